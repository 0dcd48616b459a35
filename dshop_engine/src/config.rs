use std::{env, time::Duration};

use dshop_common::helpers::{parse_boolean_flag, parse_list};
use log::*;

pub const DEFAULT_CONTENT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;
pub const DEFAULT_REFUNDABLE_PAYMENT_METHODS: &str = "stripe";

/// Runtime knobs for the reconciliation engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on a single offer-descriptor fetch from content storage
    pub content_fetch_timeout: Duration,
    /// When true, offer events that are older than (or not a forward transition from) the order's last applied event
    /// are ignored. When false, every event overwrites the order status.
    pub enforce_event_ordering: bool,
    /// Payment method ids whose orders are refunded through the refund processor on withdrawal
    pub refundable_payment_methods: Vec<String>,
    /// Channel size for the hook event handlers
    pub event_buffer_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            content_fetch_timeout: DEFAULT_CONTENT_FETCH_TIMEOUT,
            enforce_event_ordering: true,
            refundable_payment_methods: parse_list(DEFAULT_REFUNDABLE_PAYMENT_METHODS),
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl EngineConfig {
    pub fn from_env_or_default() -> Self {
        let content_fetch_timeout = env::var("DSHOP_CONTENT_FETCH_TIMEOUT")
            .ok()
            .map(|s| {
                s.parse::<u64>().map(Duration::from_secs).unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid value for DSHOP_CONTENT_FETCH_TIMEOUT. {e} Using the default, {}s, \
                         instead.",
                        DEFAULT_CONTENT_FETCH_TIMEOUT.as_secs()
                    );
                    DEFAULT_CONTENT_FETCH_TIMEOUT
                })
            })
            .unwrap_or(DEFAULT_CONTENT_FETCH_TIMEOUT);
        let enforce_event_ordering = parse_boolean_flag(env::var("DSHOP_ENFORCE_EVENT_ORDERING").ok(), true);
        if !enforce_event_ordering {
            warn!(
                "🪛️ Event ordering is NOT enforced. Late or replayed offer events will overwrite order statuses. Set \
                 DSHOP_ENFORCE_EVENT_ORDERING=true to turn the ordering guard back on."
            );
        }
        let refundable_payment_methods = env::var("DSHOP_REFUNDABLE_PAYMENT_METHODS")
            .map(|s| parse_list(&s))
            .unwrap_or_else(|_| parse_list(DEFAULT_REFUNDABLE_PAYMENT_METHODS));
        if refundable_payment_methods.is_empty() {
            info!("🪛️ No refundable payment methods are configured. Withdrawn offers will never be refunded.");
        }
        let event_buffer_size = env::var("DSHOP_EVENT_BUFFER_SIZE")
            .ok()
            .and_then(|s| {
                s.parse::<usize>()
                    .map_err(|e| {
                        warn!("🪛️ Invalid DSHOP_EVENT_BUFFER_SIZE ({s}): {e}. Using {DEFAULT_EVENT_BUFFER_SIZE}.")
                    })
                    .ok()
            })
            .unwrap_or(DEFAULT_EVENT_BUFFER_SIZE);
        Self { content_fetch_timeout, enforce_event_ordering, refundable_payment_methods, event_buffer_size }
    }

    pub fn with_content_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.content_fetch_timeout = timeout;
        self
    }

    pub fn with_event_ordering(mut self, enforce: bool) -> Self {
        self.enforce_event_ordering = enforce;
        self
    }

    pub fn with_refundable_payment_methods<S: AsRef<str>>(mut self, methods: &[S]) -> Self {
        self.refundable_payment_methods = methods.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    /// True if orders paid with the given method are refunded on withdrawal.
    pub fn is_refundable(&self, payment_method: &str) -> bool {
        self.refundable_payment_methods.iter().any(|m| m == payment_method)
    }
}
