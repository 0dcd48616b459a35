use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::{header::HeaderValue, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::IntegrationError;

/// A thin shared wrapper around a `reqwest` client. Every integration sends its requests through one of these so that
/// timeouts and error mapping are uniform.
#[derive(Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, IntegrationError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dshop/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IntegrationError::Initialization(e.to_string()))?;
        Ok(Self { client: Arc::new(client) })
    }

    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Sends the request and deserializes a successful JSON response.
    pub async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, IntegrationError> {
        let response = self.send(req).await?;
        response.json::<T>().await.map_err(|e| IntegrationError::JsonError(e.to_string()))
    }

    /// Sends the request and returns the raw response body.
    pub async fn send_bytes(&self, req: RequestBuilder) -> Result<Vec<u8>, IntegrationError> {
        let response = self.send(req).await?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Sends the request. Non-success statuses become [`IntegrationError::QueryError`] carrying the response body.
    pub async fn send(&self, req: RequestBuilder) -> Result<Response, IntegrationError> {
        let response = req.send().await?;
        let status = response.status();
        if status.is_success() {
            trace!("Request successful. {status}");
            Ok(response)
        } else {
            let status = status.as_u16();
            let message = response.text().await?;
            debug!("Request failed. Error {status}. {message}");
            Err(IntegrationError::QueryError { status, message })
        }
    }
}

pub fn bearer(token: &str) -> Result<HeaderValue, IntegrationError> {
    HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| IntegrationError::RequestError(e.to_string()))
}
