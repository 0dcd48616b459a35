use dshop_engine::{db_types::Order, order_data::OrderData};

/// Joins a base URL and a path with exactly one slash between them.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// A one-line description of an order, e.g. `Order 1-001-7-1: 2 x T-shirt for 45.00`.
pub fn order_headline(order: &Order) -> String {
    format!("Order {}: {}", order.order_id, items_and_total(&order.data))
}

pub fn items_and_total(data: &OrderData) -> String {
    let items = data.items_summary();
    if items.is_empty() {
        format!("{} total", data.total)
    } else {
        format!("{items} for {}", data.total)
    }
}
