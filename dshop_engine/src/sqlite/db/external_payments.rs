use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::{ExternalPayment, NewExternalPayment};

/// External payments are written by the checkout flow. The engine only needs this for tests and tooling.
pub async fn insert_external_payment(
    payment: NewExternalPayment,
    conn: &mut SqliteConnection,
) -> Result<ExternalPayment, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO external_payments (payment_code, payment_reference, provider, amount, currency, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(payment.payment_code)
    .bind(payment.payment_reference)
    .bind(payment.provider)
    .bind(payment.amount)
    .bind(payment.currency)
    .bind(Utc::now())
    .fetch_one(conn)
    .await
}

pub async fn fetch_external_payment(
    payment_code: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<ExternalPayment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM external_payments WHERE payment_code = $1")
        .bind(payment_code)
        .fetch_optional(conn)
        .await
}
