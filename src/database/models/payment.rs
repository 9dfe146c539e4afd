use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::repository::{Owned, Repository, Table};
use crate::database::DatabaseError;

/// A charge issued by the billing provider, mirrored locally
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub provider_payment_id: String,
    pub value: Decimal,
    pub status: String,
    pub billing_type: String,
    pub due_date: Option<NaiveDate>,
    pub paid_at: Option<DateTime<Utc>>,
    pub invoice_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Table for Payment {
    const TABLE: &'static str = "payments";
    const COLUMNS: &'static str = "id, user_id, subscription_id, provider_payment_id, value, status, billing_type, \
                                   due_date, paid_at, invoice_url, created_at";
}

impl Owned for Payment {}

#[derive(Debug, Clone)]
pub struct PaymentUpsert {
    pub user_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub provider_payment_id: String,
    pub value: Decimal,
    pub status: String,
    pub billing_type: String,
    pub due_date: Option<NaiveDate>,
    pub paid_at: Option<DateTime<Utc>>,
    pub invoice_url: Option<String>,
}

impl Repository<Payment> {
    /// Insert a payment or refresh the one with the same provider id
    pub async fn upsert(&self, payment: PaymentUpsert) -> Result<Payment, DatabaseError> {
        let row = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments
                (id, user_id, subscription_id, provider_payment_id, value, status, billing_type, due_date, paid_at, invoice_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (provider_payment_id) DO UPDATE SET
                subscription_id = COALESCE(EXCLUDED.subscription_id, payments.subscription_id),
                value = EXCLUDED.value,
                status = EXCLUDED.status,
                billing_type = EXCLUDED.billing_type,
                due_date = EXCLUDED.due_date,
                paid_at = COALESCE(EXCLUDED.paid_at, payments.paid_at),
                invoice_url = COALESCE(EXCLUDED.invoice_url, payments.invoice_url)
            RETURNING id, user_id, subscription_id, provider_payment_id, value, status, billing_type,
                      due_date, paid_at, invoice_url, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(payment.user_id)
        .bind(payment.subscription_id)
        .bind(&payment.provider_payment_id)
        .bind(payment.value)
        .bind(&payment.status)
        .bind(&payment.billing_type)
        .bind(payment.due_date)
        .bind(payment.paid_at)
        .bind(&payment.invoice_url)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }
}
