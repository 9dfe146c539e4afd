//! Billing provider abstraction
//!
//! The `BillingProvider` trait covers the customer and subscription calls this
//! service makes against the billing provider (Asaas). `SubscriptionService`
//! orchestrates those calls with the local `subscriptions`/`payments` tables.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub mod asaas;
pub mod subscriptions;
pub mod webhook;

pub use asaas::AsaasClient;
pub use subscriptions::{SubscriptionError, SubscriptionService};
pub use webhook::{WebhookEvent, WebhookOutcome};

/// Result type for billing provider operations
pub type Result<T> = std::result::Result<T, BillingError>;

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("Billing provider is not configured")]
    NotConfigured,

    #[error("Not found at billing provider: {0}")]
    NotFound(String),

    #[error("Billing provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("Billing provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid billing provider response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRequest {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpf_cnpj: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_phone: Option<String>,
    pub external_reference: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderCustomer {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    pub customer: String,
    pub billing_type: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    pub next_due_date: NaiveDate,
    pub cycle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_reference: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_pending_payments: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSubscription {
    pub id: String,
    pub customer: String,
    pub status: String,
    pub value: Decimal,
    pub next_due_date: Option<NaiveDate>,
    pub cycle: Option<String>,
    pub billing_type: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderPayment {
    pub id: String,
    pub customer: String,
    pub subscription: Option<String>,
    pub value: Decimal,
    pub status: String,
    pub billing_type: String,
    pub due_date: Option<NaiveDate>,
    pub payment_date: Option<NaiveDate>,
    pub confirmed_date: Option<NaiveDate>,
    pub invoice_url: Option<String>,
}

impl ProviderPayment {
    /// Date the money was received or confirmed, whichever the provider reported
    pub fn settled_on(&self) -> Option<NaiveDate> {
        self.payment_date.or(self.confirmed_date)
    }
}

/// Abstract billing provider interface
#[async_trait]
pub trait BillingProvider: Send + Sync {
    async fn create_customer(&self, request: &CustomerRequest) -> Result<ProviderCustomer>;

    async fn create_subscription(&self, request: &SubscriptionRequest) -> Result<ProviderSubscription>;

    /// Fetch a subscription. Deleted subscriptions are still returned with `deleted = true`.
    async fn get_subscription(&self, id: &str) -> Result<ProviderSubscription>;

    async fn update_subscription(&self, id: &str, update: &SubscriptionUpdate) -> Result<ProviderSubscription>;

    async fn cancel_subscription(&self, id: &str) -> Result<()>;

    async fn list_subscription_payments(&self, id: &str) -> Result<Vec<ProviderPayment>>;
}
