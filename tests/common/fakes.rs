//! Recording stand-ins for the billing provider and the WhatsApp gateway

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use resumo_api::services::billing::{
    self, BillingError, BillingProvider, CustomerRequest, ProviderCustomer, ProviderPayment, ProviderSubscription,
    SubscriptionRequest, SubscriptionUpdate,
};
use resumo_api::services::whatsapp::{self, ConnectionState, GatewayGroup, QrCode, WhatsAppGateway};

/// How the billing fake answers `get_subscription`
#[derive(Clone, Copy)]
pub enum Remote {
    Live,
    Deleted,
    Missing,
}

pub struct FakeBilling {
    remote: Remote,
    payments: Vec<ProviderPayment>,
    calls: Mutex<Vec<String>>,
}

impl FakeBilling {
    pub fn new(remote: Remote) -> Arc<Self> {
        Self::with_payments(remote, Vec::new())
    }

    /// `list_subscription_payments` answers with `payments`
    pub fn with_payments(remote: Remote, payments: Vec<ProviderPayment>) -> Arc<Self> {
        Arc::new(Self {
            remote,
            payments,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn subscription(id: &str, deleted: bool) -> ProviderSubscription {
        ProviderSubscription {
            id: id.to_string(),
            customer: "cus_fake".to_string(),
            status: if deleted { "INACTIVE" } else { "ACTIVE" }.to_string(),
            value: Decimal::new(2990, 2),
            next_due_date: None,
            cycle: Some("MONTHLY".to_string()),
            billing_type: Some("PIX".to_string()),
            deleted,
        }
    }
}

/// A settled provider payment for `subscription`
pub fn received_payment(id: &str, subscription: &str, paid_on: NaiveDate) -> ProviderPayment {
    ProviderPayment {
        id: id.to_string(),
        customer: "cus_fake".to_string(),
        subscription: Some(subscription.to_string()),
        value: Decimal::new(2990, 2),
        status: "RECEIVED".to_string(),
        billing_type: "PIX".to_string(),
        due_date: Some(paid_on),
        payment_date: Some(paid_on),
        confirmed_date: None,
        invoice_url: Some(format!("https://billing.example.com/i/{}", id)),
    }
}

#[async_trait]
impl BillingProvider for FakeBilling {
    async fn create_customer(&self, request: &CustomerRequest) -> billing::Result<ProviderCustomer> {
        self.record(format!("create_customer:{}", request.email));
        Ok(ProviderCustomer {
            id: "cus_fake".to_string(),
        })
    }

    async fn create_subscription(&self, request: &SubscriptionRequest) -> billing::Result<ProviderSubscription> {
        self.record(format!("create_subscription:{}:{}", request.customer, request.billing_type));
        Ok(Self::subscription("sub_new", false))
    }

    async fn get_subscription(&self, id: &str) -> billing::Result<ProviderSubscription> {
        self.record(format!("get_subscription:{}", id));
        match self.remote {
            Remote::Live => Ok(Self::subscription(id, false)),
            Remote::Deleted => Ok(Self::subscription(id, true)),
            Remote::Missing => Err(BillingError::NotFound(id.to_string())),
        }
    }

    async fn update_subscription(&self, id: &str, update: &SubscriptionUpdate) -> billing::Result<ProviderSubscription> {
        self.record(format!("update_subscription:{}:{}", id, update.status.clone().unwrap_or_default()));
        Ok(Self::subscription(id, false))
    }

    async fn cancel_subscription(&self, id: &str) -> billing::Result<()> {
        self.record(format!("cancel_subscription:{}", id));
        Ok(())
    }

    async fn list_subscription_payments(&self, id: &str) -> billing::Result<Vec<ProviderPayment>> {
        self.record(format!("list_subscription_payments:{}", id));
        Ok(self.payments.clone())
    }
}

#[derive(Default)]
pub struct FakeGateway {
    calls: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WhatsAppGateway for FakeGateway {
    async fn create_instance(&self, name: &str) -> whatsapp::Result<ConnectionState> {
        self.record(format!("create_instance:{}", name));
        Ok(ConnectionState::Close)
    }

    async fn connect(&self, name: &str) -> whatsapp::Result<QrCode> {
        self.record(format!("connect:{}", name));
        Ok(QrCode::default())
    }

    async fn connection_state(&self, name: &str) -> whatsapp::Result<ConnectionState> {
        self.record(format!("connection_state:{}", name));
        Ok(ConnectionState::Close)
    }

    async fn owner_number(&self, _name: &str) -> whatsapp::Result<Option<String>> {
        Ok(None)
    }

    async fn logout(&self, name: &str) -> whatsapp::Result<()> {
        self.record(format!("logout:{}", name));
        Ok(())
    }

    async fn delete_instance(&self, name: &str) -> whatsapp::Result<()> {
        self.record(format!("delete_instance:{}", name));
        Ok(())
    }

    async fn fetch_groups(&self, name: &str) -> whatsapp::Result<Vec<GatewayGroup>> {
        self.record(format!("fetch_groups:{}", name));
        Ok(Vec::new())
    }
}
