use sqlx::PgPool;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::models::{Group, Payment, Plan, User};
use crate::database::Repository;
use crate::services::billing::{BillingProvider, SubscriptionService};
use crate::services::whatsapp::{InstanceService, WhatsAppGateway};

/// Shared per-process state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pool: PgPool,
    pub subscriptions: SubscriptionService,
    pub instances: InstanceService,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        pool: PgPool,
        billing: Arc<dyn BillingProvider>,
        gateway: Arc<dyn WhatsAppGateway>,
    ) -> Self {
        let subscriptions = SubscriptionService::new(pool.clone(), billing, config.billing.default_billing_type.clone());
        let instances = InstanceService::new(pool.clone(), gateway);
        Self {
            config: Arc::new(config),
            pool,
            subscriptions,
            instances,
        }
    }

    pub fn users(&self) -> Repository<User> {
        Repository::new(self.pool.clone())
    }

    pub fn groups(&self) -> Repository<Group> {
        Repository::new(self.pool.clone())
    }

    pub fn plans(&self) -> Repository<Plan> {
        Repository::new(self.pool.clone())
    }

    pub fn payments(&self) -> Repository<Payment> {
        Repository::new(self.pool.clone())
    }
}
