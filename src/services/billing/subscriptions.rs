use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{BillingError, BillingProvider, CustomerRequest, ProviderPayment, SubscriptionRequest, SubscriptionUpdate};
use crate::database::models::{
    NewSubscription, Payment, PaymentUpsert, Plan, Subscription, SubscriptionStatus, User,
};
use crate::database::{DatabaseError, Repository};

/// Provider status string for a running subscription
const PROVIDER_ACTIVE: &str = "ACTIVE";

#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidData(String),

    #[error(transparent)]
    Billing(#[from] BillingError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl SubscriptionError {
    fn from_lookup(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => SubscriptionError::NotFound(msg),
            other => SubscriptionError::Database(other),
        }
    }
}

/// How a reactivation reaches the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reactivation {
    /// The provider subscription still exists; switch it back on
    Resume(String),
    /// Nothing usable at the provider; open a new subscription
    Recreate,
}

/// Subscription lifecycle against the billing provider and the local tables
#[derive(Clone)]
pub struct SubscriptionService {
    users: Repository<User>,
    plans: Repository<Plan>,
    subscriptions: Repository<Subscription>,
    payments: Repository<Payment>,
    provider: Arc<dyn BillingProvider>,
    default_billing_type: String,
}

impl SubscriptionService {
    pub fn new(pool: PgPool, provider: Arc<dyn BillingProvider>, default_billing_type: impl Into<String>) -> Self {
        Self {
            users: Repository::new(pool.clone()),
            plans: Repository::new(pool.clone()),
            subscriptions: Repository::new(pool.clone()),
            payments: Repository::new(pool),
            provider,
            default_billing_type: default_billing_type.into(),
        }
    }

    /// Subscribe a user to a plan: provider customer, provider subscription, local `pending` row
    pub async fn subscribe(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        billing_type: Option<String>,
    ) -> Result<Subscription, SubscriptionError> {
        let user = self.users.select_404(user_id).await.map_err(SubscriptionError::from_lookup)?;
        let plan = self.plans.select_404(plan_id).await.map_err(SubscriptionError::from_lookup)?;
        if !plan.active {
            return Err(SubscriptionError::InvalidData(format!("Plan '{}' is not available", plan.name)));
        }

        self.ensure_no_open_subscription(user_id, None).await?;

        let billing_type = billing_type
            .map(|b| b.to_uppercase())
            .unwrap_or_else(|| self.default_billing_type.clone());
        let customer = self.ensure_customer(&user).await?;
        let next_due_date = Utc::now().date_naive();

        let remote = self
            .provider
            .create_subscription(&SubscriptionRequest {
                customer,
                billing_type: billing_type.clone(),
                value: plan.price,
                next_due_date,
                cycle: plan.cycle.clone(),
                description: Some(plan.name.clone()),
                external_reference: Some(user.id.to_string()),
            })
            .await?;

        let subscription = self
            .subscriptions
            .create(NewSubscription {
                user_id,
                plan_id,
                provider_subscription_id: Some(remote.id),
                status: SubscriptionStatus::Pending,
                billing_type,
                value: plan.price,
                next_due_date: remote.next_due_date.or(Some(next_due_date)),
            })
            .await?;

        info!("User {} subscribed to plan '{}' ({})", user_id, plan.name, subscription.id);
        Ok(subscription)
    }

    /// Bring a lapsed subscription back to `active`.
    ///
    /// The subscription must belong to `user_id`. A provider subscription that
    /// still exists is resumed in place; a deleted or missing one is replaced
    /// by a new provider subscription with the same value, cycle and billing type.
    pub async fn reactivate_subscription(
        &self,
        subscription_id: Uuid,
        user_id: Uuid,
    ) -> Result<Subscription, SubscriptionError> {
        let subscription = self
            .subscriptions
            .select_owned_404(subscription_id, user_id)
            .await
            .map_err(SubscriptionError::from_lookup)?;

        if subscription.status() == Some(SubscriptionStatus::Active) {
            return Err(SubscriptionError::Conflict("Subscription is already active".to_string()));
        }
        self.ensure_no_open_subscription(user_id, Some(subscription.id)).await?;

        let plan = self
            .plans
            .select_404(subscription.plan_id)
            .await
            .map_err(SubscriptionError::from_lookup)?;
        let next_due = next_due_date(subscription.next_due_date, Utc::now().date_naive());

        let provider_id = match self.plan_reactivation(&subscription).await? {
            Reactivation::Resume(provider_id) => {
                self.provider
                    .update_subscription(
                        &provider_id,
                        &SubscriptionUpdate {
                            status: Some(PROVIDER_ACTIVE.to_string()),
                            next_due_date: Some(next_due),
                            update_pending_payments: Some(true),
                        },
                    )
                    .await?;
                info!("Resumed provider subscription {} for {}", provider_id, subscription.id);
                provider_id
            }
            Reactivation::Recreate => {
                let user = self.users.select_404(user_id).await.map_err(SubscriptionError::from_lookup)?;
                let customer = self.ensure_customer(&user).await?;
                let remote = self
                    .provider
                    .create_subscription(&SubscriptionRequest {
                        customer,
                        billing_type: subscription.billing_type.clone(),
                        value: subscription.value,
                        next_due_date: next_due,
                        cycle: plan.cycle.clone(),
                        description: Some(plan.name.clone()),
                        external_reference: Some(user.id.to_string()),
                    })
                    .await?;
                info!("Created provider subscription {} to reactivate {}", remote.id, subscription.id);
                remote.id
            }
        };

        Ok(self
            .subscriptions
            .mark_reactivated(subscription.id, &provider_id, Some(next_due))
            .await?)
    }

    async fn plan_reactivation(&self, subscription: &Subscription) -> Result<Reactivation, SubscriptionError> {
        let Some(provider_id) = subscription.provider_subscription_id.as_deref() else {
            return Ok(Reactivation::Recreate);
        };
        match self.provider.get_subscription(provider_id).await {
            Ok(remote) if !remote.deleted => Ok(Reactivation::Resume(remote.id)),
            Ok(_) => Ok(Reactivation::Recreate),
            Err(BillingError::NotFound(_)) => {
                warn!("Provider subscription {} no longer exists", provider_id);
                Ok(Reactivation::Recreate)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Cancel at the provider, then mark the local subscription `canceled`
    pub async fn cancel_subscription(
        &self,
        subscription_id: Uuid,
        user_id: Uuid,
    ) -> Result<Subscription, SubscriptionError> {
        let subscription = self
            .subscriptions
            .select_owned_404(subscription_id, user_id)
            .await
            .map_err(SubscriptionError::from_lookup)?;

        if subscription.status() == Some(SubscriptionStatus::Canceled) {
            return Err(SubscriptionError::Conflict("Subscription is already canceled".to_string()));
        }

        if let Some(provider_id) = subscription.provider_subscription_id.as_deref() {
            match self.provider.cancel_subscription(provider_id).await {
                Ok(()) | Err(BillingError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let canceled = self
            .subscriptions
            .set_status(subscription.id, SubscriptionStatus::Canceled)
            .await?;
        info!("Subscription {} canceled by user {}", subscription.id, user_id);
        Ok(canceled)
    }

    /// Cancel every subscription the user is still billed for. Returns how many were canceled.
    pub async fn cancel_all_for_user(&self, user_id: Uuid) -> Result<usize, SubscriptionError> {
        let mut canceled = 0;
        for subscription in self.subscriptions.select_for_user(user_id).await? {
            if subscription.status() == Some(SubscriptionStatus::Canceled) {
                continue;
            }
            self.cancel_subscription(subscription.id, user_id).await?;
            canceled += 1;
        }
        Ok(canceled)
    }

    /// Pull the provider's payments for a subscription into the local table
    pub async fn sync_payments(&self, subscription_id: Uuid, user_id: Uuid) -> Result<Vec<Payment>, SubscriptionError> {
        let subscription = self
            .subscriptions
            .select_owned_404(subscription_id, user_id)
            .await
            .map_err(SubscriptionError::from_lookup)?;

        let Some(provider_id) = subscription.provider_subscription_id.as_deref() else {
            return Ok(Vec::new());
        };

        let remote = self.provider.list_subscription_payments(provider_id).await?;
        let mut synced = Vec::with_capacity(remote.len());
        for payment in remote {
            synced.push(
                self.payments
                    .upsert(payment_upsert(&payment, subscription.user_id, Some(subscription.id)))
                    .await?,
            );
        }
        Ok(synced)
    }

    /// A user is billed through at most one `active` or `pending` subscription
    async fn ensure_no_open_subscription(&self, user_id: Uuid, except: Option<Uuid>) -> Result<(), SubscriptionError> {
        let existing = self.subscriptions.select_for_user(user_id).await?;
        if has_open_subscription(&existing, except) {
            return Err(SubscriptionError::Conflict("User already has an open subscription".to_string()));
        }
        Ok(())
    }

    /// Make sure the user exists as a provider customer and return its id
    async fn ensure_customer(&self, user: &User) -> Result<String, SubscriptionError> {
        if let Some(id) = &user.billing_customer_id {
            return Ok(id.clone());
        }

        let customer = self
            .provider
            .create_customer(&CustomerRequest {
                name: user.name.clone(),
                email: user.email.clone(),
                cpf_cnpj: user.cpf_cnpj.clone(),
                mobile_phone: user.phone.clone(),
                external_reference: user.id.to_string(),
            })
            .await?;
        self.users.set_billing_customer_id(user.id, &customer.id).await?;
        info!("Registered billing customer {} for user {}", customer.id, user.id);
        Ok(customer.id)
    }

    pub(crate) fn subscriptions(&self) -> &Repository<Subscription> {
        &self.subscriptions
    }

    pub(crate) fn payments(&self) -> &Repository<Payment> {
        &self.payments
    }

    pub(crate) fn users(&self) -> &Repository<User> {
        &self.users
    }
}

fn has_open_subscription(subscriptions: &[Subscription], except: Option<Uuid>) -> bool {
    subscriptions.iter().any(|s| {
        Some(s.id) != except
            && matches!(s.status(), Some(SubscriptionStatus::Active) | Some(SubscriptionStatus::Pending))
    })
}

/// Keep a future due date; anything past (or unknown) becomes today
pub fn next_due_date(stored: Option<NaiveDate>, today: NaiveDate) -> NaiveDate {
    match stored {
        Some(date) if date > today => date,
        _ => today,
    }
}

pub(crate) fn payment_upsert(payment: &ProviderPayment, user_id: Uuid, subscription_id: Option<Uuid>) -> PaymentUpsert {
    PaymentUpsert {
        user_id,
        subscription_id,
        provider_payment_id: payment.id.clone(),
        value: payment.value,
        status: payment.status.clone(),
        billing_type: payment.billing_type.clone(),
        due_date: payment.due_date,
        paid_at: payment
            .settled_on()
            .map(|date| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))),
        invoice_url: payment.invoice_url.clone(),
    }
}
