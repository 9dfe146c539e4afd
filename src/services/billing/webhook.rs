use serde::Deserialize;
use tracing::{info, warn};

use super::subscriptions::{payment_upsert, SubscriptionError, SubscriptionService};
use super::{ProviderPayment, ProviderSubscription};
use crate::database::models::SubscriptionStatus;

/// Notification body posted by the billing provider
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub payment: Option<ProviderPayment>,
    pub subscription: Option<ProviderSubscription>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Applied,
    Ignored,
}

/// Subscription status implied by a provider event, if the event moves it at all
pub fn status_for_event(event: &str) -> Option<SubscriptionStatus> {
    match event {
        "PAYMENT_CONFIRMED" | "PAYMENT_RECEIVED" => Some(SubscriptionStatus::Active),
        "PAYMENT_OVERDUE" => Some(SubscriptionStatus::Overdue),
        "SUBSCRIPTION_DELETED" => Some(SubscriptionStatus::Canceled),
        "SUBSCRIPTION_INACTIVATED" => Some(SubscriptionStatus::Inactive),
        _ => None,
    }
}

/// Status a subscription moves to when `event` arrives, or `None` to leave it alone.
///
/// `canceled` is terminal for provider events: a late payment on a canceled
/// subscription is recorded but does not revive it. Only reactivation does.
pub fn next_status(current: Option<SubscriptionStatus>, event: &str) -> Option<SubscriptionStatus> {
    let target = status_for_event(event)?;
    match current {
        Some(SubscriptionStatus::Canceled) => None,
        Some(status) if status == target => None,
        _ => Some(target),
    }
}

impl SubscriptionService {
    /// Apply one provider notification. Safe to replay: payments upsert by provider id.
    pub async fn apply_webhook_event(&self, event: &WebhookEvent) -> Result<WebhookOutcome, SubscriptionError> {
        if let Some(payment) = &event.payment {
            return self.apply_payment_event(&event.event, payment).await;
        }
        if let Some(remote) = &event.subscription {
            return self.apply_subscription_event(&event.event, remote).await;
        }

        warn!("Webhook event {} carried neither payment nor subscription", event.event);
        Ok(WebhookOutcome::Ignored)
    }

    async fn apply_payment_event(
        &self,
        event: &str,
        payment: &ProviderPayment,
    ) -> Result<WebhookOutcome, SubscriptionError> {
        let subscription = match payment.subscription.as_deref() {
            Some(provider_id) => self.subscriptions().find_by_provider_id(provider_id).await?,
            None => None,
        };

        let user_id = match &subscription {
            Some(s) => s.user_id,
            None => match self.users().find_by_billing_customer_id(&payment.customer).await? {
                Some(user) => user.id,
                None => {
                    warn!("Ignoring {} for unknown customer {}", event, payment.customer);
                    return Ok(WebhookOutcome::Ignored);
                }
            },
        };

        self.payments()
            .upsert(payment_upsert(payment, user_id, subscription.as_ref().map(|s| s.id)))
            .await?;

        if let Some(subscription) = &subscription {
            match next_status(subscription.status(), event) {
                Some(status) => {
                    self.subscriptions().set_status(subscription.id, status).await?;
                    info!(
                        "Subscription {} moved {} -> {} by {}",
                        subscription.id,
                        subscription.status,
                        status.as_str(),
                        event
                    );
                }
                None if subscription.status() == Some(SubscriptionStatus::Canceled) => {
                    warn!("Subscription {} is canceled; {} recorded without reviving it", subscription.id, event);
                }
                None => {}
            }
        }

        Ok(WebhookOutcome::Applied)
    }

    async fn apply_subscription_event(
        &self,
        event: &str,
        remote: &ProviderSubscription,
    ) -> Result<WebhookOutcome, SubscriptionError> {
        if status_for_event(event).is_none() {
            return Ok(WebhookOutcome::Ignored);
        }
        let Some(subscription) = self.subscriptions().find_by_provider_id(&remote.id).await? else {
            warn!("Ignoring {} for unknown provider subscription {}", event, remote.id);
            return Ok(WebhookOutcome::Ignored);
        };
        let Some(status) = next_status(subscription.status(), event) else {
            return Ok(WebhookOutcome::Ignored);
        };

        self.subscriptions().set_status(subscription.id, status).await?;
        info!("Subscription {} set to {} by {}", subscription.id, status.as_str(), event);
        Ok(WebhookOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payment_events_map_to_statuses() {
        assert_eq!(status_for_event("PAYMENT_RECEIVED"), Some(SubscriptionStatus::Active));
        assert_eq!(status_for_event("PAYMENT_CONFIRMED"), Some(SubscriptionStatus::Active));
        assert_eq!(status_for_event("PAYMENT_OVERDUE"), Some(SubscriptionStatus::Overdue));
        assert_eq!(status_for_event("SUBSCRIPTION_DELETED"), Some(SubscriptionStatus::Canceled));
        assert_eq!(status_for_event("PAYMENT_CREATED"), None);
        assert_eq!(status_for_event("PAYMENT_REFUNDED"), None);
    }

    #[test]
    fn canceled_is_terminal_for_provider_events() {
        let canceled = Some(SubscriptionStatus::Canceled);
        for event in ["PAYMENT_RECEIVED", "PAYMENT_CONFIRMED", "PAYMENT_OVERDUE", "SUBSCRIPTION_INACTIVATED"] {
            assert_eq!(next_status(canceled, event), None, "{event}");
        }
    }

    #[test]
    fn open_subscriptions_follow_events() {
        assert_eq!(
            next_status(Some(SubscriptionStatus::Pending), "PAYMENT_CONFIRMED"),
            Some(SubscriptionStatus::Active)
        );
        assert_eq!(
            next_status(Some(SubscriptionStatus::Overdue), "PAYMENT_RECEIVED"),
            Some(SubscriptionStatus::Active)
        );
        assert_eq!(
            next_status(Some(SubscriptionStatus::Active), "SUBSCRIPTION_DELETED"),
            Some(SubscriptionStatus::Canceled)
        );
        assert_eq!(next_status(Some(SubscriptionStatus::Active), "PAYMENT_RECEIVED"), None);
        assert_eq!(next_status(Some(SubscriptionStatus::Active), "PAYMENT_CREATED"), None);
    }

    #[test]
    fn parses_payment_notification() {
        let event: WebhookEvent = serde_json::from_value(json!({
            "id": "evt_05b708f961d739ea7eba7e4db318f621",
            "event": "PAYMENT_RECEIVED",
            "dateCreated": "2026-10-02 10:00:00",
            "payment": {
                "object": "payment",
                "id": "pay_080225913252",
                "customer": "cus_G7Dvo4iphUNk",
                "subscription": "sub_VXJBYgP2u0eO",
                "value": 29.9,
                "netValue": 28.91,
                "status": "RECEIVED",
                "billingType": "PIX",
                "dueDate": "2026-10-01",
                "paymentDate": "2026-10-02",
                "invoiceUrl": "https://www.asaas.com/i/080225913252"
            }
        }))
        .unwrap();

        assert_eq!(event.event, "PAYMENT_RECEIVED");
        let payment = event.payment.unwrap();
        assert_eq!(payment.subscription.as_deref(), Some("sub_VXJBYgP2u0eO"));
        assert!(event.subscription.is_none());
    }
}
