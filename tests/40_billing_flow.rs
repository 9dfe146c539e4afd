//! Subscription lifecycle against a real Postgres and a recording billing fake.
//! Run with `DATABASE_URL=... cargo test -- --ignored`.

mod common;

use chrono::{NaiveDate, Utc};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use common::fakes::{received_payment, FakeBilling, Remote};
use common::{seed_plan, seed_subscription, seed_user};
use resumo_api::database::models::{Payment, Plan, Role, Subscription, SubscriptionStatus, User};
use resumo_api::database::Repository;
use resumo_api::services::billing::{SubscriptionError, SubscriptionService, WebhookEvent, WebhookOutcome};

struct Fixture {
    user: User,
    plan: Plan,
    subscription: Subscription,
}

async fn fixture(pool: &PgPool, status: SubscriptionStatus, due: Option<NaiveDate>) -> Fixture {
    let user = seed_user(pool, Role::User).await;
    let plan = seed_plan(pool, 2).await;
    let subscription = seed_subscription(pool, &user, &plan, "sub_old", status, due).await;
    Fixture {
        user,
        plan,
        subscription,
    }
}

fn event(body: serde_json::Value) -> WebhookEvent {
    serde_json::from_value(body).unwrap()
}

fn payment_event(name: &str, payment_id: &str, subscription: &str) -> WebhookEvent {
    event(json!({
        "event": name,
        "payment": {
            "id": payment_id,
            "customer": "cus_fake",
            "subscription": subscription,
            "value": 29.9,
            "status": "RECEIVED",
            "billingType": "PIX",
            "dueDate": "2026-10-01",
            "paymentDate": "2026-10-02"
        }
    }))
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn reactivation_resumes_a_live_provider_subscription(pool: PgPool) {
    let billing = FakeBilling::new(Remote::Live);
    let service = SubscriptionService::new(pool.clone(), billing.clone(), "PIX");
    let f = fixture(&pool, SubscriptionStatus::Inactive, None).await;

    let reactivated = service
        .reactivate_subscription(f.subscription.id, f.user.id)
        .await
        .unwrap();

    assert_eq!(reactivated.status(), Some(SubscriptionStatus::Active));
    assert_eq!(reactivated.provider_subscription_id.as_deref(), Some("sub_old"));
    assert_eq!(reactivated.next_due_date, Some(Utc::now().date_naive()));
    assert!(reactivated.canceled_at.is_none());
    assert_eq!(
        billing.calls(),
        vec!["get_subscription:sub_old", "update_subscription:sub_old:ACTIVE"]
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn reactivation_recreates_a_deleted_provider_subscription(pool: PgPool) {
    let billing = FakeBilling::new(Remote::Deleted);
    let service = SubscriptionService::new(pool.clone(), billing.clone(), "PIX");
    let f = fixture(&pool, SubscriptionStatus::Canceled, None).await;

    let reactivated = service
        .reactivate_subscription(f.subscription.id, f.user.id)
        .await
        .unwrap();

    assert_eq!(reactivated.status(), Some(SubscriptionStatus::Active));
    assert_eq!(reactivated.provider_subscription_id.as_deref(), Some("sub_new"));
    assert_eq!(reactivated.plan_id, f.plan.id);

    let calls = billing.calls();
    assert_eq!(calls[0], "get_subscription:sub_old");
    assert!(calls[1].starts_with("create_customer:"));
    assert_eq!(calls[2], "create_subscription:cus_fake:PIX");

    let user = Repository::<User>::new(pool).select_404(f.user.id).await.unwrap();
    assert_eq!(user.billing_customer_id.as_deref(), Some("cus_fake"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn reactivation_keeps_a_future_due_date(pool: PgPool) {
    let billing = FakeBilling::new(Remote::Missing);
    let service = SubscriptionService::new(pool.clone(), billing, "PIX");
    let due = Utc::now().date_naive() + chrono::Duration::days(10);
    let f = fixture(&pool, SubscriptionStatus::Overdue, Some(due)).await;

    let reactivated = service
        .reactivate_subscription(f.subscription.id, f.user.id)
        .await
        .unwrap();
    assert_eq!(reactivated.next_due_date, Some(due));
    assert_eq!(reactivated.provider_subscription_id.as_deref(), Some("sub_new"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn active_subscriptions_cannot_be_reactivated(pool: PgPool) {
    let billing = FakeBilling::new(Remote::Live);
    let service = SubscriptionService::new(pool.clone(), billing.clone(), "PIX");
    let f = fixture(&pool, SubscriptionStatus::Active, None).await;

    let err = service
        .reactivate_subscription(f.subscription.id, f.user.id)
        .await
        .unwrap_err();
    assert!(matches!(err, SubscriptionError::Conflict(_)));
    assert!(billing.calls().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn other_users_subscriptions_read_as_missing(pool: PgPool) {
    let billing = FakeBilling::new(Remote::Live);
    let service = SubscriptionService::new(pool.clone(), billing, "PIX");
    let f = fixture(&pool, SubscriptionStatus::Inactive, None).await;

    let err = service
        .reactivate_subscription(f.subscription.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, SubscriptionError::NotFound(_)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn payment_webhooks_activate_and_are_idempotent(pool: PgPool) {
    let billing = FakeBilling::new(Remote::Live);
    let service = SubscriptionService::new(pool.clone(), billing, "PIX");
    let f = fixture(&pool, SubscriptionStatus::Pending, None).await;

    let event = event(json!({
        "event": "PAYMENT_CONFIRMED",
        "payment": {
            "id": "pay_1",
            "customer": "cus_fake",
            "subscription": "sub_old",
            "value": 29.9,
            "status": "CONFIRMED",
            "billingType": "PIX",
            "dueDate": "2026-10-01",
            "confirmedDate": "2026-10-02"
        }
    }));

    assert_eq!(service.apply_webhook_event(&event).await.unwrap(), WebhookOutcome::Applied);
    assert_eq!(service.apply_webhook_event(&event).await.unwrap(), WebhookOutcome::Applied);

    let subscriptions = Repository::<Subscription>::new(pool.clone());
    let subscription = subscriptions.select_404(f.subscription.id).await.unwrap();
    assert_eq!(subscription.status(), Some(SubscriptionStatus::Active));
    assert_eq!(subscriptions.active_plan_limit(f.user.id).await.unwrap(), Some(2));

    let payments = Repository::<Payment>::new(pool)
        .select_for_user(f.user.id)
        .await
        .unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].subscription_id, Some(f.subscription.id));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn subscribing_creates_a_pending_subscription(pool: PgPool) {
    let billing = FakeBilling::new(Remote::Live);
    let service = SubscriptionService::new(pool.clone(), billing.clone(), "PIX");
    let user = seed_user(&pool, Role::User).await;
    let plan = seed_plan(&pool, 3).await;

    let subscription = service
        .subscribe(user.id, plan.id, Some("boleto".to_string()))
        .await
        .unwrap();

    assert_eq!(subscription.status(), Some(SubscriptionStatus::Pending));
    assert_eq!(subscription.provider_subscription_id.as_deref(), Some("sub_new"));
    assert_eq!(subscription.billing_type, "BOLETO");
    assert_eq!(subscription.value, plan.price);

    let calls = billing.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].starts_with("create_customer:"));
    assert_eq!(calls[1], "create_subscription:cus_fake:BOLETO");

    // Pending is not active: no group allowance yet
    let subscriptions = Repository::<Subscription>::new(pool);
    assert_eq!(subscriptions.active_plan_limit(user.id).await.unwrap(), None);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn subscribing_twice_conflicts(pool: PgPool) {
    let billing = FakeBilling::new(Remote::Live);
    let service = SubscriptionService::new(pool.clone(), billing.clone(), "PIX");
    let f = fixture(&pool, SubscriptionStatus::Pending, None).await;

    let err = service.subscribe(f.user.id, f.plan.id, None).await.unwrap_err();
    assert!(matches!(err, SubscriptionError::Conflict(_)));
    assert!(billing.calls().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn canceling_stops_provider_billing(pool: PgPool) {
    let billing = FakeBilling::new(Remote::Live);
    let service = SubscriptionService::new(pool.clone(), billing.clone(), "PIX");
    let f = fixture(&pool, SubscriptionStatus::Active, None).await;

    let canceled = service.cancel_subscription(f.subscription.id, f.user.id).await.unwrap();
    assert_eq!(canceled.status(), Some(SubscriptionStatus::Canceled));
    assert!(canceled.canceled_at.is_some());
    assert_eq!(billing.calls(), vec!["cancel_subscription:sub_old"]);

    let err = service.cancel_subscription(f.subscription.id, f.user.id).await.unwrap_err();
    assert!(matches!(err, SubscriptionError::Conflict(_)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn syncing_pulls_provider_payments(pool: PgPool) {
    let paid_on = NaiveDate::from_ymd_opt(2026, 9, 5).unwrap();
    let billing = FakeBilling::with_payments(
        Remote::Live,
        vec![
            received_payment("pay_a", "sub_old", paid_on),
            received_payment("pay_b", "sub_old", paid_on),
        ],
    );
    let service = SubscriptionService::new(pool.clone(), billing.clone(), "PIX");
    let f = fixture(&pool, SubscriptionStatus::Active, None).await;

    let synced = service.sync_payments(f.subscription.id, f.user.id).await.unwrap();
    assert_eq!(synced.len(), 2);
    assert!(synced.iter().all(|p| p.subscription_id == Some(f.subscription.id)));
    assert!(synced.iter().all(|p| p.paid_at.is_some()));

    // A second sync updates in place
    service.sync_payments(f.subscription.id, f.user.id).await.unwrap();
    let stored = Repository::<Payment>::new(pool).select_for_user(f.user.id).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(billing.calls(), vec!["list_subscription_payments:sub_old"; 2]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn overdue_and_deleted_events_move_the_subscription(pool: PgPool) {
    let service = SubscriptionService::new(pool.clone(), FakeBilling::new(Remote::Live), "PIX");
    let f = fixture(&pool, SubscriptionStatus::Active, None).await;
    let subscriptions = Repository::<Subscription>::new(pool);

    let overdue = payment_event("PAYMENT_OVERDUE", "pay_late", "sub_old");
    assert_eq!(service.apply_webhook_event(&overdue).await.unwrap(), WebhookOutcome::Applied);
    let stored = subscriptions.select_404(f.subscription.id).await.unwrap();
    assert_eq!(stored.status(), Some(SubscriptionStatus::Overdue));
    assert_eq!(subscriptions.active_plan_limit(f.user.id).await.unwrap(), None);

    let deleted = event(json!({
        "event": "SUBSCRIPTION_DELETED",
        "subscription": {
            "id": "sub_old",
            "customer": "cus_fake",
            "status": "INACTIVE",
            "value": 29.9,
            "deleted": true
        }
    }));
    assert_eq!(service.apply_webhook_event(&deleted).await.unwrap(), WebhookOutcome::Applied);
    let stored = subscriptions.select_404(f.subscription.id).await.unwrap();
    assert_eq!(stored.status(), Some(SubscriptionStatus::Canceled));
    assert!(stored.canceled_at.is_some());

    // Replaying the deletion changes nothing
    assert_eq!(service.apply_webhook_event(&deleted).await.unwrap(), WebhookOutcome::Ignored);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn late_payment_does_not_revive_a_canceled_subscription(pool: PgPool) {
    let billing = FakeBilling::new(Remote::Live);
    let service = SubscriptionService::new(pool.clone(), billing, "PIX");
    let f = fixture(&pool, SubscriptionStatus::Active, None).await;
    let canceled = service.cancel_subscription(f.subscription.id, f.user.id).await.unwrap();

    let late = payment_event("PAYMENT_RECEIVED", "pay_after_cancel", "sub_old");
    assert_eq!(service.apply_webhook_event(&late).await.unwrap(), WebhookOutcome::Applied);

    let subscriptions = Repository::<Subscription>::new(pool.clone());
    let stored = subscriptions.select_404(f.subscription.id).await.unwrap();
    assert_eq!(stored.status(), Some(SubscriptionStatus::Canceled));
    assert_eq!(stored.canceled_at, canceled.canceled_at);
    assert_eq!(subscriptions.active_plan_limit(f.user.id).await.unwrap(), None);

    let payments = Repository::<Payment>::new(pool).select_for_user(f.user.id).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].provider_payment_id, "pay_after_cancel");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn reactivation_clears_canceled_at(pool: PgPool) {
    let service = SubscriptionService::new(pool.clone(), FakeBilling::new(Remote::Live), "PIX");
    let f = fixture(&pool, SubscriptionStatus::Active, None).await;
    service.cancel_subscription(f.subscription.id, f.user.id).await.unwrap();

    let reactivated = service
        .reactivate_subscription(f.subscription.id, f.user.id)
        .await
        .unwrap();
    assert_eq!(reactivated.status(), Some(SubscriptionStatus::Active));
    assert!(reactivated.canceled_at.is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn reactivation_conflicts_with_another_open_subscription(pool: PgPool) {
    let billing = FakeBilling::new(Remote::Live);
    let service = SubscriptionService::new(pool.clone(), billing.clone(), "PIX");
    let f = fixture(&pool, SubscriptionStatus::Canceled, None).await;
    let other_plan = seed_plan(&pool, 5).await;

    for (provider_id, status) in [("sub_active", SubscriptionStatus::Active), ("sub_pending", SubscriptionStatus::Pending)] {
        let open = seed_subscription(&pool, &f.user, &other_plan, provider_id, status, None).await;

        let err = service
            .reactivate_subscription(f.subscription.id, f.user.id)
            .await
            .unwrap_err();
        assert!(matches!(err, SubscriptionError::Conflict(_)), "{provider_id}");
        assert!(billing.calls().is_empty(), "{provider_id}");

        Repository::<Subscription>::new(pool.clone()).delete(open.id).await.unwrap();
    }

    let stored = Repository::<Subscription>::new(pool).select_404(f.subscription.id).await.unwrap();
    assert_eq!(stored.status(), Some(SubscriptionStatus::Canceled));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn canceling_everything_for_a_user_skips_canceled_rows(pool: PgPool) {
    let billing = FakeBilling::new(Remote::Live);
    let service = SubscriptionService::new(pool.clone(), billing.clone(), "PIX");
    let f = fixture(&pool, SubscriptionStatus::Canceled, None).await;
    seed_subscription(&pool, &f.user, &f.plan, "sub_live", SubscriptionStatus::Active, None).await;

    assert_eq!(service.cancel_all_for_user(f.user.id).await.unwrap(), 1);
    assert_eq!(billing.calls(), vec!["cancel_subscription:sub_live"]);
    assert_eq!(service.cancel_all_for_user(Uuid::new_v4()).await.unwrap(), 0);
}
