use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::repository::{Owned, Repository, Table};
use crate::database::DatabaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Overdue,
    Inactive,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Overdue => "overdue",
            SubscriptionStatus::Inactive => "inactive",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    pub fn from_column(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(SubscriptionStatus::Pending),
            "active" => Some(SubscriptionStatus::Active),
            "overdue" => Some(SubscriptionStatus::Overdue),
            "inactive" => Some(SubscriptionStatus::Inactive),
            "canceled" => Some(SubscriptionStatus::Canceled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub provider_subscription_id: Option<String>,
    pub status: String,
    pub billing_type: String,
    pub value: Decimal,
    pub next_due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl Subscription {
    pub fn status(&self) -> Option<SubscriptionStatus> {
        SubscriptionStatus::from_column(&self.status)
    }
}

impl Table for Subscription {
    const TABLE: &'static str = "subscriptions";
    const COLUMNS: &'static str = "id, user_id, plan_id, provider_subscription_id, status, billing_type, value, \
                                   next_due_date, created_at, updated_at, canceled_at";
}

impl Owned for Subscription {}

#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub provider_subscription_id: Option<String>,
    pub status: SubscriptionStatus,
    pub billing_type: String,
    pub value: Decimal,
    pub next_due_date: Option<NaiveDate>,
}

const RETURNING: &str = "RETURNING id, user_id, plan_id, provider_subscription_id, status, billing_type, value, \
                         next_due_date, created_at, updated_at, canceled_at";

impl Repository<Subscription> {
    pub async fn create(&self, new: NewSubscription) -> Result<Subscription, DatabaseError> {
        let sql = format!(
            "INSERT INTO subscriptions (id, user_id, plan_id, provider_subscription_id, status, billing_type, value, next_due_date)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) {}",
            RETURNING
        );
        let subscription = sqlx::query_as::<_, Subscription>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.user_id)
            .bind(new.plan_id)
            .bind(&new.provider_subscription_id)
            .bind(new.status.as_str())
            .bind(&new.billing_type)
            .bind(new.value)
            .bind(new.next_due_date)
            .fetch_one(self.pool())
            .await?;
        Ok(subscription)
    }

    pub async fn find_by_provider_id(&self, provider_id: &str) -> Result<Option<Subscription>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM subscriptions WHERE provider_subscription_id = $1",
            <Subscription as Table>::COLUMNS
        );
        Ok(sqlx::query_as::<_, Subscription>(&sql)
            .bind(provider_id)
            .fetch_optional(self.pool())
            .await?)
    }

    pub async fn set_status(&self, id: Uuid, status: SubscriptionStatus) -> Result<Subscription, DatabaseError> {
        let sql = format!(
            "UPDATE subscriptions SET
                status = $2,
                canceled_at = CASE WHEN $2 = 'canceled' THEN COALESCE(canceled_at, now()) ELSE NULL END,
                updated_at = now()
             WHERE id = $1 {}",
            RETURNING
        );
        sqlx::query_as::<_, Subscription>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Subscription {} not found", id)))
    }

    /// Record a successful reactivation: active again, provider reference refreshed
    pub async fn mark_reactivated(
        &self,
        id: Uuid,
        provider_subscription_id: &str,
        next_due_date: Option<NaiveDate>,
    ) -> Result<Subscription, DatabaseError> {
        let sql = format!(
            "UPDATE subscriptions SET
                status = 'active',
                provider_subscription_id = $2,
                next_due_date = COALESCE($3, next_due_date),
                canceled_at = NULL,
                updated_at = now()
             WHERE id = $1 {}",
            RETURNING
        );
        sqlx::query_as::<_, Subscription>(&sql)
            .bind(id)
            .bind(provider_subscription_id)
            .bind(next_due_date)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Subscription {} not found", id)))
    }

    /// Group limit of the user's current active plan, if any
    pub async fn active_plan_limit(&self, user_id: Uuid) -> Result<Option<i32>, DatabaseError> {
        let row: Option<(i32,)> = sqlx::query_as(
            r#"
            SELECT p.max_groups
            FROM subscriptions s
            JOIN plans p ON p.id = s.plan_id
            WHERE s.user_id = $1 AND s.status = 'active'
            ORDER BY p.max_groups DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(|(max_groups,)| max_groups))
    }
}
