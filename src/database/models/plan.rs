use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::repository::{Repository, Table};
use crate::database::DatabaseError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub cycle: String,
    pub max_groups: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Table for Plan {
    const TABLE: &'static str = "plans";
    const COLUMNS: &'static str = "id, name, description, price, cycle, max_groups, active, created_at";
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPlan {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default = "default_cycle")]
    pub cycle: String,
    #[serde(default = "default_max_groups")]
    pub max_groups: i32,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// Billing cycles the provider accepts
pub const PLAN_CYCLES: &[&str] = &["WEEKLY", "BIWEEKLY", "MONTHLY", "QUARTERLY", "SEMIANNUALLY", "YEARLY"];

fn validate_price(price: Decimal) -> Result<(), String> {
    if price <= Decimal::ZERO {
        return Err("price must be greater than zero".to_string());
    }
    Ok(())
}

fn validate_cycle(cycle: &str) -> Result<(), String> {
    if PLAN_CYCLES.contains(&cycle.to_uppercase().as_str()) {
        Ok(())
    } else {
        Err(format!("cycle must be one of {}", PLAN_CYCLES.join(", ")))
    }
}

fn validate_max_groups(max_groups: i32) -> Result<(), String> {
    if max_groups < 1 {
        return Err("max_groups must be at least 1".to_string());
    }
    Ok(())
}

impl NewPlan {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is required".to_string());
        }
        validate_price(self.price)?;
        validate_cycle(&self.cycle)?;
        validate_max_groups(self.max_groups)
    }
}

impl PlanUpdate {
    /// Only the fields being changed are checked
    pub fn validate(&self) -> Result<(), String> {
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(cycle) = &self.cycle {
            validate_cycle(cycle)?;
        }
        if let Some(max_groups) = self.max_groups {
            validate_max_groups(max_groups)?;
        }
        Ok(())
    }
}

fn default_cycle() -> String {
    "MONTHLY".to_string()
}

fn default_max_groups() -> i32 {
    1
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub cycle: Option<String>,
    pub max_groups: Option<i32>,
    pub active: Option<bool>,
}

impl Repository<Plan> {
    pub async fn select_active(&self) -> Result<Vec<Plan>, DatabaseError> {
        let plans = sqlx::query_as::<_, Plan>(
            "SELECT id, name, description, price, cycle, max_groups, active, created_at
             FROM plans WHERE active ORDER BY price ASC",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(plans)
    }

    pub async fn create(&self, new: NewPlan) -> Result<Plan, DatabaseError> {
        let plan = sqlx::query_as::<_, Plan>(
            r#"
            INSERT INTO plans (id, name, description, price, cycle, max_groups, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, description, price, cycle, max_groups, active, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.cycle.to_uppercase())
        .bind(new.max_groups)
        .bind(new.active)
        .fetch_one(self.pool())
        .await?;
        Ok(plan)
    }

    pub async fn update(&self, id: Uuid, update: PlanUpdate) -> Result<Plan, DatabaseError> {
        let plan = sqlx::query_as::<_, Plan>(
            r#"
            UPDATE plans SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                cycle = COALESCE($5, cycle),
                max_groups = COALESCE($6, max_groups),
                active = COALESCE($7, active)
            WHERE id = $1
            RETURNING id, name, description, price, cycle, max_groups, active, created_at
            "#,
        )
        .bind(id)
        .bind(update.name)
        .bind(update.description)
        .bind(update.price)
        .bind(update.cycle.map(|c| c.to_uppercase()))
        .bind(update.max_groups)
        .bind(update.active)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Plan {} not found", id)))?;
        Ok(plan)
    }

    /// Insert the plan, or update the existing plan with the same name
    pub async fn upsert_by_name(&self, new: NewPlan) -> Result<Plan, DatabaseError> {
        let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM plans WHERE name = $1")
            .bind(&new.name)
            .fetch_optional(self.pool())
            .await?;

        match existing {
            Some((id,)) => {
                self.update(
                    id,
                    PlanUpdate {
                        name: None,
                        description: new.description,
                        price: Some(new.price),
                        cycle: Some(new.cycle),
                        max_groups: Some(new.max_groups),
                        active: Some(new.active),
                    },
                )
                .await
            }
            None => self.create(new).await,
        }
    }
}
