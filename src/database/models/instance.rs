use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::repository::{Owned, Repository, Table};
use crate::database::DatabaseError;

/// A WhatsApp connection hosted by the gateway on behalf of a user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Instance {
    pub id: Uuid,
    pub user_id: Uuid,
    pub label: String,
    pub instance_name: String,
    pub status: String,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Table for Instance {
    const TABLE: &'static str = "instances";
    const COLUMNS: &'static str = "id, user_id, label, instance_name, status, phone_number, created_at, updated_at";
}

impl Owned for Instance {}

#[derive(Debug, Clone)]
pub struct NewInstance {
    pub user_id: Uuid,
    pub label: String,
    pub instance_name: String,
    pub status: String,
}

impl Repository<Instance> {
    pub async fn create(&self, new: NewInstance) -> Result<Instance, DatabaseError> {
        let instance = sqlx::query_as::<_, Instance>(
            r#"
            INSERT INTO instances (id, user_id, label, instance_name, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, label, instance_name, status, phone_number, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(&new.label)
        .bind(&new.instance_name)
        .bind(&new.status)
        .fetch_one(self.pool())
        .await
        .map_err(|e| match DatabaseError::from(e) {
            DatabaseError::Conflict(_) => DatabaseError::Conflict(format!("Instance '{}' already exists", new.label)),
            other => other,
        })?;
        Ok(instance)
    }

    pub async fn find_by_name(&self, instance_name: &str) -> Result<Option<Instance>, DatabaseError> {
        let sql = format!("SELECT {} FROM instances WHERE instance_name = $1", Instance::COLUMNS);
        Ok(sqlx::query_as::<_, Instance>(&sql)
            .bind(instance_name)
            .fetch_optional(self.pool())
            .await?)
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        status: &str,
        phone_number: Option<&str>,
    ) -> Result<Instance, DatabaseError> {
        let instance = sqlx::query_as::<_, Instance>(
            r#"
            UPDATE instances SET
                status = $2,
                phone_number = COALESCE($3, phone_number),
                updated_at = now()
            WHERE id = $1
            RETURNING id, user_id, label, instance_name, status, phone_number, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(phone_number)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Instance {} not found", id)))?;
        Ok(instance)
    }
}
