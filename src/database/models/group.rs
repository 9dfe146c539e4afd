use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::repository::{Owned, Repository, Table};
use crate::database::DatabaseError;

/// A WhatsApp group enrolled for daily summaries
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub id: Uuid,
    pub user_id: Uuid,
    pub instance_id: Option<Uuid>,
    pub group_jid: String,
    pub name: String,
    pub summary_enabled: bool,
    pub summary_time: NaiveTime,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Table for Group {
    const TABLE: &'static str = "groups";
    const COLUMNS: &'static str =
        "id, user_id, instance_id, group_jid, name, summary_enabled, summary_time, created_at, updated_at";
}

impl Owned for Group {}

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub user_id: Uuid,
    pub instance_id: Option<Uuid>,
    pub group_jid: String,
    pub name: String,
    pub summary_enabled: bool,
    pub summary_time: NaiveTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupUpdate {
    pub name: Option<String>,
    pub instance_id: Option<Uuid>,
    pub summary_enabled: Option<bool>,
    pub summary_time: Option<NaiveTime>,
}

impl Repository<Group> {
    /// Insert a group unless the owner already has `limit` of them.
    ///
    /// The owner's `users` row is locked for the count and insert, so
    /// concurrent enrollments for one user are serialized. Returns `None`
    /// when the limit is reached.
    pub async fn create_within_limit(&self, new: NewGroup, limit: i32) -> Result<Option<Group>, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(new.user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {} not found", new.user_id)))?;

        let (current,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM groups WHERE user_id = $1")
            .bind(new.user_id)
            .fetch_one(&mut *tx)
            .await?;
        if current >= i64::from(limit) {
            return Ok(None);
        }

        let group = sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO groups (id, user_id, instance_id, group_jid, name, summary_enabled, summary_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, instance_id, group_jid, name, summary_enabled, summary_time, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(new.instance_id)
        .bind(&new.group_jid)
        .bind(&new.name)
        .bind(new.summary_enabled)
        .bind(new.summary_time)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match DatabaseError::from(e) {
            DatabaseError::Conflict(_) => DatabaseError::Conflict(format!("Group '{}' is already registered", new.group_jid)),
            other => other,
        })?;

        tx.commit().await?;
        Ok(Some(group))
    }

    pub async fn update(&self, id: Uuid, update: GroupUpdate) -> Result<Group, DatabaseError> {
        let group = sqlx::query_as::<_, Group>(
            r#"
            UPDATE groups SET
                name = COALESCE($2, name),
                instance_id = COALESCE($3, instance_id),
                summary_enabled = COALESCE($4, summary_enabled),
                summary_time = COALESCE($5, summary_time),
                updated_at = now()
            WHERE id = $1
            RETURNING id, user_id, instance_id, group_jid, name, summary_enabled, summary_time, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(update.name)
        .bind(update.instance_id)
        .bind(update.summary_enabled)
        .bind(update.summary_time)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Group {} not found", id)))?;
        Ok(group)
    }
}
