use sqlx::{self, postgres::PgRow, FromRow, PgPool};
use uuid::Uuid;

use crate::database::manager::DatabaseError;

/// A persisted entity backed by a single table
pub trait Table {
    /// Table name. Always a compile-time constant, never user input.
    const TABLE: &'static str;
    /// Column list used by every SELECT on the table
    const COLUMNS: &'static str;
}

/// Generic read/delete access to one table; entity-specific writes live in
/// `impl Repository<Model>` blocks next to each model.
pub struct Repository<T> {
    pool: PgPool,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T> Repository<T>
where
    T: Table + for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _phantom: std::marker::PhantomData,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn select_all(&self) -> Result<Vec<T>, DatabaseError> {
        let sql = format!("SELECT {} FROM {} ORDER BY created_at DESC", T::COLUMNS, T::TABLE);
        Ok(sqlx::query_as::<_, T>(&sql).fetch_all(&self.pool).await?)
    }

    pub async fn select_one(&self, id: Uuid) -> Result<Option<T>, DatabaseError> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", T::COLUMNS, T::TABLE);
        Ok(sqlx::query_as::<_, T>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    pub async fn select_404(&self, id: Uuid) -> Result<T, DatabaseError> {
        self.select_one(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} record {} not found", T::TABLE, id)))
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", T::TABLE);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Tables whose rows are owned by a user through a `user_id` column
pub trait Owned: Table {}

impl<T> Repository<T>
where
    T: Owned + for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub async fn select_for_user(&self, user_id: Uuid) -> Result<Vec<T>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE user_id = $1 ORDER BY created_at DESC",
            T::COLUMNS,
            T::TABLE
        );
        Ok(sqlx::query_as::<_, T>(&sql).bind(user_id).fetch_all(&self.pool).await?)
    }

    /// Fetch a record only if it belongs to `user_id`; other users' rows read as missing
    pub async fn select_owned_404(&self, id: Uuid, user_id: Uuid) -> Result<T, DatabaseError> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1 AND user_id = $2", T::COLUMNS, T::TABLE);
        sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} record {} not found", T::TABLE, id)))
    }

    pub async fn count_for_user(&self, user_id: Uuid) -> Result<i64, DatabaseError> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE user_id = $1", T::TABLE);
        let count: (i64,) = sqlx::query_as(&sql).bind(user_id).fetch_one(&self.pool).await?;
        Ok(count.0)
    }
}
