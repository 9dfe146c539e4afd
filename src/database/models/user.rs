use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::repository::{Repository, Table};
use crate::database::DatabaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Anything other than the literal `admin` is a regular user
    pub fn from_column(value: &str) -> Self {
        if value == "admin" {
            Role::Admin
        } else {
            Role::User
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub phone: Option<String>,
    pub cpf_cnpj: Option<String>,
    pub billing_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Role {
        Role::from_column(&self.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Role::Admin
    }
}

impl Table for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static str =
        "id, email, name, password_hash, role, phone, cpf_cnpj, billing_customer_id, created_at, updated_at";
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub phone: Option<String>,
    pub cpf_cnpj: Option<String>,
}

impl Repository<User> {
    pub async fn create(&self, new: NewUser) -> Result<User, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, name, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, name, password_hash, role, phone, cpf_cnpj, billing_customer_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.email.to_lowercase())
        .bind(&new.name)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .fetch_one(self.pool())
        .await
        .map_err(|e| match DatabaseError::from(e) {
            DatabaseError::Conflict(_) => DatabaseError::Conflict(format!("Email '{}' is already registered", new.email)),
            other => other,
        })?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, name, password_hash, role, phone, cpf_cnpj, billing_customer_id, created_at, updated_at
             FROM users WHERE email = $1",
        )
        .bind(email.to_lowercase())
        .fetch_optional(self.pool())
        .await?;
        Ok(user)
    }

    pub async fn update(&self, id: Uuid, update: UserUpdate) -> Result<User, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                role = COALESCE($3, role),
                phone = COALESCE($4, phone),
                cpf_cnpj = COALESCE($5, cpf_cnpj),
                updated_at = now()
            WHERE id = $1
            RETURNING id, email, name, password_hash, role, phone, cpf_cnpj, billing_customer_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(update.name)
        .bind(update.role.map(|r| r.as_str()))
        .bind(update.phone)
        .bind(update.cpf_cnpj)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("User {} not found", id)))?;
        Ok(user)
    }

    pub async fn set_role_by_email(&self, email: &str, role: Role) -> Result<User, DatabaseError> {
        let user = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User '{}' not found", email)))?;
        self.update(
            user.id,
            UserUpdate {
                role: Some(role),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn find_by_billing_customer_id(&self, customer_id: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, name, password_hash, role, phone, cpf_cnpj, billing_customer_id, created_at, updated_at
             FROM users WHERE billing_customer_id = $1",
        )
        .bind(customer_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(user)
    }

    pub async fn set_billing_customer_id(&self, id: Uuid, customer_id: &str) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE users SET billing_customer_id = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(customer_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_literal_admin_is_admin() {
        assert_eq!(Role::from_column("admin"), Role::Admin);
        assert_eq!(Role::from_column("Admin"), Role::User);
        assert_eq!(Role::from_column(""), Role::User);
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            email: "ana@example.com".to_string(),
            name: "Ana".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: "user".to_string(),
            phone: None,
            cpf_cnpj: None,
            billing_customer_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["role"], "user");
    }
}
