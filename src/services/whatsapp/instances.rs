use sha2::{Digest, Sha256};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{ConnectionState, GatewayError, GatewayGroup, QrCode, WhatsAppGateway};
use crate::database::models::{Instance, NewInstance};
use crate::database::{DatabaseError, Repository};

#[derive(Debug, thiserror::Error)]
pub enum InstanceError {
    #[error("Invalid instance label: {0}")]
    InvalidLabel(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Keeps local instance rows and gateway instances in step
#[derive(Clone)]
pub struct InstanceService {
    instances: Repository<Instance>,
    gateway: Arc<dyn WhatsAppGateway>,
}

impl InstanceService {
    pub fn new(pool: PgPool, gateway: Arc<dyn WhatsAppGateway>) -> Self {
        Self {
            instances: Repository::new(pool),
            gateway,
        }
    }

    pub fn repository(&self) -> &Repository<Instance> {
        &self.instances
    }

    /// Create the gateway instance and its local row
    pub async fn create(&self, user_id: Uuid, label: &str) -> Result<Instance, InstanceError> {
        let label = validate_label(label)?;
        let instance_name = instance_name_for(user_id, &label);
        if self.instances.find_by_name(&instance_name).await?.is_some() {
            return Err(InstanceError::Database(DatabaseError::Conflict(format!(
                "Instance '{}' already exists",
                label
            ))));
        }

        let state = self.gateway.create_instance(&instance_name).await?;

        let created = self
            .instances
            .create(NewInstance {
                user_id,
                label: label.clone(),
                instance_name: instance_name.clone(),
                status: state.as_str().to_string(),
            })
            .await;

        match created {
            Ok(instance) => {
                info!("Created instance {} ({}) for user {}", instance.id, instance_name, user_id);
                Ok(instance)
            }
            // A concurrent create won the insert and owns the gateway instance
            Err(e @ DatabaseError::Conflict(_)) => Err(e.into()),
            Err(e) => {
                // Don't leave an orphan on the gateway
                if let Err(cleanup) = self.gateway.delete_instance(&instance_name).await {
                    warn!("Failed to remove gateway instance {} after insert error: {}", instance_name, cleanup);
                }
                Err(e.into())
            }
        }
    }

    pub async fn qr_code(&self, instance: &Instance) -> Result<QrCode, InstanceError> {
        let qr = self.gateway.connect(&instance.instance_name).await?;
        self.instances
            .update_status(instance.id, ConnectionState::Connecting.as_str(), None)
            .await?;
        Ok(qr)
    }

    /// Ask the gateway for the current state and persist it
    pub async fn refresh_status(&self, instance: &Instance) -> Result<Instance, InstanceError> {
        let state = self.gateway.connection_state(&instance.instance_name).await?;
        let phone = if state == ConnectionState::Open {
            self.gateway.owner_number(&instance.instance_name).await?
        } else {
            None
        };
        Ok(self
            .instances
            .update_status(instance.id, state.as_str(), phone.as_deref())
            .await?)
    }

    pub async fn logout(&self, instance: &Instance) -> Result<Instance, InstanceError> {
        self.gateway.logout(&instance.instance_name).await?;
        Ok(self
            .instances
            .update_status(instance.id, ConnectionState::Close.as_str(), None)
            .await?)
    }

    /// Remove from the gateway (tolerating an already-gone instance) and locally
    pub async fn delete(&self, instance: &Instance) -> Result<(), InstanceError> {
        match self.gateway.delete_instance(&instance.instance_name).await {
            Ok(()) | Err(GatewayError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        self.instances.delete(instance.id).await?;
        info!("Deleted instance {} ({})", instance.id, instance.instance_name);
        Ok(())
    }

    /// Remove every instance a user owns. Returns how many were removed.
    pub async fn delete_all_for_user(&self, user_id: Uuid) -> Result<usize, InstanceError> {
        let owned = self.instances.select_for_user(user_id).await?;
        for instance in &owned {
            self.delete(instance).await?;
        }
        Ok(owned.len())
    }

    pub async fn groups(&self, instance: &Instance) -> Result<Vec<GatewayGroup>, InstanceError> {
        Ok(self.gateway.fetch_groups(&instance.instance_name).await?)
    }
}

/// Stable gateway name for a user's instance: `inst_` + 16 hex chars of SHA-256
pub fn instance_name_for(user_id: Uuid, label: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(label.to_lowercase().as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    format!("inst_{}", &hash[..16])
}

fn validate_label(label: &str) -> Result<String, InstanceError> {
    let label = label.trim();
    if label.is_empty() {
        return Err(InstanceError::InvalidLabel("label is required".to_string()));
    }
    if label.chars().count() > 50 {
        return Err(InstanceError::InvalidLabel("label must be at most 50 characters".to_string()));
    }
    if !label
        .chars()
        .all(|c| c.is_alphanumeric() || c == ' ' || c == '-' || c == '_')
    {
        return Err(InstanceError::InvalidLabel(
            "label can only contain letters, numbers, spaces, hyphens and underscores".to_string(),
        ));
    }
    Ok(label.to_string())
}
