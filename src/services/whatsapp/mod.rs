//! WhatsApp gateway abstraction
//!
//! Instances (paired WhatsApp sessions) live on an external gateway. The
//! `WhatsAppGateway` trait is the seam; `EvolutionClient` talks to an
//! Evolution-API style server and `InstanceService` keeps the local
//! `instances` table in step with it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod evolution;
pub mod instances;

pub use evolution::EvolutionClient;
pub use instances::{InstanceError, InstanceService};

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("WhatsApp gateway is not configured")]
    NotConfigured,

    #[error("Instance not found on gateway: {0}")]
    NotFound(String),

    #[error("Gateway returned {status}: {message}")]
    Gateway { status: u16, message: String },

    #[error("Gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),
}

/// Connection state reported by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Open,
    Connecting,
    Close,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Open => "open",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Close => "close",
        }
    }

    /// Unknown gateway states are treated as disconnected
    pub fn parse(value: &str) -> Self {
        match value {
            "open" => ConnectionState::Open,
            "connecting" => ConnectionState::Connecting,
            _ => ConnectionState::Close,
        }
    }
}

/// QR code (and pairing code when the gateway offers one) for linking a phone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QrCode {
    pub base64: Option<String>,
    pub code: Option<String>,
    pub pairing_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayGroup {
    pub jid: String,
    pub subject: String,
    pub size: Option<u32>,
}

#[async_trait]
pub trait WhatsAppGateway: Send + Sync {
    /// Create the instance; returns its initial state
    async fn create_instance(&self, name: &str) -> Result<ConnectionState>;

    async fn connect(&self, name: &str) -> Result<QrCode>;

    async fn connection_state(&self, name: &str) -> Result<ConnectionState>;

    /// Phone number of the paired account, once connected
    async fn owner_number(&self, name: &str) -> Result<Option<String>>;

    async fn logout(&self, name: &str) -> Result<()>;

    async fn delete_instance(&self, name: &str) -> Result<()>;

    async fn fetch_groups(&self, name: &str) -> Result<Vec<GatewayGroup>>;
}
