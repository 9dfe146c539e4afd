use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use resumo_api::config::config;
use resumo_api::database::DatabaseManager;
use resumo_api::services::billing::AsaasClient;
use resumo_api::services::whatsapp::EvolutionClient;
use resumo_api::{app, is_production, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config().clone();
    config.validate().context("invalid configuration")?;
    tracing::info!("Starting Resumo API in {:?} mode", config.environment);

    if is_production!() && !config.security.secure_cookies {
        tracing::warn!("Session cookies are not marked Secure in production");
    }
    if config.billing.api_key.is_empty() {
        tracing::warn!("ASAAS_API_KEY is not set; subscription endpoints will fail");
    }
    if config.billing.webhook_token.is_empty() {
        tracing::warn!("ASAAS_WEBHOOK_TOKEN is not set; billing webhooks will be rejected");
    }
    if config.whatsapp.api_key.is_empty() {
        tracing::warn!("EVOLUTION_API_KEY is not set; instance endpoints will fail");
    }

    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the database")?;
    if config.database.run_migrations {
        DatabaseManager::migrate(&pool).await.context("failed to run migrations")?;
    }

    let billing = AsaasClient::from_config(&config.billing).context("invalid billing configuration")?;
    let gateway = EvolutionClient::from_config(&config.whatsapp).context("invalid WhatsApp gateway configuration")?;

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let state = AppState::new(config, pool, Arc::new(billing), Arc::new(gateway));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Resumo API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}
