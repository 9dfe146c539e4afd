use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::{
    BillingError, BillingProvider, CustomerRequest, ProviderCustomer, ProviderPayment, ProviderSubscription, Result,
    SubscriptionRequest, SubscriptionUpdate,
};
use crate::config::BillingConfig;

/// Asaas v3 REST client
#[derive(Clone)]
pub struct AsaasClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    description: String,
}

impl AsaasClient {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| BillingError::InvalidResponse(format!("invalid base URL '{}': {}", base_url, e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &BillingConfig) -> Result<Self> {
        Self::new(&config.base_url, config.api_key.clone())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BillingError::InvalidResponse("base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<B, T>(&self, method: Method, segments: &[&str], body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        if self.api_key.is_empty() {
            return Err(BillingError::NotConfigured);
        }

        let url = self.endpoint(segments)?;
        debug!("Asaas {} {}", method, url.path());

        let mut request = self
            .client
            .request(method, url)
            .header("access_token", &self.api_key)
            .header("User-Agent", concat!("resumo-api/", env!("CARGO_PKG_VERSION")));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(BillingError::NotFound(segments.join("/")));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BillingError::Provider {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| BillingError::InvalidResponse(e.to_string()))
    }
}

/// Flatten the provider's `{ errors: [{ description }] }` body into one message
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) if !parsed.errors.is_empty() => parsed
            .errors
            .into_iter()
            .map(|e| e.description)
            .collect::<Vec<_>>()
            .join("; "),
        _ if body.trim().is_empty() => "empty response body".to_string(),
        _ => body.trim().to_string(),
    }
}

#[async_trait]
impl BillingProvider for AsaasClient {
    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn create_customer(&self, request: &CustomerRequest) -> Result<ProviderCustomer> {
        self.send(Method::POST, &["customers"], Some(request)).await
    }

    #[instrument(skip(self, request), fields(customer = %request.customer))]
    async fn create_subscription(&self, request: &SubscriptionRequest) -> Result<ProviderSubscription> {
        self.send(Method::POST, &["subscriptions"], Some(request)).await
    }

    async fn get_subscription(&self, id: &str) -> Result<ProviderSubscription> {
        self.send::<(), _>(Method::GET, &["subscriptions", id], None).await
    }

    #[instrument(skip(self, update))]
    async fn update_subscription(&self, id: &str, update: &SubscriptionUpdate) -> Result<ProviderSubscription> {
        // Asaas updates subscriptions with POST on the resource
        self.send(Method::POST, &["subscriptions", id], Some(update)).await
    }

    async fn cancel_subscription(&self, id: &str) -> Result<()> {
        let _: serde_json::Value = self.send::<(), _>(Method::DELETE, &["subscriptions", id], None).await?;
        Ok(())
    }

    async fn list_subscription_payments(&self, id: &str) -> Result<Vec<ProviderPayment>> {
        let list: ListResponse<ProviderPayment> = self
            .send::<(), _>(Method::GET, &["subscriptions", id, "payments"], None)
            .await?;
        Ok(list.data)
    }
}
