use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{ConnectionState, GatewayError, GatewayGroup, QrCode, Result, WhatsAppGateway};
use crate::config::WhatsAppConfig;

/// Client for an Evolution-API style WhatsApp gateway
#[derive(Clone)]
pub struct EvolutionClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    instance: InstanceInfo,
}

#[derive(Debug, Deserialize)]
struct InstanceInfo {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StateResponse {
    instance: InstanceInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectResponse {
    base64: Option<String>,
    code: Option<String>,
    pairing_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroupInfo {
    id: String,
    subject: String,
    size: Option<u32>,
}

impl EvolutionClient {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| GatewayError::InvalidResponse(format!("invalid base URL '{}': {}", base_url, e)))?;
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &WhatsAppConfig) -> Result<Self> {
        Self::new(&config.base_url, config.api_key.clone())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::InvalidResponse("base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<B, T>(&self, method: Method, url: Url, instance: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        if self.api_key.is_empty() {
            return Err(GatewayError::NotConfigured);
        }

        debug!("Gateway {} {}", method, url.path());
        let mut request = self.client.request(method, url).header("apikey", &self.api_key);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(instance.to_string()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Gateway {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }
}

/// Pull `response.message` out of the gateway's error body
fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed.as_ref().and_then(|v| v.pointer("/response/message"));
    match message {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).unwrap_or_else(|| item.to_string()))
            .collect::<Vec<_>>()
            .join("; "),
        Some(Value::String(s)) => s.clone(),
        _ if body.trim().is_empty() => "empty response body".to_string(),
        _ => body.trim().to_string(),
    }
}

/// `5511999990000@s.whatsapp.net` -> `5511999990000`
fn phone_from_jid(jid: &str) -> String {
    jid.split(['@', ':']).next().unwrap_or(jid).to_string()
}

#[async_trait]
impl WhatsAppGateway for EvolutionClient {
    async fn create_instance(&self, name: &str) -> Result<ConnectionState> {
        let body = json!({
            "instanceName": name,
            "qrcode": true,
            "integration": "WHATSAPP-BAILEYS",
        });
        let url = self.endpoint(&["instance", "create"])?;
        let created: CreateResponse = self.send(Method::POST, url, name, Some(&body)).await?;
        let status = created.instance.status.or(created.instance.state).unwrap_or_default();
        Ok(ConnectionState::parse(&status))
    }

    async fn connect(&self, name: &str) -> Result<QrCode> {
        let url = self.endpoint(&["instance", "connect", name])?;
        let response: ConnectResponse = self.send::<(), _>(Method::GET, url, name, None).await?;
        Ok(QrCode {
            base64: response.base64,
            code: response.code,
            pairing_code: response.pairing_code,
        })
    }

    async fn connection_state(&self, name: &str) -> Result<ConnectionState> {
        let url = self.endpoint(&["instance", "connectionState", name])?;
        let response: StateResponse = self.send::<(), _>(Method::GET, url, name, None).await?;
        let state = response.instance.state.or(response.instance.status).unwrap_or_default();
        Ok(ConnectionState::parse(&state))
    }

    async fn owner_number(&self, name: &str) -> Result<Option<String>> {
        let mut url = self.endpoint(&["instance", "fetchInstances"])?;
        url.query_pairs_mut().append_pair("instanceName", name);
        let instances: Vec<Value> = self.send::<(), _>(Method::GET, url, name, None).await?;

        // v2 reports `ownerJid`, v1 nests `owner` under `instance`
        let owner = instances.iter().find_map(|item| {
            item.get("ownerJid")
                .or_else(|| item.pointer("/instance/owner"))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        });
        Ok(owner.map(phone_from_jid))
    }

    async fn logout(&self, name: &str) -> Result<()> {
        let url = self.endpoint(&["instance", "logout", name])?;
        let _: Value = self.send::<(), _>(Method::DELETE, url, name, None).await?;
        Ok(())
    }

    async fn delete_instance(&self, name: &str) -> Result<()> {
        let url = self.endpoint(&["instance", "delete", name])?;
        let _: Value = self.send::<(), _>(Method::DELETE, url, name, None).await?;
        Ok(())
    }

    async fn fetch_groups(&self, name: &str) -> Result<Vec<GatewayGroup>> {
        let mut url = self.endpoint(&["group", "fetchAllGroups", name])?;
        url.query_pairs_mut().append_pair("getParticipants", "false");
        let groups: Vec<GroupInfo> = self.send::<(), _>(Method::GET, url, name, None).await?;
        Ok(groups
            .into_iter()
            .map(|g| GatewayGroup {
                jid: g.id,
                subject: g.subject,
                size: g.size,
            })
            .collect())
    }
}
