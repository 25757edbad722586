use crate::auth::{AuthMethod, TokenInfo};
use crate::error::VaultError;
use crate::models::SecretResponse;
use reqwest::{StatusCode, Url};
use serde::Serialize;
use tokio::sync::RwLock;

const TOKEN_HEADER: &str = "X-Vault-Token";

pub struct VaultClientBuilder {
    base_url: Option<String>,
    token: Option<String>,
    application_name: Option<String>,
}

impl Default for VaultClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VaultClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            token: None,
            application_name: None,
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sent as the User-Agent header
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    pub fn build(self) -> Result<VaultClient, VaultError> {
        let base_url = self
            .base_url
            .or_else(|| std::env::var("VAULT_ADDR").ok())
            .ok_or_else(|| VaultError::InvalidAddress {
                address: String::new(),
                reason: "VAULT_ADDR not set".to_string(),
            })?;

        let parsed = Url::parse(&base_url).map_err(|e| VaultError::InvalidAddress {
            address: base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(VaultError::InvalidAddress {
                address: base_url,
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        let token = self
            .token
            .or_else(|| std::env::var("VAULT_TOKEN").ok())
            .filter(|t| !t.is_empty());

        let mut http = reqwest::Client::builder();
        if let Some(ref app_name) = self.application_name {
            http = http.user_agent(app_name.clone());
        }
        let http = http
            .build()
            .map_err(|e| VaultError::RequestError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(VaultClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            token: RwLock::new(token),
        })
    }
}

pub struct VaultClient {
    base_url: String,
    http: reqwest::Client,
    token: RwLock<Option<String>>,
}

impl VaultClient {
    pub fn builder() -> VaultClientBuilder {
        VaultClientBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replace the token attached to every subsequent request
    pub async fn set_token(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Log in through `method`. `Ok(None)` means Vault answered successfully
    /// but without an auth block.
    pub async fn login(&self, method: &dyn AuthMethod) -> Result<Option<TokenInfo>, VaultError> {
        let path = method.login_path();
        tracing::debug!(path = %path, "Logging in to Vault");

        let secret = self.write(&path, &method.login_payload()).await?;
        Ok(secret.and_then(|s| s.auth).map(TokenInfo::from))
    }

    /// POST `body` to `/v1/<path>`. Returns `None` for empty responses.
    pub async fn write<T>(&self, path: &str, body: &T) -> Result<Option<SecretResponse>, VaultError>
    where
        T: Serialize + ?Sized,
    {
        let url = format!("{}/v1/{}", self.base_url, path.trim_start_matches('/'));

        let mut request = self.http.post(&url).json(body);
        if let Some(token) = self.token().await {
            request = request.header(TOKEN_HEADER, token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| VaultError::RequestError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(client_error(status, body));
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| VaultError::RequestError(format!("Failed to read response: {}", e)))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}

/// Vault reports failures as `{"errors": ["..."]}`; fall back to the raw body.
fn client_error(status: StatusCode, body: String) -> VaultError {
    let response_data = serde_json::from_str::<serde_json::Value>(&body).ok();

    let message = response_data
        .as_ref()
        .and_then(|data| data.get("errors"))
        .and_then(|errors| errors.as_array())
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e.as_str())
                .collect::<Vec<_>>()
                .join("; ")
        })
        .filter(|m| !m.is_empty())
        .unwrap_or(body);

    VaultError::ClientError {
        status: status.as_u16(),
        message,
        response_data,
    }
}
