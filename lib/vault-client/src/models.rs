use serde::Deserialize;

/// Generic Vault API response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct SecretResponse {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub lease_id: String,
    #[serde(default)]
    pub lease_duration: u64,
    #[serde(default)]
    pub renewable: bool,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
    #[serde(default)]
    pub auth: Option<AuthData>,
}

/// Auth block returned by login and token renewal endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct AuthData {
    pub client_token: String,
    #[serde(default)]
    pub accessor: String,
    #[serde(default)]
    pub policies: Vec<String>,
    pub lease_duration: u64,
    #[serde(default)]
    pub renewable: bool,
}
