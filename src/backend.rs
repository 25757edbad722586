use std::time::Duration;

use async_trait::async_trait;
use vault_client::{AppRoleAuth, TokenInfo, VaultClient, VaultError};

/// A live credential: bearer token plus the lease the backend granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub lease_duration: Duration,
    pub renewable: bool,
    pub policies: Vec<String>,
}

impl From<TokenInfo> for Session {
    fn from(info: TokenInfo) -> Self {
        Self {
            token: info.token,
            lease_duration: info.lease_duration,
            renewable: info.renewable,
            policies: info.policies,
        }
    }
}

/// The secrets backend as seen by the renewal loop
#[async_trait]
pub trait Backend: Send + Sync {
    /// `Ok(None)` when the backend answered without auth data.
    async fn login(&self, role_id: &str, secret_id: &str) -> Result<Option<Session>, VaultError>;

    /// Renew the active token for `increment`; the returned token is never empty.
    async fn renew_self(&self, increment: Duration) -> Result<Session, VaultError>;

    /// Token attached to subsequent calls
    async fn set_token(&self, token: &str);
}

/// Vault AppRole backend
pub struct VaultBackend {
    client: VaultClient,
    approle_mount: String,
}

impl VaultBackend {
    pub fn new(client: VaultClient, approle_mount: impl Into<String>) -> Self {
        Self {
            client,
            approle_mount: approle_mount.into(),
        }
    }
}

#[async_trait]
impl Backend for VaultBackend {
    async fn login(&self, role_id: &str, secret_id: &str) -> Result<Option<Session>, VaultError> {
        let auth = AppRoleAuth::new(role_id, secret_id).with_mount(self.approle_mount.as_str());
        Ok(self.client.login(&auth).await?.map(Session::from))
    }

    async fn renew_self(&self, increment: Duration) -> Result<Session, VaultError> {
        self.client.renew_self(increment).await.map(Session::from)
    }

    async fn set_token(&self, token: &str) {
        self.client.set_token(token).await;
    }
}
