use crate::models::AuthData;
use std::time::Duration;

/// Token information from authentication or renewal
#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub token: String,
    pub lease_duration: Duration,
    pub renewable: bool,
    pub policies: Vec<String>,
}

impl From<AuthData> for TokenInfo {
    fn from(auth: AuthData) -> Self {
        Self {
            token: auth.client_token,
            lease_duration: Duration::from_secs(auth.lease_duration),
            renewable: auth.renewable,
            policies: auth.policies,
        }
    }
}
