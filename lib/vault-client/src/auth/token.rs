use super::TokenInfo;
use crate::VaultError;
use crate::client::VaultClient;
use std::time::Duration;

const RENEW_SELF_PATH: &str = "auth/token/renew-self";

impl VaultClient {
    /// Renew the active token, asking for `increment` more seconds of validity.
    ///
    /// Vault may grant less than requested; the granted lease is in the result.
    pub async fn renew_self(&self, increment: Duration) -> Result<TokenInfo, VaultError> {
        let current = self
            .token()
            .await
            .ok_or_else(|| VaultError::AuthError("no token set for renewal".to_string()))?;

        let body = serde_json::json!({ "increment": increment.as_secs() });
        let auth = self
            .write(RENEW_SELF_PATH, &body)
            .await?
            .and_then(|s| s.auth)
            .ok_or(VaultError::MissingAuth)?;

        let mut token_info = TokenInfo::from(auth);
        if token_info.token.is_empty() {
            token_info.token = current;
        }

        tracing::debug!(
            lease_secs = token_info.lease_duration.as_secs(),
            "Token renewed"
        );
        Ok(token_info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_renew_without_token_fails_before_request() {
        // Port 9 (discard) is never contacted: the missing token short-circuits.
        let client = VaultClient::builder()
            .base_url("http://127.0.0.1:9")
            .build()
            .unwrap();
        if client.token().await.is_some() {
            // VAULT_TOKEN from the environment was picked up; nothing to check.
            return;
        }

        let result = client.renew_self(Duration::from_secs(900)).await;
        assert!(matches!(result, Err(VaultError::AuthError(_))));
    }
}
