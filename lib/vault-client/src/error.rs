use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Invalid Vault address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Vault client error ({status}): {message}")]
    ClientError {
        status: u16,
        message: String,
        response_data: Option<serde_json::Value>,
    },

    #[error("Vault request error: {0}")]
    RequestError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Vault response carried no auth data")]
    MissingAuth,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VaultError {
    /// 4xx responses mean the request itself was rejected (bad role, revoked token)
    pub fn is_client_rejection(&self) -> bool {
        matches!(self, Self::ClientError { status, .. } if (400..500).contains(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_rejection_only_for_4xx() {
        let forbidden = VaultError::ClientError {
            status: 403,
            message: "permission denied".to_string(),
            response_data: None,
        };
        let unavailable = VaultError::ClientError {
            status: 503,
            message: "sealed".to_string(),
            response_data: None,
        };
        assert!(forbidden.is_client_rejection());
        assert!(!unavailable.is_client_rejection());
        assert!(!VaultError::MissingAuth.is_client_rejection());
    }
}
