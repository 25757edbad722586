use std::io;
use std::path::PathBuf;

use thiserror::Error;
use vault_client::VaultError;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Refusing to read {path}: mode {mode:o} grants group or other access, expected 600")]
    InsecurePermissions { path: PathBuf, mode: u32 },

    #[error("Resolving secret-id: {0}")]
    IdentityResolutionFailed(String),

    #[error("Logging in using approle: {0}")]
    LoginFailed(#[source] VaultError),

    #[error("Renewing token: {0}")]
    RenewalFailed(#[source] VaultError),

    #[error("Writing token file {path}: {source}")]
    PersistFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl AgentError {
    /// Only renewal failures are recovered from (by logging in again);
    /// everything else ends the agent.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::RenewalFailed(_))
    }

    /// Vault refused the request itself (4xx), e.g. a revoked token or a
    /// wrong role, as opposed to being unreachable or unhealthy.
    pub fn is_backend_rejection(&self) -> bool {
        match self {
            Self::LoginFailed(e) | Self::RenewalFailed(e) => e.is_client_rejection(),
            _ => false,
        }
    }
}
