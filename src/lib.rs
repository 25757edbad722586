//! vault-user-token - keeps a Vault AppRole token alive
//!
//! Logs in with a role id and a host-derived secret-id, writes the token to
//! `~/.vault-token` for other local processes and renews it until it can't,
//! then logs in again.

pub mod agent;
pub mod backend;
pub mod config;
pub mod error;
pub mod identity;
pub mod token_store;

pub use agent::{next_renewal_delay, Agent, RENEW_INCREMENT, RENEW_MARGIN};
pub use backend::{Backend, Session, VaultBackend};
pub use config::{AgentConfig, Cli};
pub use error::AgentError;
pub use identity::{hostname_identity, IdentityResolver};
pub use token_store::TokenStore;
