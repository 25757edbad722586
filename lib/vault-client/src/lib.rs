//! vault-client - minimal Rust client for HashiCorp Vault
//!
//! Covers what a token agent needs:
//! 1. log in through an auth method (AppRole) → token + lease
//! 2. renew the current token via `auth/token/renew-self`
//! 3. keep the active token used for subsequent calls

mod auth;
mod client;
mod error;
mod models;

pub use auth::{AppRoleAuth, AuthMethod, TokenInfo};
pub use client::{VaultClient, VaultClientBuilder};
pub use error::VaultError;
pub use models::{AuthData, SecretResponse};
