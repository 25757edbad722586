mod approle;
mod token;
mod token_info;

pub use approle::AppRoleAuth;
pub use token_info::TokenInfo;

/// Trait for login-based authentication methods
pub trait AuthMethod: Send + Sync {
    /// Path relative to `/v1/`, e.g. `auth/approle/login`
    fn login_path(&self) -> String;

    /// JSON body posted to the login path
    fn login_payload(&self) -> serde_json::Value;
}
