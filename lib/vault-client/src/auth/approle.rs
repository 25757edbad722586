use super::AuthMethod;

const DEFAULT_MOUNT: &str = "approle";

/// AppRole authentication (role_id + secret_id)
pub struct AppRoleAuth {
    pub mount: String,
    pub role_id: String,
    secret_id: String,
}

impl AppRoleAuth {
    pub fn new(role_id: impl Into<String>, secret_id: impl Into<String>) -> Self {
        Self {
            mount: DEFAULT_MOUNT.to_string(),
            role_id: role_id.into(),
            secret_id: secret_id.into(),
        }
    }

    pub fn with_mount(mut self, mount: impl Into<String>) -> Self {
        self.mount = mount.into();
        self
    }
}

impl AuthMethod for AppRoleAuth {
    fn login_path(&self) -> String {
        format!("auth/{}/login", self.mount.trim_matches('/'))
    }

    fn login_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "role_id": self.role_id,
            "secret_id": self.secret_id,
        })
    }
}
