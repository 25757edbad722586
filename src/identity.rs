//! Secret-id resolution.
//!
//! The value sent as `secret_id` comes from an override file when one exists
//! and is only accessible by its owner, otherwise from the machine hostname.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::AgentError;

/// Group and other read/write bits.
#[cfg(unix)]
const INSECURE_MODE_BITS: u32 = 0o066;

pub struct IdentityResolver {
    override_path: PathBuf,
    full_hostname: bool,
    hostname: Option<String>,
}

impl IdentityResolver {
    pub fn new(override_path: impl Into<PathBuf>, full_hostname: bool) -> Self {
        Self {
            override_path: override_path.into(),
            full_hostname,
            hostname: None,
        }
    }

    /// Use a fixed hostname instead of asking the system
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn resolve(&self) -> Result<String, AgentError> {
        if let Some(secret_id) = self.read_override()? {
            tracing::debug!(path = %self.override_path.display(), "Using secret-id override file");
            return Ok(secret_id);
        }

        let hostname = self.hostname()?;
        let identity = hostname_identity(&hostname, self.full_hostname);
        if identity.is_empty() {
            return Err(AgentError::IdentityResolutionFailed(format!(
                "hostname {:?} yields an empty secret-id",
                hostname
            )));
        }

        tracing::debug!(full_hostname = self.full_hostname, "Using hostname as secret-id");
        Ok(identity.to_string())
    }

    /// `Ok(None)` when there is no override file.
    fn read_override(&self) -> Result<Option<String>, AgentError> {
        let path = &self.override_path;

        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AgentError::IdentityResolutionFailed(format!(
                    "inspecting {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        check_permissions(path, &metadata)?;

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            // Removed between the permission check and the read.
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AgentError::IdentityResolutionFailed(format!(
                    "reading {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let secret_id = contents.trim();
        if secret_id.is_empty() {
            return Err(AgentError::IdentityResolutionFailed(format!(
                "{} is empty",
                path.display()
            )));
        }

        Ok(Some(secret_id.to_string()))
    }

    fn hostname(&self) -> Result<String, AgentError> {
        if let Some(ref hostname) = self.hostname {
            return Ok(hostname.clone());
        }

        gethostname::gethostname().into_string().map_err(|raw| {
            AgentError::IdentityResolutionFailed(format!(
                "hostname {:?} is not valid UTF-8",
                raw
            ))
        })
    }
}

#[cfg(unix)]
fn check_permissions(path: &Path, metadata: &fs::Metadata) -> Result<(), AgentError> {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode() & 0o777;
    if mode & INSECURE_MODE_BITS != 0 {
        return Err(AgentError::InsecurePermissions {
            path: path.to_path_buf(),
            mode,
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_permissions(_path: &Path, _metadata: &fs::Metadata) -> Result<(), AgentError> {
    Ok(())
}

/// The hostname, or only its first label when `full_hostname` is false.
pub fn hostname_identity(hostname: &str, full_hostname: bool) -> &str {
    if full_hostname {
        return hostname;
    }
    match hostname.split_once('.') {
        Some((first, _)) => first,
        None => hostname,
    }
}
