use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::AgentError;

pub const TOKEN_FILE_NAME: &str = ".vault-token";

#[cfg(unix)]
const TOKEN_FILE_MODE: u32 = 0o600;

/// Mirrors the current token into a file other local processes read.
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.vault-token`
    pub fn default_path() -> Result<PathBuf, AgentError> {
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(TOKEN_FILE_NAME))
            .ok_or_else(|| AgentError::PersistFailed {
                path: Path::new("~").join(TOKEN_FILE_NAME),
                source: io::Error::new(
                    io::ErrorKind::NotFound,
                    "could not determine the home directory",
                ),
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the token file contents with `token`.
    ///
    /// The token goes to a temp file with mode 600 next to the real file
    /// (symlinks are followed) and is then renamed over it, so readers never
    /// see a partial token. When that directory is not writable an existing
    /// file is truncated and rewritten in place instead.
    pub fn persist(&self, token: &str) -> Result<(), AgentError> {
        let contents = token.as_bytes();

        let result = resolve_symlink(&self.path).and_then(|target| {
            match replace_atomically(&target, contents) {
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied && target.is_file() => {
                    tracing::debug!(
                        path = %target.display(),
                        "Directory not writable, writing token in place"
                    );
                    write_private(&target, contents)
                }
                other => other,
            }
        });

        result.map_err(|source| AgentError::PersistFailed {
            path: self.path.clone(),
            source,
        })
    }
}

/// The file a symlink at `path` points to, or `path` itself.
fn resolve_symlink(path: &Path) -> io::Result<PathBuf> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.file_type().is_symlink() => {}
        Ok(_) => return Ok(path.to_path_buf()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(path.to_path_buf()),
        Err(e) => return Err(e),
    }

    match fs::canonicalize(path) {
        Ok(target) => Ok(target),
        // Dangling link: create the file it names.
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let link = fs::read_link(path)?;
            Ok(match path.parent() {
                Some(parent) => parent.join(link),
                None => link,
            })
        }
        Err(e) => Err(e),
    }
}

fn replace_atomically(target: &Path, contents: &[u8]) -> io::Result<()> {
    let tmp_path = tmp_path(target);

    write_private(&tmp_path, contents)
        .and_then(|()| fs::rename(&tmp_path, target))
        .map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            e
        })
}

fn tmp_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| TOKEN_FILE_NAME.into());
    name.push(".tmp");
    target.with_file_name(name)
}

fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(TOKEN_FILE_MODE);
    }

    let mut file = options.open(path)?;

    // `mode` only applies on creation; a leftover temp file keeps its bits.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(TOKEN_FILE_MODE))?;
    }

    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_persist_writes_exact_token() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join(TOKEN_FILE_NAME));

        store.persist("s.abc123").unwrap();

        assert_eq!(fs::read_to_string(store.path()).unwrap(), "s.abc123");
        assert!(!dir.path().join(".vault-token.tmp").exists());
    }

    #[test]
    fn test_persist_overwrites_previous_token() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join(TOKEN_FILE_NAME));

        store.persist("s.a-much-longer-first-token").unwrap();
        store.persist("s.short").unwrap();

        assert_eq!(fs::read_to_string(store.path()).unwrap(), "s.short");
    }

    #[cfg(unix)]
    #[test]
    fn test_persisted_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(TOKEN_FILE_NAME);
        fs::write(&path, "old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        TokenStore::new(&path).persist("s.abc123").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode & 0o077, 0, "mode {:o}", mode);
    }

    #[cfg(unix)]
    #[test]
    fn test_leftover_temp_file_does_not_leak_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let tmp = dir.path().join(".vault-token.tmp");
        fs::write(&tmp, "stale").unwrap();
        fs::set_permissions(&tmp, fs::Permissions::from_mode(0o666)).unwrap();

        let store = TokenStore::new(dir.path().join(TOKEN_FILE_NAME));
        store.persist("s.abc123").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn test_missing_directory_fails_loudly() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join("missing").join(TOKEN_FILE_NAME));

        let result = store.persist("s.abc123");
        assert!(matches!(result, Err(AgentError::PersistFailed { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_persist_writes_through_symlink() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let shared = dir.path().join("shared-token");
        let link = dir.path().join(TOKEN_FILE_NAME);
        fs::write(&shared, "old").unwrap();
        std::os::unix::fs::symlink(&shared, &link).unwrap();

        TokenStore::new(&link).persist("s.new").unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&shared).unwrap(), "s.new");
        assert_eq!(fs::read_to_string(&link).unwrap(), "s.new");
        let mode = fs::metadata(&shared).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert!(!dir.path().join("shared-token.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_persist_through_relative_dangling_symlink_creates_target() {
        let dir = TempDir::new().unwrap();
        let link = dir.path().join(TOKEN_FILE_NAME);
        std::os::unix::fs::symlink("shared-token", &link).unwrap();

        TokenStore::new(&link).persist("s.new").unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(
            fs::read_to_string(dir.path().join("shared-token")).unwrap(),
            "s.new"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_persist_into_read_only_directory_rewrites_existing_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let tokens = dir.path().join("tokens");
        fs::create_dir(&tokens).unwrap();
        let path = tokens.join(TOKEN_FILE_NAME);
        fs::write(&path, "old").unwrap();
        fs::set_permissions(&tokens, fs::Permissions::from_mode(0o500)).unwrap();

        let result = TokenStore::new(&path).persist("s.new");
        fs::set_permissions(&tokens, fs::Permissions::from_mode(0o700)).unwrap();

        result.unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "s.new");
        assert!(!tokens.join(".vault-token.tmp").exists());
    }

    #[test]
    fn test_default_path_is_in_home() {
        if let Ok(path) = TokenStore::default_path() {
            assert!(path.ends_with(TOKEN_FILE_NAME));
        }
    }
}
