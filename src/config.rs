//! Command line and environment configuration.

use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use struct_log::LevelFilter;

use crate::error::AgentError;
use crate::token_store::TokenStore;

pub const APP_NAME: &str = "vault-user-token";

const DEFAULT_VAULT_ADDR: &str = "https://127.0.0.1:8200";
const SECRET_ID_FILE_NAME: &str = "secret-id";

#[derive(Debug, Parser)]
#[command(name = APP_NAME, version, about = "Keeps a Vault AppRole token alive in ~/.vault-token")]
pub struct Cli {
    /// Log level (trace, debug, info, warning, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines on stdout (JSON_LOG accepts 1/0, yes/no, on/off)
    #[arg(long, env = "JSON_LOG", value_parser = BoolishValueParser::new())]
    pub json_log: bool,

    /// Use the full reported hostname (true) or only the first part (false)
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub full_hostname: bool,

    /// Vault API address
    #[arg(long, env = "VAULT_ADDR", default_value = DEFAULT_VAULT_ADDR)]
    pub vault_addr: String,

    /// ID of the role to use
    #[arg(long, env = "VAULT_ROLE_ID")]
    pub vault_role_id: Option<String>,

    /// Mount path of the AppRole auth method
    #[arg(long, env = "VAULT_APPROLE_MOUNT", default_value = "approle")]
    pub approle_mount: String,

    /// File overriding the hostname-derived secret-id
    /// [default: <config dir>/vault-user-token/secret-id]
    #[arg(long)]
    pub secret_id_file: Option<PathBuf>,

    /// Where the token is written [default: ~/.vault-token]
    #[arg(long)]
    pub token_file: Option<PathBuf>,
}

/// Validated settings for one agent process
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub vault_addr: String,
    pub role_id: String,
    pub approle_mount: String,
    pub full_hostname: bool,
    pub log_level: LevelFilter,
    pub json_log: bool,
    pub secret_id_file: PathBuf,
    pub token_file: PathBuf,
}

impl Cli {
    pub fn into_config(self) -> Result<AgentConfig, AgentError> {
        let role_id = self
            .vault_role_id
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .ok_or_else(|| {
                AgentError::ConfigInvalid(
                    "You need to supply a role id (--vault-role-id or VAULT_ROLE_ID)".to_string(),
                )
            })?;

        let log_level = struct_log::parse_level(&self.log_level)
            .map_err(|e| AgentError::ConfigInvalid(e.to_string()))?;

        let approle_mount = self.approle_mount.trim_matches('/').to_string();
        if approle_mount.is_empty() {
            return Err(AgentError::ConfigInvalid(
                "AppRole mount must not be empty".to_string(),
            ));
        }

        let secret_id_file = match self.secret_id_file {
            Some(path) => path,
            None => default_secret_id_file()?,
        };

        let token_file = match self.token_file {
            Some(path) => path,
            None => TokenStore::default_path()?,
        };

        Ok(AgentConfig {
            vault_addr: self.vault_addr,
            role_id,
            approle_mount,
            full_hostname: self.full_hostname,
            log_level,
            json_log: self.json_log,
            secret_id_file,
            token_file,
        })
    }
}

fn default_secret_id_file() -> Result<PathBuf, AgentError> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.config_dir().join(APP_NAME).join(SECRET_ID_FILE_NAME))
        .ok_or_else(|| {
            AgentError::IdentityResolutionFailed(
                "could not determine the configuration directory".to_string(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec![APP_NAME];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn with_paths<'a>(args: &[&'a str]) -> Vec<&'a str> {
        let mut all = vec![
            "--secret-id-file",
            "/etc/vault-user-token/secret-id",
            "--token-file",
            "/tmp/.vault-token",
        ];
        all.extend_from_slice(args);
        all
    }

    #[test]
    fn test_full_config() {
        let config = parse(&with_paths(&[
            "--vault-role-id",
            " role-1 ",
            "--vault-addr",
            "http://vault:8200",
            "--full-hostname",
            "false",
            "--log-level",
            "warning",
            "--approle-mount",
            "/hosts/",
        ]))
        .into_config()
        .unwrap();

        assert_eq!(config.role_id, "role-1");
        assert_eq!(config.vault_addr, "http://vault:8200");
        assert!(!config.full_hostname);
        assert_eq!(config.log_level, LevelFilter::WARN);
        assert_eq!(config.approle_mount, "hosts");
        assert_eq!(
            config.secret_id_file,
            PathBuf::from("/etc/vault-user-token/secret-id")
        );
        assert_eq!(config.token_file, PathBuf::from("/tmp/.vault-token"));
    }

    #[test]
    fn test_flag_defaults() {
        let cli = parse(&["--vault-role-id", "role-1"]);
        assert!(cli.full_hostname);
        assert_eq!(cli.log_level, "info");
        assert!(cli.secret_id_file.is_none());
        assert!(cli.token_file.is_none());
    }

    #[test]
    fn test_full_hostname_accepts_equals_form() {
        let cli = parse(&["--vault-role-id", "role-1", "--full-hostname=false"]);
        assert!(!cli.full_hostname);
    }

    #[test]
    fn test_blank_role_id_is_invalid() {
        let result = parse(&with_paths(&["--vault-role-id", "  "])).into_config();
        assert!(matches!(result, Err(AgentError::ConfigInvalid(_))));
    }

    #[test]
    fn test_missing_role_id_is_invalid() {
        let mut cli = parse(&with_paths(&[]));
        // VAULT_ROLE_ID may be set in the environment running the tests.
        cli.vault_role_id = None;
        assert!(matches!(cli.into_config(), Err(AgentError::ConfigInvalid(_))));
    }

    #[test]
    fn test_invalid_log_level() {
        let result =
            parse(&with_paths(&["--vault-role-id", "role-1", "--log-level", "loud"])).into_config();
        match result {
            Err(AgentError::ConfigInvalid(message)) => assert!(message.contains("loud")),
            other => panic!("expected ConfigInvalid, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_mount_is_invalid() {
        let result =
            parse(&with_paths(&["--vault-role-id", "role-1", "--approle-mount", "/"])).into_config();
        assert!(matches!(result, Err(AgentError::ConfigInvalid(_))));
    }

    #[test]
    fn test_json_log_accepts_boolish_env_values() {
        // The only test touching JSON_LOG.
        for (value, expected) in [("1", true), ("yes", true), ("on", true), ("0", false), ("no", false)] {
            std::env::set_var("JSON_LOG", value);
            let cli = parse(&["--vault-role-id", "role-1"]);
            assert_eq!(cli.json_log, expected, "JSON_LOG={}", value);
        }
        std::env::remove_var("JSON_LOG");

        let cli = parse(&["--vault-role-id", "role-1", "--json-log"]);
        assert!(cli.json_log);
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
