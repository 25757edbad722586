#![warn(rust_2018_idioms)]

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;

use vault_client::VaultClient;
use vault_user_token::config::APP_NAME;
use vault_user_token::{Agent, Cli, VaultBackend};

#[tokio::main]
async fn main() -> ExitCode {
    // Exits 0 itself for --version and --help.
    let cli = Cli::parse();

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let _guard = match struct_log::StructLogBuilder::new(APP_NAME, env!("CARGO_PKG_VERSION"))
        .level(config.log_level)
        .json_enabled(config.json_log)
        .init()
    {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Unable to set up logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let client = match VaultClient::builder()
        .base_url(&config.vault_addr)
        .application_name(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Unable to create new vault client");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        vault_addr = %client.base_url(),
        approle_mount = %config.approle_mount,
        secret_id_file = %config.secret_id_file.display(),
        token_file = %config.token_file.display(),
        "Starting"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    let backend = Arc::new(VaultBackend::new(client, config.approle_mount.clone()));
    match Agent::from_config(&config, backend, shutdown_rx).run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Agent stopped");
            ExitCode::FAILURE
        }
    }
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Unable to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
