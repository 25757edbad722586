//! The login / renew lifecycle.
//!
//! The agent is a two-state machine:
//!
//! * `LoggedOut`: resolve the secret-id, log in, publish the token.
//!   Any failure here is fatal.
//! * `Renewing`: sleep until shortly before the lease runs out, then renew.
//!   A failed renewal moves back to `LoggedOut`.
//!
//! A `watch` channel carrying `true` stops the machine between transitions
//! and interrupts the inter-renewal sleep.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use vault_client::VaultError;

use crate::backend::{Backend, Session};
use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::identity::IdentityResolver;
use crate::token_store::TokenStore;

/// Validity requested on every renewal
pub const RENEW_INCREMENT: Duration = Duration::from_secs(900);

/// Renew this long before the lease runs out
pub const RENEW_MARGIN: Duration = Duration::from_secs(30);

/// Lower bound on the actual wait between renewals
const MIN_RENEW_INTERVAL: Duration = Duration::from_secs(1);

/// Delay before renewing a lease of `lease_duration`; never negative.
pub fn next_renewal_delay(lease_duration: Duration) -> Duration {
    lease_duration.saturating_sub(RENEW_MARGIN)
}

enum State {
    LoggedOut,
    Renewing(Session),
}

pub struct Agent {
    role_id: String,
    backend: Arc<dyn Backend>,
    resolver: IdentityResolver,
    store: TokenStore,
    shutdown: watch::Receiver<bool>,
}

impl Agent {
    pub fn new(
        role_id: impl Into<String>,
        backend: Arc<dyn Backend>,
        resolver: IdentityResolver,
        store: TokenStore,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            role_id: role_id.into(),
            backend,
            resolver,
            store,
            shutdown,
        }
    }

    pub fn from_config(
        config: &AgentConfig,
        backend: Arc<dyn Backend>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self::new(
            config.role_id.clone(),
            backend,
            IdentityResolver::new(&config.secret_id_file, config.full_hostname),
            TokenStore::new(&config.token_file),
            shutdown,
        )
    }

    /// Run until shutdown is requested (`Ok`) or a fatal error occurs.
    pub async fn run(mut self) -> Result<(), AgentError> {
        let mut state = State::LoggedOut;

        loop {
            if self.shutdown_requested() {
                tracing::info!("Shutdown requested, stopping");
                return Ok(());
            }

            state = match state {
                State::LoggedOut => {
                    // Re-read on every login so a rotated override file is picked up.
                    let secret_id = self.resolver.resolve()?;
                    State::Renewing(self.login(&secret_id).await?)
                }
                State::Renewing(session) => match self.keep_renewing(session).await {
                    Ok(()) => {
                        tracing::info!("Shutdown requested, stopping");
                        return Ok(());
                    }
                    Err(err) if err.is_recoverable() => {
                        tracing::error!(
                            error = %err,
                            rejected = err.is_backend_rejection(),
                            "Could not renew token, logging in again"
                        );
                        State::LoggedOut
                    }
                    Err(err) => return Err(err),
                },
            };
        }
    }

    async fn login(&self, secret_id: &str) -> Result<Session, AgentError> {
        let session = self
            .backend
            .login(&self.role_id, secret_id)
            .await
            .map_err(AgentError::LoginFailed)?
            .ok_or_else(|| AgentError::LoginFailed(VaultError::MissingAuth))?;

        self.backend.set_token(&session.token).await;
        self.store.persist(&session.token)?;

        tracing::info!(
            lease_secs = session.lease_duration.as_secs(),
            policies = ?session.policies,
            token_file = %self.store.path().display(),
            "Logged in, token written"
        );
        if !session.renewable {
            tracing::warn!("Token is not renewable, a new login will follow its expiry");
        }
        Ok(session)
    }

    /// Renew `session` until a renewal fails. Returns `Ok` only on shutdown.
    async fn keep_renewing(&mut self, mut session: Session) -> Result<(), AgentError> {
        loop {
            let delay = next_renewal_delay(session.lease_duration).max(MIN_RENEW_INTERVAL);
            tracing::debug!(delay_secs = delay.as_secs(), "Next renewal scheduled");

            if !self.sleep_unless_shutdown(delay).await {
                return Ok(());
            }

            let renewed = self
                .backend
                .renew_self(RENEW_INCREMENT)
                .await
                .map_err(AgentError::RenewalFailed)?;

            if renewed.token != session.token {
                self.backend.set_token(&renewed.token).await;
                self.store.persist(&renewed.token)?;
                tracing::info!("Backend rotated the token on renewal, token written");
            }

            tracing::debug!(
                lease_secs = renewed.lease_duration.as_secs(),
                "Token renewed"
            );
            session = renewed;
        }
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// `false` if shutdown was requested before `delay` elapsed.
    async fn sleep_unless_shutdown(&mut self, delay: Duration) -> bool {
        if self.shutdown_requested() {
            return false;
        }

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                changed = self.shutdown.changed() => match changed {
                    Ok(()) if *self.shutdown.borrow() => return false,
                    Ok(()) => continue,
                    // Sender gone: nobody can ask us to stop any more.
                    Err(_) => {
                        (&mut sleep).await;
                        return true;
                    }
                },
            }
        }
    }
}
