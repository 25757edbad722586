use std::io;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_bunyan_formatter::JsonStorageLayer;
use tracing_log::LogTracer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::error::SetupError;
use crate::formatting_layer::JsonLogLayer;

/// Builder for configuring process logging
pub struct StructLogBuilder {
    application: String,
    version: String,
    level: LevelFilter,
    json_enabled: bool,
}

impl StructLogBuilder {
    /// Create a new builder with required application name and version
    pub fn new(application: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            version: version.into(),
            level: LevelFilter::INFO,
            json_enabled: false,
        }
    }

    /// Default level; `RUST_LOG` directives still take precedence
    pub fn level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Enable or disable JSON output (defaults to false)
    pub fn json_enabled(mut self, enabled: bool) -> Self {
        self.json_enabled = enabled;
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::builder()
            .with_default_directive(self.level.into())
            .from_env_lossy()
    }

    /// Initialize the logger with the configured settings.
    ///
    /// The returned guard flushes buffered JSON lines on drop and must be
    /// held for the lifetime of the process.
    pub fn init(self) -> Result<Option<WorkerGuard>, SetupError> {
        // Redirect records from the `log` crate (reqwest, hyper) to tracing.
        LogTracer::init().map_err(|_| SetupError::LogTracerAlreadyInitialized)?;

        let filter = self.env_filter();

        if !self.json_enabled {
            let subscriber = Registry::default()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr));
            tracing::subscriber::set_global_default(subscriber)
                .map_err(|_| SetupError::SubscriberAlreadySet)?;
            return Ok(None);
        }

        let (non_blocking, guard) = tracing_appender::non_blocking(io::stdout());

        let layer = JsonLogLayer::new(self.application, self.version, non_blocking);

        let subscriber = Registry::default()
            .with(filter)
            .with(JsonStorageLayer)
            .with(layer);

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|_| SetupError::SubscriberAlreadySet)?;

        Ok(Some(guard))
    }
}
