mod builder;
mod error;
mod formatting_layer;
mod level;

pub use builder::StructLogBuilder;
pub use error::SetupError;
pub use formatting_layer::JsonLogLayer;
pub use level::parse_level;

pub use tracing_appender::non_blocking::WorkerGuard;
pub use tracing_subscriber::filter::LevelFilter;
