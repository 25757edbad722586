use tracing_subscriber::filter::LevelFilter;

use crate::error::SetupError;

/// Parse a level name into a filter.
///
/// Accepts the usual tracing names plus the spellings operators tend to carry
/// over from other agents: `warning`, and `fatal`/`panic` (both map to error).
/// Matching is case-insensitive.
pub fn parse_level(level: &str) -> Result<LevelFilter, SetupError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(LevelFilter::TRACE),
        "debug" => Ok(LevelFilter::DEBUG),
        "info" => Ok(LevelFilter::INFO),
        "warn" | "warning" => Ok(LevelFilter::WARN),
        "error" | "fatal" | "panic" => Ok(LevelFilter::ERROR),
        "off" => Ok(LevelFilter::OFF),
        _ => Err(SetupError::InvalidLevel(level.to_string())),
    }
}
