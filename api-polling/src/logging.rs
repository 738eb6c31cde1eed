//! Optional subscriber setup
//!
//! The engine only emits `tracing` events under the `api_polling` target.
//! Applications that already install a subscriber can ignore this module.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable selecting the logging mode
pub const MODE_ENV_VAR: &str = "API_POLLING_LOG_MODE";

/// Environment variable overriding the log filter
pub const LEVEL_ENV_VAR: &str = "API_POLLING_LOG_LEVEL";

/// How much the engine reports, and where
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoggingMode {
    /// Install nothing
    #[default]
    Silent,
    /// Activations, restarts and deactivations, one line each
    Development,
    /// Every issued, settled and discarded attempt, with source locations
    Debug,
}

impl LoggingMode {
    /// Parse a mode name; unknown names map to `Silent`
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => LoggingMode::Development,
            "debug" => LoggingMode::Debug,
            _ => LoggingMode::Silent,
        }
    }

    /// Filter used when neither override variable is set
    pub fn default_filter(self) -> Option<&'static str> {
        match self {
            LoggingMode::Silent => None,
            LoggingMode::Development => Some("api_polling=info"),
            LoggingMode::Debug => Some("api_polling=debug"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),
}

/// Install a global subscriber for `mode`
///
/// Fails if another subscriber is already installed. `Silent` never fails.
///
/// ```rust,ignore
/// api_polling::logging::init_logging(LoggingMode::Debug)?;
/// ```
///
/// `API_POLLING_LOG_LEVEL`, then `RUST_LOG`, replace the mode's default
/// filter when set.
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    let Some(default_filter) = mode.default_filter() else {
        return Ok(());
    };
    let filter = env_filter_or(default_filter);

    let installed = if mode == LoggingMode::Debug {
        Registry::default()
            .with(
                fmt::layer()
                    .pretty()
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(filter)
            .try_init()
    } else {
        Registry::default()
            .with(fmt::layer().with_target(false).compact())
            .with(filter)
            .try_init()
    };

    installed.map_err(|e| LoggingError::TracingInit(e.to_string()))
}

/// [`init_logging`] with the mode named by `API_POLLING_LOG_MODE`
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let mode = std::env::var(MODE_ENV_VAR)
        .map(|name| LoggingMode::from_name(&name))
        .unwrap_or_default();

    init_logging(mode)
}

fn env_filter_or(default_filter: &str) -> EnvFilter {
    [LEVEL_ENV_VAR, "RUST_LOG"]
        .iter()
        .find_map(|var| std::env::var(var).ok())
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new(default_filter))
}

/// Whether any global subscriber is installed
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}
