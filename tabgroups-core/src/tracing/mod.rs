//! Structured logging for the tab engine
//!
//! Lifecycle events are logged at `info`, host event traces at `debug`,
//! recoverable issues at `warn`. Assertion violations (the host did not do
//! what was asked) and unexpected errors are logged at `error` with an
//! `assertion` field so they can be filtered separately.

use std::path::PathBuf;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

static TRACING_CONFIG: OnceLock<TracingConfig> = OnceLock::new();

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// Failed to initialize tracing subscriber
    #[error("Failed to initialize tracing: {0}")]
    InitializationFailed(String),

    /// Tracing already initialized
    #[error("Tracing has already been initialized")]
    AlreadyInitialized,

    /// Failed to create log file
    #[error("Failed to create log file: {0}")]
    FileCreationFailed(String),
}

/// Result type for tracing operations
pub type TracingResult<T> = Result<T, TracingError>;

/// Tracing log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingLevel {
    /// Only errors and assertion violations
    Error,
    /// Errors and warnings
    Warn,
    /// Lifecycle messages (default)
    #[default]
    Info,
    /// Host event traces
    Debug,
    /// Everything
    Trace,
}

impl TracingLevel {
    /// Converts to tracing crate's Level
    #[must_use]
    pub const fn to_tracing_level(self) -> Level {
        match self {
            Self::Error => Level::ERROR,
            Self::Warn => Level::WARN,
            Self::Info => Level::INFO,
            Self::Debug => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Maps a `-v` repetition count to a level
    #[must_use]
    pub const fn from_verbosity(count: u8) -> Self {
        match count {
            0 => Self::Warn,
            1 => Self::Info,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }
}

impl std::str::FromStr for TracingLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for TracingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        };
        f.write_str(name)
    }
}

/// Output destination for tracing logs
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TracingOutput {
    /// Output to stdout
    Stdout,
    /// Output to stderr
    #[default]
    Stderr,
    /// Output to a file (truncated on start)
    File {
        /// Path to the log file
        path: PathBuf,
    },
}

/// Configuration for tracing initialization
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Log level for the `tabgroups` targets
    pub level: TracingLevel,
    /// Output destination
    pub output: TracingOutput,
    /// Include thread ids in every line
    pub thread_ids: bool,
    /// Custom filter string (overrides level if set)
    pub filter: Option<String>,
}

impl TracingConfig {
    /// Creates a new tracing configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log level
    #[must_use]
    pub const fn with_level(mut self, level: TracingLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the output destination
    #[must_use]
    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    /// Enables thread ids
    #[must_use]
    pub const fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.thread_ids = enabled;
        self
    }

    /// Sets a custom filter string
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    fn env_filter(&self) -> TracingResult<EnvFilter> {
        if let Some(ref custom) = self.filter {
            return EnvFilter::try_new(custom)
                .map_err(|e| TracingError::InitializationFailed(e.to_string()));
        }
        Ok(EnvFilter::try_new(format!(
            "tabgroups_core={level},tabgroups_cli={level}",
            level = self.level
        ))
        .unwrap_or_else(|_| EnvFilter::new("info")))
    }
}

/// Initializes the tracing subscriber with the given configuration
///
/// Call once at process start. Subsequent calls return
/// [`TracingError::AlreadyInitialized`].
///
/// # Errors
///
/// Returns an error if tracing is already initialized, the filter is
/// invalid, or the log file cannot be created.
pub fn init_tracing(config: &TracingConfig) -> TracingResult<()> {
    if TRACING_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Err(TracingError::AlreadyInitialized);
    }

    let _ = TRACING_CONFIG.set(config.clone());
    let filter = config.env_filter()?;
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_thread_ids(config.thread_ids);

    let registry = tracing_subscriber::registry().with(filter);
    let result = match &config.output {
        TracingOutput::Stdout => registry.with(layer.with_writer(std::io::stdout)).try_init(),
        TracingOutput::Stderr => registry.with(layer.with_writer(std::io::stderr)).try_init(),
        TracingOutput::File { path } => {
            let file = std::fs::File::create(path)
                .map_err(|e| TracingError::FileCreationFailed(e.to_string()))?;
            registry
                .with(layer.with_ansi(false).with_writer(std::sync::Mutex::new(file)))
                .try_init()
        }
    };
    result.map_err(|e| TracingError::InitializationFailed(e.to_string()))?;

    tracing::info!(level = %config.level, "Tracing initialized");
    Ok(())
}

/// Checks if tracing has been initialized
#[must_use]
pub fn is_tracing_initialized() -> bool {
    TRACING_INITIALIZED.load(Ordering::SeqCst)
}

/// Gets the current tracing configuration (if initialized)
#[must_use]
pub fn get_tracing_config() -> Option<&'static TracingConfig> {
    TRACING_CONFIG.get()
}

/// Standard span names
pub mod span_names {
    /// Group application in a window
    pub const APPLY_GROUP: &str = "group.apply";
    /// Host event dispatch
    pub const HOST_EVENT: &str = "host.event";
    /// Navigation interception
    pub const NAVIGATION: &str = "host.navigation";
    /// Startup reconciliation
    pub const INIT: &str = "app.init";
    /// Backup restore
    pub const RESTORE_BACKUP: &str = "backup.restore";
    /// Action dispatch
    pub const RUN_ACTION: &str = "action.run";
}

/// Standard field names for tracing spans
pub mod field_names {
    /// Group id field
    pub const GROUP_ID: &str = "group_id";
    /// Window id field
    pub const WINDOW_ID: &str = "window_id";
    /// Tab id field
    pub const TAB_ID: &str = "tab_id";
    /// Marks host assertion violations
    pub const ASSERTION: &str = "assertion";
}
