use thiserror::Error;

/// Main error type for cephtune
#[derive(Error, Debug)]
pub enum TuneError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Control surface error: {0}")]
    Control(#[from] ControlError),

    #[error("Benchmark failed: {0}")]
    Benchmark(ControlError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Option catalog errors. All of these abort a run before the benchmark pool
/// is created.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("You need to supply at least one config option")]
    Empty,

    #[error("Failed to read catalog {path}: {message}")]
    ReadFailed { path: String, message: String },

    #[error("Unmarshal error for config list: {message}")]
    ParseFailed { message: String },

    #[error("Duplicate config option: {name}")]
    DuplicateOption { name: String },

    #[error("Invalid config option {name}: {message}")]
    InvalidOption { name: String, message: String },
}

/// Errors reported by a [`crate::ControlSurface`] implementation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    #[error("failed to spawn {command}: {message}")]
    Spawn { command: String, message: String },

    #[error("command {command} exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("unexpected output from {command}: {message}")]
    InvalidOutput { command: String, message: String },

    #[error("could not find score labelled '{label}' in benchmark output")]
    ScoreNotFound { label: String },

    #[error("injected failure in {operation}")]
    Injected { operation: String },
}

/// Result type alias for cephtune operations
pub type TuneResult<T> = Result<T, TuneError>;

/// Result alias for control surface calls.
pub type ControlResult<T> = Result<T, ControlError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::TuneError::Validation(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::TuneError::Config(format!($($arg)*))
    };
}
