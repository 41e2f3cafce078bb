//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

// Re-export framework error types
pub use scrapehub_module::{ConfigError, ModuleError, StoreError, ValueError};

/// Core layer error type
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// No module registered under this name
    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    /// No backend instance configured under this name
    #[error("Backend not found: {0}")]
    BackendNotFound(String),

    /// A backend instance with this name is already configured
    #[error("Backend already exists: {0}")]
    BackendAlreadyExists(String),

    /// The module declares no configuration field
    #[error("Module \"{0}\" has no configuration")]
    NotConfigurable(String),

    /// Invalid request parameters
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Console or file I/O failure
    #[error("I/O error: {0}")]
    Io(String),

    /// Module framework error
    #[error("{0}")]
    Module(#[from] ModuleError),
}

impl CoreError {
    /// Whether it is expected behavior (user input, missing resource...), used
    /// for log classification.
    ///
    /// Level `warn` should be used when returning `true` and level `error`
    /// when returning `false`.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::ModuleNotFound(_)
            | Self::BackendNotFound(_)
            | Self::BackendAlreadyExists(_)
            | Self::NotConfigurable(_)
            | Self::ValidationError(_) => true,
            Self::Module(e) => e.is_expected(),
            _ => false,
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::BackendNotFound(name) => Self::BackendNotFound(name),
            StoreError::BackendAlreadyExists(name) => Self::BackendAlreadyExists(name),
            StoreError::InvalidName(name) => {
                Self::ValidationError(format!("Invalid backend name \"{name}\""))
            }
            other => Self::StorageError(other.to_string()),
        }
    }
}

impl From<ConfigError> for CoreError {
    fn from(e: ConfigError) -> Self {
        Self::Module(ModuleError::Config(e))
    }
}

impl From<ValueError> for CoreError {
    fn from(e: ValueError) -> Self {
        Self::Module(ModuleError::Value(e))
    }
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;
