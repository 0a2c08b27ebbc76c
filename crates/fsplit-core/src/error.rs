//! Error types for fsplit-core
//!
//! Centralized error handling using `thiserror` for ergonomic error definitions.

use crate::registry::CalloutKey;
use crate::verdict::ProcessId;
use thiserror::Error;

/// Main error type for fsplit-core operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// A callout with the same key is already registered
    #[error("Callout already registered: {key}")]
    DuplicateCallout {
        /// Key of the conflicting callout
        key: CalloutKey,
    },

    /// No callout with the given key is registered
    ///
    /// Unregistration paths treat this as already-satisfied.
    #[error("Callout not found: {key}")]
    CalloutNotFound {
        /// Key that was looked up
        key: CalloutKey,
    },

    /// The policy store rejected a callout descriptor
    #[error("Policy store rejected callout {key}: {message}")]
    PolicyStore {
        /// Key of the rejected callout
        key: CalloutKey,
        /// Rejection reason
        message: String,
    },

    /// The pend queue cannot hold another suspended bind
    ///
    /// Callers fall back to failing the bind closed.
    #[error("Cannot pend bind request from process {pid}: queue exhausted")]
    PendExhausted {
        /// Process whose bind could not be pended
        pid: ProcessId,
    },

    /// The filter engine session has been closed
    #[error("Filter engine session is closed")]
    SessionClosed,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path to the missing config file
        path: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    ConfigValue {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Create a policy store rejection error
    pub fn policy_store(key: CalloutKey, message: impl Into<String>) -> Self {
        Self::PolicyStore {
            key,
            message: message.into(),
        }
    }

    /// Create a config value error
    pub fn config_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Whether this error means a callout was absent on unregistration
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::CalloutNotFound { .. })
    }
}
