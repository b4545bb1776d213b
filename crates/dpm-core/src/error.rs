//! Error types for dpm-core

use dpm_config::ConfigError;
use hmc_rest::HmcError;

/// Errors produced by backup and restore operations.
#[derive(Debug, thiserror::Error)]
pub enum DpmError {
    #[error(transparent)]
    Hmc(#[from] HmcError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A backup section could not be turned into an API template
    #[error("template for '{entity}': {message}")]
    Template { entity: String, message: String },

    /// A restore step could not be carried out
    #[error("restore of '{entity}': {message}")]
    Restore { entity: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("profile {path}: {message}")]
    Profile { path: String, message: String },
}

/// Result type for dpm-core operations.
pub type Result<T> = std::result::Result<T, DpmError>;

impl DpmError {
    pub fn template(entity: &str, message: impl Into<String>) -> Self {
        DpmError::Template {
            entity: entity.to_string(),
            message: message.into(),
        }
    }

    pub fn restore(entity: &str, message: impl Into<String>) -> Self {
        DpmError::Restore {
            entity: entity.to_string(),
            message: message.into(),
        }
    }

    /// Console call path that led to the failure, outermost first.
    pub fn operation_trail(&self) -> Vec<String> {
        match self {
            DpmError::Hmc(e) => e.operation_trail().into_iter().map(str::to_string).collect(),
            _ => Vec::new(),
        }
    }
}
