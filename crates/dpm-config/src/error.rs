//! Error types for dpm-config

use thiserror::Error;

/// Errors raised while reading, decoding or writing backup files.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A line of the sectioned file could not be understood
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// A section header appeared twice in one document
    #[error("line {line}: duplicate section [{name}]")]
    DuplicateSection { name: String, line: usize },

    /// Compound value text that is not a valid literal
    #[error("invalid literal at offset {offset}: {message}")]
    Literal { message: String, offset: usize },

    /// A field value that does not coerce to the schema's type
    #[error("key '{key}' should hold {expected}, found '{value}'")]
    FieldType {
        key: String,
        expected: &'static str,
        value: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

impl ConfigError {
    pub(crate) fn field_type(key: &str, expected: &'static str, value: &str) -> Self {
        ConfigError::FieldType {
            key: key.to_string(),
            expected,
            value: value.to_string(),
        }
    }
}
