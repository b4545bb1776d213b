//! Error types for hmc-rest

use thiserror::Error;

/// Errors raised while talking to the console API.
///
/// Leaf variants carry the operation that raised them. Callers add their own
/// frame with [`HmcError::within`] instead of overwriting the leaf, so the
/// whole call path survives up to the report.
#[derive(Error, Debug)]
pub enum HmcError {
    /// The console answered with a status other than the expected one
    #[error("{message}")]
    Status {
        operation: String,
        status: u16,
        reason: String,
        message: String,
        body: Option<String>,
    },

    /// A response body or in-memory object did not have the expected shape
    #[error("{message}")]
    Extraction { operation: String, message: String },

    /// Socket or connection level failure; never retried
    #[error("transport failure on {path}: {detail}")]
    Transport { path: String, detail: String },

    /// Caller supplied an unusable argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A named console object could not be found
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// A calling layer's frame around an inner failure
    #[error("{operation}: {source}")]
    Context {
        operation: String,
        #[source]
        source: Box<HmcError>,
    },
}

/// Result type for console API operations.
pub type Result<T> = std::result::Result<T, HmcError>;

impl HmcError {
    pub fn extraction(operation: &str, message: impl Into<String>) -> Self {
        HmcError::Extraction {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// Wrap this error in a frame naming the calling operation.
    pub fn within(self, operation: &str) -> Self {
        HmcError::Context {
            operation: operation.to_string(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with every context frame peeled off.
    pub fn root(&self) -> &HmcError {
        match self {
            HmcError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Operation names from the outermost frame down to the leaf.
    ///
    /// Adjacent duplicates are collapsed: a leaf raised by `fetch_object`
    /// and wrapped by `fetch_object` reads as a single step.
    pub fn operation_trail(&self) -> Vec<&str> {
        let mut trail: Vec<&str> = Vec::new();
        let mut current = self;
        loop {
            let name = match current {
                HmcError::Context { operation, .. } => Some(operation.as_str()),
                HmcError::Status { operation, .. } => Some(operation.as_str()),
                HmcError::Extraction { operation, .. } => Some(operation.as_str()),
                _ => None,
            };
            if let Some(name) = name {
                if trail.last() != Some(&name) {
                    trail.push(name);
                }
            }
            match current {
                HmcError::Context { source, .. } => current = source,
                _ => break,
            }
        }
        trail
    }

    /// HTTP status of the failed call, if the failure came from one.
    pub fn status(&self) -> Option<u16> {
        match self.root() {
            HmcError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body captured on the validator failure path.
    pub fn response_body(&self) -> Option<&str> {
        match self.root() {
            HmcError::Status { body, .. } => body.as_deref(),
            _ => None,
        }
    }

    /// Whether the root cause is a connection level failure.
    pub fn is_transport(&self) -> bool {
        matches!(self.root(), HmcError::Transport { .. })
    }
}

impl From<reqwest::Error> for HmcError {
    fn from(err: reqwest::Error) -> Self {
        HmcError::Transport {
            path: err
                .url()
                .map(|u| u.path().to_string())
                .unwrap_or_default(),
            detail: err.to_string(),
        }
    }
}

/// Extension for adding a context frame to a `Result`.
pub trait ResultExt<T> {
    fn within(self, operation: &str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn within(self, operation: &str) -> Result<T> {
        self.map_err(|e| e.within(operation))
    }
}
