//! The seam between the accessor layer and the wire.
//!
//! [`Transport`] is implemented by [`crate::client::HmcClient`] for the real
//! console and by [`crate::fakes::ScriptedTransport`] in tests.

use async_trait::async_trait;

use crate::error::Result;

/// HTTP methods used by the console API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A single request against the console.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Absolute API path, e.g. `/api/cpcs`
    pub path: String,
    /// JSON request body
    pub body: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        ApiRequest {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

enum ResponseBody {
    Buffered(String),
    Stream(reqwest::Response),
}

/// A console response whose body can be read exactly once.
///
/// [`ApiResponse::text`] consumes the response, so a body already handed to
/// the validator's failure path can never be read a second time.
pub struct ApiResponse {
    status: u16,
    reason: String,
    body: ResponseBody,
}

impl ApiResponse {
    /// A response with an in-memory body.
    pub fn buffered(status: u16, reason: impl Into<String>, body: impl Into<String>) -> Self {
        ApiResponse {
            status,
            reason: reason.into(),
            body: ResponseBody::Buffered(body.into()),
        }
    }

    pub(crate) fn streaming(response: reqwest::Response) -> Self {
        let status = response.status();
        ApiResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body: ResponseBody::Stream(response),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Read the whole body.
    pub async fn text(self) -> Result<String> {
        match self.body {
            ResponseBody::Buffered(text) => Ok(text),
            ResponseBody::Stream(response) => Ok(response.text().await?),
        }
    }
}

impl std::fmt::Debug for ApiResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiResponse")
            .field("status", &self.status)
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

/// Sends requests to the console.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue one request. Connection failures surface as
    /// [`crate::HmcError::Transport`]; HTTP statuses are left to the validator.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}
