//! HTTP status validation for console responses.

use tracing::{debug, error};

use crate::error::{HmcError, Result};
use crate::transport::ApiResponse;

/// Statuses the console documents as failure answers.
pub const KNOWN_BAD_STATUSES: [u16; 5] = [400, 403, 404, 409, 503];

/// The status a call must answer with, and the failures the caller expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusExpectation {
    pub good: u16,
    pub bad: Vec<u16>,
}

impl Default for StatusExpectation {
    fn default() -> Self {
        StatusExpectation {
            good: 200,
            bad: vec![400, 404],
        }
    }
}

impl StatusExpectation {
    pub fn new(good: u16, bad: &[u16]) -> Self {
        StatusExpectation {
            good,
            bad: bad.to_vec(),
        }
    }

    /// `200 OK` with a custom set of expected failures.
    pub fn ok_with(bad: &[u16]) -> Self {
        Self::new(200, bad)
    }

    /// Object creation: `201 Created`.
    pub fn created() -> Self {
        Self::new(201, &KNOWN_BAD_STATUSES)
    }

    /// Update or operation call: `204 No Content`.
    pub fn no_content() -> Self {
        Self::new(204, &KNOWN_BAD_STATUSES)
    }

    fn is_unknown(&self, status: u16) -> bool {
        !self.bad.contains(&status) && !KNOWN_BAD_STATUSES.contains(&status)
    }
}

/// Build the failure description for a status that did not match.
pub fn failure_message(
    status: u16,
    reason: &str,
    action: Option<&str>,
    expect: &StatusExpectation,
) -> String {
    let mut message = format!("HTTP Error[status={status}, reason='{reason}'] happened");
    if expect.is_unknown(status) {
        message = format!("Unknown {message}");
    }
    if let Some(action) = action {
        message = format!("{message} while doing {action}");
    }
    format!("{message}. HTTP good status should be {}", expect.good)
}

/// Reason used when the status line carries none.
const UNKNOWN_REASON: &str = "Unknown Status";

/// Check a response against the expected status.
///
/// On success the response is handed back unread. On failure the body is
/// read once, logged, and attached to the returned [`HmcError::Status`].
pub async fn validate(
    response: ApiResponse,
    operation: &str,
    action: Option<&str>,
    expect: &StatusExpectation,
) -> Result<ApiResponse> {
    let status = response.status();
    if status == expect.good {
        debug!(operation, status, "response accepted");
        return Ok(response);
    }

    let reason = match response.reason() {
        "" => UNKNOWN_REASON.to_string(),
        reason => reason.to_string(),
    };
    let message = failure_message(status, &reason, action, expect);
    let body = match response.text().await {
        Ok(text) => Some(text),
        Err(e) => {
            debug!(error = %e, "failed to read error response body");
            None
        }
    };
    error!(
        operation,
        status,
        "HMC Error Details: {}",
        body.as_deref().unwrap_or("")
    );

    Err(HmcError::Status {
        operation: operation.to_string(),
        status,
        reason,
        message,
        body,
    })
}
