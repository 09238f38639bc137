//! Backend error taxonomy.
//!
//! Defined in `testdesk-core` so the attempt, result, and history viewers can
//! turn failures into user-facing text without string matching on transport
//! errors.

use thiserror::Error;

/// Why the backend refused a test action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenial {
    /// Signed in with a non-student account.
    RoleMismatch,
    /// Student profile must be completed first.
    ProfileIncomplete,
    /// Test not assigned, or student not enrolled in the course.
    NotAssigned,
    /// The current attempt has already been submitted.
    AlreadyCompleted,
}

impl AccessDenial {
    /// Classify a backend refusal by its message text.
    ///
    /// Unrecognised text is treated as [`AccessDenial::NotAssigned`].
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("profile") || lower.contains("complete prof") {
            AccessDenial::ProfileIncomplete
        } else if lower.contains("already completed") || lower.contains("already submitted") {
            AccessDenial::AlreadyCompleted
        } else if lower.contains("only student") || lower.contains("students allowed") {
            AccessDenial::RoleMismatch
        } else {
            AccessDenial::NotAssigned
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            AccessDenial::RoleMismatch => "Only student accounts can take tests.",
            AccessDenial::ProfileIncomplete => {
                "Please complete your profile before starting this test."
            }
            AccessDenial::NotAssigned => {
                "This test has not been assigned to you, or you are not enrolled in its course."
            }
            AccessDenial::AlreadyCompleted => "You have already completed this test.",
        }
    }
}

/// Errors returned by the LMS backend or the transport in front of it.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend refused the action (HTTP 403, or 400 for a completed test).
    #[error("forbidden: {}", .0.user_message())]
    Forbidden(AccessDenial),

    /// The test is missing or inactive.
    #[error("not found: {0}")]
    NotFound(String),

    /// No valid credentials and no way to refresh them.
    #[error("not authenticated")]
    Unauthorized,

    /// Token refresh failed; stored tokens have been cleared.
    #[error("session expired, please log in again")]
    SessionExpired,

    /// Any other non-success response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Map a non-success HTTP status and the backend's error text to an [`ApiError`].
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden(AccessDenial::from_message(&message)),
            404 => ApiError::NotFound(message),
            400 if AccessDenial::from_message(&message) == AccessDenial::AlreadyCompleted => {
                ApiError::Forbidden(AccessDenial::AlreadyCompleted)
            }
            _ => ApiError::Api { status, message },
        }
    }

    /// Text to show the user when `action` (e.g. "load test") failed.
    ///
    /// Refusals and missing tests get a specific message; everything else
    /// collapses to a generic retry prompt.
    pub fn user_message(&self, action: &str) -> String {
        match self {
            ApiError::Forbidden(denial) => denial.user_message().to_string(),
            ApiError::NotFound(_) => "This test is not available or is no longer active.".into(),
            ApiError::SessionExpired => "Your session has expired. Please log in again.".into(),
            ApiError::Unauthorized => "You are not logged in. Please log in first.".into(),
            _ => format!("Failed to {action}. Please try again."),
        }
    }

    /// Whether the user has to sign in again before anything else will work.
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::SessionExpired)
    }
}

/// Pull the human-readable message out of a DRF-style error body.
///
/// The backend answers with `{"error": "..."}` or `{"detail": "..."}`; anything
/// else is returned verbatim.
pub fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["error", "detail", "message"]
                .iter()
                .find_map(|k| v.get(k).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}
