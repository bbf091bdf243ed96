use antiforge_core::{ApiError, IntoResponse, Response};
use thiserror::Error;

/// Why a request failed verification
///
/// Denials are not errors of the application: they are routed to the
/// configured [`FailureAction`](crate::FailureAction) and never propagated.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    #[error("no CSRF token is stored for this client")]
    NoStoredToken,

    #[error("CSRF token missing from request")]
    MissingSubmitted,

    #[error("CSRF token in request is empty")]
    EmptySubmitted,

    #[error("CSRF token does not match")]
    Mismatch,
}

impl Denial {
    /// Short machine-readable name, used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Denial::NoStoredToken => "no_stored_token",
            Denial::MissingSubmitted => "missing_submitted",
            Denial::EmptySubmitted => "empty_submitted",
            Denial::Mismatch => "mismatch",
        }
    }
}

/// Wiring mistakes, reported when protection is configured
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("`exception` and `error_renderer` are mutually exclusive")]
    ConflictingFailure,

    #[error("error renderer `{0}` is not invokable")]
    RendererNotInvokable(String),

    #[error("{0} is not an error status")]
    InvalidStatus(u16),

    #[error("secret phrase must not be empty")]
    EmptySecret,

    #[cfg(feature = "config")]
    #[error("Configuration error: {0}")]
    Env(#[from] envy::Error),
}

/// Failures while persisting a token
///
/// Read failures never surface: a malformed stored value loads as absent.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("no session is attached to the request")]
    NoSession,

    #[error("invalid cookie value: {0}")]
    InvalidCookie(#[from] http::header::InvalidHeaderValue),

    #[error("session write failed: {0}")]
    Session(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum CsrfError {
    #[error("CSRF protection is not installed on this request")]
    NotInstalled,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T, E = CsrfError> = std::result::Result<T, E>;

impl From<CsrfError> for ApiError {
    fn from(err: CsrfError) -> Self {
        ApiError::internal(err.to_string())
    }
}

impl IntoResponse for CsrfError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
