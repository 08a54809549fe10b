use thiserror::Error;

#[derive(Debug, Error)]
pub enum UsageError {
    #[error("Metrics backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Identity could not be resolved")]
    IdentityUnresolved,

    #[error("Malformed metrics backend response: {0}")]
    MalformedBackendResponse(String),
}

impl From<reqwest::Error> for UsageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UsageError::BackendUnavailable(format!("query timed out: {}", err))
        } else if err.is_decode() {
            UsageError::MalformedBackendResponse(err.to_string())
        } else {
            UsageError::BackendUnavailable(err.to_string())
        }
    }
}

impl UsageError {
    /// Stable machine-readable code, safe to expose to clients.
    pub fn code(&self) -> &'static str {
        match self {
            UsageError::BackendUnavailable(_) => "backend_unavailable",
            UsageError::IdentityUnresolved => "unauthenticated",
            UsageError::MalformedBackendResponse(_) => "backend_malformed_response",
        }
    }
}
