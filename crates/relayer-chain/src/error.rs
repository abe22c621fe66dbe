use std::time::Duration;

/// Errors a chain client can return: anything the caller should retry is
/// `Transient`, anything that indicates a malformed request or response is
/// `Permanent`.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Network error, 5xx, timeout, or rate-limit. Rate-limit carries the
    /// server-suggested delay when present (`Retry-After`).
    #[error("transient chain client error: {reason}")]
    Transient {
        reason: String,
        retry_after: Option<Duration>,
    },

    /// Malformed response or a non-rate-limited 4xx.
    #[error("permanent chain client error: {reason}")]
    Permanent { reason: String },
}

impl ClientError {
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient {
            reason: reason.into(),
            retry_after: None,
        }
    }

    pub fn rate_limited(reason: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::Transient {
            reason: reason.into(),
            retry_after,
        }
    }

    pub fn permanent(reason: impl Into<String>) -> Self {
        Self::Permanent {
            reason: reason.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Transient { .. })
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ClientError::Transient { retry_after, .. } => *retry_after,
            ClientError::Permanent { .. } => None,
        }
    }

    /// Classifies an HTTP status code the way the design mandates: 5xx and
    /// 429 are transient (429 additionally carrying a suggested delay when
    /// the server sends `Retry-After`), everything else is permanent.
    pub fn from_status(status: reqwest::StatusCode, retry_after: Option<Duration>) -> Self {
        if status.as_u16() == 429 {
            Self::rate_limited(format!("rate limited ({status})"), retry_after)
        } else if status.is_server_error() {
            Self::transient(format!("server error ({status})"))
        } else {
            Self::permanent(format!("client error ({status})"))
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            ClientError::transient(err.to_string())
        } else if let Some(status) = err.status() {
            ClientError::from_status(status, None)
        } else {
            ClientError::transient(err.to_string())
        }
    }
}
