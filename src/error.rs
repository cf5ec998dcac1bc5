//! Error taxonomy for the transport.

use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

use crate::adapter::Response;
use crate::compression::CompressionError;
use crate::config::ConfigError;
use crate::serializer::SerializerError;
use crate::sniffer::SniffError;

/// Errors returned by [`crate::Transport`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The node could not be reached or the exchange broke off.
    #[error("connection to {host} failed: {message}")]
    ConnectionFailed { host: String, message: String },

    #[error("request to {host} timed out after {after:?}")]
    Timeout { host: String, after: Duration },

    #[error("server error {status}")]
    ServerError { status: StatusCode, response: Response },

    #[error("client error {status}")]
    ClientError { status: StatusCode, response: Response },

    /// No alive connection and no resurrect candidate.
    #[error("no alive or resurrectable connection after {attempts} attempt(s)")]
    PoolExhausted {
        attempts: u32,
        last: Option<Box<TransportError>>,
    },

    #[error("sniffing failed: {0}")]
    SnifferFailed(#[from] SniffError),

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Retry budget used up; `last` is the final attempt's failure.
    #[error("request failed after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        last: Box<TransportError>,
    },

    #[error("deadline exceeded after {attempts} attempt(s)")]
    DeadlineExceeded {
        attempts: u32,
        last: Option<Box<TransportError>>,
    },

    #[error("request cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },

    #[error(transparent)]
    Serialization(#[from] SerializerError),

    #[error(transparent)]
    Compression(#[from] CompressionError),

    /// The request could not be built for the selected node.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Attempts made, for errors raised by the retry loop.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            TransportError::PoolExhausted { attempts, .. }
            | TransportError::Exhausted { attempts, .. }
            | TransportError::DeadlineExceeded { attempts, .. }
            | TransportError::Cancelled { attempts } => Some(*attempts),
            _ => None,
        }
    }

    /// HTTP status of the response behind this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::ServerError { status, .. }
            | TransportError::ClientError { status, .. } => Some(*status),
            TransportError::Exhausted { last, .. } => last.status(),
            TransportError::PoolExhausted { last, .. }
            | TransportError::DeadlineExceeded { last, .. } => {
                last.as_ref().and_then(|e| e.status())
            }
            _ => None,
        }
    }

    /// Whether the error came from the network rather than an HTTP answer.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectionFailed { .. } | TransportError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempts_and_status() {
        let last = TransportError::ServerError {
            status: StatusCode::SERVICE_UNAVAILABLE,
            response: Response::new(StatusCode::SERVICE_UNAVAILABLE, "busy"),
        };
        let err = TransportError::Exhausted {
            attempts: 3,
            last: Box::new(last),
        };
        assert_eq!(err.attempts(), Some(3));
        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(
            err.to_string(),
            "request failed after 3 attempt(s): server error 503 Service Unavailable"
        );

        let refused = TransportError::ConnectionFailed {
            host: "http://a:9200".into(),
            message: "refused".into(),
        };
        assert!(refused.is_connection_error());
        assert_eq!(refused.attempts(), None);
        assert_eq!(refused.status(), None);
    }
}
