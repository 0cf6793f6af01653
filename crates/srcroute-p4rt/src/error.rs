//! Transport error types and status handling.
//!
//! Switch agents answer writes and reads with a canonical status code. This
//! module maps those codes onto [`TransportError`], the single error type
//! every [`SwitchConnection`](crate::SwitchConnection) operation returns.

use std::fmt;
use thiserror::Error;

/// Canonical status codes returned by a switch agent.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum P4rtStatus {
    Ok = 0,
    Cancelled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
}

impl P4rtStatus {
    pub fn is_ok(&self) -> bool {
        *self == P4rtStatus::Ok
    }
}

impl fmt::Display for P4rtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            P4rtStatus::Ok => "OK",
            P4rtStatus::Cancelled => "CANCELLED",
            P4rtStatus::Unknown => "UNKNOWN",
            P4rtStatus::InvalidArgument => "INVALID_ARGUMENT",
            P4rtStatus::DeadlineExceeded => "DEADLINE_EXCEEDED",
            P4rtStatus::NotFound => "NOT_FOUND",
            P4rtStatus::AlreadyExists => "ALREADY_EXISTS",
            P4rtStatus::PermissionDenied => "PERMISSION_DENIED",
            P4rtStatus::ResourceExhausted => "RESOURCE_EXHAUSTED",
            P4rtStatus::FailedPrecondition => "FAILED_PRECONDITION",
            P4rtStatus::Aborted => "ABORTED",
            P4rtStatus::OutOfRange => "OUT_OF_RANGE",
            P4rtStatus::Unimplemented => "UNIMPLEMENTED",
            P4rtStatus::Internal => "INTERNAL",
            P4rtStatus::Unavailable => "UNAVAILABLE",
        };
        write!(f, "{}", s)
    }
}

/// Error type for switch transport operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The switch agent answered with a non-OK status.
    #[error("switch returned {status}: {message}")]
    Status { status: P4rtStatus, message: String },

    /// The connection handshake with a switch failed.
    #[error("cannot connect to {address}: {message}")]
    Connect { address: String, message: String },

    /// The connection was closed before or during the operation.
    #[error("connection to {switch} is closed")]
    Closed { switch: String },

    /// The entry was rejected before being sent.
    #[error("invalid table entry: {message}")]
    InvalidEntry { message: String },
}

impl TransportError {
    pub fn status(status: P4rtStatus, message: impl Into<String>) -> Self {
        TransportError::Status {
            status,
            message: message.into(),
        }
    }

    pub fn connect(address: impl Into<String>, message: impl Into<String>) -> Self {
        TransportError::Connect {
            address: address.into(),
            message: message.into(),
        }
    }

    pub fn closed(switch: impl Into<String>) -> Self {
        TransportError::Closed {
            switch: switch.into(),
        }
    }

    pub fn invalid_entry(message: impl Into<String>) -> Self {
        TransportError::InvalidEntry {
            message: message.into(),
        }
    }

    /// Returns true if reissuing the same request could succeed.
    ///
    /// The controller never retries on its own; this is informational for
    /// the operator-facing report.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::Status {
                status: P4rtStatus::Unavailable
                    | P4rtStatus::DeadlineExceeded
                    | P4rtStatus::Aborted
                    | P4rtStatus::ResourceExhausted,
                ..
            } | TransportError::Connect { .. }
        )
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_status_ok() {
        assert!(P4rtStatus::Ok.is_ok());
        assert!(!P4rtStatus::NotFound.is_ok());
        assert_eq!(P4rtStatus::ResourceExhausted.to_string(), "RESOURCE_EXHAUSTED");
    }

    #[test]
    fn test_error_display_names_cause() {
        let err = TransportError::status(P4rtStatus::InvalidArgument, "bad action param width");
        assert_eq!(
            err.to_string(),
            "switch returned INVALID_ARGUMENT: bad action param width"
        );

        let err = TransportError::closed("s1");
        assert_eq!(err.to_string(), "connection to s1 is closed");
    }

    #[test]
    fn test_transient() {
        assert!(TransportError::status(P4rtStatus::Unavailable, "busy").is_transient());
        assert!(TransportError::connect("10.0.0.1:50001", "refused").is_transient());
        assert!(!TransportError::status(P4rtStatus::InvalidArgument, "bad").is_transient());
        assert!(!TransportError::invalid_entry("no match key").is_transient());
    }
}
