//! Error types for hsplug-core.
//!
//! Every public operation returns either a typed value or exactly one
//! [`Error`]. Nothing is retried inside the library.

use thiserror::Error;

/// Error type for hsplug-core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Dial, write or read on the socket failed.
    #[error("connection failed: {0}")]
    Connection(#[source] std::io::Error),

    /// The call's deadline expired. The payload names the phase.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Malformed length header or payload that does not decode to text.
    #[error("framing error: {0}")]
    Framing(String),

    /// Response is not valid JSON or lacks the expected sub-object.
    #[error("parse error: {0}")]
    Parse(String),

    /// The device accepted the frame but rejected the operation.
    #[error("device error {code}: {message}")]
    Device {
        /// `err_code` reported by the device.
        code: i64,
        /// `err_msg` reported by the device (empty when absent).
        message: String,
    },

    /// Caller input cannot be rendered into a command.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Connection(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_display() {
        let err = Error::Device {
            code: -3,
            message: "invalid argument".into(),
        };
        assert_eq!(err.to_string(), "device error -3: invalid argument");
    }

    #[test]
    fn test_io_error_maps_to_connection() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: Error = io.into();
        assert!(matches!(err, Error::Connection(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
