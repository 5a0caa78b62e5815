//! Bridge error types

use std::error::Error;
use std::fmt;

/// Errors raised while registering or dispatching methods
#[derive(Debug)]
pub enum BridgeError {
    /// A method with this name is already on the callback object
    AlreadyRegistered(String),
    /// No method with this name is advertised
    UnknownMethod(String),
    /// Call arguments did not match the method signature
    InvalidArguments { method: String, reason: String },
    /// The method ran and failed
    MethodFailed { method: String, reason: String },
    /// The remote side answered a call with an error frame
    Remote { method: String, message: String },
    /// Peer sent a frame that makes no sense at this point
    Protocol(String),
    /// Serialization/deserialization error
    SerdeError(String),
    /// IO error
    IoError(String),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::AlreadyRegistered(name) => {
                write!(f, "Method '{}' is already registered", name)
            }
            BridgeError::UnknownMethod(name) => write!(f, "Unknown method '{}'", name),
            BridgeError::InvalidArguments { method, reason } => {
                write!(f, "Invalid arguments for '{}': {}", method, reason)
            }
            BridgeError::MethodFailed { method, reason } => {
                write!(f, "Method '{}' failed: {}", method, reason)
            }
            BridgeError::Remote { method, message } => {
                write!(f, "Remote call '{}' failed: {}", method, message)
            }
            BridgeError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            BridgeError::SerdeError(msg) => write!(f, "Serialization error: {}", msg),
            BridgeError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl Error for BridgeError {}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::SerdeError(err.to_string())
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::IoError(err.to_string())
    }
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
