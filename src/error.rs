//! # IPC Errors
//!
//! Unified error type for every decoding stage.
//!
//! Covers container framing faults, unsupported logical types, schema
//! violations and out-of-range buffer descriptors. Every error is raised while
//! opening a reader or loading a batch. Nothing is silently replaced by a
//! default value.

use std::{error, fmt, io};

/// Unified error type for all decoding operations.
#[derive(Debug)]
pub enum IpcError {
    /// Bad or missing magic, inconsistent footer length, truncated or
    /// unverifiable metadata, or an unexpected message header.
    Format(String),

    /// Type tag, integer bit width or floating point precision outside the
    /// supported set.
    UnsupportedType(String),

    /// Schema violation: dictionary-encoded field with children, or a field
    /// referencing an unregistered dictionary id.
    Schema(String),

    /// Valid Arrow input using a feature this reader does not decode
    /// (compressed bodies, delta dictionaries, big-endian data).
    UnsupportedFeature(String),

    /// A buffer descriptor or offset points outside the available bytes.
    OutOfBounds(String),

    /// Underlying I/O failure while reading a file into memory.
    Io(io::Error),
}

/// Shorthand result type used throughout the crate.
pub type IpcResult<T> = Result<T, IpcError>;

impl IpcError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        IpcError::Format(msg.into())
    }

    pub(crate) fn unsupported_type(msg: impl Into<String>) -> Self {
        IpcError::UnsupportedType(msg.into())
    }

    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        IpcError::Schema(msg.into())
    }

    pub(crate) fn out_of_bounds(msg: impl Into<String>) -> Self {
        IpcError::OutOfBounds(msg.into())
    }
}

impl fmt::Display for IpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpcError::Format(s) => write!(f, "Format error: {}", s),
            IpcError::UnsupportedType(s) => write!(f, "Unsupported type: {}", s),
            IpcError::Schema(s) => write!(f, "Schema error: {}", s),
            IpcError::UnsupportedFeature(s) => write!(f, "Unsupported feature: {}", s),
            IpcError::OutOfBounds(s) => write!(f, "Out of bounds: {}", s),
            IpcError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl error::Error for IpcError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            IpcError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for IpcError {
    fn from(e: io::Error) -> Self {
        IpcError::Io(e)
    }
}
