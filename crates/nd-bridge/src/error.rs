//! Error Types for the Array Bridge
//!
//! Every fallible operation in this crate returns [`BridgeResult`]. Errors are
//! surfaced to the caller of the operation that detected them; nothing is
//! retried or recovered silently.
//!
//! ## Error Categories
//!
//! - Shape metadata problems (`InvalidShape`)
//! - Element kinds outside the supported set (`UnsupportedDtype`)
//! - Inconsistent handle state detected on export (`ConversionError`)
//! - Configuration and limit failures

use std::fmt;
use thiserror::Error;

/// Result type for array bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Array bridge error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// Shape metadata is malformed (negative dimension, bad strides, short buffer)
    #[error("invalid shape: {reason}")]
    InvalidShape {
        /// Description of the problem
        reason: String,
    },

    /// Element kind cannot be represented by the bridge
    #[error("unsupported array dtype: {dtype}")]
    UnsupportedDtype {
        /// The offending dtype name or typestr
        dtype: String,
    },

    /// A handle's buffer does not match its declared layout
    #[error("conversion failed: {reason}")]
    ConversionError {
        /// Description of the inconsistency
        reason: String,
    },

    /// Typed access requested with the wrong element type
    #[error("dtype mismatch: expected {expected}, got {actual}")]
    DtypeMismatch {
        /// Dtype requested by the caller
        expected: String,
        /// Dtype actually stored
        actual: String,
    },

    /// Element index outside the array
    #[error("index {index:?} out of bounds for shape {shape:?}")]
    IndexOutOfBounds {
        /// Requested index
        index: Vec<usize>,
        /// Shape of the array
        shape: Vec<usize>,
    },

    /// Array exceeds the configured element limit
    #[error("array of {elements} elements exceeds the limit of {limit}")]
    LimitExceeded {
        /// Number of elements in the rejected array
        elements: usize,
        /// Configured maximum
        limit: usize,
    },

    /// Configuration could not be parsed or applied
    #[error("configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Array-interface document could not be encoded or decoded
    #[error("serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },

    /// Filesystem failure while reading configuration or documents
    #[error("io error on {path}: {message}")]
    Io {
        /// Path that was being accessed
        path: String,
        /// Error message
        message: String,
    },
}

impl BridgeError {
    /// Create an invalid shape error
    pub fn invalid_shape(reason: impl Into<String>) -> Self {
        BridgeError::InvalidShape {
            reason: reason.into(),
        }
    }

    /// Create an unsupported dtype error
    pub fn unsupported_dtype(dtype: impl Into<String>) -> Self {
        BridgeError::UnsupportedDtype {
            dtype: dtype.into(),
        }
    }

    /// Create a conversion error
    pub fn conversion(reason: impl Into<String>) -> Self {
        BridgeError::ConversionError {
            reason: reason.into(),
        }
    }

    /// Create a dtype mismatch error
    pub fn dtype_mismatch(expected: impl fmt::Display, actual: impl fmt::Display) -> Self {
        BridgeError::DtypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create an index out of bounds error
    pub fn index_out_of_bounds(index: &[usize], shape: &[usize]) -> Self {
        BridgeError::IndexOutOfBounds {
            index: index.to_vec(),
            shape: shape.to_vec(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        BridgeError::Config {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        BridgeError::Serialization {
            message: message.into(),
        }
    }

    /// Create an io error
    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        BridgeError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Check if this error concerns shape metadata
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            BridgeError::InvalidShape { .. } | BridgeError::IndexOutOfBounds { .. }
        )
    }

    /// Check if this is a type-related error
    pub fn is_type_error(&self) -> bool {
        matches!(
            self,
            BridgeError::UnsupportedDtype { .. } | BridgeError::DtypeMismatch { .. }
        )
    }
}

impl From<ndarray::ShapeError> for BridgeError {
    fn from(err: ndarray::ShapeError) -> Self {
        BridgeError::conversion(err.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::serialization(err.to_string())
    }
}
