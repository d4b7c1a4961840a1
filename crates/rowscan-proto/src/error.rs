//! Scan error types.

use thiserror::Error;

/// Errors raised while converting a column value into a native target.
#[derive(Debug, Error)]
pub enum Error {
    /// The column value has a type the target cannot hold.
    #[error("cannot scan {found} value into {target}")]
    TypeMismatch {
        /// Kind of the column value.
        found: &'static str,
        /// Name of the target type.
        target: &'static str,
    },

    /// The column value does not fit the target's range.
    #[error("value {value} out of range for {target}")]
    OutOfRange {
        /// Textual form of the value.
        value: String,
        /// Name of the target type.
        target: &'static str,
    },

    /// Text stored as bytes is not valid UTF-8.
    #[error("invalid utf-8 in column value: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A document column does not hold valid JSON.
    #[error("invalid document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
}

impl Error {
    /// Build a type mismatch error for the given target type.
    pub fn mismatch<T: ?Sized>(found: &'static str) -> Self {
        Error::TypeMismatch {
            found,
            target: std::any::type_name::<T>(),
        }
    }
}
