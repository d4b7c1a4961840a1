//! Core error types.

use thiserror::Error;

use crate::decoder::DecodeError;
use crate::plan::FieldPath;

/// Boxed error returned by a cursor implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned while starting or binding a scan sequence.
#[derive(Debug, Error)]
pub enum Error {
    /// The row set reports the same column name twice.
    #[error("rows contain duplicated column '{0}'")]
    DuplicateColumn(String),

    /// No destination field resolves to the column.
    #[error("column: '{column}': no corresponding field found in {destination}")]
    NoField {
        /// Column name reported by the cursor.
        column: String,
        /// Textual shape of the destination type.
        destination: String,
    },

    /// Several destination fields resolve to the column.
    #[error(
        "column must have exactly one field pointing to it; found {} pointing to '{column}' in {destination}",
        describe_paths(.paths)
    )]
    AmbiguousField {
        /// Column name reported by the cursor.
        column: String,
        /// Index paths of every matching field.
        paths: Vec<FieldPath>,
        /// Textual shape of the destination type.
        destination: String,
    },

    /// Mapping destination whose key is not a text type.
    #[error("invalid type {destination}: map must have string key, got: {key}")]
    InvalidMapKey {
        /// Name of the mapping type.
        destination: String,
        /// Name of the key type.
        key: String,
    },

    /// Scalar destination with a column count other than one.
    #[error("to scan into a primitive type, columns number must be exactly 1, got: {0}")]
    ColumnCount(usize),

    /// A composite type embeds itself, directly or through other embedded types.
    #[error("recursive embedding of {0}")]
    RecursiveEmbedding(String),

    /// The destination's runtime accessors disagree with its description.
    #[error("malformed destination {destination}: {reason}")]
    MalformedDestination {
        /// Name of the destination type.
        destination: String,
        /// What went wrong.
        reason: String,
    },

    /// Fallback decoding of a column failed.
    #[error("column: '{column}': {source}")]
    Decode {
        /// Column name reported by the cursor.
        column: String,
        /// Decoder error.
        #[source]
        source: DecodeError,
    },

    /// Error reported by the cursor.
    #[error(transparent)]
    Rows(BoxError),

    /// `bind` called before `start`.
    #[error("scan sequence not started")]
    NotStarted,

    /// `bind` called with a destination type other than the one the sequence started with.
    #[error("scan sequence started for {expected}, got destination {found}")]
    DestinationMismatch {
        /// Destination type the sequence was started with.
        expected: String,
        /// Destination type passed to `bind`.
        found: String,
    },

    /// Single-row scan found no rows.
    #[error("no rows in result set")]
    NotFound,

    /// Single-row scan found more than one row.
    #[error("expected 1 row, got: {0}")]
    TooManyRows(usize),
}

impl Error {
    /// Wrap a cursor error.
    pub fn rows<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Rows(Box::new(err))
    }

    /// Build a malformed destination error.
    pub(crate) fn malformed(destination: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedDestination {
            destination: destination.into(),
            reason: reason.into(),
        }
    }

    /// Check whether a single-row scan found no rows.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }
}

fn describe_paths(paths: &[FieldPath]) -> String {
    let indexes = paths
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" and ");
    format!("{} fields with indexes {}", paths.len(), indexes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_field_message() {
        let err = Error::AmbiguousField {
            column: "foo_column".into(),
            paths: vec![FieldPath::from(vec![0]), FieldPath::from(vec![1])],
            destination: "Foo { foo: String, bar: String }".into(),
        };
        assert_eq!(
            err.to_string(),
            "column must have exactly one field pointing to it; found 2 fields with indexes [0] and [1] \
             pointing to 'foo_column' in Foo { foo: String, bar: String }"
        );
    }

    #[test]
    fn test_rows_error_is_transparent() {
        let io = std::io::Error::other("connection reset");
        let err = Error::rows(io);
        assert_eq!(err.to_string(), "connection reset");
        assert!(!err.is_not_found());
        assert!(Error::NotFound.is_not_found());
    }
}
