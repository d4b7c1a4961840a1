//! In-memory cursor over materialized rows.

use rowscan_proto::{Error as ScanError, Value};
use thiserror::Error;

use super::Rows;
use crate::shape::Slot;

/// Errors reported by [`MemoryRows`].
#[derive(Debug, Error)]
pub enum MemoryRowsError {
    /// The cursor was closed.
    #[error("rows are closed")]
    Closed,

    /// `scan` called before `next` or after exhaustion.
    #[error("no current row")]
    NoCurrentRow,

    /// Target count does not match the column count.
    #[error("expected {expected} destination arguments in scan, got {got}")]
    TargetCount {
        /// Number of columns.
        expected: usize,
        /// Number of targets passed to `scan`.
        got: usize,
    },

    /// A column value could not be stored in its target.
    #[error("scan column '{column}': {source}")]
    Scan {
        /// Column name.
        column: String,
        /// Conversion error.
        #[source]
        source: ScanError,
    },

    /// Injected iteration failure.
    #[error("iteration failed: {0}")]
    Iteration(String),
}

/// A [`Rows`] implementation backed by vectors of values.
#[derive(Debug, Clone, Default)]
pub struct MemoryRows {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    /// Index of the current row; `None` before the first `next`.
    position: Option<usize>,
    /// Fail iteration once this many rows have been returned.
    fail_after: Option<(usize, String)>,
    failure: Option<String>,
    closed: bool,
    scans: usize,
}

impl MemoryRows {
    /// Create a cursor over `rows`, each with one value per column.
    pub fn new<C, S>(columns: C, rows: Vec<Vec<Value>>) -> Self
    where
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows,
            ..Default::default()
        }
    }

    /// Make iteration stop with an error after `rows` rows.
    pub fn with_failure_after(mut self, rows: usize, message: impl Into<String>) -> Self {
        self.fail_after = Some((rows, message.into()));
        self
    }

    /// Check if the cursor was closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of `scan` calls served.
    pub fn scan_count(&self) -> usize {
        self.scans
    }
}

impl Rows for MemoryRows {
    type Error = MemoryRowsError;

    fn columns(&self) -> Result<Vec<String>, Self::Error> {
        if self.closed {
            return Err(MemoryRowsError::Closed);
        }
        Ok(self.columns.clone())
    }

    fn next(&mut self) -> bool {
        if self.closed || self.failure.is_some() {
            return false;
        }
        let next = self.position.map_or(0, |p| p + 1);
        if let Some((limit, message)) = &self.fail_after {
            if next >= *limit {
                self.failure = Some(message.clone());
                self.position = None;
                return false;
            }
        }
        if next >= self.rows.len() {
            self.position = Some(self.rows.len());
            return false;
        }
        self.position = Some(next);
        true
    }

    fn scan(&mut self, targets: &mut [&mut dyn Slot]) -> Result<(), Self::Error> {
        if self.closed {
            return Err(MemoryRowsError::Closed);
        }
        let row = self
            .position
            .and_then(|p| self.rows.get(p))
            .ok_or(MemoryRowsError::NoCurrentRow)?;
        if targets.len() != self.columns.len() {
            return Err(MemoryRowsError::TargetCount {
                expected: self.columns.len(),
                got: targets.len(),
            });
        }

        for ((target, value), column) in targets.iter_mut().zip(row).zip(&self.columns) {
            target
                .scan_value(value)
                .map_err(|source| MemoryRowsError::Scan {
                    column: column.clone(),
                    source,
                })?;
        }
        self.scans += 1;
        Ok(())
    }

    fn err(&mut self) -> Result<(), Self::Error> {
        match &self.failure {
            Some(message) => Err(MemoryRowsError::Iteration(message.clone())),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iterate_and_scan() {
        let mut rows = MemoryRows::new(
            ["foo", "bar"],
            vec![
                vec![Value::from("a"), Value::Int64(1)],
                vec![Value::from("b"), Value::Int64(2)],
            ],
        );

        let mut seen = Vec::new();
        while rows.next() {
            let mut foo = String::new();
            let mut bar = 0i64;
            rows.scan(&mut [&mut foo as &mut dyn Slot, &mut bar]).unwrap();
            seen.push((foo, bar));
        }
        rows.err().unwrap();

        assert_eq!(seen, vec![("a".to_string(), 1), ("b".to_string(), 2)]);
        assert_eq!(rows.scan_count(), 2);
    }

    #[test]
    fn test_scan_without_row() {
        let mut rows = MemoryRows::new(["foo"], vec![vec![Value::from("a")]]);
        let mut foo = String::new();
        assert!(matches!(
            rows.scan(&mut [&mut foo as &mut dyn Slot]),
            Err(MemoryRowsError::NoCurrentRow)
        ));
    }

    #[test]
    fn test_target_count_mismatch() {
        let mut rows = MemoryRows::new(["foo", "bar"], vec![vec![Value::Null, Value::Null]]);
        assert!(rows.next());
        let mut foo: Option<String> = None;
        let err = rows.scan(&mut [&mut foo as &mut dyn Slot]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected 2 destination arguments in scan, got 1"
        );
    }

    #[test]
    fn test_injected_failure() {
        let mut rows = MemoryRows::new(
            ["foo"],
            vec![vec![Value::from("a")], vec![Value::from("b")]],
        )
        .with_failure_after(1, "connection reset");

        assert!(rows.next());
        assert!(!rows.next());
        assert!(!rows.next());
        assert_eq!(
            rows.err().unwrap_err().to_string(),
            "iteration failed: connection reset"
        );
    }

    #[test]
    fn test_closed() {
        let mut rows = MemoryRows::new(["foo"], vec![vec![Value::from("a")]]);
        rows.close().unwrap();
        assert!(rows.is_closed());
        assert!(!rows.next());
        assert!(matches!(rows.columns(), Err(MemoryRowsError::Closed)));
    }
}
