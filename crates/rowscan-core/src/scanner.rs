//! Scan sequences and high-level drivers.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::binder::Binder;
use crate::cache::PlanCache;
use crate::columns::ColumnSet;
use crate::config::ScanConfig;
use crate::decoder::{FallbackDecoder, JsonDecoder};
use crate::error::Error;
use crate::rows::Rows;
use crate::shape::{Bind, Shape, Slot};

/// Scanning engine: configuration, plan cache and fallback decoder.
///
/// Cloning is cheap; clones share the plan cache.
#[derive(Clone)]
pub struct Scanner {
    config: Arc<ScanConfig>,
    cache: Arc<PlanCache>,
    decoder: Arc<dyn FallbackDecoder>,
}

impl Scanner {
    /// Create a scanner with its own plan cache and the JSON fallback decoder.
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config: Arc::new(config),
            cache: Arc::new(PlanCache::new()),
            decoder: Arc::new(JsonDecoder),
        }
    }

    /// Set the fallback decoder.
    pub fn with_decoder(mut self, decoder: impl FallbackDecoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    /// Use a shared plan cache.
    ///
    /// Scanners with different configurations may share a cache; their field
    /// trees are kept apart.
    pub fn with_cache(mut self, cache: Arc<PlanCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Get the plan cache.
    pub fn cache(&self) -> &Arc<PlanCache> {
        &self.cache
    }

    /// Get the configuration.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Start a scan sequence over `rows`.
    pub fn row_scanner<R: Rows>(&self, rows: R) -> RowScanner<R> {
        RowScanner {
            rows,
            scanner: self.clone(),
            state: None,
        }
    }

    /// Scan every row into a fresh `T` appended to `dst`.
    ///
    /// The cursor is closed afterwards, even on error; the first error wins.
    pub fn scan_all<T: Bind, R: Rows>(&self, dst: &mut Vec<T>, rows: R) -> Result<(), Error> {
        let mut scanner = self.row_scanner(rows);
        let result = scan_remaining(&mut scanner, dst);
        result.and(scanner.finish())
    }

    /// Scan exactly one row into `dst`.
    ///
    /// Returns [`Error::NotFound`] on an empty result and
    /// [`Error::TooManyRows`] once the cursor is drained if it held more
    /// than one row. The cursor is closed afterwards.
    pub fn scan_one<T: Bind, R: Rows>(&self, dst: &mut T, rows: R) -> Result<(), Error> {
        let mut scanner = self.row_scanner(rows);
        let result = scan_single(&mut scanner, dst);
        result.and(scanner.finish())
    }

    /// Scan the cursor's current row into `dst`.
    ///
    /// For callers that drive `next` themselves; the cursor is left open.
    pub fn scan_row<T: Bind, R: Rows>(&self, dst: &mut T, rows: &mut R) -> Result<(), Error> {
        self.row_scanner(rows).scan(dst)
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

impl fmt::Debug for Scanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scanner")
            .field("config", &self.config)
            .field("cached_trees", &self.cache.len())
            .finish_non_exhaustive()
    }
}

fn scan_remaining<T: Bind, R: Rows>(
    scanner: &mut RowScanner<R>,
    dst: &mut Vec<T>,
) -> Result<(), Error> {
    while scanner.next() {
        let mut item = T::default();
        scanner.scan(&mut item)?;
        dst.push(item);
    }
    Ok(())
}

fn scan_single<T: Bind, R: Rows>(scanner: &mut RowScanner<R>, dst: &mut T) -> Result<(), Error> {
    if !scanner.next() {
        scanner.rows.err().map_err(Error::rows)?;
        return Err(Error::NotFound);
    }
    scanner.scan(dst)?;

    let mut count = 1;
    while scanner.next() {
        count += 1;
    }
    if count > 1 {
        return Err(Error::TooManyRows(count));
    }
    Ok(())
}

struct Started {
    columns: ColumnSet,
    binder: Binder,
    shape: Shape,
    /// Type of the destination slot, which may differ from the shape's
    /// type for transparent wrappers.
    slot_type: TypeId,
}

/// One scan sequence over a cursor.
///
/// The destination is classified and its plan resolved on [`start`](Self::start);
/// every [`bind`](Self::bind) then fills one row without re-deriving the plan
/// unless the cursor's columns changed.
pub struct RowScanner<R> {
    rows: R,
    scanner: Scanner,
    state: Option<Started>,
}

impl<R: Rows> RowScanner<R> {
    /// Classify `dst` and resolve its binding plan. Does nothing once started.
    pub fn start(&mut self, dst: &dyn Slot) -> Result<(), Error> {
        if self.state.is_some() {
            return Ok(());
        }

        let columns = ColumnSet::new(self.rows.columns().map_err(Error::rows)?)?;
        let shape = dst.shape();
        let binder =
            Binder::classify(&shape, &columns, &self.scanner.cache, &self.scanner.config)?;

        debug!(
            destination = %shape.short_name(),
            kind = binder.kind(),
            column_count = columns.len(),
            "Started scan sequence"
        );

        self.state = Some(Started {
            columns,
            binder,
            shape,
            slot_type: dst.slot_type_id(),
        });
        Ok(())
    }

    /// Fill `dst` from the current row.
    pub fn bind(&mut self, dst: &mut dyn Slot) -> Result<(), Error> {
        let Some(state) = self.state.as_mut() else {
            return Err(Error::NotStarted);
        };
        if dst.slot_type_id() != state.slot_type {
            return Err(Error::DestinationMismatch {
                expected: state.shape.short_name(),
                found: dst.shape().short_name(),
            });
        }

        let names = self.rows.columns().map_err(Error::rows)?;
        if !state.columns.matches(&names) {
            let columns = ColumnSet::new(names)?;
            state.binder = Binder::classify(
                &state.shape,
                &columns,
                &self.scanner.cache,
                &self.scanner.config,
            )?;
            state.columns = columns;
        }

        state.binder.bind_row(
            &mut self.rows,
            &state.columns,
            dst,
            &*self.scanner.decoder,
        )
    }

    /// Start if needed, then fill `dst` from the current row.
    pub fn scan<T: Bind>(&mut self, dst: &mut T) -> Result<(), Error> {
        self.start(dst)?;
        self.bind(dst)
    }

    /// Advance the cursor.
    pub fn next(&mut self) -> bool {
        self.rows.next()
    }

    /// Check whether the sequence has started.
    pub fn is_started(&self) -> bool {
        self.state.is_some()
    }

    /// Report the cursor's iteration error, then close it.
    ///
    /// The cursor is closed even if iteration failed; the iteration error wins.
    pub fn finish(mut self) -> Result<(), Error> {
        let iteration = self.rows.err().map_err(Error::rows);
        let close = self.rows.close().map_err(Error::rows);
        iteration.and(close)
    }

    /// Give back the cursor.
    pub fn into_inner(self) -> R {
        self.rows
    }
}

impl<R> fmt::Debug for RowScanner<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowScanner")
            .field("started", &self.state.is_some())
            .field(
                "destination",
                &self.state.as_ref().map(|s| s.shape.short_name()),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::MemoryRows;
    use rowscan_proto::Value;

    fn single_column(values: &[&str]) -> MemoryRows {
        MemoryRows::new(
            ["foo"],
            values.iter().map(|v| vec![Value::from(*v)]).collect(),
        )
    }

    #[test]
    fn test_bind_before_start() {
        let mut rows = single_column(&["a"]);
        let scanner = Scanner::default();
        let mut rs = scanner.row_scanner(&mut rows);
        assert!(rs.next());

        let mut dst = String::new();
        assert!(matches!(rs.bind(&mut dst), Err(Error::NotStarted)));
    }

    #[test]
    fn test_destination_mismatch() {
        let mut rows = single_column(&["a", "b"]);
        let scanner = Scanner::default();
        let mut rs = scanner.row_scanner(&mut rows);

        assert!(rs.next());
        let mut first = String::new();
        rs.scan(&mut first).unwrap();

        assert!(rs.next());
        let mut second: Option<String> = None;
        let err = rs.scan(&mut second).unwrap_err();
        assert_eq!(
            err.to_string(),
            "scan sequence started for String, got destination Option<String>"
        );
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut rows = single_column(&["a"]);
        let scanner = Scanner::default();
        let mut rs = scanner.row_scanner(&mut rows);

        let dst = String::new();
        rs.start(&dst).unwrap();
        rs.start(&dst).unwrap();
        assert!(rs.is_started());
    }

    #[test]
    fn test_scan_row() {
        let mut rows = single_column(&["a", "b"]);
        let scanner = Scanner::default();

        let mut seen = Vec::new();
        while rows.next() {
            let mut dst = String::new();
            scanner.scan_row(&mut dst, &mut rows).unwrap();
            seen.push(dst);
        }
        assert_eq!(seen, vec!["a", "b"]);
        assert!(!rows.is_closed());
    }

    #[test]
    fn test_into_inner() {
        let rows = single_column(&["a"]);
        let mut rs = Scanner::default().row_scanner(rows);
        assert!(rs.next());
        let rows = rs.into_inner();
        assert_eq!(rows.scan_count(), 0);
    }
}
