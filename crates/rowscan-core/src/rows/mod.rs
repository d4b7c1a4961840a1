//! Cursor interface consumed by the engine.
//!
//! A driver adapts its result set to [`Rows`]: it reports column names, steps
//! through rows and converts each column value of the current row into the
//! scan target at the same position.

mod memory;

pub use memory::{MemoryRows, MemoryRowsError};

use crate::shape::Slot;

/// A forward-only cursor over a query result.
pub trait Rows {
    /// Error reported by the cursor.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Column names of the result, in order.
    fn columns(&self) -> Result<Vec<String>, Self::Error>;

    /// Advance to the next row. Returns `false` when exhausted or on error.
    fn next(&mut self) -> bool;

    /// Scan the current row into `targets`, one per column.
    fn scan(&mut self, targets: &mut [&mut dyn Slot]) -> Result<(), Self::Error>;

    /// Error that terminated iteration, if any.
    fn err(&mut self) -> Result<(), Self::Error>;

    /// Release the cursor.
    fn close(&mut self) -> Result<(), Self::Error>;
}

impl<R: Rows + ?Sized> Rows for &mut R {
    type Error = R::Error;

    fn columns(&self) -> Result<Vec<String>, Self::Error> {
        (**self).columns()
    }

    fn next(&mut self) -> bool {
        (**self).next()
    }

    fn scan(&mut self, targets: &mut [&mut dyn Slot]) -> Result<(), Self::Error> {
        (**self).scan(targets)
    }

    fn err(&mut self) -> Result<(), Self::Error> {
        (**self).err()
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        (**self).close()
    }
}
