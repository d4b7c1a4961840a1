//! rowscan protocol types.
//!
//! This crate defines the column value model shared between cursors (which
//! produce values) and destinations (which scan them).
//!
//! # Modules
//!
//! - [`value`] - Column values of the current row
//! - [`error`] - Errors raised when a value cannot be scanned into a target
//!
//! # Serialization
//!
//! [`Value`] derives `serde` for debugging output and fixtures.

pub mod error;
pub mod value;

pub use error::Error;
pub use value::Value;
