//! rowscan core - binds query rows to records, maps and scalars.
//!
//! A [`Scanner`] classifies a destination type once per scan sequence,
//! resolves a binding plan from the cursor's column names (cached per type in
//! a [`PlanCache`]) and then fills one destination per row with a single
//! [`Rows::scan`] call plus any deferred fallback decoding.
//!
//! # Example
//!
//! ```
//! use rowscan_core::{bind_struct, MemoryRows, Scanner, Value};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Default, PartialEq, Deserialize)]
//! struct User {
//!     user_id: i64,
//!     name: Option<String>,
//! }
//!
//! bind_struct!(User {
//!     user_id: i64,
//!     name: Option<String>,
//! });
//!
//! let rows = MemoryRows::new(
//!     ["user_id", "name"],
//!     vec![
//!         vec![Value::Int64(1), Value::from("ada")],
//!         vec![Value::Int64(2), Value::Null],
//!     ],
//! );
//!
//! let mut users: Vec<User> = Vec::new();
//! Scanner::default().scan_all(&mut users, rows).unwrap();
//! assert_eq!(users[1], User { user_id: 2, name: None });
//! ```

mod binder;
mod impls;
mod macros;

pub mod cache;
pub mod columns;
pub mod config;
pub mod decoder;
pub mod error;
pub mod naming;
pub mod plan;
pub mod rows;
pub mod scanner;
pub mod shape;

pub use cache::{CacheStats, PlanCache};
pub use columns::ColumnSet;
pub use config::ScanConfig;
pub use decoder::{DecodeError, Discard, FallbackDecoder, JsonDecoder, RawValue};
pub use error::{BoxError, Error};
pub use plan::{BindingPlan, FieldPath, FieldTree, PlanEntry, PlanTarget};
pub use rows::{MemoryRows, MemoryRowsError, Rows};
pub use scanner::{RowScanner, Scanner};
pub use shape::{Bind, FieldDescriptor, MapKey, Shape, ShapeKind, Slot};

/// Error raised when a column value cannot be stored in a scan target.
pub use rowscan_proto::Error as ScanError;
pub use rowscan_proto::Value;

/// Re-export protocol types.
pub use rowscan_proto as proto;
