//! Binding plans for composite destinations.
//!
//! Planning happens in two passes:
//!
//! ```text
//! FieldTree::build(shape)        walk fields, resolve names   (cached per type)
//!        |
//! FieldTree::resolve(columns)    match columns to leaves      (once per column set)
//!        |
//! BindingPlan                    column-aligned scan targets
//! ```

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::columns::ColumnSet;
use crate::config::ScanConfig;
use crate::error::Error;
use crate::shape::{FieldDescriptor, Shape, ShapeKind};

/// Index path from a composite to one of its (possibly nested) fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath(Vec<usize>);

impl FieldPath {
    /// Field indexes, outermost first.
    pub fn indexes(&self) -> &[usize] {
        &self.0
    }

    fn child(&self, index: usize) -> Self {
        let mut indexes = Vec::with_capacity(self.0.len() + 1);
        indexes.extend_from_slice(&self.0);
        indexes.push(index);
        Self(indexes)
    }
}

impl From<Vec<usize>> for FieldPath {
    fn from(indexes: Vec<usize>) -> Self {
        Self(indexes)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", index)?;
        }
        f.write_str("]")
    }
}

/// A bindable field found while walking a composite.
#[derive(Debug, Clone)]
pub struct Leaf {
    /// Resolved column name, including any embedding prefix.
    pub column: String,
    /// Location of the field.
    pub path: FieldPath,
    /// The field is filled through fallback decoding.
    pub fallback: bool,
}

/// Column-independent description of a composite's bindable fields.
#[derive(Debug)]
pub struct FieldTree {
    type_id: TypeId,
    destination: String,
    leaves: Vec<Leaf>,
    by_column: HashMap<String, Vec<usize>>,
}

impl FieldTree {
    /// Walk a composite shape and resolve every leaf's column name.
    pub fn build(shape: &Shape, config: &ScanConfig) -> Result<Self, Error> {
        let ShapeKind::Composite(fields) = shape.kind() else {
            return Err(Error::malformed(
                shape.short_name(),
                "binding plans require a composite type",
            ));
        };

        let mut walker = Walker {
            config,
            leaves: Vec::new(),
            stack: vec![shape.type_id()],
        };
        walker.walk(fields, &FieldPath::default(), None)?;

        let mut by_column: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, leaf) in walker.leaves.iter().enumerate() {
            by_column.entry(leaf.column.clone()).or_default().push(i);
        }

        debug!(
            destination = %shape.short_name(),
            leaves = walker.leaves.len(),
            "Built field tree"
        );

        Ok(Self {
            type_id: shape.type_id(),
            destination: shape.to_string(),
            leaves: walker.leaves,
            by_column,
        })
    }

    /// Identity of the composite type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Textual shape of the composite, used in error messages.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Bindable fields in walk order.
    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    /// Match a column set against the leaves.
    ///
    /// Every column must resolve to exactly one leaf, unless unknown columns
    /// are allowed, in which case unmatched columns are discarded.
    pub fn resolve(&self, columns: &ColumnSet, config: &ScanConfig) -> Result<BindingPlan, Error> {
        let mut entries = Vec::with_capacity(columns.len());

        for column in columns.iter() {
            let matches = self.by_column.get(column).map(Vec::as_slice).unwrap_or(&[]);
            let target = match matches {
                [] if config.allow_unknown_columns => PlanTarget::Discard,
                [] => {
                    return Err(Error::NoField {
                        column: column.to_string(),
                        destination: self.destination.clone(),
                    })
                }
                [index] => {
                    let leaf = &self.leaves[*index];
                    PlanTarget::Field {
                        path: leaf.path.clone(),
                        fallback: leaf.fallback,
                    }
                }
                many => {
                    return Err(Error::AmbiguousField {
                        column: column.to_string(),
                        paths: many.iter().map(|&i| self.leaves[i].path.clone()).collect(),
                        destination: self.destination.clone(),
                    })
                }
            };
            entries.push(PlanEntry {
                column: column.to_string(),
                target,
            });
        }

        Ok(BindingPlan {
            type_id: self.type_id,
            destination: self.destination.clone(),
            entries,
        })
    }
}

struct Walker<'a> {
    config: &'a ScanConfig,
    leaves: Vec<Leaf>,
    /// Composite types currently being walked, to reject recursive embedding.
    stack: Vec<TypeId>,
}

impl Walker<'_> {
    fn walk(
        &mut self,
        fields: &[FieldDescriptor],
        parent: &FieldPath,
        prefix: Option<&str>,
    ) -> Result<(), Error> {
        for (index, field) in fields.iter().enumerate() {
            if field.ignored || field.binding == Some(self.config.ignore_marker.as_str()) {
                continue;
            }

            let path = parent.child(index);
            let shape = field.shape();

            if field.embedded {
                let inner = shape.unwrap_optional();
                if let ShapeKind::Composite(sub_fields) = inner.kind() {
                    if self.stack.contains(&inner.type_id()) {
                        return Err(Error::RecursiveEmbedding(inner.short_name()));
                    }
                    let nested_prefix = match field.binding {
                        Some(binding) => Some(self.join(prefix, binding)),
                        None => prefix.map(str::to_string),
                    };
                    self.stack.push(inner.type_id());
                    self.walk(sub_fields, &path, nested_prefix.as_deref())?;
                    self.stack.pop();
                    continue;
                }
            }

            let name = match field.binding {
                Some(binding) => binding.to_string(),
                None => (self.config.name_mapper)(field.name),
            };
            self.leaves.push(Leaf {
                column: self.join(prefix, &name),
                path,
                fallback: shape.needs_fallback(),
            });
        }
        Ok(())
    }

    fn join(&self, prefix: Option<&str>, name: &str) -> String {
        match prefix {
            Some(prefix) => format!("{}{}{}", prefix, self.config.prefix_separator, name),
            None => name.to_string(),
        }
    }
}

/// Where a column's value goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanTarget {
    /// A destination field.
    Field {
        /// Location of the field.
        path: FieldPath,
        /// Scan into a raw holder and decode after the row is read.
        fallback: bool,
    },
    /// An unknown column whose value is dropped.
    Discard,
}

/// One column of a binding plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    /// Column name.
    pub column: String,
    /// Destination of the column.
    pub target: PlanTarget,
}

/// Column-aligned binding plan for one composite type and column set.
#[derive(Debug, Clone)]
pub struct BindingPlan {
    type_id: TypeId,
    destination: String,
    entries: Vec<PlanEntry>,
}

impl BindingPlan {
    /// Identity of the composite type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Textual shape of the composite.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Entries in column order.
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Number of entries filled through fallback decoding.
    pub fn fallback_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.target, PlanTarget::Field { fallback: true, .. }))
            .count()
    }
}
