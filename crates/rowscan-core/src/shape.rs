//! Runtime description of destination types.
//!
//! Rust has no runtime reflection, so every destination type describes itself
//! through [`Bind::shape`] and exposes its storage through [`Slot`]. The plan
//! builder only ever looks at a [`Shape`]; the row binder only ever touches a
//! `&mut dyn Slot`.

use std::any::{Any, TypeId};
use std::fmt;

use rowscan_proto::{Error as ScanError, Value};
use serde::de::DeserializeOwned;

/// Runtime description of a destination type.
#[derive(Clone)]
pub struct Shape {
    type_id: TypeId,
    type_name: &'static str,
    kind: ShapeKind,
}

/// How values of a type are bound.
#[derive(Clone)]
pub enum ShapeKind {
    /// Text, natively scannable and usable as a mapping key.
    Text,
    /// Natively scannable non-text value (numbers, booleans, bytes, arrays).
    Scalar,
    /// Opaque structured value, only filled through fallback decoding.
    Document,
    /// Optional reference, allocated only when a value is present.
    Optional(Box<Shape>),
    /// Record with named fields.
    Composite(Vec<FieldDescriptor>),
    /// Key/value mapping.
    Mapping {
        /// Key type.
        key: Box<Shape>,
        /// Value type.
        value: Box<Shape>,
    },
}

impl Shape {
    /// Describe `T` as text.
    pub fn text<T: 'static>() -> Self {
        Self::new::<T>(ShapeKind::Text)
    }

    /// Describe `T` as a natively scannable scalar.
    pub fn scalar<T: 'static>() -> Self {
        Self::new::<T>(ShapeKind::Scalar)
    }

    /// Describe `T` as an opaque document.
    pub fn document<T: 'static>() -> Self {
        Self::new::<T>(ShapeKind::Document)
    }

    /// Describe `T` as an optional reference to `inner`.
    pub fn optional<T: 'static>(inner: Shape) -> Self {
        Self::new::<T>(ShapeKind::Optional(Box::new(inner)))
    }

    /// Describe `T` as a record with the given fields, in declaration order.
    pub fn composite<T: 'static>(fields: Vec<FieldDescriptor>) -> Self {
        Self::new::<T>(ShapeKind::Composite(fields))
    }

    /// Describe `T` as a mapping from `key` to `value`.
    pub fn mapping<T: 'static>(key: Shape, value: Shape) -> Self {
        Self::new::<T>(ShapeKind::Mapping {
            key: Box::new(key),
            value: Box::new(value),
        })
    }

    fn new<T: 'static>(kind: ShapeKind) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            kind,
        }
    }

    /// Identity of the described type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Full type name of the described type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Type name with module paths stripped, e.g. `HashMap<String, i64>`.
    pub fn short_name(&self) -> String {
        short_type_name(self.type_name)
    }

    /// Binding kind.
    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// The shape behind any optional-reference wrappers.
    pub fn unwrap_optional(&self) -> &Shape {
        match &self.kind {
            ShapeKind::Optional(inner) => inner.unwrap_optional(),
            _ => self,
        }
    }

    /// Check if this is an optional reference.
    pub fn is_optional(&self) -> bool {
        matches!(self.kind, ShapeKind::Optional(_))
    }

    /// Check if this is text.
    pub fn is_text(&self) -> bool {
        matches!(self.kind, ShapeKind::Text)
    }

    /// Check whether values of this type can only be filled by fallback decoding.
    pub fn needs_fallback(&self) -> bool {
        matches!(
            self.unwrap_optional().kind,
            ShapeKind::Composite(_) | ShapeKind::Mapping { .. } | ShapeKind::Document
        )
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({})", self)
    }
}

impl fmt::Display for Shape {
    /// Composites render with their fields, everything else by type name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ShapeKind::Composite(fields) = &self.kind else {
            return f.write_str(&self.short_name());
        };

        write!(f, "{} {{", self.short_name())?;
        for (i, field) in fields.iter().enumerate() {
            f.write_str(if i == 0 { " " } else { "; " })?;
            if field.embedded {
                f.write_str("#[embedded] ")?;
            }
            if field.ignored {
                f.write_str("#[ignored] ")?;
            }
            write!(f, "{}: {}", field.name, short_type_name(field.shape().type_name))?;
            if let Some(binding) = field.binding {
                write!(f, " = {:?}", binding)?;
            }
        }
        f.write_str(if fields.is_empty() { "}" } else { " }" })
    }
}

/// One field of a composite destination.
#[derive(Clone)]
pub struct FieldDescriptor {
    /// Declared field name.
    pub name: &'static str,
    /// Explicit column name (or prefix, for embedded fields).
    pub binding: Option<&'static str>,
    /// Fields of the value are promoted into the parent's namespace.
    pub embedded: bool,
    /// The field never receives a value.
    pub ignored: bool,
    shape: fn() -> Shape,
}

impl FieldDescriptor {
    /// Create a descriptor for a field whose type is described by `shape`.
    ///
    /// The shape is produced lazily so that types may refer to themselves
    /// through non-embedded fields. A raw identifier prefix (`r#type`) is
    /// dropped from the name.
    pub fn new(name: &'static str, shape: fn() -> Shape) -> Self {
        Self {
            name: name.strip_prefix("r#").unwrap_or(name),
            binding: None,
            embedded: false,
            ignored: false,
            shape,
        }
    }

    /// Set the explicit column name.
    pub fn with_binding(mut self, binding: &'static str) -> Self {
        self.binding = Some(binding);
        self
    }

    /// Mark the field as embedded.
    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }

    /// Mark the field as ignored.
    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    /// Shape of the field's type.
    pub fn shape(&self) -> Shape {
        (self.shape)()
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("binding", &self.binding)
            .field("embedded", &self.embedded)
            .field("ignored", &self.ignored)
            .finish()
    }
}

/// A type that can receive row data.
///
/// Implemented for std scalars, `Option`, `Box`, maps and `serde_json::Value`
/// in this crate; records implement it through [`bind_struct!`](crate::bind_struct).
/// `Default` provides the value allocated for optional references and mapping
/// entries, `DeserializeOwned` backs fallback decoding.
pub trait Bind: Default + DeserializeOwned + 'static {
    /// Describe this type.
    fn shape() -> Shape;

    /// Store a natively scanned column value.
    fn scan(&mut self, value: &Value) -> Result<(), ScanError> {
        Err(ScanError::mismatch::<Self>(value.kind()))
    }

    /// Field slots of a composite, in the order of its shape's fields.
    fn fields_mut(&mut self) -> Vec<&mut dyn Slot> {
        Vec::new()
    }

    /// Allocate a fresh value for a mapping entry.
    fn entry_value(&self) -> Option<Box<dyn Slot>> {
        None
    }

    /// Insert a mapping entry produced by [`Bind::entry_value`].
    ///
    /// Returns `false` if the key or value has the wrong type.
    fn insert_entry(&mut self, _key: &str, _value: Box<dyn Any>) -> bool {
        false
    }
}

/// Object-safe view of a destination location.
///
/// Blanket-implemented for every [`Bind`] type; cursors receive scan targets
/// as `&mut dyn Slot`.
pub trait Slot: Any + 'static {
    /// Shape of the underlying type.
    fn shape(&self) -> Shape;

    /// Identity of the underlying type.
    fn slot_type_id(&self) -> TypeId;

    /// Store a natively scanned column value.
    fn scan_value(&mut self, value: &Value) -> Result<(), ScanError>;

    /// Replace the value with one deserialized from a document.
    ///
    /// `null` resets optional references to `None`.
    fn decode_document(&mut self, document: serde_json::Value) -> Result<(), serde_json::Error>;

    /// Field slots of a composite; optional references are allocated first.
    fn field_slots(&mut self) -> Vec<&mut dyn Slot>;

    /// Allocate a fresh mapping entry value.
    fn new_entry(&self) -> Option<Box<dyn Slot>>;

    /// Insert a mapping entry.
    fn put_entry(&mut self, key: &str, value: Box<dyn Slot>) -> bool;

    /// Convert into `Any` for downcasting.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Bind> Slot for T {
    fn shape(&self) -> Shape {
        <T as Bind>::shape()
    }

    fn slot_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn scan_value(&mut self, value: &Value) -> Result<(), ScanError> {
        Bind::scan(self, value)
    }

    fn decode_document(&mut self, document: serde_json::Value) -> Result<(), serde_json::Error> {
        *self = serde_json::from_value(document)?;
        Ok(())
    }

    fn field_slots(&mut self) -> Vec<&mut dyn Slot> {
        Bind::fields_mut(self)
    }

    fn new_entry(&self) -> Option<Box<dyn Slot>> {
        Bind::entry_value(self)
    }

    fn put_entry(&mut self, key: &str, value: Box<dyn Slot>) -> bool {
        Bind::insert_entry(self, key, value.into_any())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Mapping key types.
pub trait MapKey: Bind + Eq + std::hash::Hash + Ord {
    /// Build a key from a column name.
    fn from_column(name: &str) -> Option<Self>;
}

/// Strip module paths from a `std::any::type_name` string.
pub(crate) fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();

    for c in full.chars() {
        if c.is_alphanumeric() || c == '_' || c == ':' {
            segment.push(c);
            continue;
        }
        out.push_str(last_path_segment(&segment));
        segment.clear();
        out.push(c);
    }
    out.push_str(last_path_segment(&segment));
    out
}

fn last_path_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("alloc::string::String"), "String");
        assert_eq!(
            short_type_name("std::collections::hash::map::HashMap<i32, serde_json::value::Value>"),
            "HashMap<i32, Value>"
        );
        assert_eq!(
            short_type_name("core::option::Option<alloc::boxed::Box<my_app::Row>>"),
            "Option<Box<Row>>"
        );
        assert_eq!(short_type_name("i64"), "i64");
    }

    #[test]
    fn test_needs_fallback() {
        assert!(!Shape::text::<String>().needs_fallback());
        assert!(!Shape::scalar::<i64>().needs_fallback());
        assert!(Shape::document::<serde_json::Value>().needs_fallback());
        assert!(Shape::composite::<()>(vec![]).needs_fallback());
        assert!(Shape::optional::<Option<()>>(Shape::composite::<()>(vec![])).needs_fallback());
        assert!(!Shape::optional::<Option<String>>(Shape::text::<String>()).needs_fallback());
    }

    #[test]
    fn test_raw_identifier_name() {
        let field = FieldDescriptor::new("r#type", Shape::text::<String>);
        assert_eq!(field.name, "type");
    }

    #[test]
    fn test_composite_display() {
        let shape = Shape::composite::<u8>(vec![
            FieldDescriptor::new("foo", Shape::text::<String>),
            FieldDescriptor::new("bar", Shape::scalar::<i64>).with_binding("foo_column"),
        ]);
        assert_eq!(shape.to_string(), r#"u8 { foo: String; bar: i64 = "foo_column" }"#);
    }
}
