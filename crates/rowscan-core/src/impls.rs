//! [`Bind`] implementations for std and `serde_json` types.

use std::any::{type_name, Any};
use std::collections::{BTreeMap, HashMap};

use rowscan_proto::{Error as ScanError, Value};

use crate::shape::{Bind, MapKey, Shape, Slot};

/// Implement [`Bind`] for a natively scannable type.
///
/// `$convert` maps the column value to `Result<Self, ScanError>`.
macro_rules! impl_native {
    ($ty:ty, $kind:ident, |$value:ident| $convert:expr) => {
        impl Bind for $ty {
            fn shape() -> Shape {
                Shape::$kind::<Self>()
            }

            fn scan(&mut self, $value: &Value) -> Result<(), ScanError> {
                *self = $convert?;
                Ok(())
            }
        }
    };
}

impl_native!(String, text, |value| match value {
    Value::String(s) | Value::Json(s) => Ok(s.clone()),
    Value::Bytes(b) => String::from_utf8(b.clone()).map_err(ScanError::from),
    Value::Bool(b) => Ok(b.to_string()),
    Value::Int32(i) => Ok(i.to_string()),
    Value::Int64(i) => Ok(i.to_string()),
    Value::Float32(f) => Ok(f.to_string()),
    Value::Float64(f) => Ok(f.to_string()),
    other => Err(ScanError::mismatch::<String>(other.kind())),
});

impl_native!(bool, scalar, |value| value
    .as_bool()
    .ok_or_else(|| ScanError::mismatch::<bool>(value.kind())));

impl_native!(i32, scalar, |value| scan_integer::<i32>(value));
impl_native!(i64, scalar, |value| scan_integer::<i64>(value));
impl_native!(u32, scalar, |value| scan_integer::<u32>(value));
impl_native!(u64, scalar, |value| scan_integer::<u64>(value));

impl_native!(f64, scalar, |value| value
    .as_f64()
    .or_else(|| value.as_i64().map(|i| i as f64))
    .ok_or_else(|| ScanError::mismatch::<f64>(value.kind())));

impl_native!(f32, scalar, |value| match value {
    Value::Float32(f) => Ok(*f),
    Value::Float64(f) => Ok(*f as f32),
    Value::Int32(i) => Ok(*i as f32),
    other => Err(ScanError::mismatch::<f32>(other.kind())),
});

impl_native!(Vec<u8>, scalar, |value| match value {
    Value::Bytes(b) => Ok(b.clone()),
    Value::String(s) | Value::Json(s) => Ok(s.as_bytes().to_vec()),
    other => Err(ScanError::mismatch::<Vec<u8>>(other.kind())),
});

impl_native!(Vec<String>, scalar, |value| match value {
    Value::StringArray(v) => Ok(v.clone()),
    other => Err(ScanError::mismatch::<Vec<String>>(other.kind())),
});

impl_native!(Vec<bool>, scalar, |value| match value {
    Value::BoolArray(v) => Ok(v.clone()),
    other => Err(ScanError::mismatch::<Vec<bool>>(other.kind())),
});

impl_native!(Vec<i32>, scalar, |value| match value {
    Value::Int32Array(v) => Ok(v.clone()),
    other => Err(ScanError::mismatch::<Vec<i32>>(other.kind())),
});

impl_native!(Vec<i64>, scalar, |value| match value {
    Value::Int64Array(v) => Ok(v.clone()),
    Value::Int32Array(v) => Ok(v.iter().map(|&i| i as i64).collect()),
    other => Err(ScanError::mismatch::<Vec<i64>>(other.kind())),
});

impl_native!(Vec<f64>, scalar, |value| match value {
    Value::Float64Array(v) => Ok(v.clone()),
    other => Err(ScanError::mismatch::<Vec<f64>>(other.kind())),
});

// Accepts any column, like an untyped destination.
impl_native!(serde_json::Value, scalar, |value| value.to_json());

impl_native!(Value, scalar, |value| Ok::<_, ScanError>(value.clone()));

fn scan_integer<T: TryFrom<i64>>(value: &Value) -> Result<T, ScanError> {
    let i = value
        .as_i64()
        .ok_or_else(|| ScanError::mismatch::<T>(value.kind()))?;
    T::try_from(i).map_err(|_| ScanError::OutOfRange {
        value: i.to_string(),
        target: type_name::<T>(),
    })
}

impl<T: Bind> Bind for Option<T> {
    fn shape() -> Shape {
        Shape::optional::<Self>(<T as Bind>::shape())
    }

    fn scan(&mut self, value: &Value) -> Result<(), ScanError> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        let mut inner = T::default();
        Bind::scan(&mut inner, value)?;
        *self = Some(inner);
        Ok(())
    }

    fn fields_mut(&mut self) -> Vec<&mut dyn Slot> {
        Bind::fields_mut(self.get_or_insert_with(T::default))
    }
}

// Boxes are transparent: they bind exactly like the boxed type.
impl<T: Bind> Bind for Box<T> {
    fn shape() -> Shape {
        <T as Bind>::shape()
    }

    fn scan(&mut self, value: &Value) -> Result<(), ScanError> {
        Bind::scan(&mut **self, value)
    }

    fn fields_mut(&mut self) -> Vec<&mut dyn Slot> {
        Bind::fields_mut(&mut **self)
    }

    fn entry_value(&self) -> Option<Box<dyn Slot>> {
        Bind::entry_value(&**self)
    }

    fn insert_entry(&mut self, key: &str, value: Box<dyn Any>) -> bool {
        Bind::insert_entry(&mut **self, key, value)
    }
}

macro_rules! impl_mapping {
    ($map:ident) => {
        impl<K: MapKey, V: Bind> Bind for $map<K, V> {
            fn shape() -> Shape {
                Shape::mapping::<Self>(<K as Bind>::shape(), <V as Bind>::shape())
            }

            fn entry_value(&self) -> Option<Box<dyn Slot>> {
                Some(Box::new(V::default()))
            }

            fn insert_entry(&mut self, key: &str, value: Box<dyn Any>) -> bool {
                match (K::from_column(key), value.downcast::<V>()) {
                    (Some(key), Ok(value)) => {
                        self.insert(key, *value);
                        true
                    }
                    _ => false,
                }
            }
        }
    };
}

impl_mapping!(HashMap);
impl_mapping!(BTreeMap);

impl MapKey for String {
    fn from_column(name: &str) -> Option<Self> {
        Some(name.to_string())
    }
}

impl MapKey for i32 {
    fn from_column(name: &str) -> Option<Self> {
        name.parse().ok()
    }
}

impl MapKey for i64 {
    fn from_column(name: &str) -> Option<Self> {
        name.parse().ok()
    }
}

impl MapKey for bool {
    fn from_column(name: &str) -> Option<Self> {
        name.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ShapeKind;

    #[test]
    fn test_string_scan() {
        let mut s = String::new();
        Bind::scan(&mut s, &Value::String("foo val".into())).unwrap();
        assert_eq!(s, "foo val");

        Bind::scan(&mut s, &Value::Int64(12)).unwrap();
        assert_eq!(s, "12");

        let err = Bind::scan(&mut s, &Value::Null).unwrap_err();
        assert_eq!(err.to_string(), "cannot scan null value into alloc::string::String");
    }

    #[test]
    fn test_integer_range() {
        let mut small = 0i32;
        Bind::scan(&mut small, &Value::Int64(7)).unwrap();
        assert_eq!(small, 7);

        let err = Bind::scan(&mut small, &Value::Int64(i64::MAX)).unwrap_err();
        assert!(matches!(err, ScanError::OutOfRange { .. }));

        let mut unsigned = 0u64;
        assert!(Bind::scan(&mut unsigned, &Value::Int32(-1)).is_err());
    }

    #[test]
    fn test_option_scan() {
        let mut dst: Option<String> = Some("stale".into());
        Bind::scan(&mut dst, &Value::Null).unwrap();
        assert_eq!(dst, None);

        Bind::scan(&mut dst, &Value::String("foo val".into())).unwrap();
        assert_eq!(dst.as_deref(), Some("foo val"));
    }

    #[test]
    fn test_json_value_scan() {
        let mut dst = serde_json::Value::Null;
        Bind::scan(&mut dst, &Value::Json(r#"{"key": "key val"}"#.into())).unwrap();
        assert_eq!(dst, serde_json::json!({"key": "key val"}));
    }

    #[test]
    fn test_mapping_entries() {
        let mut map: HashMap<String, i64> = HashMap::new();
        let mut entry = Slot::new_entry(&map).unwrap();
        entry.scan_value(&Value::Int64(3)).unwrap();
        assert!(Slot::put_entry(&mut map, "n", entry));
        assert_eq!(map.get("n"), Some(&3));

        // Wrong value type is rejected.
        assert!(!Slot::put_entry(&mut map, "m", Box::new(String::new())));
    }

    #[test]
    fn test_shapes() {
        assert!(<String as Bind>::shape().is_text());
        assert!(matches!(<i64 as Bind>::shape().kind(), ShapeKind::Scalar));
        assert!(<Option<i64> as Bind>::shape().is_optional());
        assert!(matches!(
            <HashMap<i32, String> as Bind>::shape().kind(),
            ShapeKind::Mapping { key, .. } if !key.is_text()
        ));
        assert_eq!(
            <Box<String> as Bind>::shape().type_id(),
            std::any::TypeId::of::<String>()
        );
    }
}
