//! Fallback decoding for values that cannot be scanned natively.
//!
//! Columns bound to composite, mapping or document destinations are first
//! scanned into a transient [`RawValue`]; after the row's native scan the raw
//! bytes are handed to a [`FallbackDecoder`] together with the destination.

use rowscan_proto::{Error as ScanError, Value};
use serde::Deserialize;
use thiserror::Error;

use crate::shape::{Bind, Shape, Slot};

/// Errors raised by a fallback decoder.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The raw value is not a valid document for the destination.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// Decoder-specific failure.
    #[error("{0}")]
    Other(String),
}

/// Decodes raw column bytes into a destination slot.
pub trait FallbackDecoder: Send + Sync {
    /// Decode `raw` into `dst`.
    ///
    /// `None` stands for a NULL column. NULLs headed for optional references
    /// are handled by the binder and never reach the decoder.
    fn decode(&self, raw: Option<&[u8]>, dst: &mut dyn Slot) -> Result<(), DecodeError>;
}

/// Default decoder: raw bytes are JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl FallbackDecoder for JsonDecoder {
    fn decode(&self, raw: Option<&[u8]>, dst: &mut dyn Slot) -> Result<(), DecodeError> {
        let document = match raw {
            Some(bytes) => serde_json::from_slice(bytes)?,
            None => serde_json::Value::Null,
        };
        dst.decode_document(document)?;
        Ok(())
    }
}

/// Transient scan target holding a column's raw bytes.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawValue(Option<Vec<u8>>);

impl RawValue {
    /// Raw bytes, `None` for NULL.
    pub fn bytes(&self) -> Option<&[u8]> {
        self.0.as_deref()
    }
}

impl Bind for RawValue {
    fn shape() -> Shape {
        Shape::scalar::<Self>()
    }

    /// Text and bytes are kept as-is; other values are rendered as JSON.
    fn scan(&mut self, value: &Value) -> Result<(), ScanError> {
        self.0 = match value {
            Value::Null => None,
            Value::String(s) | Value::Json(s) => Some(s.as_bytes().to_vec()),
            Value::Bytes(b) => Some(b.clone()),
            other => Some(serde_json::to_vec(&other.to_json()?)?),
        };
        Ok(())
    }
}

/// Scan target that drops whatever it receives.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Discard;

impl Bind for Discard {
    fn shape() -> Shape {
        Shape::scalar::<Self>()
    }

    fn scan(&mut self, _value: &Value) -> Result<(), ScanError> {
        Ok(())
    }
}
