//! Per-row binding strategies.
//!
//! A destination is classified once per scan sequence into a [`Binder`];
//! the binder then fills one row at a time with a single `Rows::scan` call
//! followed by any deferred fallback decoding.

use crate::cache::PlanCache;
use crate::columns::ColumnSet;
use crate::config::ScanConfig;
use crate::decoder::{DecodeError, Discard, FallbackDecoder, RawValue};
use crate::error::Error;
use crate::plan::{BindingPlan, PlanTarget};
use crate::rows::Rows;
use crate::shape::{Shape, ShapeKind, Slot};

/// Binding strategy for one destination kind.
#[derive(Debug, Clone)]
pub(crate) enum Binder {
    /// Record destination, filled through a binding plan.
    Composite(BindingPlan),
    /// Mapping destination, one entry per column.
    Mapping {
        /// Entry values are filled through fallback decoding.
        fallback: bool,
    },
    /// Single-value destination.
    Scalar {
        /// The value is filled through fallback decoding.
        fallback: bool,
    },
}

impl Binder {
    /// Classify a destination and validate it against the column set.
    ///
    /// Only records and mappings held by value get their own strategy; an
    /// optional record or mapping is an opaque value bound like a scalar.
    pub(crate) fn classify(
        shape: &Shape,
        columns: &ColumnSet,
        cache: &PlanCache,
        config: &ScanConfig,
    ) -> Result<Self, Error> {
        match shape.kind() {
            ShapeKind::Composite(_) => Ok(Binder::Composite(
                cache.get_or_build(shape, columns, config)?,
            )),
            ShapeKind::Mapping { key, value } => {
                if !key.is_text() {
                    return Err(Error::InvalidMapKey {
                        destination: shape.short_name(),
                        key: key.short_name(),
                    });
                }
                Ok(Binder::Mapping {
                    fallback: value.needs_fallback(),
                })
            }
            _ => {
                if columns.len() != 1 {
                    return Err(Error::ColumnCount(columns.len()));
                }
                Ok(Binder::Scalar {
                    fallback: shape.needs_fallback(),
                })
            }
        }
    }

    /// Short name of the destination kind, for logging.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Binder::Composite(_) => "composite",
            Binder::Mapping { .. } => "mapping",
            Binder::Scalar { .. } => "scalar",
        }
    }

    /// Fill `dst` from the cursor's current row.
    pub(crate) fn bind_row<R: Rows>(
        &self,
        rows: &mut R,
        columns: &ColumnSet,
        dst: &mut dyn Slot,
        decoder: &dyn FallbackDecoder,
    ) -> Result<(), Error> {
        match self {
            Binder::Composite(plan) => bind_composite(plan, rows, dst, decoder),
            Binder::Mapping { fallback } => bind_mapping(*fallback, rows, columns, dst, decoder),
            Binder::Scalar { fallback } => bind_scalar(*fallback, rows, columns, dst, decoder),
        }
    }
}

fn bind_composite<R: Rows>(
    plan: &BindingPlan,
    rows: &mut R,
    dst: &mut dyn Slot,
    decoder: &dyn FallbackDecoder,
) -> Result<(), Error> {
    let entries = plan.entries();
    let mut raws = vec![RawValue::default(); plan.fallback_count()];
    let mut discards = vec![Discard; entries.len()];

    {
        let mut wanted: Vec<(usize, &[usize])> = entries
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| match &entry.target {
                PlanTarget::Field {
                    path,
                    fallback: false,
                } => Some((i, path.indexes())),
                _ => None,
            })
            .collect();
        wanted.sort_by(|a, b| a.1.cmp(b.1));

        let mut natives: Vec<Option<&mut dyn Slot>> = entries.iter().map(|_| None).collect();
        collect_targets(dst, &wanted, 0, &mut natives, plan.destination())?;

        let mut raw_targets = raws.iter_mut();
        let mut discard_targets = discards.iter_mut();
        let mut targets: Vec<&mut dyn Slot> = Vec::with_capacity(entries.len());
        for (entry, native) in entries.iter().zip(natives) {
            match (native, &entry.target) {
                (Some(slot), _) => targets.push(slot),
                (None, PlanTarget::Field { fallback: true, .. }) => {
                    if let Some(raw) = raw_targets.next() {
                        targets.push(raw);
                    }
                }
                (None, PlanTarget::Discard) => {
                    if let Some(discard) = discard_targets.next() {
                        targets.push(discard);
                    }
                }
                (None, PlanTarget::Field { path, .. }) => {
                    return Err(Error::malformed(
                        plan.destination(),
                        format!("field {} was not reached", path),
                    ))
                }
            }
        }

        rows.scan(&mut targets).map_err(Error::rows)?;
    }

    let mut raws = raws.iter();
    for entry in entries {
        let PlanTarget::Field {
            path,
            fallback: true,
        } = &entry.target
        else {
            continue;
        };
        let Some(raw) = raws.next() else {
            break;
        };
        let slot = slot_at(dst, path.indexes(), plan.destination())?;
        decode_raw(decoder, raw, slot)
            .map_err(|source| Error::Decode {
                column: entry.column.clone(),
                source,
            })?;
    }
    Ok(())
}

/// Distribute the field slots named by `wanted` into `out`.
///
/// `wanted` holds `(entry index, field path)` pairs sorted by path. Every
/// composite on the way is asked for its field slots once, which allocates
/// optional embedded groups that have at least one wanted field.
fn collect_targets<'a>(
    slot: &'a mut dyn Slot,
    wanted: &[(usize, &[usize])],
    depth: usize,
    out: &mut [Option<&'a mut dyn Slot>],
    destination: &str,
) -> Result<(), Error> {
    if let [(entry, path)] = wanted {
        if path.len() == depth {
            out[*entry] = Some(slot);
            return Ok(());
        }
    }
    if wanted.is_empty() {
        return Ok(());
    }

    let mut children: Vec<Option<&'a mut dyn Slot>> =
        slot.field_slots().into_iter().map(Some).collect();

    let mut start = 0;
    while start < wanted.len() {
        let Some(&index) = wanted[start].1.get(depth) else {
            return Err(Error::malformed(destination, "field paths overlap"));
        };
        let len = wanted[start..]
            .iter()
            .take_while(|(_, path)| path.get(depth) == Some(&index))
            .count();
        let child = children
            .get_mut(index)
            .and_then(Option::take)
            .ok_or_else(|| Error::malformed(destination, format!("no field at index {}", index)))?;
        collect_targets(child, &wanted[start..start + len], depth + 1, out, destination)?;
        start += len;
    }
    Ok(())
}

/// Walk down a field path.
fn slot_at<'a>(
    slot: &'a mut dyn Slot,
    path: &[usize],
    destination: &str,
) -> Result<&'a mut dyn Slot, Error> {
    let Some((&index, rest)) = path.split_first() else {
        return Ok(slot);
    };
    let child = slot
        .field_slots()
        .into_iter()
        .nth(index)
        .ok_or_else(|| Error::malformed(destination, format!("no field at index {}", index)))?;
    slot_at(child, rest, destination)
}

fn bind_mapping<R: Rows>(
    fallback: bool,
    rows: &mut R,
    columns: &ColumnSet,
    dst: &mut dyn Slot,
    decoder: &dyn FallbackDecoder,
) -> Result<(), Error> {
    let mut values: Vec<Box<dyn Slot>> = Vec::with_capacity(columns.len());
    for _ in columns.iter() {
        let value = dst.new_entry().ok_or_else(|| {
            Error::malformed(dst.shape().short_name(), "mapping does not allocate entries")
        })?;
        values.push(value);
    }

    if fallback {
        let mut raws = vec![RawValue::default(); columns.len()];
        {
            let mut targets: Vec<&mut dyn Slot> = Vec::with_capacity(raws.len());
            for raw in raws.iter_mut() {
                targets.push(raw);
            }
            rows.scan(&mut targets).map_err(Error::rows)?;
        }
        for ((value, raw), column) in values.iter_mut().zip(&raws).zip(columns.iter()) {
            decode_raw(decoder, raw, &mut **value)
                .map_err(|source| Error::Decode {
                    column: column.to_string(),
                    source,
                })?;
        }
    } else {
        let mut targets: Vec<&mut dyn Slot> = Vec::with_capacity(values.len());
        for value in values.iter_mut() {
            targets.push(&mut **value);
        }
        rows.scan(&mut targets).map_err(Error::rows)?;
    }

    for (column, value) in columns.iter().zip(values) {
        if !dst.put_entry(column, value) {
            return Err(Error::malformed(
                dst.shape().short_name(),
                format!("entry '{}' was rejected", column),
            ));
        }
    }
    Ok(())
}

fn bind_scalar<R: Rows>(
    fallback: bool,
    rows: &mut R,
    columns: &ColumnSet,
    dst: &mut dyn Slot,
    decoder: &dyn FallbackDecoder,
) -> Result<(), Error> {
    if !fallback {
        return rows.scan(&mut [dst]).map_err(Error::rows);
    }

    let mut raw = RawValue::default();
    rows.scan(&mut [&mut raw as &mut dyn Slot])
        .map_err(Error::rows)?;
    decode_raw(decoder, &raw, dst).map_err(|source| Error::Decode {
        column: columns.iter().next().unwrap_or_default().to_string(),
        source,
    })
}

/// Decode a fallback column into `slot`.
///
/// A NULL column resets an optional reference to `None` without consulting
/// the decoder.
fn decode_raw(
    decoder: &dyn FallbackDecoder,
    raw: &RawValue,
    slot: &mut dyn Slot,
) -> Result<(), DecodeError> {
    match raw.bytes() {
        None if slot.shape().is_optional() => {
            slot.decode_document(serde_json::Value::Null)?;
            Ok(())
        }
        bytes => decoder.decode(bytes, slot),
    }
}
