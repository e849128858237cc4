//! Structural decoding of maps and records into maps and records.

use crate::assign::assign_value;
use crate::config::Config;
use crate::error::{CastError, CastResult};
use crate::extract;
use crate::fanout;
use crate::handle::Handle;
use crate::value::{MapValue, Record, Value};

/// Decodes a map or record source into a map or record destination.
///
/// Assignment delegates here whenever both sides are structural and the
/// source type is not directly assignable. Install a custom decoder with
/// [`Config::with_decoder`].
pub trait StructuralDecoder: Send + Sync {
    fn decode(&self, dst: &mut Value, src: &Handle, cfg: &Config) -> CastResult<()>;
}

/// The built-in decoder.
///
/// Record fields are matched by exact name first, then case-insensitively.
/// Unexported fields are neither read nor written. A map entry whose key or
/// value does not convert fails the decode, or is left out when the
/// configuration ignores errors.
#[derive(Clone, Copy, Debug, Default)]
pub struct FieldDecoder;

impl StructuralDecoder for FieldDecoder {
    fn decode(&self, dst: &mut Value, src: &Handle, cfg: &Config) -> CastResult<()> {
        let entries = source_entries(src)?;
        match dst.underlying_mut() {
            Value::Map(map) => decode_map(map, &entries, cfg),
            Value::Record(record) => decode_record(record, &entries, cfg),
            other => Err(CastError::Decode(format!(
                "destination must be a map or record, found {}",
                other.kind()
            ))),
        }
    }
}

fn source_entries(src: &Handle) -> CastResult<Vec<(Handle, Handle)>> {
    let addressable = src.can_addr();
    let value = src
        .get()
        .ok_or_else(|| CastError::Decode("source refers to nothing".into()))?;
    match value.into_underlying() {
        Value::Map(map) => Ok(map
            .entries
            .into_iter()
            .map(|(key, value)| (Handle::of(key), Handle::of(value)))
            .collect()),
        Value::Record(record) => Ok(record
            .ty
            .fields()
            .iter()
            .zip(record.fields)
            .filter(|(def, _)| def.exported)
            .map(|(def, value)| {
                (
                    Handle::of(def.name.clone()),
                    Handle::detached(value, addressable, true),
                )
            })
            .collect()),
        other => Err(CastError::Decode(format!(
            "source must be a map or record, found {}",
            other.kind()
        ))),
    }
}

fn decode_map(map: &mut MapValue, entries: &[(Handle, Handle)], cfg: &Config) -> CastResult<()> {
    let key_ty = map.key.clone();
    let elem_ty = map.elem.clone();
    let mut decoded: Vec<Option<(Value, Value)>> = vec![None; entries.len()];
    fanout::run(&mut decoded, entries, cfg, |slot, (key, value)| {
        let mut k = key_ty.zero();
        let mut v = elem_ty.zero();
        assign_value(&mut k, key, cfg)
            .and_then(|()| assign_value(&mut v, value, cfg))
            .inspect_err(|err| tracing::debug!(error = %err, "map entry failed to convert"))?;
        *slot = Some((k, v));
        Ok(())
    })?;
    for (key, value) in decoded.into_iter().flatten() {
        map.insert(key, value);
    }
    Ok(())
}

fn decode_record(record: &mut Record, entries: &[(Handle, Handle)], cfg: &Config) -> CastResult<()> {
    let names: Vec<Option<String>> = entries
        .iter()
        .map(|(key, _)| extract::string_of(key, cfg).ok())
        .collect();
    let ty = record.ty.clone();
    let mut targets: Vec<(usize, Value)> = Vec::new();
    let mut sources: Vec<Handle> = Vec::new();
    for (idx, def) in ty.fields().iter().enumerate() {
        if !def.exported {
            continue;
        }
        let found = names
            .iter()
            .position(|name| name.as_deref() == Some(def.name.as_str()))
            .or_else(|| {
                let wanted = def.name.to_lowercase();
                names
                    .iter()
                    .position(|name| name.as_deref().is_some_and(|n| n.to_lowercase() == wanted))
            });
        if let Some((_, source)) = found.and_then(|pos| entries.get(pos)) {
            targets.push((idx, def.ty.zero()));
            sources.push(source.clone());
        }
    }
    tracing::trace!(record = ty.name(), matched = targets.len(), "decoding record fields");
    fanout::run(&mut targets, &sources, cfg, |(idx, slot), source| {
        assign_value(slot, source, cfg).inspect_err(|err| {
            if let Some(def) = ty.fields().get(*idx) {
                tracing::debug!(field = %def.name, error = %err, "field assignment failed");
            }
        })
    })?;
    for (idx, value) in targets {
        if let Some(field) = record.fields.get_mut(idx) {
            *field = value;
        }
    }
    Ok(())
}
