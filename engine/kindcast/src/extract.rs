//! Scalar extraction: read a primitive out of any handle.
//!
//! Every routine follows the same precedence: a capability found while
//! unwrapping indirections, then the exact category match, then the value
//! and pointer receiver capabilities, then a round trip through the string
//! extraction.

use std::sync::Arc;

use chrono::SecondsFormat;
use num_complex::Complex64;
use parking_lot::RwLock;

use crate::capability::{self, Yield};
use crate::config::Config;
use crate::error::{CastError, CastResult};
use crate::format;
use crate::handle::Handle;
use crate::kind::Kind;
use crate::recover;
use crate::resolve;
use crate::types::{ComplexWidth, FloatWidth, IntWidth, Type, UintWidth};
use crate::value::Value;
use crate::wellknown;

pub fn extract_bool(handle: &Handle, cfg: &Config) -> CastResult<bool> {
    let cfg = cfg.clone().normalized();
    recover::guard(&cfg, || bool_of(handle, &cfg))
}

pub fn extract_int(handle: &Handle, cfg: &Config) -> CastResult<i64> {
    let cfg = cfg.clone().normalized();
    recover::guard(&cfg, || int_of(handle, &cfg))
}

pub fn extract_uint(handle: &Handle, cfg: &Config) -> CastResult<u64> {
    let cfg = cfg.clone().normalized();
    recover::guard(&cfg, || uint_of(handle, &cfg))
}

pub fn extract_float(handle: &Handle, cfg: &Config) -> CastResult<f64> {
    let cfg = cfg.clone().normalized();
    recover::guard(&cfg, || float_of(handle, &cfg))
}

pub fn extract_complex(handle: &Handle, cfg: &Config) -> CastResult<Complex64> {
    let cfg = cfg.clone().normalized();
    recover::guard(&cfg, || complex_of(handle, &cfg))
}

pub fn extract_string(handle: &Handle, cfg: &Config) -> CastResult<String> {
    let cfg = cfg.clone().normalized();
    recover::guard(&cfg, || string_of(handle, &cfg))
}

/// Extract the widest value of the handle's scalar category.
pub fn try_extract(handle: &Handle, cfg: &Config) -> CastResult<Value> {
    let cfg = cfg.clone().normalized();
    recover::guard(&cfg, || {
        check_extract_valid(handle)?;
        let resolved = resolve::child_elem(handle);
        match resolved.kind() {
            Kind::Bool => bool_of(&resolved, &cfg).map(Value::Bool),
            Kind::Int => int_of(&resolved, &cfg).map(|v| Value::Int(IntWidth::I64, v)),
            Kind::Uint => uint_of(&resolved, &cfg).map(|v| Value::Uint(UintWidth::U64, v)),
            Kind::Float => float_of(&resolved, &cfg).map(|v| Value::Float(FloatWidth::F64, v)),
            Kind::Complex => {
                complex_of(&resolved, &cfg).map(|v| Value::Complex(ComplexWidth::C128, v))
            }
            Kind::String => string_of(&resolved, &cfg).map(Value::String),
            kind => Err(unimplemented(kind, &resolved)),
        }
    })
}

pub fn get_bool(handle: &Handle, cfg: &Config) -> bool {
    extract_bool(handle, cfg).unwrap_or_default()
}

pub fn get_int(handle: &Handle, cfg: &Config) -> i64 {
    extract_int(handle, cfg).unwrap_or_default()
}

pub fn get_uint(handle: &Handle, cfg: &Config) -> u64 {
    extract_uint(handle, cfg).unwrap_or_default()
}

pub fn get_float(handle: &Handle, cfg: &Config) -> f64 {
    extract_float(handle, cfg).unwrap_or_default()
}

pub fn get_complex(handle: &Handle, cfg: &Config) -> Complex64 {
    extract_complex(handle, cfg).unwrap_or_default()
}

pub fn get_string(handle: &Handle, cfg: &Config) -> String {
    extract_string(handle, cfg).unwrap_or_default()
}

/// Sources must refer to something and be readable.
pub(crate) fn check_extract_valid(handle: &Handle) -> CastResult<()> {
    if !handle.is_valid() {
        return Err(CastError::InvalidValue("source handle refers to nothing".into()));
    }
    if !handle.can_read() {
        return Err(CastError::Unreadable {
            kind: handle.kind(),
            ty: type_name(handle),
        });
    }
    Ok(())
}

pub(crate) fn bool_of(handle: &Handle, cfg: &Config) -> CastResult<bool> {
    extract_with(
        handle,
        cfg,
        Kind::Bool,
        |value| match value {
            Value::Bool(b) => Some(Ok(*b)),
            _ => None,
        },
        |text, _| format::parse_bool(text),
    )
}

pub(crate) fn int_of(handle: &Handle, cfg: &Config) -> CastResult<i64> {
    extract_with(
        handle,
        cfg,
        Kind::Int,
        |value| match value {
            Value::Bool(b) => Some(Ok(i64::from(*b))),
            Value::Int(_, v) => Some(Ok(*v)),
            Value::Uint(width, v) if width.bits() <= 32 => Some(Ok(*v as i64)),
            Value::Duration(d) => Some(
                d.num_nanoseconds()
                    .ok_or_else(|| CastError::overflow("i64", wellknown::format_duration(*d))),
            ),
            _ => None,
        },
        |text, cfg| format::parse_int(text, cfg.base, cfg.bit_size),
    )
}

pub(crate) fn uint_of(handle: &Handle, cfg: &Config) -> CastResult<u64> {
    extract_with(
        handle,
        cfg,
        Kind::Uint,
        |value| match value {
            Value::Bool(b) => Some(Ok(u64::from(*b))),
            Value::Int(_, v) => Some(u64::try_from(*v).map_err(|_| CastError::overflow("u64", v))),
            Value::Uint(_, v) => Some(Ok(*v)),
            Value::Duration(d) => Some(
                d.num_nanoseconds()
                    .and_then(|n| u64::try_from(n).ok())
                    .ok_or_else(|| CastError::overflow("u64", wellknown::format_duration(*d))),
            ),
            _ => None,
        },
        |text, cfg| format::parse_uint(text, cfg.base, cfg.bit_size),
    )
}

pub(crate) fn float_of(handle: &Handle, cfg: &Config) -> CastResult<f64> {
    extract_with(
        handle,
        cfg,
        Kind::Float,
        |value| match value {
            Value::Bool(b) => Some(Ok(if *b { 1.0 } else { 0.0 })),
            Value::Int(width, v) if width.bits() <= 32 => Some(Ok(*v as f64)),
            Value::Uint(width, v) if width.bits() <= 32 => Some(Ok(*v as f64)),
            Value::Float(_, v) => Some(Ok(*v)),
            _ => None,
        },
        |text, cfg| format::parse_float(text, cfg.bit_size),
    )
}

pub(crate) fn complex_of(handle: &Handle, cfg: &Config) -> CastResult<Complex64> {
    extract_with(
        handle,
        cfg,
        Kind::Complex,
        |value| match value {
            Value::Int(width, v) if width.bits() <= 16 => Some(Ok(Complex64::new(*v as f64, 0.0))),
            Value::Uint(width, v) if width.bits() <= 16 => {
                Some(Ok(Complex64::new(*v as f64, 0.0)))
            }
            Value::Float(_, v) => Some(Ok(Complex64::new(*v, 0.0))),
            Value::Complex(_, v) => Some(Ok(*v)),
            _ => None,
        },
        |text, cfg| format::parse_complex(text, cfg.complex_bit_size),
    )
}

pub(crate) fn string_of(handle: &Handle, cfg: &Config) -> CastResult<String> {
    check_extract_valid(handle)?;
    let origin = handle.kind();
    let handle = match reach::<String>(handle) {
        Reached::Yielded(text) => return Ok(text),
        Reached::At(handle) => handle,
    };
    if let Some(result) = handle.with(|value| render(value.underlying(), cfg)).flatten() {
        return result;
    }
    if let Some(text) = probe_receivers::<String>(&handle, origin) {
        return Ok(text);
    }
    Err(unimplemented(Kind::String, &handle))
}

fn render(value: &Value, cfg: &Config) -> Option<CastResult<String>> {
    let text = match value {
        Value::Bool(b) => b.to_string(),
        Value::Int(_, v) => format::format_int(*v, cfg.base),
        Value::Uint(_, v) => format::format_uint(*v, cfg.base),
        Value::Float(width, v) => {
            let bits = match width {
                FloatWidth::F32 => 32,
                FloatWidth::F64 => cfg.bit_size,
            };
            format::format_float(*v, cfg.float_format, cfg.float_precision, bits)
        }
        Value::Complex(width, v) => {
            let bits = match width {
                ComplexWidth::C64 => 64,
                ComplexWidth::C128 => cfg.complex_bit_size,
            };
            format::format_complex(*v, cfg.float_format, cfg.float_precision, bits)
        }
        Value::String(s) => s.clone(),
        Value::Time(t) => t.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        Value::Duration(d) => wellknown::format_duration(*d),
        Value::Url(url) => url.as_ref().map(|u| u.to_string()).unwrap_or_default(),
        Value::Ip(ip) => ip.map(|ip| ip.to_string()).unwrap_or_default(),
        other => {
            if let Some(bytes) = list_bytes(other) {
                return Some(
                    String::from_utf8(bytes).map_err(|err| CastError::parse("string", "bytes", err)),
                );
            }
            return list_runes(other).map(|runes| {
                runes
                    .into_iter()
                    .map(|r| {
                        u32::try_from(r)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or_else(|| CastError::parse("string", &r.to_string(), "invalid character"))
                    })
                    .collect()
            });
        }
    };
    Some(Ok(text))
}

/// Items of a list whose element is the byte unit.
pub(crate) fn list_bytes(value: &Value) -> Option<Vec<u8>> {
    match value.underlying() {
        Value::Array(list) | Value::Slice(list) if list.elem.underlying() == &Type::U8 => list
            .items
            .iter()
            .map(|item| match item.underlying() {
                Value::Uint(_, b) => u8::try_from(*b).ok(),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

/// Items of a list whose element is the 32-bit character unit.
pub(crate) fn list_runes(value: &Value) -> Option<Vec<i64>> {
    match value.underlying() {
        Value::Array(list) | Value::Slice(list) if list.elem.underlying() == &Type::I32 => list
            .items
            .iter()
            .map(|item| item.underlying().as_i64())
            .collect(),
        _ => None,
    }
}

fn extract_with<T, D, P>(
    handle: &Handle,
    cfg: &Config,
    target: Kind,
    direct: D,
    parse: P,
) -> CastResult<T>
where
    T: Yield,
    D: Fn(&Value) -> Option<CastResult<T>>,
    P: Fn(&str, &Config) -> CastResult<T>,
{
    check_extract_valid(handle)?;
    let origin = handle.kind();
    let handle = match reach::<T>(handle) {
        Reached::Yielded(value) => return Ok(value),
        Reached::At(handle) => handle,
    };
    if let Some(result) = handle.with(|value| direct(value.underlying())).flatten() {
        return result;
    }
    if let Some(value) = probe_receivers::<T>(&handle, origin) {
        return Ok(value);
    }
    tracing::trace!(target_kind = %target, source_kind = %handle.kind(), "falling back to string round trip");
    let text = string_of(&handle, cfg).map_err(|err| retarget(err, target))?;
    parse(&text, cfg)
}

enum Reached<T> {
    Yielded(T),
    At(Handle),
}

// Unwrap indirections, probing each level for the capability.
fn reach<T: Yield>(handle: &Handle) -> Reached<T> {
    let mut current = handle.clone();
    let mut visited: Vec<*const RwLock<Value>> = Vec::new();
    while current.kind().is_indirection() {
        if let Some(value) = capability::probe::<T>(&current) {
            return Reached::Yielded(value);
        }
        let Some(next) = resolve::step(&current, false) else {
            break;
        };
        if let Some(cell) = next.shared() {
            let raw = Arc::as_ptr(cell);
            if visited.contains(&raw) {
                break;
            }
            visited.push(raw);
        }
        current = next;
    }
    Reached::At(current)
}

// Pointer receivers of an addressable value win over its value receivers.
fn probe_receivers<T: Yield>(handle: &Handle, origin: Kind) -> Option<T> {
    if origin != Kind::Pointer {
        if let Some(value) = capability::probe_addr::<T>(handle) {
            return Some(value);
        }
    }
    capability::probe::<T>(handle)
}

fn retarget(err: CastError, target: Kind) -> CastError {
    match err {
        CastError::UnimplementedCombination {
            operation,
            value_kind,
            value_ty,
            ..
        } => CastError::UnimplementedCombination {
            operation,
            kind: target,
            value_kind,
            value_ty,
        },
        other => other,
    }
}

fn unimplemented(kind: Kind, source: &Handle) -> CastError {
    CastError::UnimplementedCombination {
        operation: "extraction",
        kind,
        value_kind: source.kind(),
        value_ty: type_name(source),
    }
}

pub(crate) fn type_name(handle: &Handle) -> String {
    handle.ty().map(|ty| ty.name()).unwrap_or_else(|| "invalid".into())
}
