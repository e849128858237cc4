//! Generic assignment: convert a source into the destination's type and
//! store it.
//!
//! Destinations are rebuilt in fresh storage and written back only once the
//! whole conversion has succeeded, so a failed call leaves the destination
//! untouched.

use chrono::TimeDelta;
use std::net::IpAddr;

use crate::config::Config;
use crate::error::{CastError, CastResult};
use crate::extract::{self, check_extract_valid, type_name};
use crate::fanout;
use crate::handle::Handle;
use crate::kind::Kind;
use crate::recover;
use crate::resolve;
use crate::types::{IntWidth, Type, UintWidth};
use crate::value::Value;
use crate::wellknown::{self, WellKnown};

/// Assign `src` into `dest`.
///
/// A settable `dest` is written directly; otherwise it must resolve through
/// pointers to settable storage. Fails with [`CastError::CannotSet`] when no
/// such storage exists.
pub fn assign(dest: &Handle, src: &Handle, cfg: &Config) -> CastResult<()> {
    let cfg = cfg.clone().normalized();
    recover::guard(&cfg, || assign_handles(dest, src, &cfg))
}

/// Convert `value` into a fresh value of type `ty` using the assignment
/// rules.
pub fn convert(value: impl Into<Value>, ty: &Type, cfg: &Config) -> CastResult<Value> {
    let cfg = cfg.clone().normalized();
    let src = Handle::of(value);
    recover::guard(&cfg, || {
        let mut converted = ty.zero();
        assign_value(&mut converted, &src, &cfg)?;
        Ok(converted)
    })
}

fn assign_handles(dest: &Handle, src: &Handle, cfg: &Config) -> CastResult<()> {
    if !dest.is_valid() {
        return Err(CastError::InvalidValue("destination handle refers to nothing".into()));
    }
    let target = resolve::assignment_target(dest);
    if !target.can_set() {
        return Err(CastError::CannotSet);
    }
    let ty = target
        .ty()
        .ok_or_else(|| CastError::InvalidValue("destination resolved to nothing".into()))?;
    let mut fresh = ty.zero();
    assign_value(&mut fresh, src, cfg)?;
    target.set(fresh)
}

/// Assign `src` into an owned destination value, following and allocating
/// destination pointers.
pub(crate) fn assign_value(dst: &mut Value, src: &Handle, cfg: &Config) -> CastResult<()> {
    check_extract_valid(src)?;
    let src = resolve::child_elem(src);
    check_extract_valid(&src)?;
    resolve::with_initialized(dst, |dst| dispatch(dst, &src, cfg))
}

fn dispatch(dst: &mut Value, src: &Handle, cfg: &Config) -> CastResult<()> {
    let dst_ty = dst.ty();
    tracing::trace!(destination = %dst_ty, source_kind = %src.kind(), "assigning");
    match dst_ty.kind() {
        Kind::Bool => {
            let value = extract::bool_of(src, cfg)?;
            if let Value::Bool(slot) = dst.underlying_mut() {
                *slot = value;
            }
            Ok(())
        }
        Kind::Int => assign_int(dst, &dst_ty, src, cfg),
        Kind::Uint => {
            let value = extract::uint_of(src, cfg)?;
            if let Value::Uint(width, slot) = dst.underlying_mut() {
                if width.overflows(value) {
                    return Err(CastError::overflow(&dst_ty, value));
                }
                *slot = value;
            }
            Ok(())
        }
        Kind::Float => {
            let value = extract::float_of(src, cfg)?;
            if let Value::Float(width, slot) = dst.underlying_mut() {
                if width.overflows(value) {
                    return Err(CastError::overflow(&dst_ty, value));
                }
                *slot = width.narrow(value);
            }
            Ok(())
        }
        Kind::Complex => {
            let value = extract::complex_of(src, cfg)?;
            if let Value::Complex(width, slot) = dst.underlying_mut() {
                if width.overflows(value) {
                    return Err(CastError::overflow(&dst_ty, value));
                }
                *slot = width.narrow(value);
            }
            Ok(())
        }
        Kind::String => {
            let value = extract::string_of(src, cfg)?;
            if let Value::String(slot) = dst.underlying_mut() {
                *slot = value;
            }
            Ok(())
        }
        Kind::Interface => {
            assign_default(dst, &dst_ty, src);
            Ok(())
        }
        Kind::Array | Kind::Slice => assign_list(dst, &dst_ty, src, cfg),
        Kind::Map => {
            if assign_default(dst, &dst_ty, src) {
                return Ok(());
            }
            assign_structure(dst, &dst_ty, src, cfg)
        }
        Kind::Record => {
            if assign_default(dst, &dst_ty, src) {
                return Ok(());
            }
            match WellKnown::of(&dst_ty) {
                Some(WellKnown::Time) => {
                    *dst = Value::Time(wellknown::time_of(src, cfg)?);
                    Ok(())
                }
                Some(WellKnown::Url) => {
                    *dst = Value::Url(Some(wellknown::url_of(src, cfg)?));
                    Ok(())
                }
                _ => assign_structure(dst, &dst_ty, src, cfg),
            }
        }
        Kind::Chan | Kind::Func => {
            if assign_default(dst, &dst_ty, src) {
                return Ok(());
            }
            Err(CastError::Unassignable {
                kind: dst_ty.kind(),
                value_kind: src.kind(),
                value_ty: type_name(src),
            })
        }
        Kind::Pointer | Kind::Invalid => Err(unimplemented(&dst_ty, src)),
    }
}

fn assign_int(dst: &mut Value, dst_ty: &Type, src: &Handle, cfg: &Config) -> CastResult<()> {
    if dst_ty.underlying() == &Type::Duration {
        let duration = wellknown::duration_of(src, cfg)?;
        if let Value::Duration(slot) = dst.underlying_mut() {
            *slot = duration;
        }
        return Ok(());
    }
    let value = extract::int_of(src, cfg)?;
    match dst.underlying_mut() {
        Value::Int(width, slot) => {
            if width.overflows(value) {
                return Err(CastError::overflow(dst_ty, value));
            }
            *slot = value;
        }
        Value::Duration(slot) => *slot = TimeDelta::nanoseconds(value),
        _ => {}
    }
    Ok(())
}

/// Store `src` wholesale when its type is assignable to the destination.
fn assign_default(dst: &mut Value, dst_ty: &Type, src: &Handle) -> bool {
    let Some(src_ty) = src.ty() else {
        return false;
    };
    if !src_ty.assignable_to(dst_ty) {
        return false;
    }
    match src.get() {
        Some(value) => {
            *dst = value.convert_to(dst_ty);
            true
        }
        None => false,
    }
}

fn assign_list(dst: &mut Value, dst_ty: &Type, src: &Handle, cfg: &Config) -> CastResult<()> {
    if assign_default(dst, dst_ty, src) {
        return Ok(());
    }
    if WellKnown::of(dst_ty) == Some(WellKnown::Ip) {
        *dst = Value::Ip(Some(wellknown::ip_of(src, cfg)?));
        return Ok(());
    }
    let sources = match src.kind() {
        Kind::Array | Kind::Slice => list_items(src),
        Kind::String => string_units(dst_ty, src, cfg)?,
        Kind::Chan => drain(src, cfg),
        _ => return Err(unimplemented(dst_ty, src)),
    };
    rebuild_list(dst, dst_ty, src, &sources, cfg)
}

// Element handles of a list source. Slice elements are always addressable,
// array elements when the array is.
fn list_items(src: &Handle) -> Vec<Handle> {
    let addressable = src.kind() == Kind::Slice || src.can_addr();
    let items = src
        .with(|value| match value.underlying() {
            Value::Array(list) | Value::Slice(list) => list.items.clone(),
            Value::Ip(Some(IpAddr::V4(ip))) => ip.octets().map(Value::from).to_vec(),
            Value::Ip(Some(IpAddr::V6(ip))) => ip.octets().map(Value::from).to_vec(),
            _ => Vec::new(),
        })
        .unwrap_or_default();
    items
        .into_iter()
        .map(|item| Handle::detached(item, addressable, true))
        .collect()
}

fn string_units(dst_ty: &Type, src: &Handle, cfg: &Config) -> CastResult<Vec<Handle>> {
    let text = extract::string_of(src, cfg)?;
    if dst_ty.is_byte_list() {
        return Ok(text
            .bytes()
            .map(|b| Handle::of(Value::Uint(UintWidth::U8, u64::from(b))))
            .collect());
    }
    if dst_ty.is_rune_list() {
        return Ok(text
            .chars()
            .map(|ch| Handle::of(Value::Int(IntWidth::I32, i64::from(u32::from(ch)))))
            .collect());
    }
    Err(unimplemented(dst_ty, src))
}

fn drain(src: &Handle, cfg: &Config) -> Vec<Handle> {
    let endpoint = src
        .with(|value| match value.underlying() {
            Value::Chan(chan) => chan.endpoint.clone(),
            _ => None,
        })
        .flatten();
    let Some(channel) = endpoint else {
        return Vec::new();
    };
    let mut received = Vec::new();
    loop {
        let next = if cfg.block_channel {
            channel.recv()
        } else {
            channel.try_recv()
        };
        match next {
            Some(value) => received.push(Handle::of(value)),
            None => break,
        }
    }
    tracing::debug!(count = received.len(), blocking = cfg.block_channel, "drained channel");
    received
}

/// Fill a fresh list of the destination's length from `sources` and swap it
/// in. Fixed-length destinations keep their length and zero any trailing
/// elements; growable destinations take the source length.
fn rebuild_list(
    dst: &mut Value,
    dst_ty: &Type,
    src: &Handle,
    sources: &[Handle],
    cfg: &Config,
) -> CastResult<()> {
    let fixed = dst_ty.kind() == Kind::Array;
    let list = match dst.underlying_mut() {
        Value::Array(list) | Value::Slice(list) => list,
        _ => return Err(unimplemented(dst_ty, src)),
    };
    let len = if fixed { list.items.len() } else { sources.len() };
    if sources.len() > len {
        return Err(CastError::LengthExceeded {
            assigner_ty: dst_ty.name(),
            assigner_len: len,
            value_ty: type_name(src),
            value_len: sources.len(),
        });
    }
    let mut fresh: Vec<Value> = (0..len).map(|_| list.elem.zero()).collect();
    fanout::run(&mut fresh[..sources.len()], sources, cfg, |slot, source| {
        assign_value(slot, source, cfg)
    })?;
    list.items = fresh;
    Ok(())
}

fn assign_structure(dst: &mut Value, dst_ty: &Type, src: &Handle, cfg: &Config) -> CastResult<()> {
    match src.kind() {
        Kind::Map | Kind::Record => {
            tracing::debug!(destination = %dst_ty, source = %type_name(src), "delegating to structural decoder");
            cfg.decoder().decode(dst, src, cfg)
        }
        _ => Err(unimplemented(dst_ty, src)),
    }
}

fn unimplemented(dst_ty: &Type, src: &Handle) -> CastError {
    CastError::UnimplementedCombination {
        operation: "assignment",
        kind: dst_ty.kind(),
        value_kind: src.kind(),
        value_ty: type_name(src),
    }
}
