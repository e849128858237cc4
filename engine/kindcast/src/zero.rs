//! Zero-value checks.

use std::net::IpAddr;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{CastError, CastResult};
use crate::handle::Handle;
use crate::kind::Kind;
use crate::value::Value;
use crate::wellknown;

type Visited = Vec<*const RwLock<Value>>;

/// Whether the handle holds its type's zero value.
///
/// Invalid handles are zero. A [`Zeroable`](crate::capability::Zeroable)
/// capability on the value's type takes precedence over the structural
/// rule. Floats and complex numbers are zero only when every bit is zero,
/// so negative zero is not.
pub fn is_zero(handle: &Handle) -> bool {
    let addressable = handle.can_addr();
    handle
        .with(|value| zero_check(value, addressable, &mut Visited::new()))
        .unwrap_or(true)
}

pub fn is_zero_value(value: &Value) -> bool {
    zero_check(value, false, &mut Visited::new())
}

/// Like [`is_zero`], but a bound pointer counts as non-zero without looking
/// at its target.
pub fn is_ptr_zero(handle: &Handle) -> bool {
    if handle.kind() == Kind::Pointer {
        return handle.with(Value::is_nil).unwrap_or(true);
    }
    is_zero(handle)
}

/// Structural equality with the zero value of the handle's type. Unlike
/// [`is_zero`] no capability is consulted.
pub fn is_type_zero(handle: &Handle) -> bool {
    handle
        .with(|value| *value == value.ty().zero())
        .unwrap_or(true)
}

/// Overwrite a settable handle with its type's zero value.
pub fn set_zero(handle: &Handle) -> CastResult<()> {
    let ty = handle
        .ty()
        .ok_or_else(|| CastError::InvalidValue("cannot zero an invalid handle".into()))?;
    handle.set(ty.zero())
}

fn zero_check(value: &Value, addressable: bool, visited: &mut Visited) -> bool {
    if let Some(verdict) = custom_zero(value, addressable) {
        return verdict;
    }
    match value {
        Value::Bool(b) => !*b,
        Value::Int(_, v) => *v == 0,
        Value::Uint(_, v) => *v == 0,
        Value::Float(_, v) => v.to_bits() == 0,
        Value::Complex(_, c) => c.re.to_bits() == 0 && c.im.to_bits() == 0,
        Value::String(s) => s.is_empty(),
        Value::Pointer(ptr) => match &ptr.target {
            None => true,
            Some(cell) => {
                // Only the current path counts; a loop back onto it adds nothing.
                let raw = Arc::as_ptr(cell);
                if visited.contains(&raw) {
                    return true;
                }
                visited.push(raw);
                let pointee = cell.read_recursive();
                let verdict = zero_check(&pointee, true, visited);
                visited.pop();
                verdict
            }
        },
        Value::Interface(None) => true,
        Value::Interface(Some(inner)) => zero_check(inner, false, visited),
        Value::Array(list) => list
            .items
            .iter()
            .all(|item| zero_check(item, addressable, visited)),
        Value::Slice(list) => list.items.iter().all(|item| zero_check(item, true, visited)),
        Value::Map(map) => map.entries.is_empty(),
        Value::Record(record) => record
            .ty
            .fields()
            .iter()
            .zip(&record.fields)
            .filter(|(def, _)| def.exported)
            .all(|(_, field)| zero_check(field, addressable, visited)),
        Value::Chan(chan) => chan.endpoint.is_none(),
        Value::Func(func) => func.body.is_none(),
        Value::Named(_, inner) => zero_check(inner, addressable, visited),
        Value::Time(time) => wellknown::is_time_zero(time),
        Value::Duration(duration) => duration.is_zero(),
        Value::Url(url) => url.is_none(),
        Value::Ip(None) => true,
        Value::Ip(Some(IpAddr::V4(ip))) => ip.octets().iter().all(|b| *b == 0),
        Value::Ip(Some(IpAddr::V6(ip))) => ip.octets().iter().all(|b| *b == 0),
    }
}

fn custom_zero(value: &Value, addressable: bool) -> Option<bool> {
    let ty = value.ty();
    if let Some((methods, pointer_methods)) = ty.method_sets() {
        if let Some(method) = methods.zero_method() {
            return Some(method.is_zero(value));
        }
        if addressable {
            if let Some(method) = pointer_methods.zero_method() {
                return Some(method.is_zero(value));
            }
        }
        return None;
    }
    let Value::Pointer(ptr) = value.underlying() else {
        return None;
    };
    let (methods, pointer_methods) = ptr.elem.method_sets()?;
    let method = methods.zero_method().or_else(|| pointer_methods.zero_method())?;
    let pointee = ptr.load()?;
    Some(method.is_zero(&pointee))
}
