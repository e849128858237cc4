//! Unwrapping of pointer and interface indirections.
//!
//! The plain resolvers never mutate. The `init_` variants allocate a zero
//! pointee when they meet a settable null pointer, so that the resolved
//! handle is always writable storage.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::CastResult;
use crate::handle::Handle;
use crate::kind::Kind;
use crate::value::{Shared, Value};

/// One step below the handle: the pointee of a bound pointer or the held
/// value of a bound interface. Anything else resolves to itself.
pub fn elem(handle: &Handle) -> Handle {
    step(handle, false).unwrap_or_else(|| handle.clone())
}

/// Follow pointers and interfaces until a non-indirection (or a nil one) is
/// reached.
pub fn child_elem(handle: &Handle) -> Handle {
    descend(handle, false, false)
}

/// Like [`elem`], allocating the pointee of a settable null pointer.
pub fn init_elem(handle: &Handle) -> Handle {
    step(handle, true).unwrap_or_else(|| handle.clone())
}

/// Like [`child_elem`], allocating every settable null pointer on the way.
pub fn init_child_elem(handle: &Handle) -> Handle {
    descend(handle, true, false)
}

/// Like [`elem`], but only pointers are unwrapped.
pub fn indirect(handle: &Handle) -> Handle {
    if handle.kind() != Kind::Pointer {
        return handle.clone();
    }
    elem(handle)
}

/// Follow pointers only; interfaces are left in place.
pub fn child_indirect(handle: &Handle) -> Handle {
    descend(handle, false, true)
}

pub fn init_indirect(handle: &Handle) -> Handle {
    if handle.kind() != Kind::Pointer {
        return handle.clone();
    }
    init_elem(handle)
}

pub fn init_child_indirect(handle: &Handle) -> Handle {
    descend(handle, true, true)
}

/// Unwrap interfaces only.
pub fn unwrap_interface(handle: &Handle) -> Handle {
    let mut current = handle.clone();
    while current.kind() == Kind::Interface {
        match step(&current, false) {
            Some(next) => current = next,
            None => break,
        }
    }
    current
}

fn descend(handle: &Handle, init: bool, pointers_only: bool) -> Handle {
    let mut current = handle.clone();
    let mut visited: Vec<*const RwLock<Value>> = Vec::new();
    loop {
        let kind = current.kind();
        if !kind.is_indirection() || (pointers_only && kind != Kind::Pointer) {
            return current;
        }
        let Some(next) = step(&current, init) else {
            return current;
        };
        if let Some(cell) = next.shared() {
            let raw = Arc::as_ptr(cell);
            if visited.contains(&raw) {
                return next;
            }
            visited.push(raw);
        }
        current = next;
    }
}

pub(crate) fn step(handle: &Handle, init: bool) -> Option<Handle> {
    let inner = handle.with(|value| match value.underlying() {
        Value::Pointer(ptr) => Some(Step::Pointer(ptr.target.clone())),
        Value::Interface(Some(inner)) => Some(Step::Held((**inner).clone())),
        _ => None,
    })??;
    match inner {
        Step::Pointer(Some(cell)) => Some(Handle::from_shared(cell)),
        Step::Pointer(None) if init && handle.can_set() => allocate(handle),
        Step::Pointer(None) => None,
        Step::Held(value) => Some(Handle::detached(value, false, true)),
    }
}

enum Step {
    Pointer(Option<Shared>),
    Held(Value),
}

fn allocate(handle: &Handle) -> Option<Handle> {
    let slot = handle.shared()?;
    let mut guard = slot.write();
    let Value::Pointer(ptr) = guard.underlying_mut() else {
        return None;
    };
    if let Some(existing) = &ptr.target {
        return Some(Handle::from_shared(existing.clone()));
    }
    let cell = Arc::new(RwLock::new(ptr.elem.zero()));
    tracing::trace!(elem = %ptr.elem, "allocating pointee for null pointer");
    ptr.target = Some(cell.clone());
    Some(Handle::from_shared(cell))
}

/// Owned-tree counterpart of [`init_child_indirect`]: descend through
/// pointers in `dst`, giving every level a fresh zero pointee, and run `f`
/// on the innermost value. Pointees are attached only after `f` has run.
pub(crate) fn with_initialized<R, F>(dst: &mut Value, f: F) -> CastResult<R>
where
    F: FnOnce(&mut Value) -> CastResult<R>,
{
    if let Value::Pointer(ptr) = dst.underlying_mut() {
        let mut inner = ptr.elem.zero();
        let out = with_initialized(&mut inner, f)?;
        ptr.target = Some(Arc::new(RwLock::new(inner)));
        return Ok(out);
    }
    f(dst)
}

/// Storage an assignment writes into: bound pointers are followed (null
/// pointers in settable slots are allocated), and an interface is entered
/// only when it holds a pointer.
pub(crate) fn assignment_target(handle: &Handle) -> Handle {
    let mut current = handle.clone();
    let mut visited: Vec<*const RwLock<Value>> = Vec::new();
    loop {
        let next = match current.kind() {
            Kind::Pointer => step(&current, true),
            Kind::Interface => step(&current, false).filter(|inner| inner.kind() == Kind::Pointer),
            _ => None,
        };
        let Some(next) = next else {
            return current;
        };
        if let Some(cell) = next.shared() {
            let raw = Arc::as_ptr(cell);
            if visited.contains(&raw) {
                return next;
            }
            visited.push(raw);
        }
        current = next;
    }
}
