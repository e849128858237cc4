//! Structural deep copies.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::handle::Handle;
use crate::value::{List, MapValue, Pointer, Record, Shared, Value};

/// Copy the value behind `handle` into new storage.
///
/// Every pointer target reachable from the value is copied once; pointers
/// that shared a target in the source share the copied target, so cyclic
/// graphs terminate. Channels and functions are shared with the source.
/// Non-exported record fields are zero in the copy.
///
/// A settable handle yields a new slot, anything else a read-only handle.
/// An invalid handle yields an invalid handle.
pub fn deep_clone(handle: &Handle) -> Handle {
    let Some(copy) = handle.with(deep_clone_value) else {
        return Handle::invalid();
    };
    if handle.can_set() {
        Handle::slot(copy)
    } else {
        Handle::of(copy)
    }
}

pub fn deep_clone_value(value: &Value) -> Value {
    Cloner::default().value(value)
}

/// A new slot holding the zero value of the handle's type.
pub fn init_new(handle: &Handle) -> Handle {
    match handle.ty() {
        Some(ty) => Handle::slot(ty.zero()),
        None => Handle::invalid(),
    }
}

#[derive(Default)]
struct Cloner {
    cells: HashMap<*const RwLock<Value>, Shared>,
}

impl Cloner {
    fn value(&mut self, value: &Value) -> Value {
        match value {
            Value::Pointer(ptr) => Value::Pointer(Pointer {
                elem: ptr.elem.clone(),
                target: ptr.target.as_ref().map(|cell| self.cell(cell)),
            }),
            Value::Interface(inner) => {
                Value::Interface(inner.as_ref().map(|held| Box::new(self.value(held))))
            }
            Value::Array(list) => Value::Array(self.list(list)),
            Value::Slice(list) => Value::Slice(self.list(list)),
            Value::Map(map) => Value::Map(MapValue {
                key: map.key.clone(),
                elem: map.elem.clone(),
                entries: map
                    .entries
                    .iter()
                    .map(|(key, value)| (self.value(key), self.value(value)))
                    .collect(),
            }),
            Value::Record(record) => Value::Record(Record {
                ty: record.ty.clone(),
                fields: record
                    .ty
                    .fields()
                    .iter()
                    .zip(&record.fields)
                    .map(|(def, field)| {
                        if def.exported {
                            self.value(field)
                        } else {
                            def.ty.zero()
                        }
                    })
                    .collect(),
            }),
            Value::Named(named, inner) => Value::Named(named.clone(), Box::new(self.value(inner))),
            other => other.clone(),
        }
    }

    fn list(&mut self, list: &List) -> List {
        List {
            elem: list.elem.clone(),
            items: list.items.iter().map(|item| self.value(item)).collect(),
        }
    }

    // The copied cell is registered before its contents are copied so that
    // a cycle back to it resolves to the copy.
    fn cell(&mut self, cell: &Shared) -> Shared {
        let raw = Arc::as_ptr(cell);
        if let Some(copy) = self.cells.get(&raw) {
            return copy.clone();
        }
        let source = cell.read_recursive();
        let copy = Arc::new(RwLock::new(source.ty().zero()));
        self.cells.insert(raw, copy.clone());
        let contents = self.value(&source);
        drop(source);
        *copy.write() = contents;
        copy
    }
}
