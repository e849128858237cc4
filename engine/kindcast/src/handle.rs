use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{CastError, CastResult};
use crate::kind::Kind;
use crate::types::Type;
use crate::value::{Pointer, Shared, Value};

/// A reference to a value together with its capabilities.
///
/// Handles come in three shapes: invalid (refers to nothing), detached (a
/// read-only copy, possibly marked addressable when it was reached through
/// addressable storage) and slots (shared mutable storage, both settable and
/// addressable).
#[derive(Clone, Debug, Default)]
pub struct Handle {
    repr: Repr,
}

#[derive(Clone, Debug, Default)]
enum Repr {
    #[default]
    Invalid,
    Detached {
        value: Value,
        addressable: bool,
        readable: bool,
    },
    Slot(Shared),
}

impl Handle {
    pub fn invalid() -> Self {
        Self::default()
    }

    /// Read-only handle over a copy of `value`.
    pub fn of(value: impl Into<Value>) -> Self {
        Self::detached(value.into(), false, true)
    }

    /// Settable handle over fresh storage holding `value`.
    pub fn slot(value: impl Into<Value>) -> Self {
        Self::from_shared(Arc::new(RwLock::new(value.into())))
    }

    /// Settable handle over existing shared storage.
    pub fn from_shared(shared: Shared) -> Self {
        Self {
            repr: Repr::Slot(shared),
        }
    }

    pub(crate) fn detached(value: Value, addressable: bool, readable: bool) -> Self {
        Self {
            repr: Repr::Detached {
                value,
                addressable,
                readable,
            },
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self.repr, Repr::Invalid)
    }

    pub fn can_read(&self) -> bool {
        match &self.repr {
            Repr::Invalid => false,
            Repr::Detached { readable, .. } => *readable,
            Repr::Slot(_) => true,
        }
    }

    pub fn can_addr(&self) -> bool {
        match &self.repr {
            Repr::Invalid => false,
            Repr::Detached { addressable, .. } => *addressable,
            Repr::Slot(_) => true,
        }
    }

    pub fn can_set(&self) -> bool {
        matches!(self.repr, Repr::Slot(_))
    }

    /// Run `f` against the referenced value without copying it.
    pub fn with<R>(&self, f: impl FnOnce(&Value) -> R) -> Option<R> {
        match &self.repr {
            Repr::Invalid => None,
            Repr::Detached { value, .. } => Some(f(value)),
            Repr::Slot(cell) => Some(f(&*cell.read_recursive())),
        }
    }

    pub fn kind(&self) -> Kind {
        self.with(Value::kind).unwrap_or_default()
    }

    pub fn ty(&self) -> Option<Type> {
        self.with(Value::ty)
    }

    /// Snapshot of the referenced value.
    pub fn get(&self) -> Option<Value> {
        self.with(Value::clone)
    }

    /// Replace the referenced value. Only slots are settable; the stored
    /// value must be assignable to the slot's current type.
    pub fn set(&self, value: Value) -> CastResult<()> {
        let Repr::Slot(cell) = &self.repr else {
            return Err(CastError::CannotSet);
        };
        let mut guard = cell.write();
        let current = guard.ty();
        let incoming = value.ty();
        if !incoming.assignable_to(&current) {
            return Err(CastError::Unassignable {
                kind: current.kind(),
                value_kind: incoming.kind(),
                value_ty: incoming.name(),
            });
        }
        *guard = value.convert_to(&current);
        Ok(())
    }

    pub fn shared(&self) -> Option<&Shared> {
        match &self.repr {
            Repr::Slot(cell) => Some(cell),
            _ => None,
        }
    }

    /// A pointer to the slot's storage.
    pub fn addr(&self) -> Option<Value> {
        let cell = self.shared()?;
        let elem = cell.read_recursive().ty();
        Some(Value::Pointer(Pointer {
            elem,
            target: Some(cell.clone()),
        }))
    }

    pub fn into_value(self) -> Option<Value> {
        match self.repr {
            Repr::Invalid => None,
            Repr::Detached { value, .. } => Some(value),
            Repr::Slot(cell) => Some(cell.read_recursive().clone()),
        }
    }
}

impl From<Value> for Handle {
    fn from(value: Value) -> Self {
        Handle::of(value)
    }
}
