use std::fmt::{self, Display, Formatter};

use crate::handle::Handle;
use crate::types::Type;

/// Coarse category of a type, used for dispatch.
///
/// `Pointer` and `Interface` together form the indirection category, `Array`
/// (fixed length) and `Slice` (growable) the list category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Kind {
    #[default]
    Invalid,
    Bool,
    Int,
    Uint,
    Float,
    Complex,
    String,
    Pointer,
    Interface,
    Array,
    Slice,
    Map,
    Record,
    Chan,
    Func,
}

impl Kind {
    /// Classify a handle. Invalid handles classify as [`Kind::Invalid`].
    pub fn of(handle: &Handle) -> Kind {
        handle.kind()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Invalid => "invalid",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Uint => "uint",
            Kind::Float => "float",
            Kind::Complex => "complex",
            Kind::String => "string",
            Kind::Pointer => "pointer",
            Kind::Interface => "interface",
            Kind::Array => "array",
            Kind::Slice => "slice",
            Kind::Map => "map",
            Kind::Record => "record",
            Kind::Chan => "chan",
            Kind::Func => "func",
        }
    }

    /// Pointer or interface: something that must be unwrapped to reach a
    /// concrete value.
    pub fn is_indirection(&self) -> bool {
        matches!(self, Kind::Pointer | Kind::Interface)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Kind::Array | Kind::Slice)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Kind::Int | Kind::Uint | Kind::Float | Kind::Complex)
    }

    pub fn is_scalar(&self) -> bool {
        self.is_numeric() || matches!(self, Kind::Bool | Kind::String)
    }

    /// Kinds whose type descriptor carries an element type.
    pub fn is_type_elemable(&self) -> bool {
        matches!(
            self,
            Kind::Array | Kind::Chan | Kind::Map | Kind::Pointer | Kind::Slice
        )
    }

    /// Kinds that allow further unwrapping or element access.
    pub fn is_elemable(&self) -> bool {
        self.is_type_elemable() || matches!(self, Kind::Interface | Kind::Record)
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of the element one level below the handle.
///
/// For pointers, lists, maps and channels this is the element type's kind;
/// for a bound interface it is the dynamic value's kind.
pub fn elem_kind(handle: &Handle) -> Kind {
    let kind = handle.kind();
    if kind.is_type_elemable() {
        return handle
            .ty()
            .and_then(|ty| ty.elem().map(Type::kind))
            .unwrap_or_default();
    }
    if kind == Kind::Interface {
        return crate::resolve::elem(handle).kind();
    }
    kind
}

/// Kind of the root element: interfaces are unwrapped first, then element
/// types are followed until a kind without an element type is reached.
pub fn child_elem_kind(handle: &Handle) -> Kind {
    if !handle.is_valid() {
        return Kind::Invalid;
    }
    let handle = crate::resolve::unwrap_interface(handle);
    let Some(mut ty) = handle.ty() else {
        return Kind::Invalid;
    };
    if !ty.kind().is_type_elemable() {
        return ty.kind();
    }
    while let Some(elem) = ty.elem() {
        ty = elem.clone();
        if !ty.kind().is_type_elemable() {
            break;
        }
    }
    ty.kind()
}

/// Kind reached by following pointer element types only.
pub fn child_elem_ptr_kind(handle: &Handle) -> Kind {
    let Some(mut ty) = handle.ty() else {
        return Kind::Invalid;
    };
    while let Type::Pointer(elem) = ty.underlying() {
        ty = (**elem).clone();
    }
    ty.kind()
}
