use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use chrono::TimeDelta;
use num_complex::Complex64;

use crate::capability::MethodSet;
use crate::kind::Kind;
use crate::value::{Chan, Func, List, MapValue, Pointer, Record, Value};
use crate::wellknown::{self, WellKnown};

/// Width of a signed integer type. `Isize` is the platform word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
    Isize,
}

impl IntWidth {
    pub fn bits(&self) -> u32 {
        match self {
            IntWidth::I8 => 8,
            IntWidth::I16 => 16,
            IntWidth::I32 => 32,
            IntWidth::I64 => 64,
            IntWidth::Isize => isize::BITS,
        }
    }

    /// Would storing `value` in this width lose information?
    pub fn overflows(&self, value: i64) -> bool {
        let bits = self.bits();
        if bits >= 64 {
            return false;
        }
        let max = (1i64 << (bits - 1)) - 1;
        let min = -(1i64 << (bits - 1));
        value < min || value > max
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntWidth::I8 => "i8",
            IntWidth::I16 => "i16",
            IntWidth::I32 => "i32",
            IntWidth::I64 => "i64",
            IntWidth::Isize => "isize",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UintWidth {
    U8,
    U16,
    U32,
    U64,
    Usize,
}

impl UintWidth {
    pub fn bits(&self) -> u32 {
        match self {
            UintWidth::U8 => 8,
            UintWidth::U16 => 16,
            UintWidth::U32 => 32,
            UintWidth::U64 => 64,
            UintWidth::Usize => usize::BITS,
        }
    }

    pub fn overflows(&self, value: u64) -> bool {
        let bits = self.bits();
        bits < 64 && value > (1u64 << bits) - 1
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UintWidth::U8 => "u8",
            UintWidth::U16 => "u16",
            UintWidth::U32 => "u32",
            UintWidth::U64 => "u64",
            UintWidth::Usize => "usize",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    F32,
    F64,
}

impl FloatWidth {
    pub fn bits(&self) -> u32 {
        match self {
            FloatWidth::F32 => 32,
            FloatWidth::F64 => 64,
        }
    }

    /// Finite values beyond the width's largest magnitude overflow; infinities
    /// and NaN are representable in both widths.
    pub fn overflows(&self, value: f64) -> bool {
        match self {
            FloatWidth::F32 => value.is_finite() && value.abs() > f32::MAX as f64,
            FloatWidth::F64 => false,
        }
    }

    /// Round `value` to the precision of this width.
    pub fn narrow(&self, value: f64) -> f64 {
        match self {
            FloatWidth::F32 => value as f32 as f64,
            FloatWidth::F64 => value,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FloatWidth::F32 => "f32",
            FloatWidth::F64 => "f64",
        }
    }
}

/// Width of a complex type: `C64` holds two `f32` parts, `C128` two `f64`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComplexWidth {
    C64,
    C128,
}

impl ComplexWidth {
    pub fn bits(&self) -> u32 {
        match self {
            ComplexWidth::C64 => 64,
            ComplexWidth::C128 => 128,
        }
    }

    pub fn part(&self) -> FloatWidth {
        match self {
            ComplexWidth::C64 => FloatWidth::F32,
            ComplexWidth::C128 => FloatWidth::F64,
        }
    }

    pub fn overflows(&self, value: Complex64) -> bool {
        let part = self.part();
        part.overflows(value.re) || part.overflows(value.im)
    }

    pub fn narrow(&self, value: Complex64) -> Complex64 {
        let part = self.part();
        Complex64::new(part.narrow(value.re), part.narrow(value.im))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplexWidth::C64 => "c64",
            ComplexWidth::C128 => "c128",
        }
    }
}

/// Static type information for a value.
#[derive(Clone, Debug)]
pub enum Type {
    Bool,
    Int(IntWidth),
    Uint(UintWidth),
    Float(FloatWidth),
    Complex(ComplexWidth),
    String,
    Pointer(Box<Type>),
    /// A dynamic-type wrapper able to hold a value of any type.
    Interface,
    Array(usize, Box<Type>),
    Slice(Box<Type>),
    Map(Box<Type>, Box<Type>),
    Record(Arc<RecordType>),
    Chan(Box<Type>),
    Func(Arc<FuncType>),
    /// A user-defined type over an underlying type, optionally carrying
    /// conversion capabilities.
    Named(Arc<NamedType>),
    Time,
    Duration,
    Url,
    Ip,
}

static BYTE: Type = Type::Uint(UintWidth::U8);

impl Type {
    pub const BOOL: Type = Type::Bool;
    pub const I8: Type = Type::Int(IntWidth::I8);
    pub const I16: Type = Type::Int(IntWidth::I16);
    pub const I32: Type = Type::Int(IntWidth::I32);
    pub const I64: Type = Type::Int(IntWidth::I64);
    pub const ISIZE: Type = Type::Int(IntWidth::Isize);
    pub const U8: Type = Type::Uint(UintWidth::U8);
    pub const U16: Type = Type::Uint(UintWidth::U16);
    pub const U32: Type = Type::Uint(UintWidth::U32);
    pub const U64: Type = Type::Uint(UintWidth::U64);
    pub const USIZE: Type = Type::Uint(UintWidth::Usize);
    pub const F32: Type = Type::Float(FloatWidth::F32);
    pub const F64: Type = Type::Float(FloatWidth::F64);
    pub const C64: Type = Type::Complex(ComplexWidth::C64);
    pub const C128: Type = Type::Complex(ComplexWidth::C128);
    pub const STRING: Type = Type::String;
    pub const INTERFACE: Type = Type::Interface;

    pub fn pointer(elem: Type) -> Type {
        Type::Pointer(Box::new(elem))
    }

    pub fn slice(elem: Type) -> Type {
        Type::Slice(Box::new(elem))
    }

    pub fn array(len: usize, elem: Type) -> Type {
        Type::Array(len, Box::new(elem))
    }

    pub fn map(key: Type, elem: Type) -> Type {
        Type::Map(Box::new(key), Box::new(elem))
    }

    pub fn chan(elem: Type) -> Type {
        Type::Chan(Box::new(elem))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Type::Bool => Kind::Bool,
            Type::Int(_) | Type::Duration => Kind::Int,
            Type::Uint(_) => Kind::Uint,
            Type::Float(_) => Kind::Float,
            Type::Complex(_) => Kind::Complex,
            Type::String => Kind::String,
            Type::Pointer(_) => Kind::Pointer,
            Type::Interface => Kind::Interface,
            Type::Array(..) => Kind::Array,
            Type::Slice(_) | Type::Ip => Kind::Slice,
            Type::Map(..) => Kind::Map,
            Type::Record(_) | Type::Time | Type::Url => Kind::Record,
            Type::Chan(_) => Kind::Chan,
            Type::Func(_) => Kind::Func,
            Type::Named(named) => named.underlying.kind(),
        }
    }

    /// Strip named-type wrappers.
    pub fn underlying(&self) -> &Type {
        match self {
            Type::Named(named) => named.underlying.underlying(),
            other => other,
        }
    }

    pub fn is_named(&self) -> bool {
        matches!(self, Type::Named(_))
    }

    /// Element type of pointers, lists, maps and channels.
    pub fn elem(&self) -> Option<&Type> {
        match self {
            Type::Pointer(elem)
            | Type::Array(_, elem)
            | Type::Slice(elem)
            | Type::Map(_, elem)
            | Type::Chan(elem) => Some(elem),
            Type::Ip => Some(&BYTE),
            Type::Named(named) => named.underlying.elem(),
            _ => None,
        }
    }

    pub fn key(&self) -> Option<&Type> {
        match self.underlying() {
            Type::Map(key, _) => Some(key),
            _ => None,
        }
    }

    /// Fixed length of array types.
    pub fn len(&self) -> Option<usize> {
        match self.underlying() {
            Type::Array(len, _) => Some(*len),
            _ => None,
        }
    }

    pub fn record(&self) -> Option<&Arc<RecordType>> {
        match self.underlying() {
            Type::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn well_known(&self) -> Option<WellKnown> {
        WellKnown::of(self)
    }

    /// List whose element is the 8-bit unsigned unit.
    pub fn is_byte_list(&self) -> bool {
        self.kind().is_list()
            && matches!(self.elem().map(Type::underlying), Some(Type::Uint(UintWidth::U8)))
    }

    /// List whose element is the 32-bit character unit.
    pub fn is_rune_list(&self) -> bool {
        self.kind().is_list()
            && matches!(self.elem().map(Type::underlying), Some(Type::Int(IntWidth::I32)))
    }

    /// Value-receiver and pointer-receiver capabilities attached to the type.
    pub fn method_sets(&self) -> Option<(&MethodSet, &MethodSet)> {
        match self {
            Type::Named(named) => Some((&named.methods, &named.pointer_methods)),
            Type::Record(record) => Some((&record.methods, &record.pointer_methods)),
            _ => None,
        }
    }

    /// Whether a value of this type may be stored wholesale into `target`.
    ///
    /// Identical types always are; any type is assignable to an interface;
    /// composite types with identical underlying types are when at most one
    /// side is named.
    pub fn assignable_to(&self, target: &Type) -> bool {
        if self == target || matches!(target.underlying(), Type::Interface) {
            return true;
        }
        if self.is_named() && target.is_named() {
            return false;
        }
        let composite = matches!(
            self.underlying(),
            Type::Pointer(_)
                | Type::Array(..)
                | Type::Slice(_)
                | Type::Map(..)
                | Type::Chan(_)
                | Type::Func(_)
        );
        composite && self.underlying() == target.underlying()
    }

    /// The zero value of the type.
    pub fn zero(&self) -> Value {
        match self {
            Type::Bool => Value::Bool(false),
            Type::Int(width) => Value::Int(*width, 0),
            Type::Uint(width) => Value::Uint(*width, 0),
            Type::Float(width) => Value::Float(*width, 0.0),
            Type::Complex(width) => Value::Complex(*width, Complex64::new(0.0, 0.0)),
            Type::String => Value::String(String::new()),
            Type::Pointer(elem) => Value::Pointer(Pointer::null((**elem).clone())),
            Type::Interface => Value::Interface(None),
            Type::Array(len, elem) => Value::Array(List {
                elem: (**elem).clone(),
                items: (0..*len).map(|_| elem.zero()).collect(),
            }),
            Type::Slice(elem) => Value::Slice(List::new((**elem).clone())),
            Type::Map(key, elem) => Value::Map(MapValue::new((**key).clone(), (**elem).clone())),
            Type::Record(record) => Value::Record(Record {
                ty: record.clone(),
                fields: record.fields.iter().map(|field| field.ty.zero()).collect(),
            }),
            Type::Chan(elem) => Value::Chan(Chan::unbound((**elem).clone())),
            Type::Func(func) => Value::Func(Func::unbound(func.clone())),
            Type::Named(named) => {
                Value::Named(named.clone(), Box::new(named.underlying.zero()))
            }
            Type::Time => Value::Time(wellknown::zero_time()),
            Type::Duration => Value::Duration(TimeDelta::zero()),
            Type::Url => Value::Url(None),
            Type::Ip => Value::Ip(None),
        }
    }

    /// Human readable type name used in error messages.
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Bool, Type::Bool)
            | (Type::String, Type::String)
            | (Type::Interface, Type::Interface)
            | (Type::Time, Type::Time)
            | (Type::Duration, Type::Duration)
            | (Type::Url, Type::Url)
            | (Type::Ip, Type::Ip) => true,
            (Type::Int(a), Type::Int(b)) => a == b,
            (Type::Uint(a), Type::Uint(b)) => a == b,
            (Type::Float(a), Type::Float(b)) => a == b,
            (Type::Complex(a), Type::Complex(b)) => a == b,
            (Type::Pointer(a), Type::Pointer(b))
            | (Type::Slice(a), Type::Slice(b))
            | (Type::Chan(a), Type::Chan(b)) => a == b,
            (Type::Array(la, a), Type::Array(lb, b)) => la == lb && a == b,
            (Type::Map(ka, a), Type::Map(kb, b)) => ka == kb && a == b,
            (Type::Record(a), Type::Record(b)) => {
                Arc::ptr_eq(a, b) || (a.name == b.name && a.fields == b.fields)
            }
            (Type::Func(a), Type::Func(b)) => Arc::ptr_eq(a, b) || a == b,
            (Type::Named(a), Type::Named(b)) => {
                Arc::ptr_eq(a, b) || (a.name == b.name && a.underlying == b.underlying)
            }
            _ => false,
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => f.write_str("bool"),
            Type::Int(width) => f.write_str(width.as_str()),
            Type::Uint(width) => f.write_str(width.as_str()),
            Type::Float(width) => f.write_str(width.as_str()),
            Type::Complex(width) => f.write_str(width.as_str()),
            Type::String => f.write_str("string"),
            Type::Pointer(elem) => write!(f, "*{elem}"),
            Type::Interface => f.write_str("interface"),
            Type::Array(len, elem) => write!(f, "[{len}]{elem}"),
            Type::Slice(elem) => write!(f, "[]{elem}"),
            Type::Map(key, elem) => write!(f, "map[{key}]{elem}"),
            Type::Record(record) => f.write_str(&record.name),
            Type::Chan(elem) => write!(f, "chan {elem}"),
            Type::Func(func) => {
                f.write_str("func(")?;
                write_list(f, &func.params)?;
                f.write_str(")")?;
                if !func.results.is_empty() {
                    f.write_str(" (")?;
                    write_list(f, &func.results)?;
                    f.write_str(")")?;
                }
                Ok(())
            }
            Type::Named(named) => f.write_str(&named.name),
            Type::Time => f.write_str("time"),
            Type::Duration => f.write_str("duration"),
            Type::Url => f.write_str("url"),
            Type::Ip => f.write_str("ip"),
        }
    }
}

fn write_list(f: &mut Formatter<'_>, types: &[Type]) -> fmt::Result {
    for (idx, ty) in types.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{ty}")?;
    }
    Ok(())
}

/// A record field declaration. Non-exported fields are invisible to
/// readers: they are skipped by zero checks and decoding, and zeroed by
/// deep clones.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: Type,
    pub exported: bool,
}

// Records compare by layout; capabilities are not part of identity.
impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.fields == other.fields
    }
}

/// Layout of an aggregate record type.
#[derive(Clone, Debug)]
pub struct RecordType {
    name: String,
    fields: Vec<FieldDef>,
    methods: MethodSet,
    pointer_methods: MethodSet,
}

impl RecordType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            methods: MethodSet::new(),
            pointer_methods: MethodSet::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            ty,
            exported: true,
        });
        self
    }

    /// Declare a field that readers cannot access.
    pub fn hidden_field(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            ty,
            exported: false,
        });
        self
    }

    pub fn methods(mut self, methods: MethodSet) -> Self {
        self.methods = methods;
        self
    }

    pub fn pointer_methods(mut self, methods: MethodSet) -> Self {
        self.pointer_methods = methods;
        self
    }

    pub fn into_type(self) -> Type {
        Type::Record(Arc::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    pub fn value_methods(&self) -> &MethodSet {
        &self.methods
    }

    pub fn ptr_methods(&self) -> &MethodSet {
        &self.pointer_methods
    }
}

/// A user-defined type over an underlying type.
#[derive(Clone, Debug)]
pub struct NamedType {
    name: String,
    underlying: Type,
    methods: MethodSet,
    pointer_methods: MethodSet,
}

impl NamedType {
    pub fn new(name: impl Into<String>, underlying: Type) -> Self {
        Self {
            name: name.into(),
            underlying,
            methods: MethodSet::new(),
            pointer_methods: MethodSet::new(),
        }
    }

    pub fn methods(mut self, methods: MethodSet) -> Self {
        self.methods = methods;
        self
    }

    pub fn pointer_methods(mut self, methods: MethodSet) -> Self {
        self.pointer_methods = methods;
        self
    }

    pub fn into_type(self) -> Type {
        Type::Named(Arc::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn underlying(&self) -> &Type {
        &self.underlying
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncType {
    pub params: Vec<Type>,
    pub results: Vec<Type>,
}

impl FuncType {
    pub fn new(params: Vec<Type>, results: Vec<Type>) -> Self {
        Self { params, results }
    }

    pub fn into_type(self) -> Type {
        Type::Func(Arc::new(self))
    }
}
