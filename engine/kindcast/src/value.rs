use std::fmt::{self, Debug, Display, Formatter};
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, SecondsFormat, TimeDelta};
use crossbeam_channel::{Receiver, Sender};
use num_complex::{Complex32, Complex64};
use parking_lot::{Mutex, RwLock};
use url::Url;

use crate::error::{CastError, CastResult};
use crate::format;
use crate::kind::Kind;
use crate::types::{
    ComplexWidth, FloatWidth, FuncType, IntWidth, NamedType, RecordType, Type, UintWidth,
};
use crate::wellknown;

/// A storage cell shared by every pointer that targets it.
pub type Shared = Arc<RwLock<Value>>;

/// Callable body of a function value.
pub type FuncBody = Arc<dyn Fn(&[Value]) -> Vec<Value> + Send + Sync>;

/// A dynamically typed value.
///
/// Every value can report its [`Type`]; named-type wrappers pass reads and
/// writes through to the wrapped value.
#[derive(Clone, Debug)]
pub enum Value {
    Bool(bool),
    Int(IntWidth, i64),
    Uint(UintWidth, u64),
    /// `F32` values are always stored rounded to single precision.
    Float(FloatWidth, f64),
    Complex(ComplexWidth, Complex64),
    String(String),
    Pointer(Pointer),
    Interface(Option<Box<Value>>),
    Array(List),
    Slice(List),
    Map(MapValue),
    Record(Record),
    Chan(Chan),
    Func(Func),
    Named(Arc<NamedType>, Box<Value>),
    Time(DateTime<FixedOffset>),
    Duration(TimeDelta),
    Url(Option<Url>),
    Ip(Option<IpAddr>),
}

#[derive(Clone, Debug)]
pub struct Pointer {
    pub elem: Type,
    pub target: Option<Shared>,
}

impl Pointer {
    pub fn null(elem: Type) -> Self {
        Self { elem, target: None }
    }

    pub fn to(value: Value) -> Self {
        Self {
            elem: value.ty(),
            target: Some(Arc::new(RwLock::new(value))),
        }
    }

    pub fn is_null(&self) -> bool {
        self.target.is_none()
    }

    /// Snapshot of the pointee.
    pub fn load(&self) -> Option<Value> {
        self.target.as_ref().map(|cell| cell.read_recursive().clone())
    }
}

impl PartialEq for Pointer {
    fn eq(&self, other: &Self) -> bool {
        match (&self.target, &other.target) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => self.elem == other.elem,
            _ => false,
        }
    }
}

/// Items of an array or slice together with their element type.
#[derive(Clone, Debug, PartialEq)]
pub struct List {
    pub elem: Type,
    pub items: Vec<Value>,
}

impl List {
    pub fn new(elem: Type) -> Self {
        Self {
            elem,
            items: Vec::new(),
        }
    }
}

/// Map entries in insertion order. Keys are unique by value equality.
#[derive(Clone, Debug, PartialEq)]
pub struct MapValue {
    pub key: Type,
    pub elem: Type,
    pub entries: Vec<(Value, Value)>,
}

impl MapValue {
    pub fn new(key: Type, elem: Type) -> Self {
        Self {
            key,
            elem,
            entries: Vec::new(),
        }
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries
            .iter()
            .find_map(|(k, v)| if k == key { Some(v) } else { None })
    }

    /// Insert or replace the entry for `key`.
    pub fn insert(&mut self, key: Value, value: Value) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub ty: Arc<RecordType>,
    pub fields: Vec<Value>,
}

impl Record {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.ty.field_index(name).and_then(|idx| self.fields.get(idx))
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Value> {
        let idx = self.ty.field_index(name)?;
        self.fields.get_mut(idx)
    }
}

#[derive(Clone, Debug)]
pub struct Chan {
    pub elem: Type,
    pub endpoint: Option<Channel>,
}

impl Chan {
    pub fn unbound(elem: Type) -> Self {
        Self {
            elem,
            endpoint: None,
        }
    }
}

impl PartialEq for Chan {
    fn eq(&self, other: &Self) -> bool {
        match (&self.endpoint, &other.endpoint) {
            (Some(a), Some(b)) => a.same_channel(b),
            (None, None) => self.elem == other.elem,
            _ => false,
        }
    }
}

/// Both ends of a message channel. Clones share the same queue; closing
/// through any clone disconnects the sending side for all of them.
#[derive(Clone, Debug)]
pub struct Channel {
    sender: Arc<Mutex<Option<Sender<Value>>>>,
    receiver: Receiver<Value>,
}

impl Channel {
    pub fn bounded(capacity: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        Self::from_parts(sender, receiver)
    }

    pub fn unbounded() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self::from_parts(sender, receiver)
    }

    fn from_parts(sender: Sender<Value>, receiver: Receiver<Value>) -> Self {
        Self {
            sender: Arc::new(Mutex::new(Some(sender))),
            receiver,
        }
    }

    pub fn send(&self, value: Value) -> CastResult<()> {
        let sender = self.sender.lock().clone();
        match sender {
            Some(sender) => sender
                .send(value)
                .map_err(|_| CastError::InvalidValue("send on a disconnected channel".into())),
            None => Err(CastError::InvalidValue("send on a closed channel".into())),
        }
    }

    pub fn close(&self) {
        self.sender.lock().take();
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Receive without waiting.
    pub fn try_recv(&self) -> Option<Value> {
        self.receiver.try_recv().ok()
    }

    /// Wait for the next value; `None` once the channel is closed and empty.
    pub fn recv(&self) -> Option<Value> {
        self.receiver.recv().ok()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn same_channel(&self, other: &Channel) -> bool {
        self.receiver.same_channel(&other.receiver)
    }
}

#[derive(Clone)]
pub struct Func {
    pub ty: Arc<FuncType>,
    pub body: Option<FuncBody>,
}

impl Func {
    pub fn unbound(ty: Arc<FuncType>) -> Self {
        Self { ty, body: None }
    }

    pub fn new<F>(ty: Arc<FuncType>, body: F) -> Self
    where
        F: Fn(&[Value]) -> Vec<Value> + Send + Sync + 'static,
    {
        Self {
            ty,
            body: Some(Arc::new(body)),
        }
    }

    pub fn call(&self, args: &[Value]) -> Option<Vec<Value>> {
        self.body.as_ref().map(|body| body(args))
    }
}

impl Debug for Func {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Func")
            .field("ty", &self.ty)
            .field("bound", &self.body.is_some())
            .finish()
    }
}

impl PartialEq for Func {
    fn eq(&self, other: &Self) -> bool {
        match (&self.body, &other.body) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => self.ty == other.ty,
            _ => false,
        }
    }
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Bool,
            Value::Int(..) | Value::Duration(_) => Kind::Int,
            Value::Uint(..) => Kind::Uint,
            Value::Float(..) => Kind::Float,
            Value::Complex(..) => Kind::Complex,
            Value::String(_) => Kind::String,
            Value::Pointer(_) => Kind::Pointer,
            Value::Interface(_) => Kind::Interface,
            Value::Array(_) => Kind::Array,
            Value::Slice(_) | Value::Ip(_) => Kind::Slice,
            Value::Map(_) => Kind::Map,
            Value::Record(_) | Value::Time(_) | Value::Url(_) => Kind::Record,
            Value::Chan(_) => Kind::Chan,
            Value::Func(_) => Kind::Func,
            Value::Named(_, inner) => inner.kind(),
        }
    }

    /// Static type of the value. Interface values report [`Type::Interface`]
    /// regardless of what they hold.
    pub fn ty(&self) -> Type {
        match self {
            Value::Bool(_) => Type::Bool,
            Value::Int(width, _) => Type::Int(*width),
            Value::Uint(width, _) => Type::Uint(*width),
            Value::Float(width, _) => Type::Float(*width),
            Value::Complex(width, _) => Type::Complex(*width),
            Value::String(_) => Type::String,
            Value::Pointer(ptr) => Type::pointer(ptr.elem.clone()),
            Value::Interface(_) => Type::Interface,
            Value::Array(list) => Type::array(list.items.len(), list.elem.clone()),
            Value::Slice(list) => Type::slice(list.elem.clone()),
            Value::Map(map) => Type::map(map.key.clone(), map.elem.clone()),
            Value::Record(record) => Type::Record(record.ty.clone()),
            Value::Chan(chan) => Type::chan(chan.elem.clone()),
            Value::Func(func) => Type::Func(func.ty.clone()),
            Value::Named(named, _) => Type::Named(named.clone()),
            Value::Time(_) => Type::Time,
            Value::Duration(_) => Type::Duration,
            Value::Url(_) => Type::Url,
            Value::Ip(_) => Type::Ip,
        }
    }

    /// Strip named-type wrappers.
    pub fn underlying(&self) -> &Value {
        match self {
            Value::Named(_, inner) => inner.underlying(),
            other => other,
        }
    }

    pub fn underlying_mut(&mut self) -> &mut Value {
        match self {
            Value::Named(_, inner) => inner.underlying_mut(),
            other => other,
        }
    }

    pub fn into_underlying(self) -> Value {
        match self {
            Value::Named(_, inner) => inner.into_underlying(),
            other => other,
        }
    }

    /// Unbound pointer, interface, channel, function, url or address.
    pub fn is_nil(&self) -> bool {
        match self.underlying() {
            Value::Pointer(ptr) => ptr.is_null(),
            Value::Interface(inner) => inner.is_none(),
            Value::Chan(chan) => chan.endpoint.is_none(),
            Value::Func(func) => func.body.is_none(),
            Value::Url(url) => url.is_none(),
            Value::Ip(ip) => ip.is_none(),
            _ => false,
        }
    }

    /// Fit the value to `target` for a wholesale store: wrap into an
    /// interface or named type, or unwrap a named type onto its underlying
    /// composite type.
    pub fn convert_to(self, target: &Type) -> Value {
        if let Type::Named(named) = target {
            if self.ty() == *target {
                return self;
            }
            return Value::Named(
                named.clone(),
                Box::new(self.into_underlying().convert_to(named.underlying())),
            );
        }
        match (target, self) {
            (Type::Interface, Value::Interface(inner)) => Value::Interface(inner),
            (Type::Interface, other) => Value::Interface(Some(Box::new(other))),
            (_, Value::Named(_, inner)) => inner.convert_to(target),
            (_, other) => other,
        }
    }

    pub fn pointer_to(value: Value) -> Value {
        Value::Pointer(Pointer::to(value))
    }

    pub fn null_pointer(elem: Type) -> Value {
        Value::Pointer(Pointer::null(elem))
    }

    pub fn interface(value: Value) -> Value {
        Value::Interface(Some(Box::new(value)))
    }

    pub fn nil_interface() -> Value {
        Value::Interface(None)
    }

    pub fn slice(elem: Type, items: Vec<Value>) -> Value {
        Value::Slice(List { elem, items })
    }

    pub fn array(elem: Type, items: Vec<Value>) -> Value {
        Value::Array(List { elem, items })
    }

    pub fn map(key: Type, elem: Type, entries: Vec<(Value, Value)>) -> Value {
        Value::Map(MapValue { key, elem, entries })
    }

    /// Wrap `inner` in the named type `ty`. Non-named types return `inner`.
    pub fn named(ty: &Type, inner: Value) -> Value {
        match ty {
            Type::Named(named) => Value::Named(named.clone(), Box::new(inner)),
            _ => inner,
        }
    }

    /// Build a record of type `ty`, setting the listed fields and leaving the
    /// rest zero. Names that the record does not declare are ignored.
    pub fn record<'a, I>(ty: &Type, fields: I) -> Value
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        let mut value = ty.zero();
        if let Value::Record(record) = value.underlying_mut() {
            for (name, field) in fields {
                if let Some(slot) = record.field_mut(name) {
                    *slot = field;
                }
            }
        }
        value
    }

    pub fn channel(elem: Type, channel: Channel) -> Value {
        Value::Chan(Chan {
            elem,
            endpoint: Some(channel),
        })
    }

    pub fn func<F>(ty: &Type, body: F) -> Value
    where
        F: Fn(&[Value]) -> Vec<Value> + Send + Sync + 'static,
    {
        match ty.underlying() {
            Type::Func(func) => Value::named(ty, Value::Func(Func::new(func.clone(), body))),
            _ => ty.zero(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.underlying() {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.underlying() {
            Value::Int(_, v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self.underlying() {
            Value::Uint(_, v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.underlying() {
            Value::Float(_, v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_complex(&self) -> Option<Complex64> {
        match self.underlying() {
            Value::Complex(_, v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.underlying() {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self.underlying() {
            Value::Array(list) | Value::Slice(list) => Some(&list.items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapValue> {
        match self.underlying() {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self.underlying() {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<TimeDelta> {
        match self {
            Value::Duration(d) => Some(*d),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.as_record().and_then(|record| record.field(name))
    }

    /// Snapshot of the pointee, or the held value of an interface.
    pub fn deref(&self) -> Option<Value> {
        match self.underlying() {
            Value::Pointer(ptr) => ptr.load(),
            Value::Interface(inner) => inner.as_deref().cloned(),
            _ => None,
        }
    }

    pub fn len(&self) -> Option<usize> {
        match self.underlying() {
            Value::String(s) => Some(s.len()),
            Value::Array(list) | Value::Slice(list) => Some(list.items.len()),
            Value::Map(map) => Some(map.entries.len()),
            Value::Chan(chan) => Some(chan.endpoint.as_ref().map_or(0, Channel::len)),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(wa, a), Value::Int(wb, b)) => wa == wb && a == b,
            (Value::Uint(wa, a), Value::Uint(wb, b)) => wa == wb && a == b,
            (Value::Float(wa, a), Value::Float(wb, b)) => wa == wb && a == b,
            (Value::Complex(wa, a), Value::Complex(wb, b)) => wa == wb && a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Pointer(a), Value::Pointer(b)) => a == b,
            (Value::Interface(a), Value::Interface(b)) => a == b,
            (Value::Array(a), Value::Array(b)) | (Value::Slice(a), Value::Slice(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            (Value::Chan(a), Value::Chan(b)) => a == b,
            (Value::Func(a), Value::Func(b)) => a == b,
            (Value::Named(ta, a), Value::Named(tb, b)) => {
                Type::Named(ta.clone()) == Type::Named(tb.clone()) && a == b
            }
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Url(a), Value::Url(b)) => a == b,
            (Value::Ip(a), Value::Ip(b)) => a == b,
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(_, v) => write!(f, "{v}"),
            Value::Uint(_, v) => write!(f, "{v}"),
            Value::Float(width, v) => {
                f.write_str(&format::format_float(*v, 'g', -1, width.bits()))
            }
            Value::Complex(width, v) => {
                f.write_str(&format::format_complex(*v, 'g', -1, width.bits()))
            }
            Value::String(s) => f.write_str(s),
            Value::Pointer(ptr) => match &ptr.target {
                Some(cell) => write!(f, "{:p}", Arc::as_ptr(cell)),
                None => f.write_str("<nil>"),
            },
            Value::Interface(Some(inner)) => write!(f, "{inner}"),
            Value::Interface(None) => f.write_str("<nil>"),
            Value::Array(list) | Value::Slice(list) => {
                f.write_str("[")?;
                write_spaced(f, list.items.iter())?;
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("map[")?;
                for (idx, (key, value)) in map.entries.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{key}:{value}")?;
                }
                f.write_str("]")
            }
            Value::Record(record) => {
                f.write_str("{")?;
                write_spaced(f, record.fields.iter())?;
                f.write_str("}")
            }
            Value::Chan(chan) => match &chan.endpoint {
                Some(_) => write!(f, "chan {}", chan.elem),
                None => f.write_str("<nil>"),
            },
            Value::Func(func) => match &func.body {
                Some(body) => write!(f, "{:p}", Arc::as_ptr(body)),
                None => f.write_str("<nil>"),
            },
            Value::Named(_, inner) => write!(f, "{inner}"),
            Value::Time(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Duration(d) => f.write_str(&wellknown::format_duration(*d)),
            Value::Url(Some(url)) => f.write_str(url.as_str()),
            Value::Ip(Some(ip)) => write!(f, "{ip}"),
            Value::Url(None) | Value::Ip(None) => f.write_str("<nil>"),
        }
    }
}

fn write_spaced<'a>(f: &mut Formatter<'_>, items: impl Iterator<Item = &'a Value>) -> fmt::Result {
    for (idx, item) in items.enumerate() {
        if idx > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

macro_rules! from_int {
    ($($ty:ty => $width:expr),* $(,)?) => {
        $(impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::Int($width, value as i64)
            }
        })*
    };
}

macro_rules! from_uint {
    ($($ty:ty => $width:expr),* $(,)?) => {
        $(impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::Uint($width, value as u64)
            }
        })*
    };
}

from_int!(i8 => IntWidth::I8, i16 => IntWidth::I16, i32 => IntWidth::I32, i64 => IntWidth::I64, isize => IntWidth::Isize);
from_uint!(u8 => UintWidth::U8, u16 => UintWidth::U16, u32 => UintWidth::U32, u64 => UintWidth::U64, usize => UintWidth::Usize);

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(FloatWidth::F32, value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(FloatWidth::F64, value)
    }
}

impl From<Complex32> for Value {
    fn from(value: Complex32) -> Self {
        Value::Complex(
            ComplexWidth::C64,
            Complex64::new(value.re as f64, value.im as f64),
        )
    }
}

impl From<Complex64> for Value {
    fn from(value: Complex64) -> Self {
        Value::Complex(ComplexWidth::C128, value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Value::Time(value)
    }
}

impl From<TimeDelta> for Value {
    fn from(value: TimeDelta) -> Self {
        Value::Duration(value)
    }
}

impl From<Url> for Value {
    fn from(value: Url) -> Self {
        Value::Url(Some(value))
    }
}

impl From<IpAddr> for Value {
    fn from(value: IpAddr) -> Self {
        Value::Ip(Some(value))
    }
}
