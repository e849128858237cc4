//! Duck-typed conversion capabilities.
//!
//! A named or record type may carry a [`MethodSet`] for value receivers and
//! another for pointer receivers. Extraction consults them before falling
//! back to the string round trip.

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use num_complex::Complex64;

use crate::error::CastResult;
use crate::handle::Handle;
use crate::value::Value;

pub trait YieldsBool: Send + Sync {
    fn yield_bool(&self, receiver: &Value) -> CastResult<bool>;
}

pub trait YieldsInt64: Send + Sync {
    fn yield_int64(&self, receiver: &Value) -> CastResult<i64>;
}

pub trait YieldsUint64: Send + Sync {
    fn yield_uint64(&self, receiver: &Value) -> CastResult<u64>;
}

pub trait YieldsFloat64: Send + Sync {
    fn yield_float64(&self, receiver: &Value) -> CastResult<f64>;
}

pub trait YieldsComplex128: Send + Sync {
    fn yield_complex128(&self, receiver: &Value) -> CastResult<Complex64>;
}

pub trait YieldsString: Send + Sync {
    fn yield_string(&self, receiver: &Value) -> CastResult<String>;
}

/// Custom zero predicate, consulted by zero checks before the structural rule.
pub trait Zeroable: Send + Sync {
    fn is_zero(&self, receiver: &Value) -> bool;
}

impl<F> YieldsBool for F
where
    F: Fn(&Value) -> CastResult<bool> + Send + Sync,
{
    fn yield_bool(&self, receiver: &Value) -> CastResult<bool> {
        self(receiver)
    }
}

impl<F> YieldsInt64 for F
where
    F: Fn(&Value) -> CastResult<i64> + Send + Sync,
{
    fn yield_int64(&self, receiver: &Value) -> CastResult<i64> {
        self(receiver)
    }
}

impl<F> YieldsUint64 for F
where
    F: Fn(&Value) -> CastResult<u64> + Send + Sync,
{
    fn yield_uint64(&self, receiver: &Value) -> CastResult<u64> {
        self(receiver)
    }
}

impl<F> YieldsFloat64 for F
where
    F: Fn(&Value) -> CastResult<f64> + Send + Sync,
{
    fn yield_float64(&self, receiver: &Value) -> CastResult<f64> {
        self(receiver)
    }
}

impl<F> YieldsComplex128 for F
where
    F: Fn(&Value) -> CastResult<Complex64> + Send + Sync,
{
    fn yield_complex128(&self, receiver: &Value) -> CastResult<Complex64> {
        self(receiver)
    }
}

impl<F> YieldsString for F
where
    F: Fn(&Value) -> CastResult<String> + Send + Sync,
{
    fn yield_string(&self, receiver: &Value) -> CastResult<String> {
        self(receiver)
    }
}

impl<F> Zeroable for F
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn is_zero(&self, receiver: &Value) -> bool {
        self(receiver)
    }
}

/// The capabilities one receiver form of a type exposes.
#[derive(Clone, Default)]
pub struct MethodSet {
    bool_method: Option<Arc<dyn YieldsBool>>,
    int64_method: Option<Arc<dyn YieldsInt64>>,
    uint64_method: Option<Arc<dyn YieldsUint64>>,
    float64_method: Option<Arc<dyn YieldsFloat64>>,
    complex128_method: Option<Arc<dyn YieldsComplex128>>,
    string_method: Option<Arc<dyn YieldsString>>,
    zero_method: Option<Arc<dyn Zeroable>>,
}

impl MethodSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bool(mut self, method: impl YieldsBool + 'static) -> Self {
        self.bool_method = Some(Arc::new(method));
        self
    }

    pub fn with_int64(mut self, method: impl YieldsInt64 + 'static) -> Self {
        self.int64_method = Some(Arc::new(method));
        self
    }

    pub fn with_uint64(mut self, method: impl YieldsUint64 + 'static) -> Self {
        self.uint64_method = Some(Arc::new(method));
        self
    }

    pub fn with_float64(mut self, method: impl YieldsFloat64 + 'static) -> Self {
        self.float64_method = Some(Arc::new(method));
        self
    }

    pub fn with_complex128(mut self, method: impl YieldsComplex128 + 'static) -> Self {
        self.complex128_method = Some(Arc::new(method));
        self
    }

    pub fn with_string(mut self, method: impl YieldsString + 'static) -> Self {
        self.string_method = Some(Arc::new(method));
        self
    }

    pub fn with_zero(mut self, method: impl Zeroable + 'static) -> Self {
        self.zero_method = Some(Arc::new(method));
        self
    }

    pub fn bool_method(&self) -> Option<&dyn YieldsBool> {
        self.bool_method.as_deref()
    }

    pub fn int64_method(&self) -> Option<&dyn YieldsInt64> {
        self.int64_method.as_deref()
    }

    pub fn uint64_method(&self) -> Option<&dyn YieldsUint64> {
        self.uint64_method.as_deref()
    }

    pub fn float64_method(&self) -> Option<&dyn YieldsFloat64> {
        self.float64_method.as_deref()
    }

    pub fn complex128_method(&self) -> Option<&dyn YieldsComplex128> {
        self.complex128_method.as_deref()
    }

    pub fn string_method(&self) -> Option<&dyn YieldsString> {
        self.string_method.as_deref()
    }

    pub fn zero_method(&self) -> Option<&dyn Zeroable> {
        self.zero_method.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.names().is_empty()
    }

    fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.bool_method.is_some() {
            names.push("bool");
        }
        if self.int64_method.is_some() {
            names.push("int64");
        }
        if self.uint64_method.is_some() {
            names.push("uint64");
        }
        if self.float64_method.is_some() {
            names.push("float64");
        }
        if self.complex128_method.is_some() {
            names.push("complex128");
        }
        if self.string_method.is_some() {
            names.push("string");
        }
        if self.zero_method.is_some() {
            names.push("zero");
        }
        names
    }
}

impl Debug for MethodSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// A target scalar that some capability can produce.
pub(crate) trait Yield: Sized {
    const NAME: &'static str;

    fn call(methods: &MethodSet, receiver: &Value) -> Option<CastResult<Self>>;
}

impl Yield for bool {
    const NAME: &'static str = "bool";

    fn call(methods: &MethodSet, receiver: &Value) -> Option<CastResult<Self>> {
        methods.bool_method().map(|m| m.yield_bool(receiver))
    }
}

impl Yield for i64 {
    const NAME: &'static str = "int64";

    fn call(methods: &MethodSet, receiver: &Value) -> Option<CastResult<Self>> {
        methods.int64_method().map(|m| m.yield_int64(receiver))
    }
}

impl Yield for u64 {
    const NAME: &'static str = "uint64";

    fn call(methods: &MethodSet, receiver: &Value) -> Option<CastResult<Self>> {
        methods.uint64_method().map(|m| m.yield_uint64(receiver))
    }
}

impl Yield for f64 {
    const NAME: &'static str = "float64";

    fn call(methods: &MethodSet, receiver: &Value) -> Option<CastResult<Self>> {
        methods.float64_method().map(|m| m.yield_float64(receiver))
    }
}

impl Yield for Complex64 {
    const NAME: &'static str = "complex128";

    fn call(methods: &MethodSet, receiver: &Value) -> Option<CastResult<Self>> {
        methods.complex128_method().map(|m| m.yield_complex128(receiver))
    }
}

impl Yield for String {
    const NAME: &'static str = "string";

    fn call(methods: &MethodSet, receiver: &Value) -> Option<CastResult<Self>> {
        methods.string_method().map(|m| m.yield_string(receiver))
    }
}

/// Probe the capabilities visible through the handle's value.
///
/// A pointer exposes both receiver forms of its pointee type; an interface
/// exposes those of its held value; any other value exposes its value
/// receiver capabilities.
pub(crate) fn probe<T: Yield>(handle: &Handle) -> Option<T> {
    let value = handle.get()?;
    probe_value(&value)
}

/// Probe the pointer-receiver capabilities of an addressable value.
pub(crate) fn probe_addr<T: Yield>(handle: &Handle) -> Option<T> {
    if !handle.can_addr() {
        return None;
    }
    let value = handle.get()?;
    let ty = value.ty();
    let (_, pointer_methods) = ty.method_sets()?;
    settle(T::call(pointer_methods, &value))
}

fn probe_value<T: Yield>(value: &Value) -> Option<T> {
    match value.underlying() {
        Value::Pointer(ptr) if value.ty().method_sets().is_none() => {
            let pointee = ptr.load()?;
            let (methods, pointer_methods) = ptr.elem.method_sets()?;
            settle(T::call(methods, &pointee)).or_else(|| settle(T::call(pointer_methods, &pointee)))
        }
        Value::Interface(Some(inner)) => probe_value(inner),
        _ => {
            let ty = value.ty();
            let (methods, _) = ty.method_sets()?;
            settle(T::call(methods, value))
        }
    }
}

fn settle<T: Yield>(outcome: Option<CastResult<T>>) -> Option<T> {
    match outcome? {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::trace!(capability = T::NAME, error = %err, "capability declined");
            None
        }
    }
}
