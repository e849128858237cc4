use std::fmt;

use serde::de::{self, DeserializeOwned, IntoDeserializer, Visitor};
use serde::forward_to_deserialize_any;
use serde::ser;
use serde::Serialize;

use crate::error::CastError;
use crate::handle::Handle;
use crate::types::{FloatWidth, NamedType, RecordType, Type, UintWidth};
use crate::value::Value;
use crate::wellknown;

#[derive(Debug)]
pub struct SerdeError(String);

impl fmt::Display for SerdeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl ser::Error for SerdeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        SerdeError(msg.to_string())
    }
}

impl de::Error for SerdeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        SerdeError(msg.to_string())
    }
}

impl std::error::Error for SerdeError {}

impl From<SerdeError> for CastError {
    fn from(value: SerdeError) -> Self {
        CastError::Serde(value.0)
    }
}

/// Build a dynamically typed [`Value`] from typed data.
///
/// Structs become records, sequences slices, tuples arrays, maps maps and
/// newtype structs named values. Containers whose elements disagree on type
/// hold their elements behind interfaces. Enum variants with data become
/// single-entry maps keyed by the variant name.
pub fn to_value<T>(value: &T) -> Result<Value, SerdeError>
where
    T: Serialize + ?Sized,
{
    value.serialize(ValueSerializer)
}

/// Deserialize typed data out of a [`Value`], looking through pointers,
/// interfaces and named wrappers.
pub fn from_value<T>(value: Value) -> Result<T, SerdeError>
where
    T: DeserializeOwned,
{
    T::deserialize(ValueDeserializer { value })
}

pub fn from_handle<T>(handle: &Handle) -> Result<T, SerdeError>
where
    T: DeserializeOwned,
{
    let value = handle
        .get()
        .ok_or_else(|| SerdeError("cannot deserialize an invalid handle".into()))?;
    from_value(value)
}

// Element type shared by every value, or the interface type when they differ.
fn homogenize(values: Vec<Value>) -> (Type, Vec<Value>) {
    let common = values.first().map(Value::ty).filter(|first| {
        values.iter().all(|value| value.ty() == *first)
    });
    match common {
        Some(ty) => (ty, values),
        None => (
            Type::Interface,
            values.into_iter().map(Value::interface).collect(),
        ),
    }
}

fn build_map(entries: Vec<(Value, Value)>) -> Value {
    let (keys, values): (Vec<Value>, Vec<Value>) = entries.into_iter().unzip();
    let (key_ty, keys) = homogenize(keys);
    let (elem_ty, values) = homogenize(values);
    Value::map(key_ty, elem_ty, keys.into_iter().zip(values).collect())
}

fn variant(name: &'static str, inner: Value) -> Value {
    Value::map(
        Type::String,
        inner.ty(),
        vec![(Value::String(name.to_string()), inner)],
    )
}

struct ValueSerializer;

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = SerdeError;
    type SerializeSeq = SeqSerializer;
    type SerializeTuple = SeqSerializer;
    type SerializeTupleStruct = SeqSerializer;
    type SerializeTupleVariant = VariantSeqSerializer;
    type SerializeMap = MapSerializer;
    type SerializeStruct = StructSerializer;
    type SerializeStructVariant = VariantStructSerializer;

    fn serialize_bool(self, v: bool) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Self::Ok, Self::Error> {
        Ok(Value::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Self::Ok, Self::Error> {
        Ok(Value::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Self::Ok, Self::Error> {
        Ok(Value::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Self::Ok, Self::Error> {
        Ok(Value::from(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Self::Ok, Self::Error> {
        i64::try_from(v)
            .map(Value::from)
            .map_err(|_| SerdeError(format!("{v} does not fit in int64")))
    }

    fn serialize_u8(self, v: u8) -> Result<Self::Ok, Self::Error> {
        Ok(Value::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Self::Ok, Self::Error> {
        Ok(Value::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Self::Ok, Self::Error> {
        Ok(Value::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Self::Ok, Self::Error> {
        Ok(Value::from(v))
    }

    fn serialize_u128(self, v: u128) -> Result<Self::Ok, Self::Error> {
        u64::try_from(v)
            .map(Value::from)
            .map_err(|_| SerdeError(format!("{v} does not fit in uint64")))
    }

    fn serialize_f32(self, v: f32) -> Result<Self::Ok, Self::Error> {
        Ok(Value::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Self::Ok, Self::Error> {
        Ok(Value::from(v))
    }

    fn serialize_char(self, v: char) -> Result<Self::Ok, Self::Error> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok, Self::Error> {
        Ok(Value::String(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Self::Ok, Self::Error> {
        Ok(Value::slice(
            Type::Uint(UintWidth::U8),
            v.iter().copied().map(Value::from).collect(),
        ))
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        Ok(Value::nil_interface())
    }

    fn serialize_some<T>(self, value: &T) -> Result<Self::Ok, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        Ok(Value::nil_interface())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok, Self::Error> {
        Ok(Value::nil_interface())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        Ok(Value::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        let inner = value.serialize(ValueSerializer)?;
        let ty = NamedType::new(name, inner.ty()).into_type();
        Ok(Value::named(&ty, inner))
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant_name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        let inner = value.serialize(ValueSerializer)?;
        Ok(variant(variant_name, inner))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        Ok(SeqSerializer {
            elements: Vec::with_capacity(len.unwrap_or(0)),
            fixed: false,
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        Ok(SeqSerializer {
            elements: Vec::with_capacity(len),
            fixed: true,
        })
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        self.serialize_tuple(len)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Ok(VariantSeqSerializer {
            tag: variant,
            elements: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Ok(MapSerializer {
            entries: Vec::with_capacity(len.unwrap_or(0)),
            next_key: None,
        })
    }

    fn serialize_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        Ok(StructSerializer {
            name,
            entries: Vec::with_capacity(len),
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Ok(VariantStructSerializer {
            tag: variant,
            record: StructSerializer {
                name: variant,
                entries: Vec::with_capacity(len),
            },
        })
    }

    fn collect_str<T>(self, value: &T) -> Result<Self::Ok, Self::Error>
    where
        T: ?Sized + fmt::Display,
    {
        Ok(Value::String(value.to_string()))
    }
}

struct SeqSerializer {
    elements: Vec<Value>,
    fixed: bool,
}

impl ser::SerializeSeq for SeqSerializer {
    type Ok = Value;
    type Error = SerdeError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.elements.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        let (elem, items) = homogenize(self.elements);
        if self.fixed {
            Ok(Value::array(elem, items))
        } else {
            Ok(Value::slice(elem, items))
        }
    }
}

impl ser::SerializeTuple for SeqSerializer {
    type Ok = Value;
    type Error = SerdeError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SeqSerializer {
    type Ok = Value;
    type Error = SerdeError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        ser::SerializeSeq::end(self)
    }
}

struct VariantSeqSerializer {
    tag: &'static str,
    elements: Vec<Value>,
}

impl ser::SerializeTupleVariant for VariantSeqSerializer {
    type Ok = Value;
    type Error = SerdeError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.elements.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        let (elem, items) = homogenize(self.elements);
        Ok(variant(self.tag, Value::slice(elem, items)))
    }
}

struct MapSerializer {
    entries: Vec<(Value, Value)>,
    next_key: Option<Value>,
}

impl ser::SerializeMap for MapSerializer {
    type Ok = Value;
    type Error = SerdeError;

    fn serialize_key<T>(&mut self, key: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        if self.next_key.is_some() {
            return Err(SerdeError(
                "serialize_key called twice without a value".into(),
            ));
        }
        self.next_key = Some(key.serialize(ValueSerializer)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| SerdeError("serialize_value called before key".into()))?;
        let val = value.serialize(ValueSerializer)?;
        self.entries.push((key, val));
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        if self.next_key.is_some() {
            return Err(SerdeError(
                "map serialization ended with dangling key".into(),
            ));
        }
        Ok(build_map(self.entries))
    }
}

struct StructSerializer {
    name: &'static str,
    entries: Vec<(&'static str, Value)>,
}

impl StructSerializer {
    fn finish(self) -> Value {
        let ty = self
            .entries
            .iter()
            .fold(RecordType::new(self.name), |record, (key, value)| {
                record.field(*key, value.ty())
            })
            .into_type();
        Value::record(&ty, self.entries)
    }
}

struct VariantStructSerializer {
    tag: &'static str,
    record: StructSerializer,
}

impl ser::SerializeStruct for StructSerializer {
    type Ok = Value;
    type Error = SerdeError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.entries.push((key, value.serialize(ValueSerializer)?));
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(self.finish())
    }
}

impl ser::SerializeStructVariant for VariantStructSerializer {
    type Ok = Value;
    type Error = SerdeError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        ser::SerializeStruct::serialize_field(&mut self.record, key, value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(variant(self.tag, self.record.finish()))
    }
}

struct ValueDeserializer {
    value: Value,
}

impl ValueDeserializer {
    // Strip named wrappers, interfaces and bound pointers.
    fn resolved(self) -> Value {
        let mut value = self.value.into_underlying();
        loop {
            let next = match &value {
                Value::Interface(Some(inner)) => Some((**inner).clone()),
                Value::Pointer(ptr) => ptr.load(),
                _ => None,
            };
            match next {
                Some(inner) => value = inner.into_underlying(),
                None => return value,
            }
        }
    }
}

fn is_absent(value: &Value) -> bool {
    matches!(
        value,
        Value::Interface(None) | Value::Url(None) | Value::Ip(None)
    ) || matches!(value, Value::Pointer(ptr) if ptr.is_null())
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = SerdeError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.resolved() {
            Value::Bool(v) => visitor.visit_bool(v),
            Value::Int(_, v) => visitor.visit_i64(v),
            Value::Uint(_, v) => visitor.visit_u64(v),
            Value::Float(FloatWidth::F32, v) => visitor.visit_f32(v as f32),
            Value::Float(_, v) => visitor.visit_f64(v),
            Value::Complex(_, c) => visitor.visit_seq(SeqDeserializer::new(vec![
                Value::from(c.re),
                Value::from(c.im),
            ])),
            Value::String(s) => visitor.visit_string(s),
            Value::Array(list) | Value::Slice(list) => {
                visitor.visit_seq(SeqDeserializer::new(list.items))
            }
            Value::Map(map) => visitor.visit_map(MapDeserializer::new(map.entries)),
            Value::Record(record) => {
                let entries = record
                    .ty
                    .fields()
                    .iter()
                    .zip(record.fields)
                    .filter(|(def, _)| def.exported)
                    .map(|(def, value)| (Value::String(def.name.clone()), value))
                    .collect();
                visitor.visit_map(MapDeserializer::new(entries))
            }
            Value::Time(time) => visitor.visit_string(time.to_rfc3339()),
            Value::Duration(duration) => visitor.visit_string(wellknown::format_duration(duration)),
            Value::Url(Some(url)) => visitor.visit_string(url.to_string()),
            Value::Ip(Some(ip)) => visitor.visit_string(ip.to_string()),
            absent if is_absent(&absent) => visitor.visit_none(),
            other => Err(SerdeError(format!(
                "cannot deserialize a value of kind {}",
                other.kind()
            ))),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        let value = self.resolved();
        if is_absent(&value) {
            visitor.visit_none()
        } else {
            visitor.visit_some(ValueDeserializer { value })
        }
    }

    fn deserialize_newtype_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(ValueDeserializer {
            value: self.resolved(),
        })
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string bytes byte_buf
        unit unit_struct seq tuple tuple_struct map struct identifier ignored_any
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.resolved() {
            Value::String(name) => visitor.visit_enum(name.into_deserializer()),
            Value::Map(map) if map.entries.len() == 1 => {
                let mut entries = map.entries.into_iter();
                match entries.next() {
                    Some((tag, value)) => visitor.visit_enum(EnumDeserializer { tag, value }),
                    None => Err(SerdeError("empty enum map".into())),
                }
            }
            other => Err(SerdeError(format!(
                "expected a variant name or single-entry map for enum, found {}",
                other.kind()
            ))),
        }
    }
}

struct SeqDeserializer {
    iter: std::vec::IntoIter<Value>,
}

impl SeqDeserializer {
    fn new(values: Vec<Value>) -> Self {
        Self {
            iter: values.into_iter(),
        }
    }
}

impl<'de> de::SeqAccess<'de> for SeqDeserializer {
    type Error = SerdeError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(value) => seed.deserialize(ValueDeserializer { value }).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct MapDeserializer {
    iter: std::vec::IntoIter<(Value, Value)>,
    pending: Option<Value>,
}

impl MapDeserializer {
    fn new(entries: Vec<(Value, Value)>) -> Self {
        Self {
            iter: entries.into_iter(),
            pending: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapDeserializer {
    type Error = SerdeError;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: de::DeserializeSeed<'de>,
    {
        let Some((key, value)) = self.iter.next() else {
            return Ok(None);
        };
        self.pending = Some(value);
        seed.deserialize(ValueDeserializer { value: key }).map(Some)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: de::DeserializeSeed<'de>,
    {
        let value = self
            .pending
            .take()
            .ok_or_else(|| SerdeError("next_value called before next_key".into()))?;
        seed.deserialize(ValueDeserializer { value })
    }
}

struct EnumDeserializer {
    tag: Value,
    value: Value,
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer {
    type Error = SerdeError;
    type Variant = VariantDeserializer;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant), Self::Error>
    where
        V: de::DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(ValueDeserializer { value: self.tag })?;
        Ok((variant, VariantDeserializer { value: self.value }))
    }
}

struct VariantDeserializer {
    value: Value,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer {
    type Error = SerdeError;

    fn unit_variant(self) -> Result<(), Self::Error> {
        let value = ValueDeserializer { value: self.value }.resolved();
        if is_absent(&value) {
            Ok(())
        } else {
            Err(SerdeError(format!(
                "expected unit variant payload, found {}",
                value.kind()
            )))
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, Self::Error>
    where
        T: de::DeserializeSeed<'de>,
    {
        seed.deserialize(ValueDeserializer { value: self.value })
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        de::Deserializer::deserialize_seq(ValueDeserializer { value: self.value }, visitor)
    }

    fn struct_variant<V>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        de::Deserializer::deserialize_map(ValueDeserializer { value: self.value }, visitor)
    }
}
