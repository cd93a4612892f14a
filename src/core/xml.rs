// XML element mapping for `Value`, plus the text-scalar deserializer XML payloads need.
//
// Objects become child elements in field order, arrays become repeated elements
// named after their field, and `null` (or an empty array) becomes an empty
// `<name/>` element. Every scalar is element text, so decoding yields strings
// that are parsed against the destination type by `from_text_value`.
use std::fmt;
use std::str::FromStr;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use serde::de::{self, DeserializeOwned, DeserializeSeed, MapAccess, SeqAccess, Visitor};
use serde::{Deserializer, forward_to_deserialize_any};
use serde_json::{Map, Value};

use crate::core::codec::{decode_error, encode_error};
use crate::core::error::{Error, ErrorKind};

const ROOT: &str = "value";

pub(crate) fn to_xml(value: &Value) -> Result<Vec<u8>, Error> {
    if value.is_array() {
        return Err(Error::new(ErrorKind::Encode)
            .with_message("a top-level sequence has no single XML root element"));
    }
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, ROOT, value)?;
    Ok(writer.into_inner())
}

fn write_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> Result<(), Error> {
    check_name(name)?;
    match value {
        Value::Null => emit(writer, Event::Empty(BytesStart::new(name))),
        Value::Bool(flag) => write_text(writer, name, if *flag { "true" } else { "false" }),
        Value::Number(number) => write_text(writer, name, &number.to_string()),
        Value::String(text) => write_text(writer, name, text),
        Value::Array(items) if items.is_empty() => {
            emit(writer, Event::Empty(BytesStart::new(name)))
        }
        Value::Array(items) => {
            for item in items {
                if item.is_array() {
                    return Err(Error::new(ErrorKind::Encode)
                        .with_message(format!("nested sequence in <{name}> has no XML form")));
                }
                write_element(writer, name, item)?;
            }
            Ok(())
        }
        Value::Object(fields) => {
            emit(writer, Event::Start(BytesStart::new(name)))?;
            for (key, field) in fields {
                write_element(writer, key, field)?;
            }
            emit(writer, Event::End(BytesEnd::new(name)))
        }
    }
}

fn write_text(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<(), Error> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    if !text.is_empty() {
        emit(writer, Event::Text(BytesText::new(text)))?;
    }
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), Error> {
    writer.write_event(event).map_err(encode_error)
}

fn check_name(name: &str) -> Result<(), Error> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::Encode)
            .with_message(format!("{name:?} is not a valid XML element name")))
    }
}

struct Frame {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Frame {
    fn new(name: String) -> Self {
        Self {
            name,
            fields: Map::new(),
            text: String::new(),
        }
    }

    // Repeated children collapse into an array.
    fn push(&mut self, name: String, value: Value) {
        match self.fields.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.fields.insert(name, value);
            }
        }
    }

    // Text is ignored once an element has children.
    fn into_value(self) -> (String, Value) {
        let value = if self.fields.is_empty() {
            Value::String(self.text)
        } else {
            Value::Object(self.fields)
        };
        (self.name, value)
    }
}

/// Parses one XML document; the root element's name is not checked. Attributes are ignored.
pub(crate) fn from_xml(buf: &[u8]) -> Result<Value, Error> {
    let text = std::str::from_utf8(buf).map_err(decode_error)?;
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Frame> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event().map_err(decode_error)? {
            Event::Start(start) => {
                ensure_single_root(&stack, &root)?;
                stack.push(Frame::new(element_name(&start)?));
            }
            Event::Empty(start) => {
                ensure_single_root(&stack, &root)?;
                let name = element_name(&start)?;
                attach(&mut stack, &mut root, name, Value::Null);
            }
            Event::Text(content) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&content.unescape().map_err(decode_error)?);
                }
            }
            Event::CData(content) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(std::str::from_utf8(&content).map_err(decode_error)?);
                }
            }
            Event::End(_) => {
                let frame = stack.pop().ok_or_else(|| malformed("unexpected closing tag"))?;
                let (name, value) = frame.into_value();
                attach(&mut stack, &mut root, name, value);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(frame) = stack.last() {
        return Err(malformed(&format!("element <{}> is never closed", frame.name)));
    }
    root.ok_or_else(|| malformed("no root element"))
}

fn ensure_single_root(stack: &[Frame], root: &Option<Value>) -> Result<(), Error> {
    if stack.is_empty() && root.is_some() {
        return Err(malformed("more than one root element"));
    }
    Ok(())
}

fn attach(stack: &mut [Frame], root: &mut Option<Value>, name: String, value: Value) {
    match stack.last_mut() {
        Some(parent) => parent.push(name, value),
        None => *root = Some(value),
    }
}

fn element_name(start: &BytesStart<'_>) -> Result<String, Error> {
    std::str::from_utf8(start.name().as_ref())
        .map(str::to_owned)
        .map_err(decode_error)
}

fn malformed(message: &str) -> Error {
    Error::new(ErrorKind::Decode).with_message(format!("malformed XML: {message}"))
}

/// Deserializes `value`, parsing string scalars into whatever the destination asks for.
///
/// A lone element where a sequence is expected is a one-item sequence, and an empty
/// element is an empty sequence, an empty map, or `None`.
pub(crate) fn from_text_value<T: DeserializeOwned>(value: Value) -> Result<T, serde_json::Error> {
    T::deserialize(TextValue(value))
}

struct TextValue(Value);

fn parse<T>(text: &str) -> Result<T, serde_json::Error>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    text.trim()
        .parse()
        .map_err(|err| <serde_json::Error as de::Error>::custom(format!("{text:?}: {err}")))
}

macro_rules! parse_text {
    ($($method:ident => $visit:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
                match self.0 {
                    Value::String(text) => visitor.$visit(parse::<$ty>(&text)?),
                    other => other.$method(visitor),
                }
            }
        )*
    };
}

impl<'de> Deserializer<'de> for TextValue {
    type Error = serde_json::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Array(items) => visitor.visit_seq(Items(items.into_iter())),
            Value::Object(fields) => visitor.visit_map(Fields::new(fields)),
            other => other.deserialize_any(visitor),
        }
    }

    parse_text! {
        deserialize_bool => visit_bool(bool),
        deserialize_i8 => visit_i8(i8),
        deserialize_i16 => visit_i16(i16),
        deserialize_i32 => visit_i32(i32),
        deserialize_i64 => visit_i64(i64),
        deserialize_u8 => visit_u8(u8),
        deserialize_u16 => visit_u16(u16),
        deserialize_u32 => visit_u32(u32),
        deserialize_u64 => visit_u64(u64),
        deserialize_f32 => visit_f32(f32),
        deserialize_f64 => visit_f64(f64),
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(TextValue(other)),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Null => visitor.visit_unit(),
            Value::String(text) if text.is_empty() => visitor.visit_unit(),
            other => other.deserialize_unit(visitor),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let items = match self.0 {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        };
        visitor.visit_seq(Items(items.into_iter()))
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Object(fields) => visitor.visit_map(Fields::new(fields)),
            Value::Null => visitor.visit_map(Fields::new(Map::new())),
            Value::String(text) if text.is_empty() => visitor.visit_map(Fields::new(Map::new())),
            other => other.deserialize_map(visitor),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.0.deserialize_enum(name, variants, visitor)
    }

    forward_to_deserialize_any! {
        i128 u128 char str string bytes byte_buf identifier ignored_any
    }
}

struct Items(std::vec::IntoIter<Value>);

impl<'de> SeqAccess<'de> for Items {
    type Error = serde_json::Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, Self::Error> {
        self.0
            .next()
            .map(|item| seed.deserialize(TextValue(item)))
            .transpose()
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.0.len())
    }
}

struct Fields {
    entries: serde_json::map::IntoIter,
    pending: Option<Value>,
}

impl Fields {
    fn new(fields: Map<String, Value>) -> Self {
        Self {
            entries: fields.into_iter(),
            pending: None,
        }
    }
}

impl<'de> MapAccess<'de> for Fields {
    type Error = serde_json::Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        let Some((key, value)) = self.entries.next() else {
            return Ok(None);
        };
        self.pending = Some(value);
        seed.deserialize(Value::String(key)).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, Self::Error> {
        let value = self.pending.take().ok_or_else(|| {
            <serde_json::Error as de::Error>::custom("map value requested before its key")
        })?;
        seed.deserialize(TextValue(value))
    }
}
