// Codec seam: turns a `serde_json::Value` into bytes and back.
use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use crate::core::error::{Error, ErrorKind};
use crate::core::xml;

/// A marshal/unmarshal pair implementing one data encoding.
///
/// Implementations are expected to round-trip: `unmarshal(&marshal(v)?)?` must be
/// observably equal to `v` for every value the encoding supports. Storage handles
/// rely on this but do not check it.
pub trait Codec: Send + Sync {
    fn marshal(&self, value: &Value) -> Result<Vec<u8>, Error>;

    fn unmarshal(&self, buf: &[u8]) -> Result<Value, Error>;

    /// True when `unmarshal` yields every scalar as a string (XML element text, say).
    /// Such values are parsed against the destination type while loading.
    fn text_scalars(&self) -> bool {
        false
    }
}

type MarshalFn = dyn Fn(&Value) -> Result<Vec<u8>, Error> + Send + Sync;
type UnmarshalFn = dyn Fn(&[u8]) -> Result<Value, Error> + Send + Sync;

/// Codec assembled from two closures, for encodings that are not worth a named type.
pub struct FnCodec {
    marshal: Box<MarshalFn>,
    unmarshal: Box<UnmarshalFn>,
}

impl FnCodec {
    pub fn new<M, U>(marshal: M, unmarshal: U) -> Self
    where
        M: Fn(&Value) -> Result<Vec<u8>, Error> + Send + Sync + 'static,
        U: Fn(&[u8]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        Self {
            marshal: Box::new(marshal),
            unmarshal: Box::new(unmarshal),
        }
    }
}

impl Codec for FnCodec {
    fn marshal(&self, value: &Value) -> Result<Vec<u8>, Error> {
        (self.marshal)(value)
    }

    fn unmarshal(&self, buf: &[u8]) -> Result<Value, Error> {
        (self.unmarshal)(buf)
    }
}

impl fmt::Debug for FnCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCodec").finish_non_exhaustive()
    }
}

/// Built-in encodings.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Format {
    /// Compact JSON with no trailing newline.
    #[default]
    Json,
    /// Indented JSON.
    JsonPretty,
    /// Compact JSON wrapped in padded standard base64.
    Base64Json,
    /// TOML; the top-level value must be a table.
    Toml,
    /// YAML block style.
    Yaml,
    /// XML under a `<value>` root element; see `core::xml` for the mapping.
    Xml,
}

impl Format {
    pub const ALL: [Format; 6] = [
        Format::Json,
        Format::JsonPretty,
        Format::Base64Json,
        Format::Toml,
        Format::Yaml,
        Format::Xml,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::JsonPretty => "json-pretty",
            Format::Base64Json => "base64-json",
            Format::Toml => "toml",
            Format::Yaml => "yaml",
            Format::Xml => "xml",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Format::Json | Format::JsonPretty => "json",
            Format::Base64Json => "b64",
            Format::Toml => "toml",
            Format::Yaml => "yaml",
            Format::Xml => "xml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Format::ALL
            .into_iter()
            .find(|format| format.name() == name)
            .ok_or_else(|| {
                Error::new(ErrorKind::Usage)
                    .with_message(format!("unknown format: {name}"))
                    .with_hint("Use one of: json, json-pretty, base64-json, toml, yaml, xml.")
            })
    }
}

impl Codec for Format {
    fn marshal(&self, value: &Value) -> Result<Vec<u8>, Error> {
        match self {
            Format::Json => serde_json::to_vec(value).map_err(encode_error),
            Format::JsonPretty => serde_json::to_vec_pretty(value).map_err(encode_error),
            Format::Base64Json => {
                let json = serde_json::to_vec(value).map_err(encode_error)?;
                Ok(STANDARD.encode(json).into_bytes())
            }
            Format::Toml => toml::to_string(value)
                .map(String::into_bytes)
                .map_err(encode_error),
            Format::Yaml => serde_yaml::to_string(value)
                .map(String::into_bytes)
                .map_err(encode_error),
            Format::Xml => xml::to_xml(value),
        }
    }

    fn unmarshal(&self, buf: &[u8]) -> Result<Value, Error> {
        match self {
            Format::Json | Format::JsonPretty => serde_json::from_slice(buf).map_err(decode_error),
            Format::Base64Json => {
                let json = STANDARD.decode(buf.trim_ascii()).map_err(decode_error)?;
                serde_json::from_slice(&json).map_err(decode_error)
            }
            Format::Toml => {
                let text = std::str::from_utf8(buf).map_err(decode_error)?;
                toml::from_str(text).map_err(decode_error)
            }
            Format::Yaml => serde_yaml::from_slice(buf).map_err(decode_error),
            Format::Xml => xml::from_xml(buf),
        }
    }

    fn text_scalars(&self) -> bool {
        matches!(self, Format::Xml)
    }
}

pub fn encode_error(source: impl std::error::Error + Send + Sync + 'static) -> Error {
    Error::new(ErrorKind::Encode).with_source(source)
}

pub fn decode_error(source: impl std::error::Error + Send + Sync + 'static) -> Error {
    Error::new(ErrorKind::Decode).with_source(source)
}
