// Load/store sequences shared by every backend; the only code that takes a `Lock`.
use std::io::{Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Number, Value};
use tracing::{debug, trace};

use crate::core::codec::{Codec, decode_error, encode_error};
use crate::core::error::Error;
use crate::core::lock::Lock;
use crate::core::xml::from_text_value;

/// Reads `stream` to exhaustion under `lock` and decodes it into `dest`.
///
/// `dest` is replaced only when both the read and the decode succeed.
pub fn load_from<R, T>(
    stream: &mut R,
    dest: &mut T,
    codec: &dyn Codec,
    lock: &Lock,
) -> Result<(), Error>
where
    R: Read + ?Sized,
    T: DeserializeOwned,
{
    let _guard = lock.acquire();
    trace!("load lock acquired");

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).map_err(Error::io)?;

    let value = codec.unmarshal(&buf)?;
    *dest = decode(value, codec)?;
    debug!(bytes = buf.len(), "loaded value");
    Ok(())
}

/// Encodes `value` and writes the whole payload to `stream` under `lock`.
///
/// Encoding runs before the lock is taken.
pub fn store_to<W, T>(
    stream: &mut W,
    value: &T,
    codec: &dyn Codec,
    lock: &Lock,
) -> Result<(), Error>
where
    W: Write + ?Sized,
    T: Serialize + ?Sized,
{
    let buf = encode(value, codec)?;
    write_payload(stream, &buf, lock)
}

/// Serializes `value` and runs it through `codec`. Takes no lock.
pub(crate) fn encode<T>(value: &T, codec: &dyn Codec) -> Result<Vec<u8>, Error>
where
    T: Serialize + ?Sized,
{
    let mut value = serde_json::to_value(value).map_err(encode_error)?;
    integral_floats_as_integers(&mut value);
    codec.marshal(&value)
}

/// Writes an already encoded payload under `lock`.
pub(crate) fn write_payload<W: Write + ?Sized>(
    stream: &mut W,
    buf: &[u8],
    lock: &Lock,
) -> Result<(), Error> {
    let _guard = lock.acquire();
    trace!("store lock acquired");

    stream.write_all(buf).map_err(Error::io)?;
    stream.flush().map_err(Error::io)?;
    debug!(bytes = buf.len(), "stored value");
    Ok(())
}

fn decode<T: DeserializeOwned>(value: Value, codec: &dyn Codec) -> Result<T, Error> {
    let typed = if codec.text_scalars() {
        from_text_value(value)
    } else {
        serde_json::from_value(value)
    };
    typed.map_err(decode_error)
}

// `42.0_f64` is stored as `42`; it still loads back into an `f64`.
fn integral_floats_as_integers(value: &mut Value) {
    match value {
        Value::Number(number) => {
            if number.is_f64() {
                if let Some(float) = number.as_f64() {
                    if float.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(&float)
                    {
                        *number = Number::from(float as i64);
                    }
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(integral_floats_as_integers),
        Value::Object(fields) => fields.values_mut().for_each(integral_floats_as_integers),
        _ => {}
    }
}
