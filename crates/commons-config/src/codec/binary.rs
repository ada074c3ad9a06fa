//! Compact binary encoding of configurations.
//!
//! Layout:
//!
//! ```text
//! config   := nullMark:u8 [count:varint property*count]
//! property := name:string type:u8 description:nullable<string> final:u8
//!             valueCount:varint value*valueCount
//! ```
//!
//! Strings are a varint byte length followed by UTF-8. A nullable item is a
//! null mark (0 = null, 1 = present) followed by the item. Values of
//! reference types are nullable; primitives are written raw, big-endian.
//! An untyped property is written with type byte `0xFF`.

use std::io::{self, Read, Write};

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike};

use crate::config::Config;
use crate::error::SerializationError;
use crate::property::Property;
use crate::value::{BigDecimal, BigInteger, ClassName, EnumValue, PropertyType, Value};

/// Type byte of a property that has no type yet.
const NO_TYPE: u8 = 0xFF;

const NULL_MARK: u8 = 0;
const PRESENT_MARK: u8 = 1;

/// Longest LEB128 encoding of a `u64`.
const MAX_VARINT_BYTES: usize = 10;

/// Upper bound on up-front allocations driven by untrusted counts.
const MAX_PREALLOC: usize = 1024;

type Result<T> = std::result::Result<T, SerializationError>;

/// Binary codec for [`Config`] and [`Property`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

impl BinaryCodec {
    pub fn new() -> Self {
        Self
    }

    /// Write `config`, or a null mark when `None`.
    pub fn encode<W: Write>(&self, config: Option<&Config>, out: &mut W) -> Result<()> {
        let Some(config) = config else {
            out.write_all(&[NULL_MARK])?;
            return Ok(());
        };
        let properties = config.properties();
        out.write_all(&[PRESENT_MARK])?;
        write_varint(out, properties.len() as u64)?;
        for property in &properties {
            self.encode_property(property, out)?;
        }
        tracing::trace!(properties = properties.len(), "encoded configuration");
        Ok(())
    }

    /// Read a configuration; a null mark yields `None`.
    pub fn decode<R: Read>(&self, input: &mut R) -> Result<Option<Config>> {
        if read_u8(input)? == NULL_MARK {
            return Ok(None);
        }
        let count = read_varint(input)?;
        let config = Config::new();
        for _ in 0..count {
            config.insert(self.decode_property(input)?);
        }
        tracing::trace!(properties = count, "decoded configuration");
        Ok(Some(config))
    }

    pub fn encode_property<W: Write>(&self, property: &Property, out: &mut W) -> Result<()> {
        write_string(out, property.name())?;
        out.write_all(&[property.value_type().map_or(NO_TYPE, PropertyType::ordinal)])?;
        match property.description() {
            Some(description) => {
                out.write_all(&[PRESENT_MARK])?;
                write_string(out, description)?;
            }
            None => out.write_all(&[NULL_MARK])?,
        }
        out.write_all(&[u8::from(property.is_final())])?;
        write_varint(out, property.len() as u64)?;
        if let Some(ty) = property.value_type() {
            for value in property.raw_values() {
                write_value(out, ty, value)?;
            }
        }
        Ok(())
    }

    pub fn decode_property<R: Read>(&self, input: &mut R) -> Result<Property> {
        let name = read_string(input)?;
        let ty = match read_u8(input)? {
            NO_TYPE => None,
            ordinal => Some(
                PropertyType::from_ordinal(ordinal)
                    .ok_or_else(|| SerializationError::UnknownType(ordinal.to_string()))?,
            ),
        };
        let description = if read_u8(input)? == NULL_MARK {
            None
        } else {
            Some(read_string(input)?)
        };
        let is_final = read_u8(input)? != 0;
        let count = read_varint(input)?;

        let mut values = Vec::with_capacity((count as usize).min(MAX_PREALLOC));
        match ty {
            Some(ty) => {
                for _ in 0..count {
                    values.push(read_value(input, ty)?);
                }
            }
            None if count > 0 => {
                return Err(SerializationError::UnknownType(format!(
                    "untyped property '{}' with {} values",
                    name, count
                )));
            }
            None => {}
        }
        Ok(Property::from_parts(name, ty, values, is_final, description)?)
    }

    /// Encode a configuration into a fresh buffer.
    pub fn to_bytes(&self, config: &Config) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.encode(Some(config), &mut buf)?;
        Ok(buf)
    }

    /// Decode a non-null configuration that must span the whole buffer.
    pub fn from_bytes(&self, bytes: &[u8]) -> Result<Config> {
        let mut cursor = bytes;
        let config = self
            .decode(&mut cursor)?
            .ok_or_else(|| SerializationError::UnexpectedNull {
                what: "configuration".to_string(),
            })?;
        if !cursor.is_empty() {
            return Err(SerializationError::TrailingData(cursor.len()));
        }
        Ok(config)
    }
}

fn write_varint<W: Write>(out: &mut W, mut value: u64) -> io::Result<()> {
    let mut buf = [0u8; MAX_VARINT_BYTES];
    let mut len = 0;
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf[len] = byte;
            len += 1;
            break;
        }
        buf[len] = byte | 0x80;
        len += 1;
    }
    out.write_all(&buf[..len])
}

fn read_varint<R: Read>(input: &mut R) -> Result<u64> {
    let mut value = 0u64;
    for i in 0..MAX_VARINT_BYTES {
        let byte = read_u8(input)?;
        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(SerializationError::VarintOverflow)
}

fn read_u8<R: Read>(input: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    input.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_array<R: Read, const N: usize>(input: &mut R) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    input.read_exact(&mut buf)?;
    Ok(buf)
}

fn write_bytes<W: Write>(out: &mut W, bytes: &[u8]) -> io::Result<()> {
    write_varint(out, bytes.len() as u64)?;
    out.write_all(bytes)
}

fn read_bytes<R: Read>(input: &mut R) -> Result<Vec<u8>> {
    let len = read_varint(input)?;
    let mut buf = Vec::with_capacity((len as usize).min(MAX_PREALLOC));
    input.by_ref().take(len).read_to_end(&mut buf)?;
    if (buf.len() as u64) < len {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    Ok(buf)
}

fn write_string<W: Write>(out: &mut W, s: &str) -> io::Result<()> {
    write_bytes(out, s.as_bytes())
}

fn read_string<R: Read>(input: &mut R) -> Result<String> {
    String::from_utf8(read_bytes(input)?).map_err(|_| SerializationError::InvalidUtf8)
}

fn write_value<W: Write>(out: &mut W, ty: PropertyType, value: &Value) -> Result<()> {
    if ty.is_reference() {
        if value.is_null() {
            out.write_all(&[NULL_MARK])?;
            return Ok(());
        }
        out.write_all(&[PRESENT_MARK])?;
    }
    match value {
        Value::Boolean(v) => out.write_all(&[u8::from(*v)])?,
        Value::Char(v) => out.write_all(&u32::from(*v).to_be_bytes())?,
        Value::Byte(v) => out.write_all(&v.to_be_bytes())?,
        Value::Short(v) => out.write_all(&v.to_be_bytes())?,
        Value::Int(v) => out.write_all(&v.to_be_bytes())?,
        Value::Long(v) => out.write_all(&v.to_be_bytes())?,
        Value::Float(v) => out.write_all(&v.to_bits().to_be_bytes())?,
        Value::Double(v) => out.write_all(&v.to_bits().to_be_bytes())?,
        Value::String(v) => write_string(out, v)?,
        Value::Date(v) => out.write_all(&v.num_days_from_ce().to_be_bytes())?,
        Value::Time(v) => {
            out.write_all(&v.num_seconds_from_midnight().to_be_bytes())?;
            out.write_all(&v.nanosecond().to_be_bytes())?;
        }
        Value::DateTime(v) => {
            out.write_all(&v.timestamp().to_be_bytes())?;
            out.write_all(&v.timestamp_subsec_nanos().to_be_bytes())?;
        }
        Value::BigInteger(v) => write_string(out, v.as_str())?,
        Value::BigDecimal(v) => write_string(out, v.as_str())?,
        Value::ByteArray(v) => write_bytes(out, v)?,
        Value::Enum(v) => {
            write_string(out, &v.type_name)?;
            write_string(out, &v.constant)?;
        }
        Value::Class(v) => write_string(out, v.as_str())?,
        Value::Null => {
            return Err(SerializationError::UnexpectedNull {
                what: format!("{} value", ty),
            })
        }
    }
    Ok(())
}

fn read_value<R: Read>(input: &mut R, ty: PropertyType) -> Result<Value> {
    if ty.is_reference() && read_u8(input)? == NULL_MARK {
        return Ok(Value::Null);
    }
    let value = match ty {
        PropertyType::Boolean => Value::Boolean(read_u8(input)? != 0),
        PropertyType::Char => {
            let code = u32::from_be_bytes(read_array(input)?);
            Value::Char(char::from_u32(code).ok_or_else(|| {
                SerializationError::invalid_value(ty, format!("{:#x}", code), "not a scalar value")
            })?)
        }
        PropertyType::Byte => Value::Byte(i8::from_be_bytes(read_array(input)?)),
        PropertyType::Short => Value::Short(i16::from_be_bytes(read_array(input)?)),
        PropertyType::Int => Value::Int(i32::from_be_bytes(read_array(input)?)),
        PropertyType::Long => Value::Long(i64::from_be_bytes(read_array(input)?)),
        PropertyType::Float => Value::Float(f32::from_bits(u32::from_be_bytes(read_array(input)?))),
        PropertyType::Double => {
            Value::Double(f64::from_bits(u64::from_be_bytes(read_array(input)?)))
        }
        PropertyType::String => Value::String(read_string(input)?),
        PropertyType::Date => {
            let days = i32::from_be_bytes(read_array(input)?);
            Value::Date(NaiveDate::from_num_days_from_ce_opt(days).ok_or_else(|| {
                SerializationError::invalid_value(ty, days.to_string(), "day out of range")
            })?)
        }
        PropertyType::Time => {
            let secs = u32::from_be_bytes(read_array(input)?);
            let nanos = u32::from_be_bytes(read_array(input)?);
            Value::Time(
                NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos).ok_or_else(|| {
                    SerializationError::invalid_value(
                        ty,
                        format!("{}s+{}ns", secs, nanos),
                        "time out of range",
                    )
                })?,
            )
        }
        PropertyType::DateTime => {
            let secs = i64::from_be_bytes(read_array(input)?);
            let nanos = u32::from_be_bytes(read_array(input)?);
            Value::DateTime(DateTime::from_timestamp(secs, nanos).ok_or_else(|| {
                SerializationError::invalid_value(
                    ty,
                    format!("{}s+{}ns", secs, nanos),
                    "timestamp out of range",
                )
            })?)
        }
        PropertyType::BigInteger => {
            let text = read_string(input)?;
            let parsed: BigInteger = text
                .parse()
                .map_err(|e| SerializationError::invalid_value(ty, text.clone(), e))?;
            Value::BigInteger(parsed)
        }
        PropertyType::BigDecimal => {
            let text = read_string(input)?;
            let parsed: BigDecimal = text
                .parse()
                .map_err(|e| SerializationError::invalid_value(ty, text.clone(), e))?;
            Value::BigDecimal(parsed)
        }
        PropertyType::ByteArray => Value::ByteArray(read_bytes(input)?),
        PropertyType::Enum => {
            let type_name = read_string(input)?;
            let constant = read_string(input)?;
            Value::Enum(EnumValue::new(type_name, constant))
        }
        PropertyType::Class => Value::Class(ClassName::new(read_string(input)?)),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn populated() -> Config {
        let config = Config::new();
        config.set("flag", true);
        config.set("letter", 'λ');
        config.set("tiny", -3i8);
        config.set("short", 1234i16);
        config.set_all("ports", [80i32, 443]);
        config.set("big", i64::MIN);
        config.set("ratio", 0.25f32);
        config.set("pi", std::f64::consts::PI);
        config.set_all("edges", [f64::NAN, -0.0, 0.0]);
        config.set("unset", f32::NAN);
        config.set_final("name", "svc", true);
        config.set("day", NaiveDate::from_ymd_opt(1999, 12, 31).unwrap());
        config.set("at", NaiveTime::from_hms_nano_opt(1, 2, 3, 4).unwrap());
        config.set(
            "stamp",
            DateTime::parse_from_rfc3339("2021-06-01T12:00:00.5Z")
                .unwrap()
                .with_timezone(&Utc),
        );
        config.set("huge", "123456789012345678901234567890".parse::<BigInteger>().unwrap());
        config.set("money", "10.50".parse::<BigDecimal>().unwrap());
        config.set("blob", vec![0u8, 1, 2, 255]);
        config.set("mode", EnumValue::new("app.Mode", "FAST"));
        config.set("kind", ClassName::new("app.Handler"));
        config.set_null("home", PropertyType::String).unwrap();
        config.insert(Property::new("untyped").described("nothing yet"));
        config
    }

    #[test]
    fn test_round_trip_populated_config() {
        let codec = BinaryCodec::new();
        let config = populated();
        let bytes = codec.to_bytes(&config).unwrap();
        let decoded = codec.from_bytes(&bytes).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn test_null_config() {
        let codec = BinaryCodec::new();
        let mut buf = Vec::new();
        codec.encode(None, &mut buf).unwrap();
        assert_eq!(buf, vec![NULL_MARK]);
        assert!(codec.decode(&mut buf.as_slice()).unwrap().is_none());
        assert!(matches!(
            codec.from_bytes(&buf),
            Err(SerializationError::UnexpectedNull { .. })
        ));
    }

    #[test]
    fn test_property_layout() {
        let codec = BinaryCodec::new();
        let property = Property::with_value("a", 1i32).finalized(true);
        let mut buf = Vec::new();
        codec.encode_property(&property, &mut buf).unwrap();
        assert_eq!(
            buf,
            vec![
                1, b'a', // name
                PropertyType::Int.ordinal(),
                NULL_MARK, // description
                1,         // final
                1,         // value count
                0, 0, 0, 1,
            ]
        );
    }

    #[test]
    fn test_varint_boundaries() {
        for value in [0u64, 127, 128, 300, u32::MAX as u64, u64::MAX] {
            let mut buf = Vec::new();
            write_varint(&mut buf, value).unwrap();
            assert_eq!(read_varint(&mut buf.as_slice()).unwrap(), value);
        }
        let mut buf = Vec::new();
        write_varint(&mut buf, 300).unwrap();
        assert_eq!(buf, vec![0xAC, 0x02]);
    }

    #[test]
    fn test_varint_overflow() {
        let bytes = [0xFFu8; 11];
        assert!(matches!(
            read_varint(&mut bytes.as_slice()),
            Err(SerializationError::VarintOverflow)
        ));
    }

    #[test]
    fn test_truncated_input() {
        let codec = BinaryCodec::new();
        let bytes = codec.to_bytes(&populated()).unwrap();
        let err = codec.from_bytes(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(matches!(err, SerializationError::Io(_)));
    }

    #[test]
    fn test_trailing_data() {
        let codec = BinaryCodec::new();
        let mut bytes = codec.to_bytes(&Config::new()).unwrap();
        bytes.push(7);
        assert!(matches!(
            codec.from_bytes(&bytes),
            Err(SerializationError::TrailingData(1))
        ));
    }

    #[test]
    fn test_unknown_type_byte() {
        let codec = BinaryCodec::new();
        let bytes = vec![PRESENT_MARK, 1, 1, b'a', 42, NULL_MARK, 0, 0];
        assert!(matches!(
            codec.from_bytes(&bytes),
            Err(SerializationError::UnknownType(_))
        ));
    }

    #[test]
    fn test_null_in_primitive_rejected_on_write() {
        let mut buf = Vec::new();
        let err = write_value(&mut buf, PropertyType::Int, &Value::Null).unwrap_err();
        assert!(matches!(err, SerializationError::UnexpectedNull { .. }));
    }
}
