//! Property value model.
//!
//! A [`Value`] is a tagged union over the closed set of [`PropertyType`]s.
//! Conversions between Rust types and values go through [`IntoValue`] and
//! [`FromValue`], so the container needs one generic setter/getter pair
//! instead of one per type.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::SerializationError;

/// Element type of a property.
///
/// Declaration order is the ordinal used by the binary format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyType {
    Boolean,
    Char,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    Date,
    Time,
    #[serde(rename = "DATETIME")]
    DateTime,
    BigInteger,
    BigDecimal,
    ByteArray,
    Enum,
    Class,
}

impl PropertyType {
    /// All types in ordinal order.
    pub const ALL: [PropertyType; 17] = [
        Self::Boolean,
        Self::Char,
        Self::Byte,
        Self::Short,
        Self::Int,
        Self::Long,
        Self::Float,
        Self::Double,
        Self::String,
        Self::Date,
        Self::Time,
        Self::DateTime,
        Self::BigInteger,
        Self::BigDecimal,
        Self::ByteArray,
        Self::Enum,
        Self::Class,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(ordinal as usize).copied()
    }

    /// Upper-case name used by the XML format.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "BOOLEAN",
            Self::Char => "CHAR",
            Self::Byte => "BYTE",
            Self::Short => "SHORT",
            Self::Int => "INT",
            Self::Long => "LONG",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::String => "STRING",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::DateTime => "DATETIME",
            Self::BigInteger => "BIG_INTEGER",
            Self::BigDecimal => "BIG_DECIMAL",
            Self::ByteArray => "BYTE_ARRAY",
            Self::Enum => "ENUM",
            Self::Class => "CLASS",
        }
    }

    /// Reference types admit a null entry; primitives do not.
    pub fn is_reference(self) -> bool {
        self.ordinal() >= Self::String.ordinal()
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = SerializationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|ty| ty.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| SerializationError::UnknownType(s.to_string()))
    }
}

/// Malformed arbitrary-precision literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} literal '{text}'")]
pub struct InvalidNumber {
    kind: &'static str,
    text: String,
}

/// Arbitrary-precision integer literal.
///
/// Only the decimal text is kept, in canonical form: no `+` sign, no leading
/// zeros and no negative zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BigInteger(String);

impl BigInteger {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.starts_with('-')
    }

    /// Narrow to `i128` when the value fits.
    pub fn to_i128(&self) -> Option<i128> {
        self.0.parse().ok()
    }
}

impl FromStr for BigInteger {
    type Err = InvalidNumber;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidNumber {
            kind: "integer",
            text: s.to_string(),
        };
        let (negative, digits) = split_sign(s);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let trimmed = digits.trim_start_matches('0');
        if trimmed.is_empty() {
            return Ok(Self("0".to_string()));
        }
        let text = if negative {
            format!("-{}", trimmed)
        } else {
            trimmed.to_string()
        };
        Ok(Self(text))
    }
}

impl From<i64> for BigInteger {
    fn from(v: i64) -> Self {
        Self(v.to_string())
    }
}

impl From<i128> for BigInteger {
    fn from(v: i128) -> Self {
        Self(v.to_string())
    }
}

impl From<u64> for BigInteger {
    fn from(v: u64) -> Self {
        Self(v.to_string())
    }
}

impl fmt::Display for BigInteger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Arbitrary-precision decimal literal.
///
/// The scale is kept as written, so `1.0` and `1.00` are different values.
/// A leading `+` is dropped and the exponent marker is normalised to `E`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BigDecimal(String);

impl BigDecimal {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of digits after the decimal point, ignoring any exponent.
    pub fn fraction_digits(&self) -> usize {
        let mantissa = self.0.split('E').next().unwrap_or_default();
        mantissa.split_once('.').map(|(_, f)| f.len()).unwrap_or(0)
    }

    /// Lossy conversion to `f64`.
    pub fn to_f64(&self) -> Option<f64> {
        self.0.parse().ok()
    }
}

impl FromStr for BigDecimal {
    type Err = InvalidNumber;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidNumber {
            kind: "decimal",
            text: s.to_string(),
        };
        let (negative, rest) = split_sign(s);
        let (mantissa, exponent) = match rest.find(['e', 'E']) {
            Some(pos) => (&rest[..pos], Some(&rest[pos + 1..])),
            None => (rest, None),
        };
        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((i, f)) => (i, f),
            None => (mantissa, ""),
        };
        let all_digits = |t: &str| t.bytes().all(|b| b.is_ascii_digit());
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(invalid());
        }
        let mut text = String::with_capacity(s.len());
        if negative {
            text.push('-');
        }
        text.push_str(mantissa);
        if let Some(exp) = exponent {
            let (exp_negative, exp_digits) = split_sign(exp);
            if exp_digits.is_empty() || !all_digits(exp_digits) {
                return Err(invalid());
            }
            text.push('E');
            if exp_negative {
                text.push('-');
            }
            text.push_str(exp_digits);
        }
        Ok(Self(text))
    }
}

impl From<i64> for BigDecimal {
    fn from(v: i64) -> Self {
        Self(v.to_string())
    }
}

impl fmt::Display for BigDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn split_sign(s: &str) -> (bool, &str) {
    if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = s.strip_prefix('+') {
        (false, rest)
    } else {
        (false, s)
    }
}

/// A named constant of a named enumeration type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub type_name: String,
    pub constant: String,
}

impl EnumValue {
    pub fn new(type_name: impl Into<String>, constant: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            constant: constant.into(),
        }
    }

    /// Parse `TypeName.CONSTANT`; the constant is the segment after the
    /// last dot.
    pub fn parse(text: &str) -> Option<Self> {
        let (type_name, constant) = text.rsplit_once('.')?;
        if type_name.is_empty() || constant.is_empty() {
            return None;
        }
        Some(Self::new(type_name, constant))
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.constant)
    }
}

/// Fully-qualified name of a type, stored by CLASS properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassName(pub String);

impl ClassName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single stored value.
///
/// Equality compares `Float` and `Double` by bit pattern: `NaN` equals
/// itself and `0.0` differs from `-0.0`.
#[derive(Debug, Clone)]
pub enum Value {
    Boolean(bool),
    Char(char),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(DateTime<Utc>),
    BigInteger(BigInteger),
    BigDecimal(BigDecimal),
    ByteArray(Vec<u8>),
    Enum(EnumValue),
    Class(ClassName),
    /// Null entry of a reference-typed property.
    Null,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Short(a), Self::Short(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Time(a), Self::Time(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            (Self::BigInteger(a), Self::BigInteger(b)) => a == b,
            (Self::BigDecimal(a), Self::BigDecimal(b)) => a == b,
            (Self::ByteArray(a), Self::ByteArray(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::Class(a), Self::Class(b)) => a == b,
            (Self::Null, Self::Null) => true,
            _ => false,
        }
    }
}

impl Value {
    /// Type of this value; `None` for [`Value::Null`].
    pub fn value_type(&self) -> Option<PropertyType> {
        let ty = match self {
            Self::Boolean(_) => PropertyType::Boolean,
            Self::Char(_) => PropertyType::Char,
            Self::Byte(_) => PropertyType::Byte,
            Self::Short(_) => PropertyType::Short,
            Self::Int(_) => PropertyType::Int,
            Self::Long(_) => PropertyType::Long,
            Self::Float(_) => PropertyType::Float,
            Self::Double(_) => PropertyType::Double,
            Self::String(_) => PropertyType::String,
            Self::Date(_) => PropertyType::Date,
            Self::Time(_) => PropertyType::Time,
            Self::DateTime(_) => PropertyType::DateTime,
            Self::BigInteger(_) => PropertyType::BigInteger,
            Self::BigDecimal(_) => PropertyType::BigDecimal,
            Self::ByteArray(_) => PropertyType::ByteArray,
            Self::Enum(_) => PropertyType::Enum,
            Self::Class(_) => PropertyType::Class,
            Self::Null => return None,
        };
        Some(ty)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text form used by the XML and properties formats.
    ///
    /// Returns `None` for null entries.
    pub fn to_text(&self) -> Option<String> {
        let text = match self {
            Self::Boolean(v) => v.to_string(),
            Self::Char(v) => v.to_string(),
            Self::Byte(v) => v.to_string(),
            Self::Short(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Long(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Double(v) => v.to_string(),
            Self::String(v) => v.clone(),
            Self::Date(v) => v.format("%Y-%m-%d").to_string(),
            Self::Time(v) => v.format("%H:%M:%S%.f").to_string(),
            Self::DateTime(v) => v.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            Self::BigInteger(v) => v.to_string(),
            Self::BigDecimal(v) => v.to_string(),
            Self::ByteArray(v) => base64::engine::general_purpose::STANDARD.encode(v),
            Self::Enum(v) => v.to_string(),
            Self::Class(v) => v.to_string(),
            Self::Null => return None,
        };
        Some(text)
    }

    /// Parse the text form of a value of type `ty`.
    pub fn parse(ty: PropertyType, text: &str) -> Result<Self, SerializationError> {
        let bad = |reason: &dyn fmt::Display| SerializationError::invalid_value(ty, text, reason);
        let value = match ty {
            PropertyType::Boolean => {
                if text.eq_ignore_ascii_case("true") {
                    Self::Boolean(true)
                } else if text.eq_ignore_ascii_case("false") {
                    Self::Boolean(false)
                } else {
                    return Err(bad(&"expected true or false"));
                }
            }
            PropertyType::Char => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::Char(c),
                    _ => return Err(bad(&"expected exactly one character")),
                }
            }
            PropertyType::Byte => Self::Byte(text.parse().map_err(|e| bad(&e))?),
            PropertyType::Short => Self::Short(text.parse().map_err(|e| bad(&e))?),
            PropertyType::Int => Self::Int(text.parse().map_err(|e| bad(&e))?),
            PropertyType::Long => Self::Long(text.parse().map_err(|e| bad(&e))?),
            PropertyType::Float => Self::Float(text.parse().map_err(|e| bad(&e))?),
            PropertyType::Double => Self::Double(text.parse().map_err(|e| bad(&e))?),
            PropertyType::String => Self::String(text.to_string()),
            PropertyType::Date => Self::Date(text.parse().map_err(|e| bad(&e))?),
            PropertyType::Time => Self::Time(text.parse().map_err(|e| bad(&e))?),
            PropertyType::DateTime => Self::DateTime(
                DateTime::parse_from_rfc3339(text)
                    .map_err(|e| bad(&e))?
                    .with_timezone(&Utc),
            ),
            PropertyType::BigInteger => Self::BigInteger(text.parse().map_err(|e| bad(&e))?),
            PropertyType::BigDecimal => Self::BigDecimal(text.parse().map_err(|e| bad(&e))?),
            PropertyType::ByteArray => Self::ByteArray(
                base64::engine::general_purpose::STANDARD
                    .decode(text)
                    .map_err(|e| bad(&e))?,
            ),
            PropertyType::Enum => {
                Self::Enum(EnumValue::parse(text).ok_or_else(|| bad(&"expected Type.CONSTANT"))?)
            }
            PropertyType::Class => Self::Class(ClassName::new(text)),
        };
        Ok(value)
    }
}

/// Conversion of a Rust value into a property [`Value`].
pub trait IntoValue {
    /// Property type the converted value carries.
    const TYPE: PropertyType;

    fn into_value(self) -> Value;
}

/// Extraction of a Rust value from a property [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! value_conversions {
    ($($rust:ty => $variant:ident),* $(,)?) => {
        $(
            impl IntoValue for $rust {
                const TYPE: PropertyType = PropertyType::$variant;

                fn into_value(self) -> Value {
                    Value::$variant(self)
                }
            }

            impl FromValue for $rust {
                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(v.clone()),
                        _ => None,
                    }
                }
            }
        )*
    };
}

value_conversions! {
    bool => Boolean,
    char => Char,
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    String => String,
    NaiveDate => Date,
    NaiveTime => Time,
    DateTime<Utc> => DateTime,
    BigInteger => BigInteger,
    BigDecimal => BigDecimal,
    Vec<u8> => ByteArray,
    EnumValue => Enum,
    ClassName => Class,
}

impl IntoValue for &str {
    const TYPE: PropertyType = PropertyType::String;

    fn into_value(self) -> Value {
        Value::String(self.to_string())
    }
}

impl IntoValue for &[u8] {
    const TYPE: PropertyType = PropertyType::ByteArray;

    fn into_value(self) -> Value {
        Value::ByteArray(self.to_vec())
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Values of a reference type, the only kinds a property may hold as null.
///
/// Primitive types do not implement it, so `Option<i32>` cannot be stored:
///
/// ```compile_fail
/// use commons_config::Property;
///
/// let mut port = Property::new("port");
/// port.set(None::<i32>);
/// ```
pub trait ReferenceValue: IntoValue + sealed::Sealed {}

macro_rules! reference_values {
    ($($rust:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $rust {}
            impl ReferenceValue for $rust {}
        )*
    };
}

reference_values! {
    String,
    &str,
    NaiveDate,
    NaiveTime,
    DateTime<Utc>,
    BigInteger,
    BigDecimal,
    Vec<u8>,
    &[u8],
    EnumValue,
    ClassName,
}

/// `None` becomes a null entry of the wrapped type.
impl<T: ReferenceValue> IntoValue for Option<T> {
    const TYPE: PropertyType = T::TYPE;

    fn into_value(self) -> Value {
        self.map(IntoValue::into_value).unwrap_or(Value::Null)
    }
}

/// Null entries read back as `Some(None)`.
impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}
