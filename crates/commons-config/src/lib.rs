//! Commons Config
//!
//! Typed, multi-valued configuration properties held in a thread-safe
//! container, merged between containers under a [`MergingPolicy`], and
//! persisted in binary, XML, `.properties` or TOML form.

pub mod codec;
pub mod config;
pub mod error;
pub mod file;
pub mod merge;
pub mod property;
pub mod stack;
pub mod value;

pub use codec::{BinaryCodec, XmlCodec};
pub use config::{Config, ConfigView};
pub use error::{ConfigError, ConfigResult, PropertyError, SerializationError};
pub use file::{
    Charset, ConfigFormat, ConfigSource, FileConfig, PropertiesConfig, PropertiesFormat,
    TomlConfig, TomlFormat, XmlConfig, XmlFormat,
};
pub use merge::{MergeReport, MergingPolicy, UnknownPolicy};
pub use property::Property;
pub use stack::StackConfig;
pub use value::{
    BigDecimal, BigInteger, ClassName, EnumValue, FromValue, IntoValue, InvalidNumber,
    PropertyType, ReferenceValue, Value,
};
