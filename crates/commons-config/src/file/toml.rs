//! TOML configuration files.
//!
//! Tables are flattened into dotted property names, so
//!
//! ```toml
//! [server]
//! ports = [80, 443]
//! ```
//!
//! loads as the LONG property `server.ports` with two values. Arrays of
//! tables use the element index as a name segment (`servers.0.host`).

use std::io::Write;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use toml::value::Datetime;
use toml::{Table, Value as TomlValue};

use super::{ConfigFormat, FileConfig};
use crate::config::Config;
use crate::error::{ConfigError, ConfigResult, SerializationError};
use crate::property::Property;
use crate::value::{PropertyType, Value};

/// The TOML format.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlFormat;

impl ConfigFormat for TomlFormat {
    const NAME: &'static str = "toml";

    fn parse(&self, bytes: &[u8]) -> ConfigResult<Config> {
        let text = std::str::from_utf8(bytes).map_err(|_| SerializationError::InvalidUtf8)?;
        let table: Table = text.parse().map_err(|e: toml::de::Error| {
            let line = e
                .span()
                .map(|span| text[..span.start].matches('\n').count() + 1)
                .unwrap_or(0);
            ConfigError::parse(line, e.message())
        })?;
        let config = Config::new();
        flatten_table("", table, &config)?;
        Ok(config)
    }

    fn render<W: Write>(&self, config: &Config, out: &mut W) -> ConfigResult<()> {
        let mut table = Table::new();
        for property in config.properties() {
            let mut items = Vec::with_capacity(property.len());
            for value in property.raw_values() {
                if let Some(item) = to_toml(value)? {
                    items.push(item);
                }
            }
            let item = match items.len() {
                0 => continue,
                1 => items.remove(0),
                _ => TomlValue::Array(items),
            };
            table.insert(property.name().to_string(), item);
        }
        let text = toml::to_string(&table).map_err(SerializationError::from)?;
        out.write_all(text.as_bytes())
            .map_err(|e| ConfigError::io(None, e))
    }
}

/// A [`Config`] persisted as a TOML file.
pub type TomlConfig = FileConfig<TomlFormat>;

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn flatten_table(prefix: &str, table: Table, config: &Config) -> ConfigResult<()> {
    for (key, value) in table {
        flatten_value(join(prefix, &key), value, config)?;
    }
    Ok(())
}

fn flatten_value(name: String, value: TomlValue, config: &Config) -> ConfigResult<()> {
    match value {
        TomlValue::Table(table) => flatten_table(&name, table, config),
        TomlValue::Array(items) if items.iter().all(TomlValue::is_table) && !items.is_empty() => {
            for (index, item) in items.into_iter().enumerate() {
                flatten_value(join(&name, &index.to_string()), item, config)?;
            }
            Ok(())
        }
        TomlValue::Array(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(scalar(&name, item)?);
            }
            let ty = values.first().and_then(Value::value_type);
            if let Some(ty) = ty {
                if let Some(other) = values.iter().find(|v| v.value_type() != Some(ty)) {
                    return Err(ConfigError::parse(
                        0,
                        format!(
                            "array '{}' mixes {} and {} values",
                            name,
                            ty,
                            other.value_type().map_or("null", PropertyType::as_str)
                        ),
                    ));
                }
            }
            config.insert(Property::from_parts(name, ty, values, false, None)?);
            Ok(())
        }
        scalar_value => {
            let value = scalar(&name, scalar_value)?;
            let ty = value.value_type();
            config.insert(Property::from_parts(name, ty, vec![value], false, None)?);
            Ok(())
        }
    }
}

fn scalar(name: &str, value: TomlValue) -> ConfigResult<Value> {
    let value = match value {
        TomlValue::String(s) => Value::String(s),
        TomlValue::Integer(i) => Value::Long(i),
        TomlValue::Float(f) => Value::Double(f),
        TomlValue::Boolean(b) => Value::Boolean(b),
        TomlValue::Datetime(dt) => from_datetime(name, &dt)?,
        TomlValue::Array(_) | TomlValue::Table(_) => {
            return Err(ConfigError::parse(
                0,
                format!("array '{}' holds nested arrays or tables", name),
            ))
        }
    };
    Ok(value)
}

fn from_datetime(name: &str, dt: &Datetime) -> ConfigResult<Value> {
    let text = dt.to_string();
    let bad = |reason: chrono::ParseError| {
        ConfigError::parse(0, format!("property '{}': invalid datetime '{}': {}", name, text, reason))
    };
    let value = match (dt.date.is_some(), dt.time.is_some(), dt.offset.is_some()) {
        (true, false, _) => Value::Date(text.parse::<NaiveDate>().map_err(bad)?),
        (false, true, _) => Value::Time(text.parse::<NaiveTime>().map_err(bad)?),
        (true, true, true) => Value::DateTime(
            DateTime::parse_from_rfc3339(&text)
                .map_err(bad)?
                .with_timezone(&Utc),
        ),
        // Local date-times carry no offset and are read as UTC.
        _ => Value::DateTime(
            NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
                .map_err(bad)?
                .and_utc(),
        ),
    };
    Ok(value)
}

/// TOML form of a value; `None` for null entries, which TOML cannot hold.
fn to_toml(value: &Value) -> ConfigResult<Option<TomlValue>> {
    let item = match value {
        Value::Null => return Ok(None),
        Value::Boolean(v) => TomlValue::Boolean(*v),
        Value::Byte(v) => TomlValue::Integer(i64::from(*v)),
        Value::Short(v) => TomlValue::Integer(i64::from(*v)),
        Value::Int(v) => TomlValue::Integer(i64::from(*v)),
        Value::Long(v) => TomlValue::Integer(*v),
        Value::Float(v) => TomlValue::Float(f64::from(*v)),
        Value::Double(v) => TomlValue::Float(*v),
        Value::Date(v) => TomlValue::Datetime(to_datetime(&v.format("%Y-%m-%d").to_string())?),
        Value::Time(v) => TomlValue::Datetime(to_datetime(&v.format("%H:%M:%S%.f").to_string())?),
        Value::DateTime(v) => {
            TomlValue::Datetime(to_datetime(&v.to_rfc3339_opts(SecondsFormat::AutoSi, true))?)
        }
        other => match other.to_text() {
            Some(text) => TomlValue::String(text),
            None => return Ok(None),
        },
    };
    Ok(Some(item))
}

fn to_datetime(text: &str) -> ConfigResult<Datetime> {
    text.parse::<Datetime>().map_err(|e| {
        ConfigError::Serialization(SerializationError::invalid_value(
            PropertyType::DateTime,
            text,
            e,
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(text: &str) -> ConfigResult<Config> {
        TomlFormat.parse(text.as_bytes())
    }

    #[test]
    fn test_scalars_are_typed() {
        let config = parse(
            r#"
name = "web"
port = 8080
ratio = 0.5
enabled = true
"#,
        )
        .unwrap();
        assert_eq!(config.get_string("name").as_deref(), Some("web"));
        assert_eq!(config.get_long("port"), Some(8080));
        assert_eq!(config.get_double("ratio"), Some(0.5));
        assert_eq!(config.get_bool("enabled"), Some(true));
        assert_eq!(config.get("port").unwrap().value_type(), Some(PropertyType::Long));
    }

    #[test]
    fn test_tables_flatten_to_dotted_names() {
        let config = parse(
            r#"
[server]
ports = [80, 443]

[server.tls]
cert = "/etc/cert.pem"

[[workers]]
host = "a"

[[workers]]
host = "b"
"#,
        )
        .unwrap();
        assert_eq!(config.get_values::<i64>("server.ports"), vec![80, 443]);
        assert_eq!(
            config.get_string("server.tls.cert").as_deref(),
            Some("/etc/cert.pem")
        );
        assert_eq!(config.get_string("workers.0.host").as_deref(), Some("a"));
        assert_eq!(config.get_string("workers.1.host").as_deref(), Some("b"));
    }

    #[test]
    fn test_datetimes() {
        let config = parse(
            r#"
day = 2024-03-05
at = 07:32:00
stamp = 1979-05-27T07:32:00-01:00
local = 1979-05-27T07:32:00
"#,
        )
        .unwrap();
        assert_eq!(
            config.get_value::<NaiveDate>("day"),
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
        assert_eq!(
            config.get_value::<NaiveTime>("at"),
            NaiveTime::from_hms_opt(7, 32, 0)
        );
        let stamp = config.get_value::<DateTime<Utc>>("stamp").unwrap();
        assert_eq!(stamp.to_rfc3339(), "1979-05-27T08:32:00+00:00");
        let local = config.get_value::<DateTime<Utc>>("local").unwrap();
        assert_eq!(local.to_rfc3339(), "1979-05-27T07:32:00+00:00");
    }

    #[test]
    fn test_empty_array_is_untyped() {
        let config = parse("list = []").unwrap();
        let list = config.get("list").unwrap();
        assert!(list.is_empty());
        assert_eq!(list.value_type(), None);
    }

    #[test]
    fn test_mixed_array_fails() {
        let err = parse("mixed = [1, \"two\"]").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("mixed"));
    }

    #[test]
    fn test_nested_array_fails() {
        let err = parse("nested = [[1], [2]]").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let err = parse("a = 1\nb = = 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_file_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app.toml");

        let file = TomlConfig::new();
        file.config().set("server.host", "localhost");
        file.config().set_all("server.ports", [80i64, 443]);
        file.config().set("debug", false);
        file.config()
            .set("started", NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        file.store(&path).unwrap();

        let mut loaded = TomlConfig::new();
        loaded.load(&path).unwrap();
        assert_eq!(loaded.config(), file.config());
    }
}
