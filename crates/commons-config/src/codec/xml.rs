//! XML encoding of configurations.
//!
//! ```xml
//! <configuration>
//!   <property name="ports" type="INT" final="false">
//!     <description>listening ports</description>
//!     <value>80</value>
//!     <value>443</value>
//!   </property>
//! </configuration>
//! ```
//!
//! Null entries are written as `<value null="true"/>`. An untyped property
//! has no `type` attribute and no values.

use std::io::{Read, Write};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::config::Config;
use crate::error::SerializationError;
use crate::property::Property;
use crate::value::{PropertyType, Value};

const ROOT: &str = "configuration";
const PROPERTY: &str = "property";
const DESCRIPTION: &str = "description";
const VALUE: &str = "value";

type Result<T> = std::result::Result<T, SerializationError>;

/// XML codec for [`Config`].
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec {
    indent: Option<usize>,
}

impl XmlCodec {
    /// Compact output without line breaks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretty output indented by `spaces` per level.
    pub fn with_indent(spaces: usize) -> Self {
        Self {
            indent: Some(spaces),
        }
    }

    pub fn encode<W: Write>(&self, config: &Config, out: W) -> Result<()> {
        match self.indent {
            Some(spaces) => write_document(&mut Writer::new_with_indent(out, b' ', spaces), config),
            None => write_document(&mut Writer::new(out), config),
        }
    }

    pub fn to_string(&self, config: &Config) -> Result<String> {
        let mut buf = Vec::new();
        self.encode(config, &mut buf)?;
        String::from_utf8(buf).map_err(|_| SerializationError::InvalidUtf8)
    }

    pub fn decode<R: Read>(&self, mut input: R) -> Result<Config> {
        let mut text = String::new();
        input.read_to_string(&mut text)?;
        self.from_str(&text)
    }

    pub fn from_str(&self, xml: &str) -> Result<Config> {
        let config = Config::new();
        for property in XmlReader::new(xml).read_document()? {
            config.insert(property);
        }
        tracing::trace!(properties = config.len(), "decoded XML configuration");
        Ok(config)
    }
}

fn write_document<W: Write>(writer: &mut Writer<W>, config: &Config) -> Result<()> {
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(SerializationError::xml)?;
    let properties = config.properties();
    if properties.is_empty() {
        writer
            .write_event(Event::Empty(BytesStart::new(ROOT)))
            .map_err(SerializationError::xml)?;
        return Ok(());
    }
    writer
        .write_event(Event::Start(BytesStart::new(ROOT)))
        .map_err(SerializationError::xml)?;
    for property in &properties {
        write_property(writer, property)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(ROOT)))
        .map_err(SerializationError::xml)?;
    Ok(())
}

fn write_property<W: Write>(writer: &mut Writer<W>, property: &Property) -> Result<()> {
    let mut start = BytesStart::new(PROPERTY);
    start.push_attribute(("name", property.name()));
    if let Some(ty) = property.value_type() {
        start.push_attribute(("type", ty.as_str()));
    }
    start.push_attribute(("final", if property.is_final() { "true" } else { "false" }));

    if property.is_empty() && property.description().is_none() {
        writer
            .write_event(Event::Empty(start))
            .map_err(SerializationError::xml)?;
        return Ok(());
    }

    writer
        .write_event(Event::Start(start))
        .map_err(SerializationError::xml)?;
    if let Some(description) = property.description() {
        write_text_element(writer, DESCRIPTION, description)?;
    }
    for value in property.raw_values() {
        match value.to_text() {
            Some(text) => write_text_element(writer, VALUE, &text)?,
            None => writer
                .write_event(Event::Empty(
                    BytesStart::new(VALUE).with_attributes([("null", "true")]),
                ))
                .map_err(SerializationError::xml)?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(PROPERTY)))
        .map_err(SerializationError::xml)?;
    Ok(())
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    if text.is_empty() {
        writer
            .write_event(Event::Empty(BytesStart::new(name)))
            .map_err(SerializationError::xml)?;
        return Ok(());
    }
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(SerializationError::xml)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(SerializationError::xml)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(SerializationError::xml)?;
    Ok(())
}

/// Attributes and children of a `<property>` being read.
struct PendingProperty {
    name: String,
    ty: Option<PropertyType>,
    is_final: bool,
    description: Option<String>,
    /// Text of each `<value>`; `None` for null entries.
    texts: Vec<Option<String>>,
}

impl PendingProperty {
    fn from_start(e: &BytesStart<'_>) -> Result<Self> {
        let mut name = None;
        let mut ty = None;
        let mut is_final = false;
        for attr in e.attributes() {
            let attr = attr.map_err(SerializationError::xml)?;
            let value = attr.unescape_value().map_err(SerializationError::xml)?;
            match attr.key.as_ref() {
                b"name" => name = Some(value.into_owned()),
                b"type" => ty = Some(value.parse::<PropertyType>()?),
                b"final" => is_final = value.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }
        let name = name.ok_or_else(|| SerializationError::MissingAttribute {
            element: PROPERTY.to_string(),
            attribute: "name".to_string(),
        })?;
        Ok(Self {
            name,
            ty,
            is_final,
            description: None,
            texts: Vec::new(),
        })
    }

    fn finish(self) -> Result<Property> {
        let values = match self.ty {
            Some(ty) => self
                .texts
                .iter()
                .map(|text| match text {
                    Some(text) => Value::parse(ty, text),
                    None => Ok(Value::Null),
                })
                .collect::<Result<Vec<_>>>()?,
            None if !self.texts.is_empty() => {
                return Err(SerializationError::MissingAttribute {
                    element: PROPERTY.to_string(),
                    attribute: "type".to_string(),
                })
            }
            None => Vec::new(),
        };
        Ok(Property::from_parts(
            self.name,
            self.ty,
            values,
            self.is_final,
            self.description,
        )?)
    }
}

/// Where the reader is in the document.
enum Position {
    Prolog,
    Root,
    InProperty(PendingProperty),
    Epilog,
}

/// Text collection for the leaf element currently open.
enum Leaf {
    Description(String),
    Value(String),
}

struct XmlReader<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> XmlReader<'a> {
    fn new(xml: &'a str) -> Self {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;
        Self { reader }
    }

    fn read_document(&mut self) -> Result<Vec<Property>> {
        let mut properties = Vec::new();
        let mut position = Position::Prolog;
        let mut leaf: Option<Leaf> = None;

        loop {
            let event = self.reader.read_event().map_err(SerializationError::xml)?;
            match event {
                Event::Start(e) | Event::Empty(e) if leaf.is_some() => {
                    return Err(SerializationError::UnexpectedElement {
                        parent: VALUE.to_string(),
                        found: element_name(&e),
                    });
                }
                Event::Start(e) => {
                    position = self.open(position, &e, false, &mut leaf, &mut properties)?;
                }
                Event::Empty(e) => {
                    position = self.open(position, &e, true, &mut leaf, &mut properties)?;
                }
                Event::Text(e) => {
                    if let Some(Leaf::Description(text) | Leaf::Value(text)) = leaf.as_mut() {
                        text.push_str(&e.unescape().map_err(SerializationError::xml)?);
                    }
                }
                Event::CData(e) => {
                    if let Some(Leaf::Description(text) | Leaf::Value(text)) = leaf.as_mut() {
                        text.push_str(&String::from_utf8_lossy(e.as_ref()));
                    }
                }
                Event::End(_) => {
                    position = match (position, leaf.take()) {
                        (Position::InProperty(mut pending), Some(Leaf::Description(text))) => {
                            pending.description = Some(text);
                            Position::InProperty(pending)
                        }
                        (Position::InProperty(mut pending), Some(Leaf::Value(text))) => {
                            pending.texts.push(Some(text));
                            Position::InProperty(pending)
                        }
                        (Position::InProperty(pending), None) => {
                            properties.push(pending.finish()?);
                            Position::Root
                        }
                        (Position::Root, _) => Position::Epilog,
                        (other, _) => other,
                    };
                }
                Event::Eof => break,
                _ => {}
            }
        }

        match position {
            Position::Epilog => Ok(properties),
            Position::Prolog => Err(SerializationError::Xml("empty document".to_string())),
            _ => Err(SerializationError::Xml(format!(
                "unexpected end of document inside <{}>",
                ROOT
            ))),
        }
    }

    /// Handle an opening (or self-closing) tag.
    fn open(
        &self,
        position: Position,
        e: &BytesStart<'_>,
        empty: bool,
        leaf: &mut Option<Leaf>,
        properties: &mut Vec<Property>,
    ) -> Result<Position> {
        let name = element_name(e);
        match position {
            Position::Prolog if name == ROOT => Ok(if empty { Position::Epilog } else { Position::Root }),
            Position::Prolog => Err(SerializationError::UnexpectedRoot { found: name }),
            Position::Root if name == PROPERTY => {
                let pending = PendingProperty::from_start(e)?;
                if empty {
                    properties.push(pending.finish()?);
                    Ok(Position::Root)
                } else {
                    Ok(Position::InProperty(pending))
                }
            }
            Position::InProperty(mut pending) if name == VALUE => {
                let is_null = e
                    .try_get_attribute("null")
                    .map_err(SerializationError::xml)?
                    .map(|a| a.value.as_ref() == b"true")
                    .unwrap_or(false);
                if empty {
                    pending
                        .texts
                        .push(if is_null { None } else { Some(String::new()) });
                } else {
                    *leaf = Some(Leaf::Value(String::new()));
                }
                Ok(Position::InProperty(pending))
            }
            Position::InProperty(mut pending) if name == DESCRIPTION => {
                if empty {
                    pending.description = Some(String::new());
                } else {
                    *leaf = Some(Leaf::Description(String::new()));
                }
                Ok(Position::InProperty(pending))
            }
            Position::InProperty(_) => Err(SerializationError::UnexpectedElement {
                parent: PROPERTY.to_string(),
                found: name,
            }),
            Position::Root => Err(SerializationError::UnexpectedElement {
                parent: ROOT.to_string(),
                found: name,
            }),
            Position::Epilog => Err(SerializationError::Xml(format!(
                "element <{}> after the root element",
                name
            ))),
        }
    }
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{BigDecimal, BigInteger, ClassName, EnumValue};
    use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

    fn populated() -> Config {
        let config = Config::new();
        config.set("flag", false);
        config.set("tiny", i8::MIN);
        config.set("short", -1234i16);
        config.set_all("ports", [80i32, 443]);
        config.set("big", i64::MAX);
        config.set_all("scale", [1.5f32, f32::NEG_INFINITY]);
        config.set_all("edges", [f64::NAN, -0.0, 0.0]);
        config.set(
            "stamp",
            DateTime::parse_from_rfc3339("2021-06-01T12:00:00.000000004Z")
                .unwrap()
                .with_timezone(&Utc),
        );
        config.set("huge", "-123456789012345678901234567890".parse::<BigInteger>().unwrap());
        config.set_final("name", "a <b> & 'c'", true);
        config.set("space", ' ');
        config.set("padded", "  keep me  ");
        config.set("empty", "");
        config.set("ratio", 0.1f64);
        config.set("day", NaiveDate::from_ymd_opt(2000, 1, 1).unwrap());
        config.set("at", NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        config.set("money", "0.10".parse::<BigDecimal>().unwrap());
        config.set("blob", vec![9u8, 8, 7]);
        config.set("mode", EnumValue::new("app.Mode", "FAST"));
        config.set("kind", ClassName::new("app.Handler"));
        config.set_null("home", PropertyType::String).unwrap();
        config.insert(Property::new("untyped").described("later"));
        config.insert(Property::new("bare"));
        config
    }

    #[test]
    fn test_round_trip_compact() {
        let codec = XmlCodec::new();
        let config = populated();
        let xml = codec.to_string(&config).unwrap();
        assert_eq!(codec.from_str(&xml).unwrap(), config);
    }

    #[test]
    fn test_fixture_covers_every_type() {
        let config = populated();
        for ty in PropertyType::ALL {
            assert!(
                config.properties().iter().any(|p| p.value_type() == Some(ty)),
                "no {ty} property"
            );
        }
    }

    #[test]
    fn test_round_trip_indented() {
        let codec = XmlCodec::with_indent(2);
        let config = populated();
        let xml = codec.to_string(&config).unwrap();
        assert!(xml.contains("\n  <property"));
        assert_eq!(codec.from_str(&xml).unwrap(), config);
    }

    #[test]
    fn test_document_shape() {
        let config = Config::new();
        config.insert(
            Property::with_values("ports", [80i32, 443])
                .described("listening ports"),
        );
        let xml = XmlCodec::new().to_string(&config).unwrap();
        assert!(xml.contains(
            "<configuration><property name=\"ports\" type=\"INT\" final=\"false\">\
             <description>listening ports</description>\
             <value>80</value><value>443</value></property></configuration>"
        ));
    }

    #[test]
    fn test_empty_property_has_no_values() {
        let config = Config::new();
        config.set_all("list", Vec::<i64>::new());
        let xml = XmlCodec::new().to_string(&config).unwrap();
        assert!(xml.contains("<property name=\"list\" type=\"LONG\" final=\"false\"/>"));
        let decoded = XmlCodec::new().from_str(&xml).unwrap();
        assert!(decoded.get("list").unwrap().is_empty());
    }

    #[test]
    fn test_null_value_marker() {
        let config = Config::new();
        config.set_null("home", PropertyType::String).unwrap();
        let xml = XmlCodec::new().to_string(&config).unwrap();
        assert!(xml.contains("<value null=\"true\"/>"));
    }

    #[test]
    fn test_wrong_root_element() {
        let err = XmlCodec::new().from_str("<settings/>").unwrap_err();
        assert!(matches!(err, SerializationError::UnexpectedRoot { found } if found == "settings"));
    }

    #[test]
    fn test_unknown_child_element() {
        let err = XmlCodec::new()
            .from_str("<configuration><entry/></configuration>")
            .unwrap_err();
        assert!(matches!(err, SerializationError::UnexpectedElement { .. }));
    }

    #[test]
    fn test_missing_name_attribute() {
        let err = XmlCodec::new()
            .from_str("<configuration><property type=\"INT\"/></configuration>")
            .unwrap_err();
        assert!(matches!(err, SerializationError::MissingAttribute { .. }));
    }

    #[test]
    fn test_bad_value_text() {
        let err = XmlCodec::new()
            .from_str(
                "<configuration><property name=\"a\" type=\"INT\">\
                 <value>ten</value></property></configuration>",
            )
            .unwrap_err();
        assert!(matches!(err, SerializationError::InvalidValue { .. }));
    }

    #[test]
    fn test_unclosed_document() {
        let err = XmlCodec::new()
            .from_str("<configuration><property name=\"a\" type=\"INT\">")
            .unwrap_err();
        assert!(matches!(err, SerializationError::Xml(_)));
    }

    #[test]
    fn test_empty_configuration() {
        let xml = XmlCodec::new().to_string(&Config::new()).unwrap();
        assert!(xml.ends_with("<configuration/>"));
        assert!(XmlCodec::new().from_str(&xml).unwrap().is_empty());
    }
}
