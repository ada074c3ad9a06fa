//! XML configuration files.

use std::io::Write;

use super::{ConfigFormat, FileConfig};
use crate::codec::XmlCodec;
use crate::config::Config;
use crate::error::{ConfigResult, SerializationError};

/// The XML format written by [`XmlCodec`]; indented by two spaces unless
/// built from another codec.
#[derive(Debug, Clone, Copy)]
pub struct XmlFormat {
    codec: XmlCodec,
}

impl XmlFormat {
    pub fn new(codec: XmlCodec) -> Self {
        Self { codec }
    }
}

impl Default for XmlFormat {
    fn default() -> Self {
        Self::new(XmlCodec::with_indent(2))
    }
}

impl ConfigFormat for XmlFormat {
    const NAME: &'static str = "xml";

    fn parse(&self, bytes: &[u8]) -> ConfigResult<Config> {
        let text = std::str::from_utf8(bytes).map_err(|_| SerializationError::InvalidUtf8)?;
        Ok(self.codec.from_str(text)?)
    }

    fn render<W: Write>(&self, config: &Config, out: &mut W) -> ConfigResult<()> {
        Ok(self.codec.encode(config, out)?)
    }
}

/// A [`Config`] persisted as an XML file.
pub type XmlConfig = FileConfig<XmlFormat>;
