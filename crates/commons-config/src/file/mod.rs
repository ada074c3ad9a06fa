//! File-backed configurations.
//!
//! A [`FileConfig`] owns a [`Config`] and a [`ConfigFormat`] that turns raw
//! bytes into properties and back. Loading parses into a fresh config and
//! assigns it only once parsing succeeded, so a failed load leaves the
//! previous contents in place.

mod properties;
mod toml;
mod xml;

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::error::{ConfigError, ConfigResult};

pub use self::properties::{Charset, PropertiesConfig, PropertiesFormat};
pub use self::toml::{TomlConfig, TomlFormat};
pub use self::xml::{XmlConfig, XmlFormat};

/// A text or binary representation of a whole [`Config`].
pub trait ConfigFormat {
    /// Short name used in log events.
    const NAME: &'static str;

    /// Parse raw file contents into a new config.
    fn parse(&self, bytes: &[u8]) -> ConfigResult<Config>;

    /// Write `config` to `out`.
    fn render<W: Write>(&self, config: &Config, out: &mut W) -> ConfigResult<()>;
}

/// Where the loaded contents came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSource {
    /// File path (None when loaded from a stream)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// SHA-256 digest of the raw bytes, hex-encoded
    pub digest: String,
}

impl ConfigSource {
    fn new(path: Option<&Path>, bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self {
            path: path.map(Path::to_path_buf),
            digest: hex::encode(hasher.finalize()),
        }
    }
}

/// A [`Config`] persisted in the format `F`.
#[derive(Debug, Default)]
pub struct FileConfig<F> {
    config: Config,
    format: F,
    source: Option<ConfigSource>,
}

impl<F: ConfigFormat + Default> FileConfig<F> {
    pub fn new() -> Self {
        Self::with_format(F::default())
    }
}

impl<F: ConfigFormat> FileConfig<F> {
    pub fn with_format(format: F) -> Self {
        Self {
            config: Config::new(),
            format,
            source: None,
        }
    }

    /// Wrap an existing config, e.g. to store it.
    pub fn from_config(config: Config, format: F) -> Self {
        Self {
            config,
            format,
            source: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_inner(self) -> Config {
        self.config
    }

    pub fn format(&self) -> &F {
        &self.format
    }

    /// Source of the last successful load.
    pub fn source(&self) -> Option<&ConfigSource> {
        self.source.as_ref()
    }

    /// Replace the contents with the properties stored at `path`.
    pub fn load(&mut self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| ConfigError::io(Some(path), e))?;
        self.load_bytes(Some(path), &bytes)
    }

    /// Replace the contents with the properties read from `input`.
    pub fn load_from<R: Read>(&mut self, mut input: R) -> ConfigResult<()> {
        let mut bytes = Vec::new();
        input
            .read_to_end(&mut bytes)
            .map_err(|e| ConfigError::io(None, e))?;
        self.load_bytes(None, &bytes)
    }

    fn load_bytes(&mut self, path: Option<&Path>, bytes: &[u8]) -> ConfigResult<()> {
        let parsed = self.format.parse(bytes)?;
        let report = self.config.assign(&parsed);
        let source = ConfigSource::new(path, bytes);
        tracing::debug!(
            format = F::NAME,
            path = ?source.path,
            digest = %source.digest,
            properties = report.created,
            "loaded configuration"
        );
        self.source = Some(source);
        Ok(())
    }

    /// Write the contents to `path`, replacing the file.
    pub fn store(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let mut bytes = Vec::new();
        self.format.render(&self.config, &mut bytes)?;
        fs::write(path, &bytes).map_err(|e| ConfigError::io(Some(path), e))?;
        tracing::debug!(
            format = F::NAME,
            path = %path.display(),
            properties = self.config.len(),
            "stored configuration"
        );
        Ok(())
    }

    /// Write the contents to `out`.
    pub fn store_to<W: Write>(&self, mut out: W) -> ConfigResult<()> {
        self.format.render(&self.config, &mut out)?;
        out.flush().map_err(|e| ConfigError::io(None, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_source_records_path_and_digest() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app.properties");
        fs::write(&path, "a=1\n").unwrap();

        let mut file = PropertiesConfig::new();
        assert!(file.source().is_none());
        file.load(&path).unwrap();

        let source = file.source().unwrap();
        assert_eq!(source.path.as_deref(), Some(path.as_path()));
        assert_eq!(source.digest.len(), 64);
        assert_eq!(source.digest, ConfigSource::new(None, b"a=1\n").digest);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.xml");
        let err = XmlConfig::new().load(&path).unwrap_err();
        match err {
            ConfigError::Io { path: Some(p), .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_failed_load_keeps_previous_contents() {
        let mut file = XmlConfig::new();
        file.load_from("<configuration><property name=\"a\" type=\"INT\"><value>1</value></property></configuration>".as_bytes())
            .unwrap();
        let digest = file.source().unwrap().digest.clone();

        assert!(file.load_from("<settings/>".as_bytes()).is_err());
        assert_eq!(file.config().get_int("a"), Some(1));
        assert_eq!(file.source().unwrap().digest, digest);
    }

    #[test]
    fn test_stream_source_has_no_path() {
        let mut file = TomlConfig::new();
        file.load_from("a = 1".as_bytes()).unwrap();
        assert!(file.source().unwrap().path.is_none());
        let json = serde_json::to_string(file.source().unwrap()).unwrap();
        assert!(!json.contains("path"));
    }
}
