//! Error types for the configuration container and its codecs.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::value::PropertyType;

/// Errors raised by a single [`Property`](crate::Property) mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// Appending or unioning values of a different type.
    #[error("property '{name}' holds {expected} values, cannot add {actual}")]
    TypeMismatch {
        name: String,
        expected: PropertyType,
        actual: PropertyType,
    },

    /// A null entry was requested for a primitive type.
    #[error("property '{name}' cannot hold a null {ty} value")]
    NullNotAllowed { name: String, ty: PropertyType },
}

/// Errors from the binary, XML and TOML encoders.
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("expected root element <configuration>, found <{found}>")]
    UnexpectedRoot { found: String },

    #[error("unexpected element <{found}> inside <{parent}>")]
    UnexpectedElement { parent: String, found: String },

    #[error("element <{element}> is missing attribute '{attribute}'")]
    MissingAttribute { element: String, attribute: String },

    #[error("unknown property type: {0}")]
    UnknownType(String),

    #[error("unexpected null {what}")]
    UnexpectedNull { what: String },

    #[error("invalid {ty} value '{text}': {reason}")]
    InvalidValue {
        ty: PropertyType,
        text: String,
        reason: String,
    },

    #[error("invalid UTF-8 in string payload")]
    InvalidUtf8,

    #[error("variable-length integer is too long")]
    VarintOverflow,

    #[error("XML error: {0}")]
    Xml(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("{0} trailing bytes after configuration payload")]
    TrailingData(usize),

    #[error(transparent)]
    Property(#[from] PropertyError),
}

impl SerializationError {
    pub(crate) fn invalid_value(
        ty: PropertyType,
        text: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::InvalidValue {
            ty,
            text: text.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn xml(err: impl ToString) -> Self {
        Self::Xml(err.to_string())
    }
}

/// Configuration errors.
///
/// Load and store failures surface as this single type with the original
/// cause attached.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error on {}: {source}", path.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "<stream>".to_string()))]
    Io {
        path: Option<PathBuf>,
        #[source]
        source: io::Error,
    },

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error(transparent)]
    Property(#[from] PropertyError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

impl ConfigError {
    pub(crate) fn io(path: Option<&std::path::Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.map(|p| p.to_path_buf()),
            source,
        }
    }

    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
