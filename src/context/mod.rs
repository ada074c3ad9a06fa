//! Locale and time-zone context passed explicitly to code that formats
//! dates or text for people.
//!
//! There is no ambient or thread-local lookup: callers build a
//! [`LocaleContext`] and hand it down.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A time zone given as a fixed UTC offset.
pub type TimeZoneSpec = FixedOffset;

/// Errors from parsing locales and time zones.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("invalid locale '{0}'")]
    InvalidLocale(String),

    #[error("invalid time zone '{0}'")]
    InvalidTimeZone(String),
}

/// A language, optional country and optional variant, e.g. `en_US`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale {
    language: String,
    country: Option<String>,
    variant: Option<String>,
}

impl Locale {
    /// Build a locale from already separated parts.
    pub fn new(language: &str, country: Option<&str>) -> Result<Self, ContextError> {
        let text = match country {
            Some(country) => format!("{}_{}", language, country),
            None => language.to_string(),
        };
        text.parse()
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    /// `en_US`.
    pub fn en_us() -> Self {
        Self {
            language: "en".to_string(),
            country: Some("US".to_string()),
            variant: None,
        }
    }
}

/// Parses `en`, `en_US`, `en-US` and `en_US_POSIX`; the language is
/// lower-cased and the country upper-cased.
impl FromStr for Locale {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ContextError::InvalidLocale(s.to_string());
        let mut parts = s.split(|c: char| c == '_' || c == '-');

        let language = parts.next().unwrap_or_default();
        if !(2..=8).contains(&language.len()) || !language.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }

        let country = match parts.next() {
            None => None,
            Some(c) if c.is_empty() => None,
            Some(c)
                if (c.len() == 2 && c.chars().all(|ch| ch.is_ascii_alphabetic()))
                    || (c.len() == 3 && c.chars().all(|ch| ch.is_ascii_digit())) =>
            {
                Some(c.to_ascii_uppercase())
            }
            Some(_) => return Err(invalid()),
        };

        let rest: Vec<&str> = parts.collect();
        let variant = if rest.is_empty() {
            None
        } else {
            let variant = rest.join("_");
            if variant.is_empty() || !variant.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(invalid());
            }
            Some(variant)
        };

        Ok(Self {
            language: language.to_ascii_lowercase(),
            country,
            variant,
        })
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.language)?;
        match (&self.country, &self.variant) {
            (Some(country), Some(variant)) => write!(f, "_{}_{}", country, variant),
            (Some(country), None) => write!(f, "_{}", country),
            (None, Some(variant)) => write!(f, "__{}", variant),
            (None, None) => Ok(()),
        }
    }
}

impl TryFrom<String> for Locale {
    type Error = ContextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.to_string()
    }
}

/// Parse `UTC`, `GMT`, `Z`, `+01:00`, `-0530` or `+09`.
pub fn parse_time_zone(text: &str) -> Result<TimeZoneSpec, ContextError> {
    let invalid = || ContextError::InvalidTimeZone(text.to_string());
    let trimmed = text.trim();
    if ["UTC", "GMT", "Z"].iter().any(|z| trimmed.eq_ignore_ascii_case(z)) {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = if let Some(rest) = trimmed.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = trimmed.strip_prefix('-') {
        (-1, rest)
    } else {
        return Err(invalid());
    };
    if !rest.is_ascii() {
        return Err(invalid());
    }
    let (hours, minutes) = match (rest.len(), rest.as_bytes().get(2)) {
        (2, _) => (rest, "00"),
        (4, _) => rest.split_at(2),
        (5, Some(b':')) => (&rest[..2], &rest[3..]),
        _ => return Err(invalid()),
    };
    if !(hours.bytes().chain(minutes.bytes())).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if minutes >= 60 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// The locale and time zone used when presenting values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleContext {
    locale: Locale,
    time_zone: TimeZoneSpec,
}

impl LocaleContext {
    pub fn new(locale: Locale, time_zone: TimeZoneSpec) -> Self {
        Self { locale, time_zone }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_time_zone(mut self, time_zone: TimeZoneSpec) -> Self {
        self.time_zone = time_zone;
        self
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn time_zone(&self) -> TimeZoneSpec {
        self.time_zone
    }

    /// The current time in this context's zone.
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.localize(Utc::now())
    }

    pub fn localize(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.time_zone)
    }

    /// Timestamp for file header comments.
    pub fn stamp(&self) -> DateTime<FixedOffset> {
        self.now()
    }
}

/// `en_US` in UTC.
impl Default for LocaleContext {
    fn default() -> Self {
        Self {
            locale: Locale::en_us(),
            time_zone: Utc.fix(),
        }
    }
}
