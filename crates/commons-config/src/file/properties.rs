//! Java-style `.properties` files.
//!
//! Every entry loads as a STRING value appended with [`Config::add`], so a
//! key repeated on several lines becomes a multi-valued property. Storing
//! writes one `key=value` line per value, keys sorted.

use std::io::Write;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::{ConfigFormat, FileConfig};
use crate::config::Config;
use crate::error::{ConfigError, ConfigResult, SerializationError};

/// Character encoding of a properties file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Charset {
    /// UTF-8, written without `\u` escapes.
    #[default]
    Utf8,
    /// ISO-8859-1; characters above `~` are written as `\uXXXX`.
    Latin1,
}

impl Charset {
    fn decode(self, bytes: &[u8]) -> ConfigResult<String> {
        match self {
            Self::Utf8 => String::from_utf8(bytes.to_vec())
                .map_err(|_| ConfigError::Serialization(SerializationError::InvalidUtf8)),
            Self::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }

    fn ascii_only(self) -> bool {
        matches!(self, Self::Latin1)
    }
}

/// The `.properties` format.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertiesFormat {
    charset: Charset,
}

impl PropertiesFormat {
    pub fn new(charset: Charset) -> Self {
        Self { charset }
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    fn write_header<W: Write>(
        &self,
        out: &mut W,
        comment: Option<&str>,
        stamp: DateTime<FixedOffset>,
    ) -> ConfigResult<()> {
        let mut header = String::new();
        if let Some(comment) = comment {
            for line in comment.lines() {
                header.push('#');
                header.push_str(&escape(line, EscapeMode::Comment, self.charset.ascii_only()));
                header.push('\n');
            }
        }
        header.push('#');
        header.push_str(&stamp.format("%a %b %d %H:%M:%S %:z %Y").to_string());
        header.push('\n');
        out.write_all(header.as_bytes())
            .map_err(|e| ConfigError::io(None, e))
    }
}

impl ConfigFormat for PropertiesFormat {
    const NAME: &'static str = "properties";

    fn parse(&self, bytes: &[u8]) -> ConfigResult<Config> {
        let text = self.charset.decode(bytes)?;
        let config = Config::new();
        for entry in LogicalLines::new(&text) {
            let (key, value) = split_entry(&entry.text);
            let key = unescape(key, entry.line)?;
            let value = unescape(value, entry.line)?;
            config.add(&key, value)?;
        }
        Ok(config)
    }

    fn render<W: Write>(&self, config: &Config, out: &mut W) -> ConfigResult<()> {
        let ascii_only = self.charset.ascii_only();
        let mut text = String::new();
        for property in config.properties() {
            let key = escape(property.name(), EscapeMode::Key, ascii_only);
            for value in property.raw_values() {
                let value = value.to_text().unwrap_or_default();
                text.push_str(&key);
                text.push('=');
                text.push_str(&escape(&value, EscapeMode::Value, ascii_only));
                text.push('\n');
            }
        }
        out.write_all(text.as_bytes())
            .map_err(|e| ConfigError::io(None, e))
    }
}

/// A [`Config`] persisted as a `.properties` file.
pub type PropertiesConfig = FileConfig<PropertiesFormat>;

impl FileConfig<PropertiesFormat> {
    pub fn with_charset(charset: Charset) -> Self {
        Self::with_format(PropertiesFormat::new(charset))
    }

    /// Write the contents to `out` after a comment header: the optional
    /// `comment` lines, then `stamp`.
    pub fn store_with_header<W: Write>(
        &self,
        mut out: W,
        comment: Option<&str>,
        stamp: DateTime<FixedOffset>,
    ) -> ConfigResult<()> {
        self.format().write_header(&mut out, comment, stamp)?;
        self.store_to(out)
    }
}

/// One key/value line after joining continuations.
struct LogicalLine {
    /// 1-based number of the first natural line.
    line: usize,
    text: String,
}

/// Iterator over logical lines: comments and blank lines are dropped,
/// leading whitespace is stripped and continuation lines are joined.
struct LogicalLines<'a> {
    lines: std::iter::Enumerate<std::str::Split<'a, char>>,
}

impl<'a> LogicalLines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.split('\n').enumerate(),
        }
    }
}

impl Iterator for LogicalLines<'_> {
    type Item = LogicalLine;

    fn next(&mut self) -> Option<LogicalLine> {
        let mut current: Option<LogicalLine> = None;
        for (idx, raw) in self.lines.by_ref() {
            let raw = raw.strip_suffix('\r').unwrap_or(raw);
            let trimmed = raw.trim_start_matches(is_blank);
            if current.is_none() && (trimmed.is_empty() || trimmed.starts_with(is_comment_mark)) {
                continue;
            }
            let logical = current.get_or_insert_with(|| LogicalLine {
                line: idx + 1,
                text: String::new(),
            });
            if continues(trimmed) {
                logical.text.push_str(&trimmed[..trimmed.len() - 1]);
                continue;
            }
            logical.text.push_str(trimmed);
            return current;
        }
        current
    }
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\u{c}')
}

fn is_comment_mark(c: char) -> bool {
    c == '#' || c == '!'
}

/// A line ending in an odd number of backslashes continues on the next.
fn continues(line: &str) -> bool {
    line.bytes().rev().take_while(|&b| b == b'\\').count() % 2 == 1
}

/// Split a logical line at the first unescaped `=`, `:` or blank.
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut split = None;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                split = Some((i, true));
                break;
            }
            c if is_blank(c) => {
                split = Some((i, false));
                break;
            }
            _ => {}
        }
    }
    let Some((at, has_separator)) = split else {
        return (line, "");
    };
    let key = &line[..at];
    let mut rest = line[at + 1..].trim_start_matches(is_blank);
    if !has_separator {
        if let Some(after) = rest.strip_prefix(|c: char| c == '=' || c == ':') {
            rest = after.trim_start_matches(is_blank);
        }
    }
    (key, rest)
}

fn unescape(text: &str, line: usize) -> ConfigResult<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let unit = read_unit(&mut chars, line)?;
                let code = if (0xD800..0xDC00).contains(&unit) {
                    let rest = chars.as_str();
                    let low = rest
                        .strip_prefix("\\u")
                        .and_then(|hex| hex.get(..4))
                        .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                        .filter(|low| (0xDC00..0xE000).contains(low))
                        .ok_or_else(|| ConfigError::parse(line, "unpaired surrogate in \\u escape"))?;
                    chars = rest[6..].chars();
                    0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00)
                } else {
                    unit
                };
                let decoded = char::from_u32(code)
                    .ok_or_else(|| ConfigError::parse(line, "unpaired surrogate in \\u escape"))?;
                out.push(decoded);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}

fn read_unit(chars: &mut std::str::Chars<'_>, line: usize) -> ConfigResult<u32> {
    let hex: String = chars.by_ref().take(4).collect();
    if hex.len() != 4 {
        return Err(ConfigError::parse(line, "malformed \\uxxxx encoding"));
    }
    u32::from_str_radix(&hex, 16).map_err(|_| ConfigError::parse(line, "malformed \\uxxxx encoding"))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EscapeMode {
    Key,
    Value,
    Comment,
}

fn escape(text: &str, mode: EscapeMode, ascii_only: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.chars().enumerate() {
        if mode == EscapeMode::Comment {
            if ascii_only && u32::from(c) > 0x7E {
                push_unicode_escape(&mut out, c);
            } else {
                out.push(c);
            }
            continue;
        }
        match c {
            ' ' if mode == EscapeMode::Key || i == 0 => out.push_str("\\ "),
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{c}' => out.push_str("\\f"),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            c if u32::from(c) < 0x20 || (ascii_only && u32::from(c) > 0x7E) => {
                push_unicode_escape(&mut out, c);
            }
            c => out.push(c),
        }
    }
    out
}

fn push_unicode_escape(out: &mut String, c: char) {
    let mut units = [0u16; 2];
    for unit in c.encode_utf16(&mut units) {
        out.push_str(&format!("\\u{:04X}", unit));
    }
}
