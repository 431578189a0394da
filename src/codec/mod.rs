//! Record codec
//!
//! Translates between one line of text and an ordered list of string fields.
//! Parsing and quoting follow RFC 4180 through the csv crate, restricted to a
//! single physical line per record: fields with embedded line breaks are
//! rejected on encode, and lines that would need them are rejected on decode.
//!
//! A [`Codec`] is configuration only. One instance is shared read-only by every
//! row of a table.

mod delimiter;

pub use delimiter::{detect_delimiter, Delimiter};

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Error type for record encoding/decoding
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("cannot encode record: {0}")]
    Encode(String),
    #[error("cannot decode record: {0}")]
    Decode(String),
}

/// When fields are wrapped in quote characters on encode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quoting {
    /// Only fields containing the separator or the quote character
    #[default]
    Necessary,
    Always,
    /// Every field that does not parse as a number
    NonNumeric,
    /// Never quote; fields that would need it cannot be encoded
    Never,
}

impl Quoting {
    fn style(self) -> csv::QuoteStyle {
        match self {
            Quoting::Necessary => csv::QuoteStyle::Necessary,
            Quoting::Always => csv::QuoteStyle::Always,
            Quoting::NonNumeric => csv::QuoteStyle::NonNumeric,
            Quoting::Never => csv::QuoteStyle::Never,
        }
    }
}

/// Codec configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    /// Field separator. `None` lets the table pick one for the file.
    pub separator: Option<char>,
    pub quote: char,
    pub quoting: Quoting,
    /// Escape character for quotes inside quoted fields. `None` means quotes
    /// are escaped by doubling them.
    pub escape: Option<char>,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            separator: None,
            quote: '"',
            quoting: Quoting::Necessary,
            escape: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codec {
    delimiter: u8,
    quote: u8,
    quoting: Quoting,
    escape: Option<u8>,
}

impl Default for Codec {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            quoting: Quoting::Necessary,
            escape: None,
        }
    }
}

impl Codec {
    /// Build a codec, using `fallback` when the options name no separator
    pub fn new(options: &CodecOptions, fallback: Delimiter) -> Result<Self> {
        let separator = options.separator.unwrap_or(fallback.char());
        let delimiter = config_byte(separator, "separator")?;
        let quote = config_byte(options.quote, "quote")?;
        let escape = options
            .escape
            .map(|c| config_byte(c, "escape"))
            .transpose()?;

        if delimiter == quote {
            return Err(Error::construction(format!(
                "separator and quote are both {:?}",
                separator
            )));
        }
        if escape == Some(delimiter) {
            return Err(Error::construction(format!(
                "separator and escape are both {:?}",
                separator
            )));
        }

        Ok(Self {
            delimiter,
            quote,
            quoting: options.quoting,
            escape,
        })
    }

    pub fn separator(&self) -> char {
        self.delimiter as char
    }

    pub fn quoting(&self) -> Quoting {
        self.quoting
    }

    /// Encode fields into a single line (without terminator)
    pub fn encode<S: AsRef<str>>(&self, fields: &[S]) -> std::result::Result<String, CodecError> {
        for field in fields {
            let field = field.as_ref();
            if field.contains(['\n', '\r']) {
                return Err(CodecError::Encode(
                    "field contains a line break".to_string(),
                ));
            }
            if self.quoting == Quoting::Never
                && field
                    .bytes()
                    .any(|b| b == self.delimiter || b == self.quote)
            {
                return Err(CodecError::Encode(format!(
                    "field {:?} needs quoting but quoting is disabled",
                    field
                )));
            }
        }

        let fields: Vec<Cow<'_, str>> = fields
            .iter()
            .map(|f| self.escape_field(f.as_ref()))
            .collect();

        match fields.as_slice() {
            [] => return Ok(String::new()),
            // A lone empty field would otherwise be an empty line, which
            // decodes to no fields at all.
            [only] if only.is_empty() => {
                if self.quoting == Quoting::Never {
                    return Err(CodecError::Encode(
                        "a lone empty field needs quoting but quoting is disabled".to_string(),
                    ));
                }
                let quote = self.quote as char;
                return Ok(format!("{}{}", quote, quote));
            }
            _ => {}
        }

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .quote(self.quote)
            .quote_style(self.quoting.style())
            .double_quote(self.escape.is_none())
            .escape(self.escape.unwrap_or(b'\\'))
            .terminator(csv::Terminator::Any(b'\n'))
            .flexible(true)
            .has_headers(false)
            .from_writer(Vec::new());

        writer
            .write_record(fields.iter().map(|f| f.as_bytes()))
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        let mut bytes = writer
            .into_inner()
            .map_err(|e| CodecError::Encode(e.to_string()))?;

        if bytes.last() == Some(&b'\n') {
            bytes.pop();
        }

        String::from_utf8(bytes).map_err(|e| CodecError::Encode(e.to_string()))
    }

    /// Double the escape character so a quoted field reads it back literally
    ///
    /// The writer quotes any field holding the escape character but only
    /// escapes quotes inside it. Unquoted fields never need this, since the
    /// reader only honors the escape inside quotes.
    fn escape_field<'a>(&self, field: &'a str) -> Cow<'a, str> {
        match self.escape {
            Some(escape) if self.quoting != Quoting::Never => {
                let escape = escape as char;
                if field.contains(escape) {
                    Cow::Owned(field.replace(escape, &format!("{}{}", escape, escape)))
                } else {
                    Cow::Borrowed(field)
                }
            }
            _ => Cow::Borrowed(field),
        }
    }

    /// Decode a single line (without terminator) into fields
    ///
    /// An empty line decodes to no fields.
    pub fn decode(&self, line: &str) -> std::result::Result<Vec<String>, CodecError> {
        if line.contains(['\n', '\r']) {
            return Err(CodecError::Decode("line contains a line break".to_string()));
        }
        if line.is_empty() {
            return Ok(Vec::new());
        }
        if self.quoting != Quoting::Never {
            self.check_quotes(line)?;
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .quote(self.quote)
            .quoting(self.quoting != Quoting::Never)
            .double_quote(self.escape.is_none())
            .escape(self.escape)
            .has_headers(false)
            .flexible(true)
            .from_reader(line.as_bytes());

        let mut records = reader.records();
        let record = match records.next() {
            Some(result) => result.map_err(|e| CodecError::Decode(e.to_string()))?,
            None => return Ok(Vec::new()),
        };
        if records.next().is_some() {
            return Err(CodecError::Decode(
                "line holds more than one record".to_string(),
            ));
        }

        Ok(record.iter().map(|s| s.to_string()).collect())
    }

    /// Reject a quoted field that is still open at the end of the line
    fn check_quotes(&self, line: &str) -> std::result::Result<(), CodecError> {
        let bytes = line.as_bytes();
        let mut in_quotes = false;
        let mut at_field_start = true;
        let mut i = 0;

        while i < bytes.len() {
            let b = bytes[i];
            if in_quotes {
                if Some(b) == self.escape {
                    i += 2;
                    continue;
                }
                if b == self.quote {
                    if self.escape.is_none() && bytes.get(i + 1) == Some(&self.quote) {
                        i += 2;
                        continue;
                    }
                    in_quotes = false;
                }
            } else if b == self.delimiter {
                at_field_start = true;
                i += 1;
                continue;
            } else if b == self.quote && at_field_start {
                in_quotes = true;
            }
            at_field_start = false;
            i += 1;
        }

        if in_quotes {
            return Err(CodecError::Decode("unterminated quoted field".to_string()));
        }
        Ok(())
    }
}

fn config_byte(c: char, what: &str) -> Result<u8> {
    if !c.is_ascii() || c == '\n' || c == '\r' {
        return Err(Error::construction(format!(
            "{} {:?} must be a single ASCII character other than a line break",
            what, c
        )));
    }
    Ok(c as u8)
}
