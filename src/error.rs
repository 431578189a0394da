//! Error and warning types
//!
//! Errors abort the operation that raised them with no partial effect.
//! Warnings never abort anything: they are emitted through `tracing` and kept
//! in a small per-table log (see [`crate::Table::take_warnings`]).

use std::fmt;

use crate::codec::CodecError;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The line store or codec could not be initialized
    #[error("cannot construct table: {message}")]
    Construction { message: String },

    /// Fields could not be serialized under the active configuration
    #[error(transparent)]
    Encode(CodecError),

    /// A stored line could not be parsed under the active configuration
    #[error("{}", decode_message(.index, .source))]
    Decode {
        index: Option<usize>,
        #[source]
        source: CodecError,
    },

    #[error("line store I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

fn decode_message(index: &Option<usize>, source: &CodecError) -> String {
    match index {
        Some(index) => format!("line {}: {}", index, source),
        None => source.to_string(),
    }
}

impl Error {
    pub(crate) fn construction(message: impl Into<String>) -> Self {
        Error::Construction {
            message: message.into(),
        }
    }

    pub(crate) fn decode_at(index: usize, source: CodecError) -> Self {
        Error::Decode {
            index: Some(index),
            source,
        }
    }

    pub fn is_encode(&self) -> bool {
        matches!(self, Error::Encode(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode { .. })
    }
}

/// Non-fatal conditions reported while operating on a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A write was directed at a row whose line no longer exists.
    /// The change stays in memory and is dropped on write.
    SeveredWrite { fields: Vec<String> },

    /// A splice asked for a range outside the table and was clamped
    ClampedSplice {
        requested_offset: usize,
        requested_count: usize,
        offset: usize,
        count: usize,
    },

    /// A deferred row could not be written when it was released
    FlushFailed { index: usize, message: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::SeveredWrite { fields } => write!(
                f,
                "write to a severed row ({} fields) was kept in memory only",
                fields.len()
            ),
            Warning::ClampedSplice {
                requested_offset,
                requested_count,
                offset,
                count,
            } => write!(
                f,
                "splice({}, {}) clamped to splice({}, {})",
                requested_offset, requested_count, offset, count
            ),
            Warning::FlushFailed { index, message } => {
                write!(f, "flush of row {} failed: {}", index, message)
            }
        }
    }
}
