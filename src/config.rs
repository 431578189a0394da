//! Table construction options
//!
//! Options can be built in code or loaded from a YAML or JSON file:
//!
//! ```yaml
//! write_back: immediate
//! separator: "\t"
//! codec:
//!   quoting: always
//! line_store:
//!   engine: rope
//!   line_ending: crlf
//! ```

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::codec::{Codec, CodecOptions, Delimiter};
use crate::error::Result;
use crate::store::LineStoreOptions;

/// When a row handle writes its fields back to the line store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteBack {
    /// Every mutation re-encodes and writes the line before returning
    Immediate,
    /// Mutations mark the row dirty; it is written once on flush or release
    #[default]
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    pub write_back: WriteBack,

    /// Cache live row handles and keep them in step with structural changes.
    ///
    /// With `false` every `get` decodes a fresh, unregistered handle that
    /// writes through immediately (the write-back mode is ignored). Such
    /// handles are never reindexed, so they must not be kept across an
    /// insert, remove or splice.
    pub hold_rows: bool,

    /// Shortcut for `codec.separator`; takes precedence when set
    pub separator: Option<char>,

    /// Forwarded to the codec
    pub codec: CodecOptions,

    /// Forwarded to the line store
    pub line_store: LineStoreOptions,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            write_back: WriteBack::Deferred,
            hold_rows: true,
            separator: None,
            codec: CodecOptions::default(),
            line_store: LineStoreOptions::default(),
        }
    }
}

impl TableOptions {
    pub fn immediate() -> Self {
        Self {
            write_back: WriteBack::Immediate,
            ..Self::default()
        }
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = Some(separator);
        self
    }

    /// Effective codec options after applying the `separator` shortcut
    pub fn codec_options(&self) -> CodecOptions {
        let mut codec = self.codec.clone();
        if self.separator.is_some() {
            codec.separator = self.separator;
        }
        codec
    }

    /// Build the codec, defaulting the separator from the file at `path`
    pub(crate) fn build_codec(&self, path: Option<&Path>) -> Result<Codec> {
        let fallback = path.map(Delimiter::for_file).unwrap_or_default();
        Codec::new(&self.codec_options(), fallback)
    }

    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse YAML table options")
    }

    pub fn from_json_str(content: &str) -> anyhow::Result<Self> {
        serde_json::from_str(content).context("Failed to parse JSON table options")
    }

    /// Load options from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read options from {}", path.display()))?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let options = if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
        .with_context(|| format!("Invalid options file {}", path.display()))?;

        tracing::info!("Loaded table options from {}", path.display());
        Ok(options)
    }

    /// Save options as YAML
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create directory {}", parent.display())
            })?;
        }
        let content = serde_yaml::to_string(self).context("Failed to serialize table options")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write options to {}", path.display()))?;
        Ok(())
    }
}
