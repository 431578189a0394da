//! Line stores
//!
//! A line store is an ordered, randomly addressable sequence of raw text
//! lines that supports splicing. The table owns its store exclusively and is
//! the only component allowed to change its length.
//!
//! ```text
//! LineStore
//! ├── FileLineStore  (line offsets in memory, content on disk)
//! └── RopeLineStore  (whole content in a rope, synced to disk on demand)
//! ```

mod file;
mod rope;

pub use file::FileLineStore;
pub use rope::RopeLineStore;

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Splice-capable sequence of text lines
///
/// Lines are passed and returned without their terminator.
pub trait LineStore {
    /// Number of lines
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read one line, or `None` past the end
    fn get(&mut self, index: usize) -> io::Result<Option<String>>;

    /// Overwrite one line. Writing at `len()` appends.
    fn set(&mut self, index: usize, line: &str) -> io::Result<()>;

    /// Replace `count` lines starting at `offset` with `lines`, returning the
    /// removed lines. `offset + count` must not exceed `len()`.
    fn splice(&mut self, offset: usize, count: usize, lines: Vec<String>)
        -> io::Result<Vec<String>>;

    /// Make all writes durable
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Line terminator written by a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// Which store implementation backs a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Line offsets in memory, lines read from disk on demand
    #[default]
    Indexed,
    /// Whole file in a rope, written back on sync
    Rope,
}

/// Options forwarded to the line store constructor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineStoreOptions {
    pub engine: Engine,
    pub line_ending: LineEnding,
    /// Create the file if it does not exist
    pub create: bool,
}

impl Default for LineStoreOptions {
    fn default() -> Self {
        Self {
            engine: Engine::Indexed,
            line_ending: LineEnding::Lf,
            create: true,
        }
    }
}

/// Open the configured store engine over `path`
pub fn open(path: &Path, options: &LineStoreOptions) -> io::Result<Box<dyn LineStore>> {
    Ok(match options.engine {
        Engine::Indexed => Box::new(FileLineStore::open(path, options)?),
        Engine::Rope => Box::new(RopeLineStore::open(path, options)?),
    })
}

/// Strip one trailing `\n` or `\r\n`
pub(crate) fn trim_terminator(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(line)
}
