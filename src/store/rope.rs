//! Rope-backed line store
//!
//! Keeps the whole text in a `ropey::Rope` with every line terminated, so the
//! rope always ends with a line break (or is empty) and line `i` of the store
//! is line `i` of the rope.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use ropey::Rope;

use super::{trim_terminator, LineEnding, LineStore, LineStoreOptions};

#[derive(Debug, Clone, Default)]
pub struct RopeLineStore {
    buffer: Rope,
    /// File written on `sync` (None for in-memory stores)
    file_path: Option<PathBuf>,
    line_ending: LineEnding,
    is_modified: bool,
}

impl RopeLineStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an in-memory store holding `lines`
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut text = String::new();
        for line in lines {
            text.push_str(line.as_ref());
            text.push('\n');
        }
        Self {
            buffer: Rope::from(text),
            ..Self::default()
        }
    }

    /// Create an in-memory store from raw text (final newline optional)
    pub fn from_text(text: &str) -> Self {
        Self {
            buffer: Rope::from(terminated(text, LineEnding::Lf)),
            ..Self::default()
        }
    }

    /// Load a file into a rope; `sync` writes it back
    pub fn open(path: &Path, options: &LineStoreOptions) -> io::Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound && options.create => {
                tracing::debug!("{} not found, starting empty", path.display());
                String::new()
            }
            Err(e) => return Err(e),
        };
        let normalized = terminated(&content, options.line_ending);
        let is_modified = normalized.len() != content.len() || !path.exists();

        Ok(Self {
            buffer: Rope::from(normalized),
            file_path: Some(path.to_path_buf()),
            line_ending: options.line_ending,
            is_modified,
        })
    }

    /// Entire content, including terminators
    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    fn char_range(&self, offset: usize, count: usize) -> std::ops::Range<usize> {
        self.buffer.line_to_char(offset)..self.buffer.line_to_char(offset + count)
    }

    fn encode_lines(&self, lines: &[String]) -> String {
        let ending = self.line_ending.as_str();
        let mut text = String::new();
        for line in lines {
            text.push_str(line);
            text.push_str(ending);
        }
        text
    }
}

impl LineStore for RopeLineStore {
    fn len(&self) -> usize {
        if self.buffer.len_chars() == 0 {
            0
        } else {
            self.buffer.len_lines() - 1
        }
    }

    fn get(&mut self, index: usize) -> io::Result<Option<String>> {
        if index >= self.len() {
            return Ok(None);
        }
        let line = self.buffer.line(index).to_string();
        Ok(Some(trim_terminator(&line).to_string()))
    }

    fn set(&mut self, index: usize, line: &str) -> io::Result<()> {
        let len = self.len();
        match index.cmp(&len) {
            std::cmp::Ordering::Less => self.splice(index, 1, vec![line.to_string()]),
            std::cmp::Ordering::Equal => self.splice(len, 0, vec![line.to_string()]),
            std::cmp::Ordering::Greater => Err(out_of_range(index, 0, len)),
        }
        .map(|_| ())
    }

    fn splice(
        &mut self,
        offset: usize,
        count: usize,
        lines: Vec<String>,
    ) -> io::Result<Vec<String>> {
        let len = self.len();
        if offset > len || count > len - offset {
            return Err(out_of_range(offset, count, len));
        }

        let mut removed = Vec::with_capacity(count);
        for index in offset..offset + count {
            let line = self.buffer.line(index).to_string();
            removed.push(trim_terminator(&line).to_string());
        }

        let text = self.encode_lines(&lines);
        let range = self.char_range(offset, count);
        let start = range.start;
        self.buffer.remove(range);
        self.buffer.insert(start, &text);
        self.is_modified = true;

        Ok(removed)
    }

    fn sync(&mut self) -> io::Result<()> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };
        if !self.is_modified {
            return Ok(());
        }

        // Write next to the target, then rename over it
        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);
        {
            let mut writer = BufWriter::new(fs::File::create(&tmp_path)?);
            self.buffer.write_to(&mut writer)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, path)?;

        self.is_modified = false;
        tracing::debug!("Synced {} lines to {}", self.len(), path.display());
        Ok(())
    }
}

/// Ensure non-empty text ends with a terminator
fn terminated(text: &str, ending: LineEnding) -> String {
    let mut text = text.to_string();
    if !text.is_empty() && !text.ends_with('\n') {
        text.push_str(ending.as_str());
    }
    text
}

pub(super) fn out_of_range(offset: usize, count: usize, len: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!(
            "line range {}..{} is outside a store of {} lines",
            offset,
            offset + count,
            len
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::super::tests::{contents, exercise_splices, lines};
    use super::*;

    #[test]
    fn test_from_lines_len() {
        let store = RopeLineStore::from_lines(["a,b", "c,d"]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.text(), "a,b\nc,d\n");

        assert_eq!(RopeLineStore::new().len(), 0);
    }

    #[test]
    fn test_from_text_without_final_newline() {
        let mut store = RopeLineStore::from_text("a\nb");
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).unwrap().as_deref(), Some("b"));
        assert_eq!(store.get(2).unwrap(), None);
    }

    #[test]
    fn test_empty_lines_count() {
        let mut store = RopeLineStore::from_text("\n\nx\n");
        assert_eq!(store.len(), 3);
        assert_eq!(contents(&mut store), lines(&["", "", "x"]));
    }

    #[test]
    fn test_set_and_append() {
        let mut store = RopeLineStore::from_lines(["a", "b"]);
        store.set(0, "first").unwrap();
        store.set(2, "appended").unwrap();
        assert_eq!(contents(&mut store), lines(&["first", "b", "appended"]));
        assert!(store.set(9, "nope").is_err());
    }

    #[test]
    fn test_splice_script() {
        let mut store = RopeLineStore::from_lines(["a", "b", "c", "d", "e"]);
        exercise_splices(&mut store);
    }

    #[test]
    fn test_splice_out_of_range() {
        let mut store = RopeLineStore::from_lines(["a"]);
        let err = store.splice(0, 2, vec![]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_crlf_lines_are_trimmed() {
        let mut store = RopeLineStore::from_text("a,b\r\nc,d\r\n");
        assert_eq!(contents(&mut store), lines(&["a,b", "c,d"]));
    }

    #[test]
    fn test_open_and_sync() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        fs::write(&path, "a,b\nc,d").unwrap();

        let options = LineStoreOptions::default();
        let mut store = RopeLineStore::open(&path, &options).unwrap();
        assert!(store.is_modified());
        store.splice(1, 1, lines(&["x,y", "z,w"])).unwrap();
        store.sync().unwrap();
        assert!(!store.is_modified());

        assert_eq!(fs::read_to_string(&path).unwrap(), "a,b\nx,y\nz,w\n");
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.csv");

        let strict = LineStoreOptions {
            create: false,
            ..Default::default()
        };
        assert!(RopeLineStore::open(&path, &strict).is_err());

        let mut store = RopeLineStore::open(&path, &LineStoreOptions::default()).unwrap();
        assert!(store.is_empty());
        store.sync().unwrap();
        assert!(path.exists());
    }
}
