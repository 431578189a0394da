//! Indexed file line store
//!
//! Only the byte offset of each line start lives in memory. Reads seek to the
//! line and read it; writes rewrite the file from the first affected byte,
//! carrying the tail after the affected region along with them.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::rope::out_of_range;
use super::{trim_terminator, LineEnding, LineStore, LineStoreOptions};

#[derive(Debug)]
pub struct FileLineStore {
    file: File,
    path: PathBuf,
    /// Byte offset of the start of each line
    offsets: Vec<u64>,
    /// Total file size in bytes
    size: u64,
    line_ending: LineEnding,
}

impl FileLineStore {
    /// Open (or create) `path` and index its lines
    ///
    /// A missing final line terminator is added on open so that every line,
    /// including the last, can be rewritten in place.
    pub fn open(path: &Path, options: &LineStoreOptions) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(options.create)
            .truncate(false)
            .open(path)?;

        let mut store = Self {
            file,
            path: path.to_path_buf(),
            offsets: Vec::new(),
            size: 0,
            line_ending: options.line_ending,
        };
        store.index()?;
        store.terminate_last_line()?;

        tracing::debug!(
            "Indexed {} lines ({} bytes) in {}",
            store.offsets.len(),
            store.size,
            path.display()
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rebuild the offset table with one buffered pass over the file
    fn index(&mut self) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut reader = BufReader::new(&self.file);
        let mut offsets = Vec::new();
        let mut position = 0u64;
        let mut line = Vec::new();

        loop {
            line.clear();
            let read = reader.read_until(b'\n', &mut line)?;
            if read == 0 {
                break;
            }
            offsets.push(position);
            position += read as u64;
        }

        self.offsets = offsets;
        self.size = position;
        Ok(())
    }

    fn terminate_last_line(&mut self) -> io::Result<()> {
        if self.size == 0 {
            return Ok(());
        }
        let mut last = [0u8; 1];
        self.file.seek(SeekFrom::Start(self.size - 1))?;
        self.file.read_exact(&mut last)?;
        if last[0] != b'\n' {
            let ending = self.line_ending.as_str().as_bytes();
            self.file.seek(SeekFrom::Start(self.size))?;
            self.file.write_all(ending)?;
            self.size += ending.len() as u64;
        }
        Ok(())
    }

    /// Byte offset where line `index` starts (file size for `index == len`)
    fn offset_of(&self, index: usize) -> u64 {
        self.offsets.get(index).copied().unwrap_or(self.size)
    }

    fn read_range(&mut self, start: u64, end: u64) -> io::Result<Vec<u8>> {
        let mut bytes = vec![0u8; (end - start) as usize];
        self.file.seek(SeekFrom::Start(start))?;
        self.file.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    fn read_line_bytes(&mut self, index: usize) -> io::Result<Vec<u8>> {
        let start = self.offset_of(index);
        let end = self.offset_of(index + 1);
        self.read_range(start, end)
    }

    /// Read line `index`; invalid UTF-8 is an `InvalidData` error
    fn read_line(&mut self, index: usize) -> io::Result<String> {
        let bytes = self.read_line_bytes(index)?;
        let text = String::from_utf8(bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(trim_terminator(&text).to_string())
    }

    /// Read line `index` with invalid UTF-8 replaced by U+FFFD
    fn read_line_lossy(&mut self, index: usize) -> io::Result<String> {
        let bytes = self.read_line_bytes(index)?;
        Ok(trim_terminator(&String::from_utf8_lossy(&bytes)).to_string())
    }
}

impl LineStore for FileLineStore {
    fn len(&self) -> usize {
        self.offsets.len()
    }

    fn get(&mut self, index: usize) -> io::Result<Option<String>> {
        if index >= self.len() {
            return Ok(None);
        }
        self.read_line(index).map(Some)
    }

    fn set(&mut self, index: usize, line: &str) -> io::Result<()> {
        let len = self.len();
        if index > len {
            return Err(out_of_range(index, 0, len));
        }
        let count = usize::from(index < len);
        self.splice(index, count, vec![line.to_string()])?;
        Ok(())
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

        // Lines that are not UTF-8 can still be overwritten or removed
        let removed = (offset..offset + count)
            .map(|index| self.read_line_lossy(index))
            .collect::<io::Result<Vec<_>>>()?;

        let region_start = self.offset_of(offset);
        let region_end = self.offset_of(offset + count);
        let tail = self.read_range(region_end, self.size)?;

        let ending = self.line_ending.as_str();
        let mut replacement = Vec::new();
        let mut new_offsets = Vec::with_capacity(lines.len());
        for line in &lines {
            new_offsets.push(region_start + replacement.len() as u64);
            replacement.extend_from_slice(line.as_bytes());
            replacement.extend_from_slice(ending.as_bytes());
        }
        let tail_start = region_start + replacement.len() as u64;

        self.file.seek(SeekFrom::Start(region_start))?;
        self.file.write_all(&replacement)?;
        self.file.write_all(&tail)?;
        let new_size = tail_start + tail.len() as u64;
        self.file.set_len(new_size)?;

        let moved: Vec<u64> = self.offsets[offset + count..]
            .iter()
            .map(|&o| o - region_end + tail_start)
            .collect();
        self.offsets.truncate(offset);
        self.offsets.extend(new_offsets);
        self.offsets.extend(moved);
        self.size = new_size;

        Ok(removed)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file.sync_all()
    }
}
