//! Delimited-text file as a mutable array of mutable rows
//!
//! # Architecture
//!
//! ```text
//! Table
//! └── Rc<Backing> ◀──────────── shared by every Row
//!     ├── LineStore  (raw lines, owned; only the table resizes it)
//!     ├── Codec      (line <-> fields, read-only)
//!     └── RowCache   (line index -> Weak<RowInner>)
//! ```
//!
//! Reads go through the cache first, so while a [`Row`] for line `i` is alive,
//! `get(i)` hands back that same row. Every structural change goes through
//! [`Table::splice`], which keeps live rows pointing at their line: rows after
//! the changed range are reindexed, and rows inside the removed range are
//! severed.

mod backing;
mod cache;
mod row;

pub use row::Row;

use std::io;
use std::path::Path;
use std::rc::Rc;

use backing::Backing;
use row::RowInner;

use crate::codec::{Codec, CodecError};
use crate::config::{TableOptions, WriteBack};
use crate::error::{Error, Result, Warning};
use crate::store::{self, LineStore, RopeLineStore};

pub struct Table {
    backing: Rc<Backing>,
    write_back: WriteBack,
    hold_rows: bool,
}

impl Table {
    /// Open a delimited-text file
    ///
    /// When no separator is configured, `.tsv` files use tabs, `.psv` files
    /// use pipes and everything else uses commas.
    pub fn open(path: impl AsRef<Path>, options: TableOptions) -> Result<Self> {
        let path = path.as_ref();
        let codec = options.build_codec(Some(path))?;
        let store = store::open(path, &options.line_store).map_err(|e| {
            Error::construction(format!("cannot open {}: {}", path.display(), e))
        })?;

        tracing::debug!(
            "Opened {} ({} lines, separator {:?}, {:?})",
            path.display(),
            store.len(),
            codec.separator(),
            options.write_back
        );
        Ok(Self::from_parts(store, codec, &options))
    }

    /// Wrap an existing line store
    pub fn with_store(store: Box<dyn LineStore>, options: TableOptions) -> Result<Self> {
        let codec = options.build_codec(None)?;
        Ok(Self::from_parts(store, codec, &options))
    }

    /// Table over an in-memory rope holding `lines`
    pub fn in_memory<I, S>(lines: I, options: TableOptions) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_store(Box::new(RopeLineStore::from_lines(lines)), options)
    }

    fn from_parts(store: Box<dyn LineStore>, codec: Codec, options: &TableOptions) -> Self {
        Self {
            backing: Rc::new(Backing::new(store, codec)),
            write_back: options.write_back,
            hold_rows: options.hold_rows,
        }
    }

    pub fn codec(&self) -> &Codec {
        &self.backing.codec
    }

    /// Write-back mode of rows handed out by `get`
    pub fn write_back(&self) -> WriteBack {
        if self.hold_rows {
            self.write_back
        } else {
            WriteBack::Immediate
        }
    }

    pub fn len(&self) -> usize {
        self.backing.store.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether line `index` exists
    pub fn exists(&self, index: usize) -> bool {
        index < self.len()
    }

    /// Row handle for line `index`, or `None` past the end
    pub fn get(&self, index: usize) -> Result<Option<Row>> {
        if self.hold_rows {
            if let Some(inner) = self.backing.cache.borrow().get(index) {
                return Ok(Some(Row::from_inner(inner)));
            }
        }

        let line = self
            .backing
            .store
            .borrow_mut()
            .get(index)
            .map_err(|e| read_error(index, e))?;
        let Some(line) = line else {
            return Ok(None);
        };
        let fields = self
            .backing
            .codec
            .decode(&line)
            .map_err(|e| Error::decode_at(index, e))?;

        let inner = Rc::new(RowInner::new(
            fields,
            Some(index),
            self.write_back(),
            Rc::clone(&self.backing),
        ));
        if self.hold_rows {
            self.backing.cache.borrow_mut().insert(index, &inner);
        }
        Ok(Some(Row::from_inner(inner)))
    }

    /// Overwrite line `index` with `fields`
    ///
    /// A live row for that line takes the new fields and loses any pending
    /// deferred changes. Setting past the end pads with empty records.
    pub fn set<S: AsRef<str>>(&mut self, index: usize, fields: &[S]) -> Result<()> {
        let fields: Vec<String> = fields.iter().map(|f| f.as_ref().to_string()).collect();
        let line = self.backing.codec.encode(&fields).map_err(Error::Encode)?;

        let len = self.len();
        if index < len {
            self.backing.store.borrow_mut().set(index, &line)?;
        } else {
            let mut lines = vec![String::new(); index - len];
            lines.push(line);
            self.splice_lines(len, 0, lines)?;
        }

        if self.hold_rows {
            let live = self.backing.cache.borrow().get(index);
            if let Some(inner) = live {
                inner.overwrite(fields);
            }
        }
        Ok(())
    }

    /// Replace `remove_count` records at `offset` with `records`, returning
    /// the removed records
    ///
    /// Live rows after the removed range are moved to their new index; live
    /// rows inside it are severed. Out-of-range requests are clamped to the
    /// table and reported as a warning. Encode and decode failures leave both
    /// the file and the live rows untouched.
    pub fn splice<R, S>(
        &mut self,
        offset: usize,
        remove_count: usize,
        records: &[R],
    ) -> Result<Vec<Vec<String>>>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let lines = records
            .iter()
            .map(|record| self.backing.codec.encode(record.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::Encode)?;
        self.splice_lines(offset, remove_count, lines)
    }

    fn splice_lines(
        &mut self,
        offset: usize,
        remove_count: usize,
        lines: Vec<String>,
    ) -> Result<Vec<Vec<String>>> {
        let len = self.len();
        let clamped_offset = offset.min(len);
        let clamped_count = remove_count.min(len - clamped_offset);
        if (clamped_offset, clamped_count) != (offset, remove_count) {
            self.backing.warn(Warning::ClampedSplice {
                requested_offset: offset,
                requested_count: remove_count,
                offset: clamped_offset,
                count: clamped_count,
            });
        }
        let (offset, remove_count) = (clamped_offset, clamped_count);
        let insert_count = lines.len();

        let removed_lines = self
            .backing
            .store
            .borrow_mut()
            .splice(offset, remove_count, lines)?;

        let removed = match self.decode_all(offset, &removed_lines) {
            Ok(removed) => removed,
            Err(e) => {
                // Put the store back so the failed splice has no effect
                if let Err(undo) =
                    self.backing
                        .store
                        .borrow_mut()
                        .splice(offset, insert_count, removed_lines)
                {
                    tracing::error!("Failed to roll back splice at {}: {}", offset, undo);
                    return Err(Error::Io(undo));
                }
                return Err(e);
            }
        };

        if self.hold_rows {
            let stats = self
                .backing
                .cache
                .borrow_mut()
                .reindex(offset, remove_count, insert_count);
            tracing::debug!(
                "splice({}, {}) +{}: moved {}, severed {}, pruned {}",
                offset,
                remove_count,
                insert_count,
                stats.moved,
                stats.severed,
                stats.pruned
            );
        }

        Ok(removed)
    }

    fn decode_all(&self, offset: usize, lines: &[String]) -> Result<Vec<Vec<String>>> {
        lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                self.backing
                    .codec
                    .decode(line)
                    .map_err(|e| Error::decode_at(offset + i, e))
            })
            .collect()
    }

    /// Insert `records` before `index`
    pub fn insert<R, S>(&mut self, index: usize, records: &[R]) -> Result<()>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        self.splice(index, 0, records).map(|_| ())
    }

    /// Remove `count` records starting at `offset`
    pub fn remove_range(&mut self, offset: usize, count: usize) -> Result<Vec<Vec<String>>> {
        self.splice_lines(offset, count, Vec::new())
    }

    /// Append `records` at the end
    pub fn push<R, S>(&mut self, records: &[R]) -> Result<()>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let len = self.len();
        self.splice(len, 0, records).map(|_| ())
    }

    /// Remove and return the last record
    pub fn pop(&mut self) -> Result<Option<Vec<String>>> {
        let len = self.len();
        if len == 0 {
            return Ok(None);
        }
        Ok(self.splice_lines(len - 1, 1, Vec::new())?.pop())
    }

    /// Remove and return the first record
    pub fn shift(&mut self) -> Result<Option<Vec<String>>> {
        if self.is_empty() {
            return Ok(None);
        }
        Ok(self.splice_lines(0, 1, Vec::new())?.pop())
    }

    /// Insert `records` at the front
    pub fn unshift<R, S>(&mut self, records: &[R]) -> Result<()>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        self.splice(0, 0, records).map(|_| ())
    }

    /// Truncate, or extend with empty records, to exactly `len` records
    pub fn resize(&mut self, len: usize) -> Result<()> {
        let current = self.len();
        if len < current {
            self.splice_lines(len, current - len, Vec::new())?;
        } else if len > current {
            self.splice_lines(current, 0, vec![String::new(); len - current])?;
        }
        Ok(())
    }

    /// Remove every record
    pub fn clear(&mut self) -> Result<()> {
        self.resize(0)
    }

    /// Iterate over row handles in order
    pub fn rows(&self) -> impl Iterator<Item = Result<Row>> + '_ {
        (0..self.len()).filter_map(move |index| self.get(index).transpose())
    }

    /// Decode every record without creating row handles
    pub fn records(&self) -> Result<Vec<Vec<String>>> {
        let mut store = self.backing.store.borrow_mut();
        (0..store.len())
            .map(|index| {
                let line = store
                    .get(index)
                    .map_err(|e| read_error(index, e))?
                    .unwrap_or_default();
                self.backing
                    .codec
                    .decode(&line)
                    .map_err(|e| Error::decode_at(index, e))
            })
            .collect()
    }

    /// Write the pending changes of every live row
    pub fn flush_rows(&self) -> Result<()> {
        let live = self.backing.cache.borrow().live();
        for row in live {
            row.flush()?;
        }
        Ok(())
    }

    /// Flush every live row, then make the line store durable
    pub fn sync(&self) -> Result<()> {
        self.flush_rows()?;
        self.backing.store.borrow_mut().sync()?;
        Ok(())
    }

    /// Number of live rows currently tracked
    pub fn cached_rows(&self) -> usize {
        self.backing.cache.borrow().live_len()
    }

    /// Warnings reported since the last call
    pub fn take_warnings(&self) -> Vec<Warning> {
        self.backing.take_warnings()
    }
}

/// A line that is not valid text fails to decode like any other bad line
fn read_error(index: usize, e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::InvalidData {
        Error::decode_at(index, CodecError::Decode(e.to_string()))
    } else {
        Error::Io(e)
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("len", &self.len())
            .field("separator", &self.backing.codec.separator())
            .field("write_back", &self.write_back())
            .field("hold_rows", &self.hold_rows)
            .field("cached_rows", &self.cached_rows())
            .finish()
    }
}
