//! Row handles
//!
//! A [`Row`] is a live, mutable view of one record. Clones share the same
//! record, so a mutation through one clone is visible through all of them.
//!
//! ```text
//! Concrete(i) ──reindex──▶ Concrete(j)
//!      │
//!    sever (line removed)
//!      ▼
//!   Severed   (in-memory only, writes are dropped with a warning)
//! ```
//!
//! Under [`WriteBack::Immediate`] every mutation writes the line before
//! returning. Under [`WriteBack::Deferred`] mutations only mark the row
//! dirty; the line is written by [`Row::flush`], [`Row::release`], or when the
//! last clone is dropped.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::backing::Backing;
use crate::config::WriteBack;
use crate::error::{Error, Result, Warning};

struct RowState {
    fields: Vec<String>,
    /// Current line index, `None` once severed
    index: Option<usize>,
    dirty: bool,
}

pub(crate) struct RowInner {
    state: RefCell<RowState>,
    write_back: WriteBack,
    backing: Rc<Backing>,
}

impl RowInner {
    pub(crate) fn new(
        fields: Vec<String>,
        index: Option<usize>,
        write_back: WriteBack,
        backing: Rc<Backing>,
    ) -> Self {
        Self {
            state: RefCell::new(RowState {
                fields,
                index,
                dirty: false,
            }),
            write_back,
            backing,
        }
    }

    pub(crate) fn index(&self) -> Option<usize> {
        self.state.borrow().index
    }

    pub(crate) fn move_to(&self, index: usize) {
        let mut state = self.state.borrow_mut();
        debug_assert!(state.index.is_some(), "severed rows never move");
        state.index = Some(index);
    }

    /// Detach from storage for good
    pub(crate) fn sever(&self) {
        self.state.borrow_mut().index = None;
    }

    /// Replace the record with what was just written to its line
    pub(crate) fn overwrite(&self, fields: Vec<String>) {
        let mut state = self.state.borrow_mut();
        state.fields = fields;
        state.dirty = false;
    }

    fn discard_pending(&self) {
        self.state.borrow_mut().dirty = false;
    }

    pub(crate) fn flush(&self) -> Result<()> {
        let state = self.state.borrow();
        if !state.dirty {
            return Ok(());
        }

        match state.index {
            Some(index) => self.backing.write_line(index, &state.fields)?,
            None => self.backing.warn(Warning::SeveredWrite {
                fields: state.fields.clone(),
            }),
        }
        drop(state);

        self.state.borrow_mut().dirty = false;
        Ok(())
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut Vec<String>) -> R) -> Result<R> {
        match self.write_back {
            WriteBack::Deferred => {
                let mut state = self.state.borrow_mut();
                let out = f(&mut state.fields);
                state.dirty = true;
                Ok(out)
            }
            WriteBack::Immediate => {
                let (mut fields, index) = {
                    let state = self.state.borrow();
                    (state.fields.clone(), state.index)
                };
                let out = f(&mut fields);

                let line = self.backing.codec.encode(&fields).map_err(Error::Encode)?;
                match index {
                    Some(index) => self.backing.store.borrow_mut().set(index, &line)?,
                    None => self.backing.warn(Warning::SeveredWrite {
                        fields: fields.clone(),
                    }),
                }

                self.overwrite(fields);
                Ok(out)
            }
        }
    }
}

impl Drop for RowInner {
    fn drop(&mut self) {
        if self.write_back == WriteBack::Deferred {
            if let Err(e) = self.flush() {
                let index = self.index().unwrap_or_default();
                tracing::error!("Dropping row {} lost its pending changes: {}", index, e);
                self.backing.warn(Warning::FlushFailed {
                    index,
                    message: e.to_string(),
                });
            }
        }

        if let Some(index) = self.state.get_mut().index {
            // Skipped when the table is mid-operation; the dead entry is
            // pruned on its next visit instead.
            if let Ok(mut cache) = self.backing.cache.try_borrow_mut() {
                cache.forget(index, self as *const RowInner);
            }
        }
    }
}

/// Live handle to one record of a [`crate::Table`]
#[derive(Clone)]
pub struct Row(pub(crate) Rc<RowInner>);

impl Row {
    pub(crate) fn from_inner(inner: Rc<RowInner>) -> Self {
        Self(inner)
    }

    /// Field `i`, or `None` past the end
    pub fn get(&self, i: usize) -> Option<String> {
        self.0.state.borrow().fields.get(i).cloned()
    }

    /// Copy of every field
    pub fn fields(&self) -> Vec<String> {
        self.0.state.borrow().fields.clone()
    }

    pub fn len(&self) -> usize {
        self.0.state.borrow().fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current line index, `None` once the line has been removed
    pub fn index(&self) -> Option<usize> {
        self.0.index()
    }

    pub fn is_severed(&self) -> bool {
        self.index().is_none()
    }

    /// Whether there are deferred changes not yet written
    pub fn is_dirty(&self) -> bool {
        self.0.state.borrow().dirty
    }

    pub fn write_back(&self) -> WriteBack {
        self.0.write_back
    }

    /// Whether `other` is a handle to the same record
    pub fn same_row(&self, other: &Row) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Set field `i`, padding with empty fields when `i` is past the end
    pub fn set(&self, i: usize, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        self.0.mutate(|fields| {
            if i >= fields.len() {
                fields.resize(i + 1, String::new());
            }
            fields[i] = value;
        })
    }

    /// Truncate or extend with empty fields to exactly `len` fields
    pub fn resize(&self, len: usize) -> Result<()> {
        self.0.mutate(|fields| fields.resize(len, String::new()))
    }

    pub fn push(&self, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        self.0.mutate(|fields| fields.push(value))
    }

    pub fn pop(&self) -> Result<Option<String>> {
        if self.is_empty() {
            return Ok(None);
        }
        self.0.mutate(|fields| fields.pop())
    }

    /// Remove and return the first field
    pub fn shift(&self) -> Result<Option<String>> {
        if self.is_empty() {
            return Ok(None);
        }
        self.0.mutate(|fields| Some(fields.remove(0)))
    }

    /// Insert a field at the front
    pub fn unshift(&self, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        self.0.mutate(|fields| fields.insert(0, value))
    }

    pub fn clear(&self) -> Result<()> {
        self.0.mutate(|fields| fields.clear())
    }

    /// Write pending deferred changes now
    ///
    /// A severed row reports a warning and discards the pending state.
    pub fn flush(&self) -> Result<()> {
        self.0.flush()
    }

    /// Flush, then give up this handle
    ///
    /// Unlike an implicit drop, a failed flush is returned to the caller. If
    /// other clones are alive the row stays dirty so they can retry; on the
    /// last handle the pending changes are discarded along with it, and no
    /// drop-time warning is recorded for the same failure.
    pub fn release(self) -> Result<()> {
        let result = self.0.flush();
        if result.is_err() && Rc::strong_count(&self.0) == 1 {
            self.0.discard_pending();
        }
        result
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.state.borrow();
        f.debug_struct("Row")
            .field("index", &state.index)
            .field("fields", &state.fields)
            .field("dirty", &state.dirty)
            .field("write_back", &self.0.write_back)
            .finish()
    }
}
