//! State shared by a table and every row handle it hands out

use std::cell::RefCell;
use std::collections::VecDeque;

use super::cache::RowCache;
use crate::codec::Codec;
use crate::error::{Error, Result, Warning};
use crate::store::LineStore;

/// Most recent warnings kept for `Table::take_warnings`
const MAX_WARNINGS: usize = 256;

pub(crate) struct Backing {
    pub(crate) store: RefCell<Box<dyn LineStore>>,
    pub(crate) codec: Codec,
    pub(crate) cache: RefCell<RowCache>,
    warnings: RefCell<VecDeque<Warning>>,
}

impl Backing {
    pub(crate) fn new(store: Box<dyn LineStore>, codec: Codec) -> Self {
        Self {
            store: RefCell::new(store),
            codec,
            cache: RefCell::new(RowCache::default()),
            warnings: RefCell::new(VecDeque::new()),
        }
    }

    /// Encode `fields` and overwrite line `index`
    pub(crate) fn write_line(&self, index: usize, fields: &[String]) -> Result<()> {
        let line = self.codec.encode(fields).map_err(Error::Encode)?;
        self.store.borrow_mut().set(index, &line)?;
        Ok(())
    }

    pub(crate) fn warn(&self, warning: Warning) {
        tracing::warn!("{}", warning);
        let mut warnings = self.warnings.borrow_mut();
        if warnings.len() == MAX_WARNINGS {
            warnings.pop_front();
        }
        warnings.push_back(warning);
    }

    pub(crate) fn take_warnings(&self) -> Vec<Warning> {
        self.warnings.borrow_mut().drain(..).collect()
    }
}

impl Drop for Backing {
    fn drop(&mut self) {
        if let Err(e) = self.store.get_mut().sync() {
            tracing::error!("Failed to sync line store: {}", e);
        }
    }
}
