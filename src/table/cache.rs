//! Row handle cache
//!
//! Maps a line index to a weak reference to the live handle for that line.
//! The cache never owns a handle: an entry is only useful while somebody
//! outside the cache holds the row, and entries whose row is gone are pruned
//! whenever they are touched.

use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use super::row::RowInner;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReindexStats {
    pub moved: usize,
    pub severed: usize,
    pub pruned: usize,
}

#[derive(Default)]
pub(crate) struct RowCache {
    entries: BTreeMap<usize, Weak<RowInner>>,
}

impl RowCache {
    /// The live handle for `index`, if any
    pub(crate) fn get(&self, index: usize) -> Option<Rc<RowInner>> {
        self.entries.get(&index)?.upgrade()
    }

    /// Register `row` under `index`. Any previous entry must be dead.
    pub(crate) fn insert(&mut self, index: usize, row: &Rc<RowInner>) {
        let previous = self.entries.insert(index, Rc::downgrade(row));
        debug_assert!(previous.map_or(true, |weak| weak.strong_count() == 0));
    }

    /// Drop the entry for `index` if it still refers to `row`
    pub(crate) fn forget(&mut self, index: usize, row: *const RowInner) {
        if self
            .entries
            .get(&index)
            .is_some_and(|weak| std::ptr::eq(weak.as_ptr(), row))
        {
            self.entries.remove(&index);
        }
    }

    /// Every handle that is still alive, in index order
    pub(crate) fn live(&self) -> Vec<Rc<RowInner>> {
        self.entries.values().filter_map(Weak::upgrade).collect()
    }

    pub(crate) fn live_len(&self) -> usize {
        self.entries
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Apply the index mapping of a splice that replaced `remove_count` lines
    /// at `offset` with `insert_count` new ones.
    ///
    /// Entries before `offset` stay. Entries in the removed range are severed
    /// and dropped. Entries after it shift by the change in length. Entries
    /// are visited in ascending order when the table shrank or kept its
    /// length and in descending order when it grew, so a move never lands on
    /// an entry that has not been visited yet.
    pub(crate) fn reindex(
        &mut self,
        offset: usize,
        remove_count: usize,
        insert_count: usize,
    ) -> ReindexStats {
        let mut stats = ReindexStats::default();
        if remove_count == 0 && insert_count == 0 {
            return stats;
        }

        let mut affected: Vec<usize> = self.entries.range(offset..).map(|(&i, _)| i).collect();
        if insert_count > remove_count {
            affected.reverse();
        }

        for index in affected {
            let Some(weak) = self.entries.remove(&index) else {
                continue;
            };
            let Some(row) = weak.upgrade() else {
                stats.pruned += 1;
                continue;
            };

            if index < offset + remove_count {
                row.sever();
                stats.severed += 1;
            } else {
                let new_index = index - remove_count + insert_count;
                row.move_to(new_index);
                self.entries.insert(new_index, weak);
                stats.moved += 1;
            }
        }

        stats
    }

    #[cfg(test)]
    pub(crate) fn indices(&self) -> Vec<usize> {
        self.entries.keys().copied().collect()
    }
}
