//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use csvtie::{Table, TableOptions};

/// Table over an in-memory rope holding `lines`
pub fn memory_table(lines: &[&str], options: TableOptions) -> Table {
    Table::in_memory(lines, options).unwrap()
}

/// Write `content` to `name` in a fresh temp dir
pub fn temp_file(name: &str, content: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    (dir, path)
}

/// Copy a file from `samples/` into a fresh temp dir
pub fn sample_copy(name: &str) -> (tempfile::TempDir, PathBuf) {
    let source = Path::new(env!("CARGO_MANIFEST_DIR")).join("samples").join(name);
    let content = fs::read_to_string(source).unwrap();
    temp_file(name, &content)
}

/// Decode every record of the table (bypasses row handles)
pub fn records(table: &Table) -> Vec<Vec<String>> {
    table.records().unwrap()
}

/// Build an owned record from string slices
pub fn record(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|s| s.to_string()).collect()
}

/// Minimal linear congruential generator for repeatable operation scripts
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    /// Uniform-ish value in `0..=max`
    pub fn below(&mut self, max: usize) -> usize {
        (self.next() % (max as u64 + 1)) as usize
    }
}
