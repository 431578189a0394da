//! csvtie - delimited-text files as mutable arrays of mutable rows
//!
//! A [`Table`] presents a file of one-record-per-line delimited text as an
//! array of rows. Each [`Row`] is a live handle that can be read and mutated
//! field by field, and stays bound to its line while the table is spliced
//! around it.
//!
//! ```no_run
//! use csvtie::{Table, TableOptions};
//!
//! # fn main() -> csvtie::Result<()> {
//! let mut table = Table::open("people.csv", TableOptions::default())?;
//! let row = table.get(1)?.expect("second row");
//! table.remove_range(0, 1)?;
//! assert_eq!(row.index(), Some(0));
//! row.set(0, "renamed")?;
//! drop(row); // deferred changes are written here
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod store;
pub mod table;

// Re-export commonly used types
pub use codec::{Codec, CodecError, CodecOptions, Delimiter, Quoting};
pub use config::{TableOptions, WriteBack};
pub use error::{Error, Result, Warning};
pub use store::{Engine, FileLineStore, LineEnding, LineStore, LineStoreOptions, RopeLineStore};
pub use table::{Row, Table};
