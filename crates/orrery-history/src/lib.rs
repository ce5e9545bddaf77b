//! Stage/step history storage for Orrery worlds.
//!
//! The run controller persists every tick through the [`HistoryStore`]
//! trait and resumes worlds from it. This crate provides the trait, an
//! in-memory implementation, and a JSON-lines journal so the in-memory
//! tables survive a restart.
//!
//! # Architecture
//!
//! - [`MemoryHistory`] keeps world, stage and step tables behind a mutex
//! - [`JournalWriter`] appends [`JournalRecord`]s to any `Write` sink
//! - [`JournalReader`] replays a journal from any `BufRead` source back
//!   into a [`MemoryHistory`]
//! - [`JournaledHistory`] combines the two: reads from memory, writes
//!   through to the journal

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod journal;
pub mod journaled;
pub mod memory;
pub mod reader;
pub mod store;
pub mod writer;

pub use error::HistoryError;
pub use journal::{JournalHeader, JournalRecord, FORMAT_NAME, FORMAT_VERSION};
pub use journaled::JournaledHistory;
pub use memory::MemoryHistory;
pub use reader::{JournalReader, RecordIter};
pub use store::{HistoryStore, NewStep, WorldCatalog};
pub use writer::JournalWriter;
