//! Journal reader.
//!
//! [`JournalReader`] reads records from any `BufRead` source. The header
//! line is validated on construction.

use std::io::BufRead;

use crate::error::HistoryError;
use crate::journal::{JournalHeader, JournalRecord, FORMAT_NAME, FORMAT_VERSION};
use crate::memory::MemoryHistory;

/// Reads journal lines from a byte stream.
///
/// Generic over `R: BufRead` so tests can use `&[u8]` and production
/// code can use `BufReader<File>`.
pub struct JournalReader<R: BufRead> {
    reader: R,
    header: JournalHeader,
    line: u64,
    records_read: u64,
    buf: String,
}

impl<R: BufRead> JournalReader<R> {
    /// Open a journal stream, reading and validating the header.
    pub fn open(mut reader: R) -> Result<Self, HistoryError> {
        let mut buf = String::new();
        if reader.read_line(&mut buf)? == 0 {
            return Err(HistoryError::MalformedJournal {
                line: 1,
                detail: "missing header".into(),
            });
        }
        let header: JournalHeader =
            serde_json::from_str(buf.trim_end()).map_err(|e| HistoryError::MalformedJournal {
                line: 1,
                detail: e.to_string(),
            })?;
        if header.format != FORMAT_NAME {
            return Err(HistoryError::MalformedJournal {
                line: 1,
                detail: format!("unexpected format {:?}", header.format),
            });
        }
        if header.version != FORMAT_VERSION {
            return Err(HistoryError::UnsupportedVersion {
                found: header.version,
            });
        }
        Ok(Self {
            reader,
            header,
            line: 1,
            records_read: 0,
            buf,
        })
    }

    /// The validated header.
    pub fn header(&self) -> &JournalHeader {
        &self.header
    }

    /// Read the next record, or `None` if the stream is exhausted.
    ///
    /// Blank lines are skipped.
    pub fn next_record(&mut self) -> Result<Option<JournalRecord>, HistoryError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }
            let record =
                serde_json::from_str(text).map_err(|e| HistoryError::MalformedJournal {
                    line: self.line,
                    detail: e.to_string(),
                })?;
            self.records_read += 1;
            return Ok(Some(record));
        }
    }

    /// Number of records read so far.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Convert into a record iterator.
    pub fn records(self) -> RecordIter<R> {
        RecordIter {
            reader: self,
            done: false,
        }
    }

    /// Replay every remaining record into a fresh [`MemoryHistory`].
    pub fn restore(mut self) -> Result<MemoryHistory, HistoryError> {
        let history = MemoryHistory::new();
        while let Some(record) = self.next_record()? {
            apply(&history, record).map_err(|e| HistoryError::MalformedJournal {
                line: self.line,
                detail: e.to_string(),
            })?;
        }
        log::info!(
            "restored {} journal records ({} steps)",
            self.records_read,
            history.step_count()
        );
        Ok(history)
    }
}

/// Apply one journal record to a store.
///
/// A stage must follow its world and a step must follow its stage.
fn apply(history: &MemoryHistory, record: JournalRecord) -> Result<(), HistoryError> {
    match record {
        JournalRecord::World(w) => history.insert_world(w),
        JournalRecord::Stage(s) => history.insert_stage(s)?,
        JournalRecord::Step(s) => history.insert_step(s)?,
        JournalRecord::WorldDeleted { id } => {
            history.delete_world(id)?;
        }
        JournalRecord::WorldCleared { id } => history.clear_world(id)?,
    }
    Ok(())
}

/// Iterator adapter over journal records.
pub struct RecordIter<R: BufRead> {
    reader: JournalReader<R>,
    done: bool,
}

impl<R: BufRead> Iterator for RecordIter<R> {
    type Item = Result<JournalRecord, HistoryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
