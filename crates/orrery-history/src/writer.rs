//! Journal writer.
//!
//! [`JournalWriter`] streams records to any `Write` sink, one JSON
//! document per line.

use std::io::Write;

use crate::error::HistoryError;
use crate::journal::{JournalHeader, JournalRecord};

/// Writes journal lines to a byte stream.
///
/// Generic over `W: Write` so tests can use `Vec<u8>` and production
/// code can use `BufWriter<File>`.
///
/// After any write or flush error the sink may hold a partial line, so
/// the writer refuses every later call with [`HistoryError::JournalFailed`].
///
/// # Examples
///
/// ```
/// use orrery_core::WorldId;
/// use orrery_history::{JournalReader, JournalRecord, JournalWriter};
///
/// let mut buf = Vec::new();
/// let mut writer = JournalWriter::new(&mut buf).unwrap();
/// writer.append(&JournalRecord::WorldCleared { id: WorldId(1) }).unwrap();
/// assert_eq!(writer.records_written(), 1);
/// drop(writer);
///
/// let mut reader = JournalReader::open(buf.as_slice()).unwrap();
/// let rec = reader.next_record().unwrap().unwrap();
/// assert_eq!(rec, JournalRecord::WorldCleared { id: WorldId(1) });
/// assert!(reader.next_record().unwrap().is_none());
/// ```
pub struct JournalWriter<W: Write> {
    writer: W,
    records_written: u64,
    failed: bool,
}

impl<W: Write> JournalWriter<W> {
    /// Start a new journal, immediately writing the header line.
    pub fn new(mut writer: W) -> Result<Self, HistoryError> {
        write_line(&mut writer, &JournalHeader::current())?;
        Ok(Self {
            writer,
            records_written: 0,
            failed: false,
        })
    }

    /// Continue an existing journal. No header is written; `writer` must
    /// be positioned at the end of a journal that already has one.
    pub fn resume(writer: W) -> Self {
        Self {
            writer,
            records_written: 0,
            failed: false,
        }
    }

    /// Append one record.
    pub fn append(&mut self, record: &JournalRecord) -> Result<(), HistoryError> {
        self.check()?;
        let line = encode_line(record)?;
        if let Err(e) = self.writer.write_all(&line) {
            self.fail(&e);
            return Err(e.into());
        }
        self.records_written += 1;
        Ok(())
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<(), HistoryError> {
        self.check()?;
        if let Err(e) = self.writer.flush() {
            self.fail(&e);
            return Err(e.into());
        }
        Ok(())
    }

    /// Whether an earlier write or flush failed.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    fn check(&self) -> Result<(), HistoryError> {
        if self.failed {
            Err(HistoryError::JournalFailed)
        } else {
            Ok(())
        }
    }

    fn fail(&mut self, e: &std::io::Error) {
        log::error!(
            "journal write failed after {} records: {e}",
            self.records_written
        );
        self.failed = true;
    }

    /// Number of records appended through this writer.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Consume the writer and return the underlying `Write` sink.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn encode_line<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, HistoryError> {
    let mut line = serde_json::to_vec(value).map_err(|e| HistoryError::Encode {
        detail: e.to_string(),
    })?;
    line.push(b'\n');
    Ok(line)
}

fn write_line<W: Write, T: serde::Serialize>(w: &mut W, value: &T) -> Result<(), HistoryError> {
    w.write_all(&encode_line(value)?)?;
    Ok(())
}
