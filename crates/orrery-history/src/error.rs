//! Error types for the history store and journal.

use std::fmt;
use std::io;

use orrery_core::{StageId, StepId, WorldId};

/// Errors returned by history stores, the journal writer and the journal
/// reader.
#[derive(Debug)]
pub enum HistoryError {
    /// No world with this id exists.
    WorldNotFound {
        /// The requested id.
        world: WorldId,
    },
    /// No step with this id exists.
    StepNotFound {
        /// The requested id.
        step: StepId,
    },
    /// No stage with this id exists.
    StageNotFound {
        /// The requested id.
        stage: StageId,
    },
    /// A record could not be serialized.
    Encode {
        /// Serializer message.
        detail: String,
    },
    /// An I/O error occurred while reading or writing the journal.
    Io(io::Error),
    /// A journal line could not be decoded.
    MalformedJournal {
        /// 1-based line number of the offending line.
        line: u64,
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// The journal header names a format version this build cannot read.
    UnsupportedVersion {
        /// The version found in the header.
        found: u32,
    },
    /// An earlier journal write failed; the writer accepts no more records.
    JournalFailed,
}

impl HistoryError {
    /// Whether this error reports a missing world, stage or step.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::WorldNotFound { .. } | Self::StepNotFound { .. } | Self::StageNotFound { .. }
        )
    }
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorldNotFound { world } => write!(f, "world {world} not found"),
            Self::StepNotFound { step } => write!(f, "step {step} not found"),
            Self::StageNotFound { stage } => write!(f, "stage {stage} not found"),
            Self::Encode { detail } => write!(f, "encode failed: {detail}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::MalformedJournal { line, detail } => {
                write!(f, "malformed journal line {line}: {detail}")
            }
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported journal version {found}")
            }
            Self::JournalFailed => write!(f, "journal writer failed earlier"),
        }
    }
}

impl std::error::Error for HistoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for HistoryError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
