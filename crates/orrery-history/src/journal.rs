//! Journal line types.
//!
//! A journal is a JSON-lines file. The first line is a [`JournalHeader`];
//! every following non-blank line is one [`JournalRecord`]:
//!
//! ```text
//! {"format":"orrery-journal","version":1}
//! {"kind":"world","id":1,"title":"Sandbox","plugin":"DEMO_GAME"}
//! {"kind":"stage","id":1,"world_id":1,"code":"stage_0","title":"Stage 0"}
//! {"kind":"step","id":1,"stage_id":1,"state":"{...}","actions":"[]","logs":"[]","interactions":"[]"}
//! ```
//!
//! Records carry their ids, so replay reproduces the exact tables and
//! counters of the store that wrote them.

use orrery_core::{StageRecord, StepRecord, WorldId, WorldRecord};
use serde::{Deserialize, Serialize};

/// Value of [`JournalHeader::format`].
pub const FORMAT_NAME: &str = "orrery-journal";

/// Current journal format version.
pub const FORMAT_VERSION: u32 = 1;

/// First line of every journal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalHeader {
    /// Always [`FORMAT_NAME`].
    pub format: String,
    /// Format version the journal was written with.
    pub version: u32,
}

impl JournalHeader {
    /// Header for the current format version.
    pub fn current() -> Self {
        Self {
            format: FORMAT_NAME.to_string(),
            version: FORMAT_VERSION,
        }
    }
}

/// One mutation of a history store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JournalRecord {
    /// A world was created or updated.
    World(WorldRecord),
    /// A stage was appended.
    Stage(StageRecord),
    /// A step was appended.
    Step(StepRecord),
    /// A world and all of its history were deleted.
    WorldDeleted {
        /// The deleted world.
        id: WorldId,
    },
    /// All stages and steps of a world were dropped.
    WorldCleared {
        /// The cleared world.
        id: WorldId,
    },
}
