//! Persisted record shapes.
//!
//! These mirror the rows a history store keeps. The step payload columns
//! are JSON strings: the store never looks inside them, and the run
//! controller and plugins are the only parties that encode or decode them.

use serde::{Deserialize, Serialize};

use crate::action::WorldStage;
use crate::id::{StageId, StepId, WorldId};

/// One world: a simulation instance bound to a plugin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldRecord {
    /// Record id.
    pub id: WorldId,
    /// Human-readable title.
    pub title: String,
    /// Plugin identifier, resolved through the plugin registry.
    pub plugin: String,
    /// Opaque configuration blob handed to the plugin on every start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
}

/// One stage row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Record id. Larger means later within a world.
    pub id: StageId,
    /// Owning world.
    pub world_id: WorldId,
    /// Short machine key.
    pub code: String,
    /// Human-readable label.
    pub title: String,
}

impl StageRecord {
    /// The stage label this row persists.
    pub fn label(&self) -> WorldStage {
        WorldStage::new(self.code.clone(), self.title.clone())
    }
}

/// One persisted tick outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Record id. Larger means later within a world.
    pub id: StepId,
    /// Owning stage.
    pub stage_id: StageId,
    /// Plugin state after the tick, as JSON.
    pub state: String,
    /// Actions consumed by the tick, as a JSON array.
    pub actions: String,
    /// Logs produced by the tick, as a JSON array.
    pub logs: String,
    /// Interactions produced by the tick, as a JSON array.
    pub interactions: String,
}

/// A step joined with its owning stage, as returned by
/// `HistoryStore::load_step`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedStep {
    /// The step row.
    pub step: StepRecord,
    /// The stage row the step belongs to.
    pub stage: StageRecord,
}

impl LoadedStep {
    /// The world this step belongs to.
    pub fn world_id(&self) -> WorldId {
        self.stage.world_id
    }
}
