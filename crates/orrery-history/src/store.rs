//! The [`HistoryStore`] and [`WorldCatalog`] traits.
//!
//! Both take `&self` and require `Send + Sync`: one store is shared by
//! every run thread and by the request side, so implementations guard
//! their own tables.

use orrery_core::{LoadedStep, StageId, StageRecord, StepId, StepRecord, WorldId, WorldRecord};

use crate::error::HistoryError;

/// Serialized payload of a step about to be appended.
///
/// Each field is a JSON document; the store keeps them verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewStep {
    /// Plugin state after the tick.
    pub state: String,
    /// Actions consumed by the tick.
    pub actions: String,
    /// Logs produced by the tick.
    pub logs: String,
    /// Interactions produced by the tick.
    pub interactions: String,
}

/// Append-only persistence for stage and step rows.
///
/// # Contract
///
/// - Ids returned by `append_stage` / `append_step` strictly increase
///   with call order, across all worlds.
/// - Rows are never modified after they are appended.
/// - `steps_for_world` and `stages_for_world` return newest first.
pub trait HistoryStore: Send + Sync {
    /// Id of the newest step recorded for `world`, if any.
    fn find_highest_step_id(&self, world: WorldId) -> Result<Option<StepId>, HistoryError>;

    /// Load a step together with its owning stage.
    fn load_step(&self, step: StepId) -> Result<LoadedStep, HistoryError>;

    /// Append a stage row for `world`.
    fn append_stage(&self, world: WorldId, code: &str, title: &str)
        -> Result<StageId, HistoryError>;

    /// Append a step row under `stage`.
    fn append_step(&self, stage: StageId, step: NewStep) -> Result<StepId, HistoryError>;

    /// All steps of `world`, newest first.
    fn steps_for_world(&self, world: WorldId) -> Result<Vec<StepRecord>, HistoryError>;

    /// All stages of `world`, newest first.
    fn stages_for_world(&self, world: WorldId) -> Result<Vec<StageRecord>, HistoryError>;
}

/// Read access to world records.
pub trait WorldCatalog: Send + Sync {
    /// Look up one world.
    fn world(&self, id: WorldId) -> Result<WorldRecord, HistoryError>;
}
