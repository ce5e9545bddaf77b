//! In-memory history store.

use std::collections::BTreeMap;
use std::sync::Mutex;

use indexmap::IndexMap;
use orrery_core::{LoadedStep, StageId, StageRecord, StepId, StepRecord, WorldId, WorldRecord};

use crate::error::HistoryError;
use crate::store::{HistoryStore, NewStep, WorldCatalog};

/// A [`HistoryStore`] and [`WorldCatalog`] kept entirely in memory.
///
/// Ids come from one monotonic counter per table starting at 1, so id
/// order is creation order. Deleting rows never rewinds a counter.
///
/// # Examples
///
/// ```
/// use orrery_history::{HistoryStore, MemoryHistory, NewStep};
///
/// let history = MemoryHistory::new();
/// let world = history.create_world("Sandbox", "DEMO_GAME", None);
/// let stage = history.append_stage(world.id, "stage_0", "Stage 0").unwrap();
/// let step = history.append_step(stage, NewStep {
///     state: "{}".into(),
///     actions: "[]".into(),
///     logs: "[]".into(),
///     interactions: "[]".into(),
/// }).unwrap();
/// assert_eq!(history.find_highest_step_id(world.id).unwrap(), Some(step));
/// ```
pub struct MemoryHistory {
    tables: Mutex<Tables>,
}

struct Tables {
    worlds: IndexMap<WorldId, WorldRecord>,
    stages: BTreeMap<StageId, StageRecord>,
    steps: BTreeMap<StepId, StepRecord>,
    next_world: u64,
    next_stage: u64,
    next_step: u64,
}

impl Tables {
    fn require_world(&self, world: WorldId) -> Result<(), HistoryError> {
        if self.worlds.contains_key(&world) {
            Ok(())
        } else {
            Err(HistoryError::WorldNotFound { world })
        }
    }

    fn owner_of(&self, step: &StepRecord) -> Option<WorldId> {
        self.stages.get(&step.stage_id).map(|s| s.world_id)
    }

    fn clear(&mut self, world: WorldId) {
        let stages = &self.stages;
        self.steps
            .retain(|_, step| stages.get(&step.stage_id).map(|s| s.world_id) != Some(world));
        self.stages.retain(|_, stage| stage.world_id != world);
    }
}

impl MemoryHistory {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables {
                worlds: IndexMap::new(),
                stages: BTreeMap::new(),
                steps: BTreeMap::new(),
                next_world: 1,
                next_stage: 1,
                next_step: 1,
            }),
        }
    }

    // ── World CRUD ──────────────────────────────────────────────

    /// Create a world record.
    pub fn create_world(
        &self,
        title: impl Into<String>,
        plugin: impl Into<String>,
        config: Option<String>,
    ) -> WorldRecord {
        let record = self.reserve_world(title, plugin, config);
        self.insert_world(record.clone());
        record
    }

    /// Replace an existing world record's title, plugin and config.
    pub fn update_world(&self, record: WorldRecord) -> Result<(), HistoryError> {
        let mut t = self.tables.lock().unwrap();
        match t.worlds.get_mut(&record.id) {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(HistoryError::WorldNotFound { world: record.id }),
        }
    }

    /// Delete a world together with all of its stages and steps.
    pub fn delete_world(&self, world: WorldId) -> Result<WorldRecord, HistoryError> {
        let mut t = self.tables.lock().unwrap();
        let record = t
            .worlds
            .shift_remove(&world)
            .ok_or(HistoryError::WorldNotFound { world })?;
        t.clear(world);
        Ok(record)
    }

    /// Drop all stages and steps of a world, keeping the world itself.
    pub fn clear_world(&self, world: WorldId) -> Result<(), HistoryError> {
        let mut t = self.tables.lock().unwrap();
        t.require_world(world)?;
        t.clear(world);
        Ok(())
    }

    /// All worlds, in creation order.
    pub fn worlds(&self) -> Vec<WorldRecord> {
        self.tables.lock().unwrap().worlds.values().cloned().collect()
    }

    /// Look up one stage.
    pub fn stage(&self, stage: StageId) -> Result<StageRecord, HistoryError> {
        self.tables
            .lock()
            .unwrap()
            .stages
            .get(&stage)
            .cloned()
            .ok_or(HistoryError::StageNotFound { stage })
    }

    /// Total number of step rows across all worlds.
    pub fn step_count(&self) -> usize {
        self.tables.lock().unwrap().steps.len()
    }

    // ── Reserve and commit (shared with the journal) ───────────

    /// Validate `world` and take the next stage id without inserting.
    ///
    /// A reserved id that is never committed leaves a gap; counters never
    /// rewind.
    pub(crate) fn reserve_stage(
        &self,
        world: WorldId,
        code: &str,
        title: &str,
    ) -> Result<StageRecord, HistoryError> {
        let mut t = self.tables.lock().unwrap();
        t.require_world(world)?;
        let id = StageId(t.next_stage);
        t.next_stage += 1;
        Ok(StageRecord {
            id,
            world_id: world,
            code: code.to_string(),
            title: title.to_string(),
        })
    }

    /// Validate `stage` and take the next step id without inserting.
    pub(crate) fn reserve_step(
        &self,
        stage: StageId,
        step: NewStep,
    ) -> Result<StepRecord, HistoryError> {
        let mut t = self.tables.lock().unwrap();
        if !t.stages.contains_key(&stage) {
            return Err(HistoryError::StageNotFound { stage });
        }
        let id = StepId(t.next_step);
        t.next_step += 1;
        Ok(StepRecord {
            id,
            stage_id: stage,
            state: step.state,
            actions: step.actions,
            logs: step.logs,
            interactions: step.interactions,
        })
    }

    /// Take the next world id without inserting.
    pub(crate) fn reserve_world(
        &self,
        title: impl Into<String>,
        plugin: impl Into<String>,
        config: Option<String>,
    ) -> WorldRecord {
        let mut t = self.tables.lock().unwrap();
        let id = WorldId(t.next_world);
        t.next_world += 1;
        WorldRecord {
            id,
            title: title.into(),
            plugin: plugin.into(),
            config,
        }
    }

    // ── Insert with known ids (commit and journal replay) ──────

    pub(crate) fn insert_world(&self, record: WorldRecord) {
        let mut t = self.tables.lock().unwrap();
        t.next_world = t.next_world.max(record.id.0 + 1);
        t.worlds.insert(record.id, record);
    }

    /// Insert a stage row. Its world must exist.
    pub(crate) fn insert_stage(&self, record: StageRecord) -> Result<(), HistoryError> {
        let mut t = self.tables.lock().unwrap();
        t.require_world(record.world_id)?;
        t.next_stage = t.next_stage.max(record.id.0 + 1);
        t.stages.insert(record.id, record);
        Ok(())
    }

    /// Insert a step row. Its stage must exist.
    pub(crate) fn insert_step(&self, record: StepRecord) -> Result<(), HistoryError> {
        let mut t = self.tables.lock().unwrap();
        if !t.stages.contains_key(&record.stage_id) {
            return Err(HistoryError::StageNotFound {
                stage: record.stage_id,
            });
        }
        t.next_step = t.next_step.max(record.id.0 + 1);
        t.steps.insert(record.id, record);
        Ok(())
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore for MemoryHistory {
    fn find_highest_step_id(&self, world: WorldId) -> Result<Option<StepId>, HistoryError> {
        let t = self.tables.lock().unwrap();
        t.require_world(world)?;
        Ok(t
            .steps
            .values()
            .rev()
            .find(|step| t.owner_of(step) == Some(world))
            .map(|step| step.id))
    }

    fn load_step(&self, step: StepId) -> Result<LoadedStep, HistoryError> {
        let t = self.tables.lock().unwrap();
        let row = t
            .steps
            .get(&step)
            .ok_or(HistoryError::StepNotFound { step })?;
        let stage = t
            .stages
            .get(&row.stage_id)
            .ok_or(HistoryError::StageNotFound {
                stage: row.stage_id,
            })?;
        Ok(LoadedStep {
            step: row.clone(),
            stage: stage.clone(),
        })
    }

    fn append_stage(
        &self,
        world: WorldId,
        code: &str,
        title: &str,
    ) -> Result<StageId, HistoryError> {
        let stage = self.reserve_stage(world, code, title)?;
        let id = stage.id;
        self.insert_stage(stage)?;
        Ok(id)
    }

    fn append_step(&self, stage: StageId, step: NewStep) -> Result<StepId, HistoryError> {
        let step = self.reserve_step(stage, step)?;
        let id = step.id;
        self.insert_step(step)?;
        Ok(id)
    }

    fn steps_for_world(&self, world: WorldId) -> Result<Vec<StepRecord>, HistoryError> {
        let t = self.tables.lock().unwrap();
        t.require_world(world)?;
        Ok(t
            .steps
            .values()
            .rev()
            .filter(|step| t.owner_of(step) == Some(world))
            .cloned()
            .collect())
    }

    fn stages_for_world(&self, world: WorldId) -> Result<Vec<StageRecord>, HistoryError> {
        let t = self.tables.lock().unwrap();
        t.require_world(world)?;
        Ok(t
            .stages
            .values()
            .rev()
            .filter(|stage| stage.world_id == world)
            .cloned()
            .collect())
    }
}

impl WorldCatalog for MemoryHistory {
    fn world(&self, id: WorldId) -> Result<WorldRecord, HistoryError> {
        self.tables
            .lock()
            .unwrap()
            .worlds
            .get(&id)
            .cloned()
            .ok_or(HistoryError::WorldNotFound { world: id })
    }
}
