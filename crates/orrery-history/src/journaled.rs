//! Write-through journaling store.

use std::io::Write;
use std::sync::Mutex;

use orrery_core::{LoadedStep, StageId, StageRecord, StepId, StepRecord, WorldId, WorldRecord};

use crate::error::HistoryError;
use crate::journal::JournalRecord;
use crate::memory::MemoryHistory;
use crate::store::{HistoryStore, NewStep, WorldCatalog};
use crate::writer::JournalWriter;

/// A [`MemoryHistory`] that appends every mutation to a journal.
///
/// Reads are served from memory. Each mutation holds the journal lock,
/// validates against memory, writes and flushes the journal record, and
/// only then applies the change in memory. A failed journal write leaves
/// memory untouched (at most an unused id is skipped), and the writer
/// then refuses further records with [`HistoryError::JournalFailed`].
pub struct JournaledHistory<W: Write + Send> {
    memory: MemoryHistory,
    journal: Mutex<JournalWriter<W>>,
}

impl<W: Write + Send> JournaledHistory<W> {
    /// Wrap a store and a journal positioned after its last record.
    ///
    /// Pass a fresh [`MemoryHistory`] with [`JournalWriter::new`], or the
    /// result of [`JournalReader::restore`](crate::JournalReader::restore)
    /// with [`JournalWriter::resume`].
    pub fn new(memory: MemoryHistory, journal: JournalWriter<W>) -> Self {
        Self {
            memory,
            journal: Mutex::new(journal),
        }
    }

    /// The in-memory tables.
    pub fn memory(&self) -> &MemoryHistory {
        &self.memory
    }

    /// Consume the store and return its journal writer.
    pub fn into_journal(self) -> JournalWriter<W> {
        self.journal.into_inner().unwrap()
    }

    fn record(journal: &mut JournalWriter<W>, rec: &JournalRecord) -> Result<(), HistoryError> {
        journal.append(rec)?;
        journal.flush()
    }

    /// Create a world record. See [`MemoryHistory::create_world`].
    pub fn create_world(
        &self,
        title: impl Into<String>,
        plugin: impl Into<String>,
        config: Option<String>,
    ) -> Result<WorldRecord, HistoryError> {
        let mut journal = self.journal.lock().unwrap();
        let world = self.memory.reserve_world(title, plugin, config);
        Self::record(&mut journal, &JournalRecord::World(world.clone()))?;
        self.memory.insert_world(world.clone());
        Ok(world)
    }

    /// Replace a world record. See [`MemoryHistory::update_world`].
    pub fn update_world(&self, record: WorldRecord) -> Result<(), HistoryError> {
        let mut journal = self.journal.lock().unwrap();
        self.memory.world(record.id)?;
        Self::record(&mut journal, &JournalRecord::World(record.clone()))?;
        self.memory.update_world(record)
    }

    /// Delete a world. See [`MemoryHistory::delete_world`].
    pub fn delete_world(&self, world: WorldId) -> Result<WorldRecord, HistoryError> {
        let mut journal = self.journal.lock().unwrap();
        self.memory.world(world)?;
        Self::record(&mut journal, &JournalRecord::WorldDeleted { id: world })?;
        self.memory.delete_world(world)
    }

    /// Drop a world's history. See [`MemoryHistory::clear_world`].
    pub fn clear_world(&self, world: WorldId) -> Result<(), HistoryError> {
        let mut journal = self.journal.lock().unwrap();
        self.memory.world(world)?;
        Self::record(&mut journal, &JournalRecord::WorldCleared { id: world })?;
        self.memory.clear_world(world)
    }
}

impl<W: Write + Send> HistoryStore for JournaledHistory<W> {
    fn find_highest_step_id(&self, world: WorldId) -> Result<Option<StepId>, HistoryError> {
        self.memory.find_highest_step_id(world)
    }

    fn load_step(&self, step: StepId) -> Result<LoadedStep, HistoryError> {
        self.memory.load_step(step)
    }

    fn append_stage(
        &self,
        world: WorldId,
        code: &str,
        title: &str,
    ) -> Result<StageId, HistoryError> {
        let mut journal = self.journal.lock().unwrap();
        let stage = self.memory.reserve_stage(world, code, title)?;
        let id = stage.id;
        Self::record(&mut journal, &JournalRecord::Stage(stage.clone()))?;
        self.memory.insert_stage(stage)?;
        Ok(id)
    }

    fn append_step(&self, stage: StageId, step: NewStep) -> Result<StepId, HistoryError> {
        let mut journal = self.journal.lock().unwrap();
        let step = self.memory.reserve_step(stage, step)?;
        let id = step.id;
        Self::record(&mut journal, &JournalRecord::Step(step.clone()))?;
        self.memory.insert_step(step)?;
        Ok(id)
    }

    fn steps_for_world(&self, world: WorldId) -> Result<Vec<StepRecord>, HistoryError> {
        self.memory.steps_for_world(world)
    }

    fn stages_for_world(&self, world: WorldId) -> Result<Vec<StageRecord>, HistoryError> {
        self.memory.stages_for_world(world)
    }
}

impl<W: Write + Send> WorldCatalog for JournaledHistory<W> {
    fn world(&self, id: WorldId) -> Result<WorldRecord, HistoryError> {
        self.memory.world(id)
    }
}
