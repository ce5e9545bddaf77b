//! Run controller: the start/stop/resume lifecycle of a world.
//!
//! One [`RunController::run`] call drives one world's [`TickEngine`] in a
//! loop until the world is stopped or the step cap is reached, persisting
//! every tick through the [`HistoryStore`]. Each iteration:
//!
//! 1. `advance()` the engine.
//! 2. Append a stage row if the tick's stage code differs from the
//!    current one (or there is none yet).
//! 3. Append the step row under the current stage.
//! 4. Call the step-changed callback.
//!
//! The running flag is only checked between iterations, so a tick that
//! has started is always persisted before a stop takes effect.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use orrery_core::{StageId, StepId, WorldId, WorldRecord};
use orrery_history::{HistoryStore, NewStep, WorldCatalog};

use crate::error::ControlError;
use crate::metrics::{RunExit, RunReport, RunTally};
use crate::plugins::PluginRegistry;
use crate::run::{RunClaim, RunRegistry};
use crate::tick::{TickEngine, TickResult};

/// Result of asking for a world to start.
#[derive(Debug)]
pub enum StartOutcome<T> {
    /// The world was claimed and ran (or is running).
    Started(T),
    /// The world already had a live run; nothing happened.
    AlreadyRunning,
}

impl<T> StartOutcome<T> {
    /// The started value, if any.
    pub fn started(self) -> Option<T> {
        match self {
            Self::Started(v) => Some(v),
            Self::AlreadyRunning => None,
        }
    }

    /// Whether the start was rejected as a duplicate.
    pub fn is_already_running(&self) -> bool {
        matches!(self, Self::AlreadyRunning)
    }
}

/// Drives worlds through their run loops.
///
/// Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct RunController {
    plugins: Arc<PluginRegistry>,
    history: Arc<dyn HistoryStore>,
    worlds: Arc<dyn WorldCatalog>,
    runs: Arc<RunRegistry>,
}

impl RunController {
    /// Build a controller over one store that is both the history and the
    /// world catalog.
    pub fn new<S>(plugins: Arc<PluginRegistry>, store: Arc<S>, runs: Arc<RunRegistry>) -> Self
    where
        S: HistoryStore + WorldCatalog + 'static,
    {
        Self {
            plugins,
            history: store.clone(),
            worlds: store,
            runs,
        }
    }

    /// The shared run registry.
    pub fn runs(&self) -> &Arc<RunRegistry> {
        &self.runs
    }

    /// Claim `world` and run it on the calling thread.
    ///
    /// Returns [`StartOutcome::AlreadyRunning`] without side effects if
    /// the world already has a live run. `resume_from` defaults to the
    /// world's newest step; `max_steps` caps the ticks of this call only.
    pub fn start(
        &self,
        world: WorldId,
        on_step_changed: &dyn Fn(StepId),
        resume_from: Option<StepId>,
        max_steps: Option<u64>,
    ) -> Result<StartOutcome<RunReport>, ControlError> {
        let Some(claim) = self.runs.claim(world) else {
            log::warn!("world {world} is already running; start ignored");
            return Ok(StartOutcome::AlreadyRunning);
        };
        self.run(claim, on_step_changed, resume_from, max_steps)
            .map(StartOutcome::Started)
    }

    /// Run an already claimed world until it is stopped, reaches
    /// `max_steps`, or fails. The claim is released on return.
    pub fn run(
        &self,
        claim: RunClaim,
        on_step_changed: &dyn Fn(StepId),
        resume_from: Option<StepId>,
        max_steps: Option<u64>,
    ) -> Result<RunReport, ControlError> {
        let world = claim.world();
        let result = self.drive(&claim, on_step_changed, resume_from, max_steps);
        match &result {
            Ok(report) => log::info!(
                "world {world} stopped after {} tick(s): {:?}",
                report.ticks,
                report.exit
            ),
            Err(e) => log::error!("world {world} run aborted: {e}"),
        }
        result
    }

    fn drive(
        &self,
        claim: &RunClaim,
        on_step_changed: &dyn Fn(StepId),
        resume_from: Option<StepId>,
        max_steps: Option<u64>,
    ) -> Result<RunReport, ControlError> {
        let record = self.worlds.world(claim.world())?;
        let (mut engine, mut current) = self.prepare(&record, claim, resume_from)?;

        log::info!(
            "world {} started (plugin {}, max_steps {:?})",
            record.id,
            record.plugin,
            max_steps
        );

        let started = Instant::now();
        let mut tally = RunTally::new();
        let exit = loop {
            if !claim.is_running() {
                break RunExit::Stopped;
            }
            if max_steps.is_some_and(|max| tally.ticks >= max) {
                break RunExit::StepCap;
            }

            let tick = engine.advance()?;
            claim.mark_initialized();

            let stage = match &current {
                Some((id, code)) if *code == tick.stage.code => *id,
                _ => {
                    let id = self.history.append_stage(
                        record.id,
                        &tick.stage.code,
                        &tick.stage.title,
                    )?;
                    log::info!("world {}: entered stage {} ({id})", record.id, tick.stage.code);
                    tally.stages_created += 1;
                    current = Some((id, tick.stage.code.clone()));
                    id
                }
            };

            let step = self.history.append_step(stage, encode_tick(&tick)?)?;
            log::debug!(
                "world {}: step {step} persisted ({} action(s), {} us)",
                record.id,
                tick.metrics.actions,
                tick.metrics.plugin_us
            );
            tally.record_step(step, &tick.metrics);
            notify(on_step_changed, record.id, step);
        };

        Ok(tally.finish(record.id, exit, started.elapsed()))
    }

    /// Build the engine, resuming from history when there is any.
    fn prepare(
        &self,
        record: &WorldRecord,
        claim: &RunClaim,
        resume_from: Option<StepId>,
    ) -> Result<(TickEngine, Option<(StageId, String)>), ControlError> {
        let mut plugin = self.plugins.create(&record.plugin)?;
        if let Some(config) = &record.config {
            plugin.configure(config)?;
        }

        let resume = match resume_from {
            Some(step) => Some(step),
            None => self.history.find_highest_step_id(record.id)?,
        };

        let mut engine = TickEngine::new(plugin, claim.actions());
        let Some(step) = resume else {
            return Ok((engine, None));
        };

        let loaded = self.history.load_step(step)?;
        if loaded.world_id() != record.id {
            return Err(ControlError::ForeignStep {
                step,
                world: record.id,
            });
        }
        let state = engine.plugin().parse_state(&loaded.step.state)?;
        engine.load(state, loaded.stage.label());
        claim.mark_initialized();
        log::info!(
            "world {} resuming from step {step} in stage {}",
            record.id,
            loaded.stage.code
        );
        Ok((engine, Some((loaded.stage.id, loaded.stage.code))))
    }
}

fn encode_tick(tick: &TickResult) -> Result<NewStep, ControlError> {
    Ok(NewStep {
        state: serde_json::to_string(&tick.state)?,
        actions: serde_json::to_string(&tick.actions)?,
        logs: serde_json::to_string(&tick.logs)?,
        interactions: serde_json::to_string(&tick.interactions)?,
    })
}

fn notify(on_step_changed: &dyn Fn(StepId), world: WorldId, step: StepId) {
    if panic::catch_unwind(AssertUnwindSafe(|| on_step_changed(step))).is_err() {
        log::warn!("world {world}: step-changed callback panicked at step {step}");
    }
}
