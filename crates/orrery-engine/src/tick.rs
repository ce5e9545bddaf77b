//! Tick engine: drives one plugin instance one tick at a time.
//!
//! [`TickEngine`] owns the plugin, its current state and stage label, and
//! the per-tick log/interaction buffers. Pending actions are the receiving
//! end of an unbounded crossbeam channel whose sender lives in the world's
//! run slot, so submitters never wait on an in-flight tick.
//!
//! # Tick atomicity
//!
//! `advance()` drains the action channel before calling the plugin; that
//! batch is the tick's input and anything sent afterwards belongs to the
//! next tick. If the plugin call fails, state and stage are left as they
//! were before the tick, the tick's logs and interactions are discarded,
//! and the drained input is lost.

use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use orrery_core::{
    ClientInteraction, ExternalInput, Plugin, PluginError, TickContext, WorldAction,
    WorldLogEntry, WorldStage,
};
use serde_json::Value;

use crate::metrics::TickMetrics;

// ── TickResult ───────────────────────────────────────────────────

/// Outcome of one successful [`TickEngine::advance`].
#[derive(Clone, Debug, PartialEq)]
pub struct TickResult {
    /// Plugin state after the tick.
    pub state: Value,
    /// Stage label after the tick, including relabels made during it.
    pub stage: WorldStage,
    /// Actions the tick consumed, in submission order.
    pub actions: Vec<WorldAction>,
    /// Logs produced during the tick.
    pub logs: Vec<WorldLogEntry>,
    /// Interactions produced during the tick.
    pub interactions: Vec<ClientInteraction>,
    /// Counters for this tick.
    pub metrics: TickMetrics,
}

// ── TickEngine ───────────────────────────────────────────────────

/// Single-threaded tick engine for one world.
///
/// # Examples
///
/// ```
/// use orrery_core::{ExternalInput, PluginError, Simulation, SimulationPlugin,
///     StateDescription, TickContext, WorldAction};
/// use orrery_engine::TickEngine;
///
/// struct Count;
/// impl Simulation for Count {
///     type State = usize;
///     fn initialize(&mut self, _: &mut TickContext<'_>) -> Result<usize, PluginError> {
///         Ok(0)
///     }
///     fn step(&mut self, _: &mut TickContext<'_>, prev: &usize, input: &ExternalInput)
///         -> Result<usize, PluginError> {
///         Ok(prev + input.actions.len())
///     }
///     fn describe_state(&self, _: &usize) -> StateDescription {
///         StateDescription::new()
///     }
/// }
///
/// let (mut engine, actions) = TickEngine::with_channel(SimulationPlugin::boxed(Count));
/// engine.advance().unwrap(); // initialize
/// actions.send(WorldAction::new("A")).unwrap();
/// actions.send(WorldAction::new("B")).unwrap();
/// let tick = engine.advance().unwrap();
/// assert_eq!(tick.state, serde_json::json!(2));
/// assert_eq!(tick.actions.len(), 2);
/// ```
pub struct TickEngine {
    plugin: Box<dyn Plugin>,
    actions: Receiver<WorldAction>,
    state: Option<Value>,
    stage: WorldStage,
    logs: Vec<WorldLogEntry>,
    interactions: Vec<ClientInteraction>,
    ticks: u64,
}

impl TickEngine {
    /// Wrap a plugin, consuming actions from `actions`.
    ///
    /// The engine starts uninitialized in the
    /// [`initial`](WorldStage::initial) stage.
    pub fn new(plugin: Box<dyn Plugin>, actions: Receiver<WorldAction>) -> Self {
        Self {
            plugin,
            actions,
            state: None,
            stage: WorldStage::initial(),
            logs: Vec::new(),
            interactions: Vec::new(),
            ticks: 0,
        }
    }

    /// Wrap a plugin with a fresh action channel, returning its sender.
    pub fn with_channel(plugin: Box<dyn Plugin>) -> (Self, Sender<WorldAction>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(plugin, rx), tx)
    }

    /// Replace state and stage with a persisted step's, discarding any
    /// pending actions and buffered logs/interactions.
    ///
    /// Must not be called while a tick is in flight; `&mut self` makes
    /// that impossible from safe code.
    pub fn load(&mut self, state: Value, stage: WorldStage) {
        let dropped = self.actions.try_iter().count();
        if dropped > 0 {
            log::debug!("discarded {dropped} action(s) queued before load");
        }
        self.state = Some(state);
        self.stage = stage;
        self.logs.clear();
        self.interactions.clear();
    }

    /// Run one tick: `initialize` when there is no state yet, `step`
    /// otherwise.
    ///
    /// On error the engine is left exactly as it was before the call,
    /// minus the consumed actions.
    pub fn advance(&mut self) -> Result<TickResult, PluginError> {
        let input = ExternalInput::new(self.actions.try_iter().collect());
        let stage_before = self.stage.clone();

        let started = Instant::now();
        let outcome = {
            let mut ctx = TickContext::new(&mut self.stage, &mut self.logs, &mut self.interactions);
            match &self.state {
                None => self.plugin.initialize(&mut ctx),
                Some(prev) => self.plugin.step(&mut ctx, prev, &input),
            }
        };
        let plugin_us = started.elapsed().as_micros() as u64;

        let logs = std::mem::take(&mut self.logs);
        let interactions = std::mem::take(&mut self.interactions);

        let state = match outcome {
            Ok(state) => state,
            Err(e) => {
                self.stage = stage_before;
                return Err(e);
            }
        };

        self.state = Some(state.clone());
        self.ticks += 1;
        let metrics = TickMetrics {
            plugin_us,
            actions: input.actions.len(),
            logs: logs.len(),
            interactions: interactions.len(),
        };
        Ok(TickResult {
            state,
            stage: self.stage.clone(),
            actions: input.actions,
            logs,
            interactions,
            metrics,
        })
    }

    /// The plugin this engine drives.
    pub fn plugin(&self) -> &dyn Plugin {
        &*self.plugin
    }

    /// Current state, or `None` before the first tick or load.
    pub fn state(&self) -> Option<&Value> {
        self.state.as_ref()
    }

    /// Current stage label.
    pub fn stage(&self) -> &WorldStage {
        &self.stage
    }

    /// Whether the engine holds a state (loaded or produced by a tick).
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Successful ticks since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_core::{LogLevel, SimulationPlugin};
    use orrery_test_utils::{CounterSim, CounterState, FailingSim};
    use proptest::prelude::*;
    use serde_json::json;

    fn counter(per_stage: u64) -> (TickEngine, Sender<WorldAction>) {
        TickEngine::with_channel(SimulationPlugin::boxed(CounterSim::every(per_stage)))
    }

    fn decode(v: &Value) -> CounterState {
        serde_json::from_value(v.clone()).unwrap()
    }

    #[test]
    fn first_tick_initializes_without_stepping() {
        let (mut engine, _tx) = counter(10);
        assert!(!engine.is_initialized());
        assert_eq!(engine.stage().code, "initial");
        let tick = engine.advance().unwrap();
        assert_eq!(decode(&tick.state).n, 0);
        assert_eq!(tick.stage.code, "stage_0");
        assert_eq!(tick.logs.len(), 1);
        assert_eq!(tick.logs[0].level, LogLevel::Info);
        assert!(engine.is_initialized());
        assert_eq!(engine.ticks(), 1);
    }

    #[test]
    fn actions_sent_before_advance_are_consumed_once() {
        let (mut engine, tx) = counter(10);
        engine.advance().unwrap();
        tx.send(WorldAction::new("PING")).unwrap();
        tx.send(WorldAction::new("PONG")).unwrap();
        let tick = engine.advance().unwrap();
        assert_eq!(tick.metrics.actions, 2);
        assert_eq!(decode(&tick.state).seen, vec!["PING", "PONG"]);
        let tick = engine.advance().unwrap();
        assert!(tick.actions.is_empty());
        assert_eq!(decode(&tick.state).seen.len(), 2);
    }

    #[test]
    fn actions_before_initialize_are_dropped_with_the_first_tick() {
        let (mut engine, tx) = counter(10);
        tx.send(WorldAction::new("EARLY")).unwrap();
        let tick = engine.advance().unwrap();
        assert_eq!(tick.actions, vec![WorldAction::new("EARLY")]);
        assert!(decode(&tick.state).seen.is_empty());
    }

    #[test]
    fn load_replaces_state_and_discards_pending() {
        let (mut engine, tx) = counter(10);
        tx.send(WorldAction::new("STALE")).unwrap();
        engine.load(json!({"n": 41, "seen": []}), WorldStage::new("stage_4", "Stage 4"));
        assert!(engine.is_initialized());
        assert_eq!(engine.stage().code, "stage_4");
        let tick = engine.advance().unwrap();
        let state = decode(&tick.state);
        assert_eq!(state.n, 42);
        assert!(state.seen.is_empty());
        assert!(tick.actions.is_empty());
    }

    #[test]
    fn failed_step_keeps_prior_state_and_stage() {
        let sim = FailingSim::new(2);
        let (mut engine, tx) = TickEngine::with_channel(SimulationPlugin::boxed(sim.clone()));
        engine.advance().unwrap();
        let ok = engine.advance().unwrap();
        assert_eq!(ok.state, json!(1));

        tx.send(WorldAction::new("LOST")).unwrap();
        let err = engine.advance().unwrap_err();
        assert!(matches!(err, PluginError::Failed { .. }));
        assert_eq!(engine.state(), Some(&json!(1)));
        assert_eq!(engine.ticks(), 2);
        assert_eq!(sim.calls(), 3);

        // Retry starts from the same state; the failed tick's input and
        // logs are gone.
        let err = engine.advance().unwrap_err();
        assert!(matches!(err, PluginError::Failed { .. }));
        assert_eq!(engine.state(), Some(&json!(1)));
    }

    #[test]
    fn stage_relabel_is_reverted_on_failure() {
        struct RelabelThenFail;
        impl orrery_core::Simulation for RelabelThenFail {
            type State = u8;
            fn initialize(&mut self, _: &mut TickContext<'_>) -> Result<u8, PluginError> {
                Ok(0)
            }
            fn step(
                &mut self,
                ctx: &mut TickContext<'_>,
                _: &u8,
                _: &ExternalInput,
            ) -> Result<u8, PluginError> {
                ctx.set_stage("broken", "Broken");
                ctx.error("about to fail");
                Err(PluginError::failed("nope"))
            }
            fn describe_state(&self, _: &u8) -> orrery_core::StateDescription {
                Default::default()
            }
        }
        let (mut engine, _tx) = TickEngine::with_channel(SimulationPlugin::boxed(RelabelThenFail));
        engine.advance().unwrap();
        assert!(engine.advance().is_err());
        assert_eq!(engine.stage().code, "initial");
    }

    proptest! {
        // Whatever the split of sends across ticks, every action is
        // consumed by exactly one tick, in send order.
        #[test]
        fn every_action_consumed_exactly_once(batches in proptest::collection::vec(0usize..5, 1..12)) {
            let (mut engine, tx) = counter(3);
            engine.advance().unwrap();
            let mut expected = Vec::new();
            let mut seen_total = 0;
            for (i, n) in batches.iter().enumerate() {
                for j in 0..*n {
                    let name = format!("A{i}_{j}");
                    expected.push(name.clone());
                    tx.send(WorldAction::new(name)).unwrap();
                }
                let tick = engine.advance().unwrap();
                prop_assert_eq!(tick.actions.len(), *n);
                seen_total += tick.actions.len();
            }
            let state = decode(engine.state().unwrap());
            prop_assert_eq!(seen_total, expected.len());
            prop_assert_eq!(state.seen, expected);
            prop_assert_eq!(state.n, batches.len() as u64);
        }
    }
}
