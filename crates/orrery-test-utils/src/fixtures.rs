//! Reusable simulation test fixtures.
//!
//! - [`CounterSim`]: counts ticks and records the actions it saw.
//! - [`FailingSim`]: fails deterministically after N calls.
//! - [`GatedSim`]: blocks inside `step` until the test releases it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use orrery_core::{
    ExternalInput, PluginError, Simulation, StateDescription, TickContext, WorldActionDef,
};
use serde::{Deserialize, Serialize};

// ── CounterSim ──────────────────────────────────────────────────

/// State of [`CounterSim`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterState {
    /// Ticks since initialization.
    pub n: u64,
    /// Every action name consumed so far, in order.
    pub seen: Vec<String>,
}

/// Counts ticks; `initialize` yields `n = 0`, each `step` adds one.
///
/// Stage labelling is either fixed or changes every `k` ticks
/// (`stage_{n / k}`). A world config of the form `{"every": k}` switches
/// to the latter.
#[derive(Clone, Debug)]
pub struct CounterSim {
    fixed: Option<String>,
    every: u64,
}

impl CounterSim {
    /// Always report stage `code`.
    pub fn fixed(code: impl Into<String>) -> Self {
        Self {
            fixed: Some(code.into()),
            every: 1,
        }
    }

    /// Change stage every `k` ticks.
    pub fn every(k: u64) -> Self {
        Self {
            fixed: None,
            every: k.max(1),
        }
    }

    fn label(&self, ctx: &mut TickContext<'_>, n: u64) {
        match &self.fixed {
            Some(code) => ctx.set_stage(code.clone(), code.to_uppercase()),
            None => {
                let idx = n / self.every;
                ctx.set_stage(format!("stage_{idx}"), format!("Stage {idx}"));
            }
        }
    }
}

impl Default for CounterSim {
    fn default() -> Self {
        Self::fixed("counting")
    }
}

#[derive(Deserialize)]
struct CounterConfig {
    every: u64,
}

impl Simulation for CounterSim {
    type State = CounterState;

    fn configure(&mut self, config: &str) -> Result<(), PluginError> {
        let cfg: CounterConfig =
            serde_json::from_str(config).map_err(|e| PluginError::InvalidConfig {
                reason: e.to_string(),
            })?;
        *self = Self::every(cfg.every);
        Ok(())
    }

    fn define_actions(&self) -> Vec<WorldActionDef> {
        vec![
            WorldActionDef::new("PING", "Ping"),
            WorldActionDef::new("PONG", "Pong").with_shortcut("KeyP"),
        ]
    }

    fn initialize(&mut self, ctx: &mut TickContext<'_>) -> Result<CounterState, PluginError> {
        ctx.info("counter initialized");
        self.label(ctx, 0);
        Ok(CounterState::default())
    }

    fn step(
        &mut self,
        ctx: &mut TickContext<'_>,
        prev: &CounterState,
        input: &ExternalInput,
    ) -> Result<CounterState, PluginError> {
        let mut next = prev.clone();
        next.n += 1;
        next.seen
            .extend(input.actions.iter().map(|a| a.name.clone()));
        ctx.debug(format!("tick {}", next.n));
        self.label(ctx, next.n);
        Ok(next)
    }

    fn describe_state(&self, state: &CounterState) -> StateDescription {
        let mut d = StateDescription::new();
        d.insert("n".into(), state.n.to_string());
        d.insert("seen".into(), state.seen.len().to_string());
        d
    }

    fn render_state(&self, state: &CounterState) -> Result<Vec<u8>, PluginError> {
        Ok(state.n.to_le_bytes().to_vec())
    }
}

// ── FailingSim ──────────────────────────────────────────────────

/// Succeeds `succeed_count` times (initialize and step both count),
/// then fails every call.
///
/// The call counter is shared, so clones handed out by a plugin factory
/// all count against the same budget.
#[derive(Clone, Debug)]
pub struct FailingSim {
    pub succeed_count: usize,
    calls: Arc<AtomicUsize>,
}

impl FailingSim {
    /// Create a simulation that succeeds `succeed_count` times then fails.
    pub fn new(succeed_count: usize) -> Self {
        Self {
            succeed_count,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// How many times `initialize` or `step` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn attempt(&self, value: u64) -> Result<u64, PluginError> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            return Err(PluginError::failed(format!(
                "deliberate failure after {} successful calls",
                self.succeed_count
            )));
        }
        Ok(value)
    }
}

impl Simulation for FailingSim {
    type State = u64;

    fn initialize(&mut self, _ctx: &mut TickContext<'_>) -> Result<u64, PluginError> {
        self.attempt(0)
    }

    fn step(
        &mut self,
        ctx: &mut TickContext<'_>,
        prev: &u64,
        _input: &ExternalInput,
    ) -> Result<u64, PluginError> {
        ctx.warn("about to attempt");
        self.attempt(prev + 1)
    }

    fn describe_state(&self, state: &u64) -> StateDescription {
        [("value".to_string(), state.to_string())].into_iter().collect()
    }
}

// ── GatedSim ────────────────────────────────────────────────────

/// Test-side control for a [`GatedSim`].
pub struct Gate {
    entered: Receiver<u64>,
    release: Sender<()>,
}

impl Gate {
    /// Create a gate and the simulation it controls.
    pub fn pair() -> (Gate, GatedSim) {
        let (entered_tx, entered_rx) = crossbeam_channel::unbounded();
        let (release_tx, release_rx) = crossbeam_channel::unbounded();
        (
            Gate {
                entered: entered_rx,
                release: release_tx,
            },
            GatedSim {
                entered: entered_tx,
                release: release_rx,
            },
        )
    }

    /// Wait until the simulation is inside a call; returns the state
    /// value it is stepping from (`u64::MAX` for `initialize`).
    pub fn wait_entered(&self, timeout: Duration) -> Option<u64> {
        self.entered.recv_timeout(timeout).ok()
    }

    /// Let one blocked call complete.
    pub fn release(&self) {
        let _ = self.release.send(());
    }
}

/// Blocks in every `initialize`/`step` until its [`Gate`] releases it.
///
/// If the gate is dropped, calls proceed without blocking.
#[derive(Clone)]
pub struct GatedSim {
    entered: Sender<u64>,
    release: Receiver<()>,
}

impl GatedSim {
    fn block(&self, at: u64) {
        let _ = self.entered.send(at);
        let _ = self.release.recv();
    }
}

impl Simulation for GatedSim {
    type State = u64;

    fn initialize(&mut self, _ctx: &mut TickContext<'_>) -> Result<u64, PluginError> {
        self.block(u64::MAX);
        Ok(0)
    }

    fn step(
        &mut self,
        _ctx: &mut TickContext<'_>,
        prev: &u64,
        _input: &ExternalInput,
    ) -> Result<u64, PluginError> {
        self.block(*prev);
        Ok(prev + 1)
    }

    fn describe_state(&self, state: &u64) -> StateDescription {
        [("value".to_string(), state.to_string())].into_iter().collect()
    }
}
