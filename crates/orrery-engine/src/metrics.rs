//! Per-tick and per-run metrics.
//!
//! [`TickMetrics`] is attached to every tick result; [`RunReport`]
//! summarizes one `start` invocation once its loop exits.

use std::time::Duration;

use orrery_core::{StepId, WorldId};

/// Counters collected during a single tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickMetrics {
    /// Time spent inside the plugin's `initialize`/`step`, in microseconds.
    pub plugin_us: u64,
    /// Actions consumed by the tick.
    pub actions: usize,
    /// Log lines produced by the tick.
    pub logs: usize,
    /// Interactions produced by the tick.
    pub interactions: usize,
}

/// Why a run loop exited normally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunExit {
    /// The running flag was cleared by `stop`.
    Stopped,
    /// The invocation's step cap was reached.
    StepCap,
}

/// Summary of one completed run loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    /// The world that ran.
    pub world: WorldId,
    /// Ticks completed and persisted by this invocation.
    pub ticks: u64,
    /// Stage rows created by this invocation.
    pub stages_created: u64,
    /// First step persisted by this invocation.
    pub first_step: Option<StepId>,
    /// Last step persisted by this invocation.
    pub last_step: Option<StepId>,
    /// Total plugin time across all ticks, in microseconds.
    pub plugin_us: u64,
    /// Why the loop exited.
    pub exit: RunExit,
    /// Wall-clock time from loop entry to exit.
    pub elapsed: Duration,
}

/// Accumulates a [`RunReport`] while the loop runs.
#[derive(Debug)]
pub(crate) struct RunTally {
    pub ticks: u64,
    pub stages_created: u64,
    pub first_step: Option<StepId>,
    pub last_step: Option<StepId>,
    pub plugin_us: u64,
}

impl RunTally {
    pub fn new() -> Self {
        Self {
            ticks: 0,
            stages_created: 0,
            first_step: None,
            last_step: None,
            plugin_us: 0,
        }
    }

    pub fn record_step(&mut self, step: StepId, metrics: &TickMetrics) {
        self.ticks += 1;
        self.first_step.get_or_insert(step);
        self.last_step = Some(step);
        self.plugin_us += metrics.plugin_us;
    }

    pub fn finish(self, world: WorldId, exit: RunExit, elapsed: Duration) -> RunReport {
        RunReport {
            world,
            ticks: self.ticks,
            stages_created: self.stages_created,
            first_step: self.first_step,
            last_step: self.last_step,
            plugin_us: self.plugin_us,
            exit,
            elapsed,
        }
    }
}
