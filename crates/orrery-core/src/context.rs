//! Capability handle passed to plugins during a tick.
//!
//! [`TickContext`] borrows the tick engine's per-tick buffers for the
//! duration of one `initialize`/`step` call. Everything a plugin records
//! through it is visible immediately: a log appended mid-step and a stage
//! relabelled mid-step both show up in the tick result that `advance()`
//! returns once the call completes.

use serde_json::Value;

use crate::action::{ClientInteraction, LogLevel, WorldLogEntry, WorldStage};

/// Narrow view of the tick engine handed to plugin code.
///
/// Plugins cannot reach the engine's state, pending actions, or history
/// through this handle; they can only append logs and interactions and
/// relabel the current stage.
///
/// # Examples
///
/// ```
/// use orrery_core::{LogLevel, TickContext, WorldStage};
///
/// let mut stage = WorldStage::initial();
/// let mut logs = Vec::new();
/// let mut interactions = Vec::new();
/// {
///     let mut ctx = TickContext::new(&mut stage, &mut logs, &mut interactions);
///     ctx.info("warming up");
///     ctx.set_stage("warmup", "Warm-up");
///     assert_eq!(ctx.stage().code, "warmup");
/// }
/// assert_eq!(logs.len(), 1);
/// assert_eq!(logs[0].level, LogLevel::Info);
/// assert_eq!(stage.code, "warmup");
/// ```
pub struct TickContext<'a> {
    stage: &'a mut WorldStage,
    logs: &'a mut Vec<WorldLogEntry>,
    interactions: &'a mut Vec<ClientInteraction>,
}

impl<'a> TickContext<'a> {
    /// Construct a context over the given buffers.
    ///
    /// Typically called by the tick engine, not by plugins directly.
    pub fn new(
        stage: &'a mut WorldStage,
        logs: &'a mut Vec<WorldLogEntry>,
        interactions: &'a mut Vec<ClientInteraction>,
    ) -> Self {
        Self {
            stage,
            logs,
            interactions,
        }
    }

    /// Append a log line to this tick's log buffer.
    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.logs.push(WorldLogEntry {
            level,
            message: message.into(),
        });
    }

    /// Shorthand for [`log`](Self::log) at [`LogLevel::Debug`].
    pub fn debug(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    /// Shorthand for [`log`](Self::log) at [`LogLevel::Info`].
    pub fn info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    /// Shorthand for [`log`](Self::log) at [`LogLevel::Warning`].
    pub fn warn(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    /// Shorthand for [`log`](Self::log) at [`LogLevel::Error`].
    pub fn error(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// Record a request/response exchange made during this tick.
    pub fn interact(&mut self, request: Value, response: Value) {
        self.interactions
            .push(ClientInteraction { request, response });
    }

    /// Relabel the engine's current stage.
    ///
    /// The run controller persists a new stage row when the code differs
    /// from the previously persisted one.
    pub fn set_stage(&mut self, code: impl Into<String>, title: impl Into<String>) {
        *self.stage = WorldStage::new(code, title);
    }

    /// The engine's current stage, including relabels made this tick.
    pub fn stage(&self) -> &WorldStage {
        self.stage
    }

    /// Number of log lines recorded so far this tick.
    pub fn log_count(&self) -> usize {
        self.logs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn interactions_append_in_order() {
        let mut stage = WorldStage::initial();
        let mut logs = Vec::new();
        let mut interactions = Vec::new();
        let mut ctx = TickContext::new(&mut stage, &mut logs, &mut interactions);
        ctx.interact(json!({"q": 1}), json!({"a": 2}));
        ctx.interact(json!("ping"), json!("pong"));
        drop(ctx);
        assert_eq!(interactions.len(), 2);
        assert_eq!(interactions[1].request, json!("ping"));
    }

    #[test]
    fn level_helpers_tag_entries() {
        let mut stage = WorldStage::initial();
        let mut logs = Vec::new();
        let mut interactions = Vec::new();
        let mut ctx = TickContext::new(&mut stage, &mut logs, &mut interactions);
        ctx.debug("d");
        ctx.warn("w");
        ctx.error("e");
        assert_eq!(ctx.log_count(), 3);
        drop(ctx);
        let levels: Vec<_> = logs.iter().map(|l| l.level).collect();
        assert_eq!(levels, vec![LogLevel::Debug, LogLevel::Warning, LogLevel::Error]);
    }

    proptest! {
        // Stage relabels overwrite; logs accumulate in call order.
        #[test]
        fn last_relabel_wins_and_logs_keep_order(
            ops in proptest::collection::vec((any::<bool>(), 0u8..10), 0..40),
        ) {
            let mut stage = WorldStage::initial();
            let mut logs = Vec::new();
            let mut interactions = Vec::new();
            let mut ctx = TickContext::new(&mut stage, &mut logs, &mut interactions);
            let mut expected_stage = WorldStage::initial();
            let mut expected_logs = Vec::new();
            for (relabel, n) in &ops {
                if *relabel {
                    ctx.set_stage(format!("s{n}"), format!("S{n}"));
                    expected_stage = WorldStage::new(format!("s{n}"), format!("S{n}"));
                } else {
                    ctx.info(format!("m{n}"));
                    expected_logs.push(format!("m{n}"));
                }
                prop_assert_eq!(ctx.stage(), &expected_stage);
            }
            drop(ctx);
            prop_assert_eq!(stage, expected_stage);
            let messages: Vec<_> = logs.into_iter().map(|l| l.message).collect();
            prop_assert_eq!(messages, expected_logs);
        }
    }
}
