//! Per-tick vocabulary: actions in, logs and interactions out.
//!
//! Every type here is persisted as part of a step row, so all of them
//! derive `Serialize`/`Deserialize` and their JSON shape is part of the
//! history format.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An external action submitted to a running world.
///
/// Actions accumulate between ticks and are consumed, in submission
/// order, by the next tick.
///
/// # Examples
///
/// ```
/// use orrery_core::WorldAction;
///
/// let action = WorldAction::new("TURN_UP");
/// assert_eq!(action.name, "TURN_UP");
/// assert_eq!(serde_json::to_string(&action).unwrap(), r#"{"name":"TURN_UP"}"#);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldAction {
    /// Plugin-defined action name.
    pub name: String,
}

impl WorldAction {
    /// Build an action from its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Declaration of an action a plugin understands.
///
/// Returned by [`Plugin::define_actions`](crate::Plugin::define_actions)
/// so a client can render controls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldActionDef {
    /// Action name, matched against [`WorldAction::name`].
    pub name: String,
    /// Human-readable label.
    pub title: String,
    /// Optional keyboard shortcut hint (e.g. `"ArrowUp"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<String>,
}

impl WorldActionDef {
    /// Declare an action without a shortcut.
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            shortcut: None,
        }
    }

    /// Attach a keyboard shortcut hint.
    pub fn with_shortcut(mut self, shortcut: impl Into<String>) -> Self {
        self.shortcut = Some(shortcut.into());
        self
    }
}

/// The actions consumed by one tick, in submission order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalInput {
    /// Actions submitted since the previous tick started.
    pub actions: Vec<WorldAction>,
}

impl ExternalInput {
    /// Wrap a drained action batch.
    pub fn new(actions: Vec<WorldAction>) -> Self {
        Self { actions }
    }

    /// Whether this tick received no input.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Severity of a plugin-produced log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Verbose diagnostics.
    Debug,
    /// Normal progress messages.
    Info,
    /// Something unexpected that the plugin recovered from.
    Warning,
    /// A failure the plugin reports but does not abort on.
    Error,
    /// A failure that leaves the world in a questionable state.
    Critical,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// One log line captured during a tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldLogEntry {
    /// Severity.
    pub level: LogLevel,
    /// Message text.
    pub message: String,
}

/// A request/response pair the plugin exchanged with an outside party
/// (for example a model endpoint) during a tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientInteraction {
    /// What was sent.
    pub request: Value,
    /// What came back.
    pub response: Value,
}

/// Code and title of a stage, as reported by the plugin.
///
/// A fresh engine starts in the [`initial`](WorldStage::initial) stage
/// until the plugin relabels it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldStage {
    /// Short machine key. Stage changes are detected on this field only.
    pub code: String,
    /// Human-readable label.
    pub title: String,
}

impl WorldStage {
    /// Code of the stage a never-relabelled engine reports.
    pub const INITIAL_CODE: &'static str = "initial";

    /// Build a stage label.
    pub fn new(code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
        }
    }

    /// The sentinel stage of an engine whose plugin never called
    /// `set_stage`.
    pub fn initial() -> Self {
        Self::new(Self::INITIAL_CODE, "Initial")
    }
}

impl Default for WorldStage {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_uses_uppercase_names() {
        let entry = WorldLogEntry {
            level: LogLevel::Warning,
            message: "low fuel".into(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"level":"WARNING","message":"low fuel"}"#);
        assert_eq!(LogLevel::Critical.to_string(), "CRITICAL");
    }

    #[test]
    fn action_def_omits_missing_shortcut() {
        let def = WorldActionDef::new("JUMP", "Jump");
        assert_eq!(
            serde_json::to_string(&def).unwrap(),
            r#"{"name":"JUMP","title":"Jump"}"#
        );
        let with = def.with_shortcut("Space");
        assert_eq!(with.shortcut.as_deref(), Some("Space"));
    }

    #[test]
    fn default_stage_is_initial() {
        let stage = WorldStage::default();
        assert_eq!(stage.code, "initial");
        assert_eq!(stage.title, "Initial");
    }

    #[test]
    fn external_input_reports_emptiness() {
        assert!(ExternalInput::default().is_empty());
        assert!(!ExternalInput::new(vec![WorldAction::new("A")]).is_empty());
    }
}
