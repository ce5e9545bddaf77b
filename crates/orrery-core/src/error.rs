//! Error type for plugin calls.
//!
//! Subsystem errors (history, run control, notification) live in their
//! own crates; this one covers failures raised by plugin code or by the
//! erased state conversion around it.

use std::error::Error;
use std::fmt;

/// Errors returned by [`Plugin`](crate::Plugin) and
/// [`Simulation`](crate::Simulation) methods.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PluginError {
    /// `initialize` or `step` failed. Aborts the current run.
    Failed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// A serialized or erased state could not be decoded into the
    /// plugin's state type, or encoded back out of it.
    InvalidState {
        /// Description of the decoding problem.
        reason: String,
    },
    /// The world's configuration blob was rejected by `configure`.
    InvalidConfig {
        /// Description of the rejected setting.
        reason: String,
    },
    /// `render_state` could not produce an image.
    Render {
        /// Description of the rendering problem.
        reason: String,
    },
}

impl PluginError {
    /// Shorthand for [`PluginError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "plugin failed: {reason}"),
            Self::InvalidState { reason } => write!(f, "invalid plugin state: {reason}"),
            Self::InvalidConfig { reason } => write!(f, "invalid world config: {reason}"),
            Self::Render { reason } => write!(f, "render failed: {reason}"),
        }
    }
}

impl Error for PluginError {}

impl From<serde_json::Error> for PluginError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidState {
            reason: e.to_string(),
        }
    }
}
