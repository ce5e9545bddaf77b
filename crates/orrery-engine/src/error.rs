//! Error type for run control and the world service.

use std::error::Error;
use std::fmt;

use orrery_bus::BusError;
use orrery_core::{PluginError, StepId, WorldId};
use orrery_history::HistoryError;

/// Errors returned by [`RunController`](crate::RunController),
/// [`RunRegistry`](crate::RunRegistry) and
/// [`WorldService`](crate::WorldService).
///
/// A duplicate start is not an error; see
/// [`StartOutcome::AlreadyRunning`](crate::StartOutcome::AlreadyRunning).
#[derive(Debug)]
pub enum ControlError {
    /// The history store failed, including unknown world/stage/step ids.
    History(HistoryError),
    /// The world references a plugin identifier nobody registered.
    UnknownPlugin {
        /// The unregistered identifier.
        plugin: String,
    },
    /// The world has no live run to accept actions.
    NotRunning {
        /// The world addressed.
        world: WorldId,
    },
    /// A plugin call failed. Aborts the run it happened in.
    Plugin(PluginError),
    /// A tick result could not be serialized for persistence.
    Encode {
        /// Serializer message.
        detail: String,
    },
    /// The run thread could not be spawned.
    ThreadSpawnFailed {
        /// OS error text.
        reason: String,
    },
    /// A run thread panicked.
    RunPanicked {
        /// The world whose run panicked.
        world: WorldId,
    },
    /// The requested resume step belongs to a different world.
    ForeignStep {
        /// The requested step.
        step: StepId,
        /// The world being started.
        world: WorldId,
    },
    /// The notification bus refused a subscription.
    Bus(BusError),
}

impl ControlError {
    /// Whether this error reports a missing world, stage or step.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::History(e) if e.is_not_found())
    }
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::History(e) => write!(f, "history: {e}"),
            Self::UnknownPlugin { plugin } => write!(f, "unknown plugin {plugin:?}"),
            Self::NotRunning { world } => write!(f, "world {world} is not running"),
            Self::Plugin(e) => write!(f, "plugin: {e}"),
            Self::Encode { detail } => write!(f, "tick encode failed: {detail}"),
            Self::ThreadSpawnFailed { reason } => write!(f, "thread spawn failed: {reason}"),
            Self::RunPanicked { world } => write!(f, "run thread of world {world} panicked"),
            Self::ForeignStep { step, world } => {
                write!(f, "step {step} does not belong to world {world}")
            }
            Self::Bus(e) => write!(f, "bus: {e}"),
        }
    }
}

impl Error for ControlError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::History(e) => Some(e),
            Self::Plugin(e) => Some(e),
            Self::Bus(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HistoryError> for ControlError {
    fn from(e: HistoryError) -> Self {
        Self::History(e)
    }
}

impl From<PluginError> for ControlError {
    fn from(e: PluginError) -> Self {
        Self::Plugin(e)
    }
}

impl From<BusError> for ControlError {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

impl From<serde_json::Error> for ControlError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encode {
            detail: e.to_string(),
        }
    }
}
