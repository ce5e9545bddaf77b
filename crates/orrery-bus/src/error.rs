//! Error type for bus operations.

use std::fmt;

/// Errors returned by [`NotificationBus`](crate::NotificationBus).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BusError {
    /// An event was published while the previous one had not been
    /// delivered to any observer. The new event was still stored and
    /// observers were woken; only the older one was lost.
    Overrun {
        /// The topic published to.
        topic: String,
        /// Number of published events no observer had picked up yet,
        /// not counting the one just published.
        pending: u64,
    },
    /// The event could not be serialized.
    Encode {
        /// Serializer message.
        detail: String,
    },
    /// The bus has been shut down and accepts no new observers.
    ShutDown,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overrun { topic, pending } => {
                write!(f, "topic {topic:?} overrun: {pending} event(s) not yet delivered")
            }
            Self::Encode { detail } => write!(f, "event encode failed: {detail}"),
            Self::ShutDown => write!(f, "notification bus is shut down"),
        }
    }
}

impl std::error::Error for BusError {}
