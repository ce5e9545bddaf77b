//! Live-status notification bus for Orrery worlds.
//!
//! Observers subscribe to a named topic over some [`Connection`] and
//! block there for the connection's lifetime; publishers push a small
//! JSON event that tells every observer "this changed, re-fetch". The
//! bus keeps only the latest event per topic, never a backlog.
//!
//! Topic names are opaque to the bus. The engine uses
//! `world/{id}/status-watch`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod bus;
pub mod config;
pub mod connection;
pub mod error;

pub use bus::{NotificationBus, ObserverExit, PublishOutcome};
pub use config::{BusConfig, ConfigError, OverrunPolicy};
pub use connection::{Connection, Probe};
pub use error::BusError;
