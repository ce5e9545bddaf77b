//! World stepping engine for Orrery.
//!
//! Drives pluggable simulations one tick at a time, persists every tick
//! as stage/step history, and publishes a status event per step.
//!
//! # Architecture
//!
//! - [`TickEngine`] wraps one plugin instance and its per-tick buffers
//! - [`RunRegistry`] guarantees at most one live run per world
//! - [`RunController`] runs the tick loop for a claimed world
//! - [`WorldService`] is the entry point for request handlers: it spawns
//!   run threads and wires step notifications to the
//!   [`NotificationBus`](orrery_bus::NotificationBus)

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod controller;
pub mod error;
pub mod metrics;
pub mod plugins;
pub mod run;
pub mod service;
pub mod tick;

pub use config::{ConfigError, EngineConfig};
pub use controller::{RunController, StartOutcome};
pub use error::ControlError;
pub use metrics::{RunExit, RunReport, TickMetrics};
pub use plugins::PluginRegistry;
pub use run::{RunClaim, RunRegistry};
pub use service::{status_topic, RunHandle, StatusEvent, StepSummary, WorldService, WorldStatus};
pub use tick::{TickEngine, TickResult};
