//! Core types and traits for the Orrery world stepping engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by every other Orrery crate: typed record ids,
//! the persisted record shapes, the per-tick action/log/interaction
//! types, and the [`Simulation`] / [`Plugin`] capability traits that
//! pluggable worlds implement.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod action;
pub mod context;
pub mod error;
pub mod id;
pub mod plugin;
pub mod record;

pub use action::{
    ClientInteraction, ExternalInput, LogLevel, WorldAction, WorldActionDef, WorldLogEntry,
    WorldStage,
};
pub use context::TickContext;
pub use error::PluginError;
pub use id::{StageId, StepId, WorldId};
pub use plugin::{Plugin, Simulation, SimulationPlugin, StateDescription};
pub use record::{LoadedStep, StageRecord, StepRecord, WorldRecord};
