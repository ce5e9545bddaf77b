//! Orrery: a pluggable world stepping engine.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Orrery sub-crates. For most users, adding `orrery` as a single dependency
//! is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use orrery::prelude::*;
//!
//! // A simulation that counts the actions it has seen.
//! struct Tally;
//! impl Simulation for Tally {
//!     type State = usize;
//!     fn initialize(&mut self, ctx: &mut TickContext<'_>) -> Result<usize, PluginError> {
//!         ctx.set_stage("counting", "Counting");
//!         Ok(0)
//!     }
//!     fn step(&mut self, _: &mut TickContext<'_>, prev: &usize, input: &ExternalInput)
//!         -> Result<usize, PluginError> {
//!         Ok(prev + input.actions.len())
//!     }
//!     fn describe_state(&self, state: &usize) -> StateDescription {
//!         [("seen".to_string(), state.to_string())].into_iter().collect()
//!     }
//! }
//!
//! let mut plugins = PluginRegistry::new();
//! plugins.register("TALLY", || SimulationPlugin::boxed(Tally));
//!
//! let store = Arc::new(MemoryHistory::new());
//! let bus = Arc::new(NotificationBus::new(BusConfig::default()));
//! let service = WorldService::new(EngineConfig::default(), plugins, Arc::clone(&store), bus)
//!     .unwrap();
//!
//! let world = store.create_world("demo", "TALLY", None);
//! let run = service.start_world(world.id, Some(3)).unwrap().started().unwrap();
//! let report = run.join().unwrap();
//! assert_eq!(report.ticks, 3);
//!
//! let last = report.last_step.unwrap();
//! assert_eq!(service.describe_step(last).unwrap()["seen"], "0");
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `orrery-core` | IDs, records, tick vocabulary, plugin traits |
//! | [`history`] | `orrery-history` | History store traits, in-memory store, journal |
//! | [`bus`] | `orrery-bus` | Topic-based latest-event notification bus |
//! | [`engine`] | `orrery-engine` | Tick engine, run control, world service |
//! | [`plugins`] | `orrery-plugins` | Reference plugins (demo game) |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`orrery-core`).
///
/// Contains the record shapes, the per-tick action/log/interaction types,
/// and the plugin contract ([`types::Simulation`], [`types::Plugin`]).
pub use orrery_core as types;

/// Stage/step history storage (`orrery-history`).
///
/// [`history::MemoryHistory`] for in-process tables,
/// [`history::JournaledHistory`] to persist them as a JSON-lines journal.
pub use orrery_history as history;

/// Live-status notification bus (`orrery-bus`).
pub use orrery_bus as bus;

/// Tick engine, run control and world service (`orrery-engine`).
///
/// Most applications only need [`engine::WorldService`].
pub use orrery_engine as engine;

/// Reference plugins (`orrery-plugins`).
pub use orrery_plugins as plugins;

/// Common imports for typical Orrery usage.
///
/// ```rust
/// use orrery::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use orrery_core::{
        ExternalInput, Plugin, Simulation, SimulationPlugin, StateDescription, TickContext,
        WorldAction, WorldActionDef, WorldId, WorldStage,
    };

    // Errors
    pub use orrery_bus::BusError;
    pub use orrery_core::PluginError;
    pub use orrery_engine::ControlError;
    pub use orrery_history::HistoryError;

    // History
    pub use orrery_history::{HistoryStore, MemoryHistory, WorldCatalog};

    // Bus
    pub use orrery_bus::{BusConfig, Connection, NotificationBus};

    // Engine
    pub use orrery_engine::{
        EngineConfig, PluginRegistry, RunHandle, RunReport, StartOutcome, WorldService,
    };
}
