//! Reference simulation plugins for the Orrery world engine.
//!
//! - [`DemoGame`]: a point steered around a wrapping grid, registered as
//!   [`DEMO_GAME`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod demo_game;

pub use demo_game::{DemoGame, DemoGameConfig, DemoGameState, Turn, DEMO_GAME};

use orrery_engine::PluginRegistry;

/// Register every plugin in this crate under its identifier.
pub fn register(plugins: &mut PluginRegistry) -> &mut PluginRegistry {
    plugins.register_default::<DemoGame>(DEMO_GAME)
}
