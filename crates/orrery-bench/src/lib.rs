//! Benchmark profiles for the Orrery world engine.
//!
//! - [`instant_demo_game`]: the demo game with its per-step pause removed
//! - [`bench_registry`]: a plugin registry holding that game
//! - [`seeded_history`]: a store with one world and `steps` persisted ticks

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use orrery_core::WorldId;
use orrery_engine::{PluginRegistry, RunController, RunRegistry};
use orrery_history::MemoryHistory;
use orrery_plugins::{DemoGame, DemoGameConfig};

/// Plugin identifier of [`instant_demo_game`] in [`bench_registry`].
pub const BENCH_GAME: &str = "BENCH_GAME";

/// Demo game on a `cols` × `rows` grid without the tick delay.
pub fn instant_demo_game(cols: u32, rows: u32) -> DemoGame {
    let config = DemoGameConfig {
        tick_delay_ms: 0,
        field_size: [cols, rows],
    };
    match DemoGame::new(config) {
        Ok(game) => game,
        Err(e) => panic!("bench profile rejected: {e}"),
    }
}

/// Registry with [`instant_demo_game`] (64 × 64) under [`BENCH_GAME`].
pub fn bench_registry() -> PluginRegistry {
    let mut plugins = PluginRegistry::new();
    plugins.register_cloned(BENCH_GAME, instant_demo_game(64, 64));
    plugins
}

/// A store holding one [`BENCH_GAME`] world that has run `steps` ticks.
pub fn seeded_history(steps: u64) -> (Arc<MemoryHistory>, WorldId) {
    let store = Arc::new(MemoryHistory::new());
    let world = store.create_world("bench", BENCH_GAME, None).id;
    let controller = RunController::new(
        Arc::new(bench_registry()),
        Arc::clone(&store),
        Arc::new(RunRegistry::new()),
    );
    if let Err(e) = controller.start(world, &|_| {}, None, Some(steps)) {
        panic!("seeding failed: {e}");
    }
    (store, world)
}
