//! The demo game driven through the real run controller.

use std::sync::Arc;

use orrery_core::{StepId, WorldAction};
use orrery_engine::{PluginRegistry, RunController, RunRegistry};
use orrery_history::{HistoryStore, MemoryHistory};
use orrery_plugins::{DemoGameState, DEMO_GAME};

fn controller() -> (RunController, Arc<MemoryHistory>, Arc<RunRegistry>) {
    let mut plugins = PluginRegistry::new();
    orrery_plugins::register(&mut plugins);
    let store = Arc::new(MemoryHistory::new());
    let runs = Arc::new(RunRegistry::new());
    let controller = RunController::new(Arc::new(plugins), Arc::clone(&store), Arc::clone(&runs));
    (controller, store, runs)
}

fn state(store: &MemoryHistory, step: StepId) -> DemoGameState {
    serde_json::from_str(&store.load_step(step).unwrap().step.state).unwrap()
}

#[test]
fn seven_ticks_cross_two_stage_boundaries() {
    let (controller, store, _runs) = controller();
    let w = store.create_world("demo", DEMO_GAME, Some(r#"{"tick_delay_ms": 0}"#.into()));

    let report = controller
        .start(w.id, &|_| {}, None, Some(7))
        .unwrap()
        .started()
        .unwrap();
    assert_eq!(report.ticks, 7);

    // initialize keeps the initial label; scores 1-4 are stage_0, 5-6 stage_1.
    let mut stages = store.stages_for_world(w.id).unwrap();
    stages.reverse();
    let codes: Vec<_> = stages.iter().map(|s| s.code.as_str()).collect();
    assert_eq!(codes, vec!["initial", "stage_0", "stage_1"]);
    assert_eq!(stages[2].title, "Stage 1");

    let last = state(&store, report.last_step.unwrap());
    assert_eq!(last.score, 6);
    assert_eq!(last.pos, [6, 6]);
}

#[test]
fn turn_action_steers_the_next_tick() {
    let (controller, store, runs) = controller();
    let w = store.create_world(
        "demo",
        DEMO_GAME,
        Some(r#"{"tick_delay_ms": 0, "field_size": [5, 5]}"#.into()),
    );
    let id = w.id;
    let submitted = std::cell::Cell::new(false);
    controller
        .start(
            w.id,
            &|_| {
                if !submitted.replace(true) {
                    runs.submit(id, WorldAction::new("TURN_LEFT")).unwrap();
                }
            },
            None,
            Some(3),
        )
        .unwrap();

    let steps = store.steps_for_world(w.id).unwrap();
    let second = state(&store, steps[1].id);
    let third = state(&store, steps[0].id);
    assert_eq!(second.velocity, [-1, 0]);
    assert_eq!(second.pos, [4, 0]);
    assert_eq!(third.pos, [3, 0]);
}
