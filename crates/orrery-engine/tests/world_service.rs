//! World service integration tests: background runs, action submission
//! and status watchers over mock connections.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use orrery_bus::{BusConfig, NotificationBus, ObserverExit};
use orrery_core::{
    ExternalInput, PluginError, Simulation, SimulationPlugin, StateDescription, TickContext,
    WorldAction, WorldId,
};
use orrery_engine::{
    status_topic, ControlError, EngineConfig, PluginRegistry, RunExit, WorldService,
};
use orrery_history::{HistoryStore, MemoryHistory};
use orrery_test_utils::{channel_connection, wait_until, CounterSim, Gate};

// ── Helpers ─────────────────────────────────────────────────────

const WAIT: Duration = Duration::from_secs(5);

struct PanicSim;

impl Simulation for PanicSim {
    type State = u8;

    fn initialize(&mut self, _ctx: &mut TickContext<'_>) -> Result<u8, PluginError> {
        Ok(0)
    }

    fn step(
        &mut self,
        _ctx: &mut TickContext<'_>,
        _prev: &u8,
        _input: &ExternalInput,
    ) -> Result<u8, PluginError> {
        panic!("simulation bug");
    }

    fn describe_state(&self, _state: &u8) -> StateDescription {
        StateDescription::new()
    }
}

fn service(register: impl FnOnce(&mut PluginRegistry)) -> (Arc<WorldService>, Arc<MemoryHistory>) {
    let mut plugins = PluginRegistry::new();
    plugins.register_default::<CounterSim>("COUNTER");
    plugins.register("PANIC", || SimulationPlugin::boxed(PanicSim));
    register(&mut plugins);
    let store = Arc::new(MemoryHistory::new());
    let bus = Arc::new(NotificationBus::new(BusConfig {
        wake_interval: Duration::from_millis(20),
        ..BusConfig::default()
    }));
    let svc = WorldService::new(EngineConfig::default(), plugins, Arc::clone(&store), bus).unwrap();
    (Arc::new(svc), store)
}

// ── Run control ─────────────────────────────────────────────────

#[test]
fn background_run_reports_and_releases() {
    let (svc, store) = service(|_| {});
    let w = store.create_world("w", "COUNTER", None);
    let handle = svc.start_world(w.id, Some(5)).unwrap().started().unwrap();
    assert_eq!(handle.world(), w.id);
    let report = handle.join().unwrap();
    assert_eq!(report.ticks, 5);
    assert_eq!(report.exit, RunExit::StepCap);
    assert!(!svc.is_running(w.id));
    assert_eq!(store.steps_for_world(w.id).unwrap().len(), 5);
}

#[test]
fn stop_world_lets_the_tick_finish() {
    let (gate, sim) = Gate::pair();
    let (svc, store) = service(|p| {
        p.register_cloned("GATED", sim);
    });
    let w = store.create_world("w", "GATED", None);
    let handle = svc.start_world(w.id, None).unwrap().started().unwrap();

    assert_eq!(gate.wait_entered(WAIT), Some(u64::MAX));
    assert!(svc.is_running(w.id));
    assert!(!svc.is_initialized(w.id));
    gate.release();

    assert_eq!(gate.wait_entered(WAIT), Some(0));
    assert!(svc.is_initialized(w.id));
    assert!(svc.stop_world(w.id));
    assert!(!svc.is_running(w.id));
    // The old loop still holds the world until it exits.
    assert!(svc.start_world(w.id, None).unwrap().is_already_running());
    gate.release();

    let report = handle.join().unwrap();
    assert_eq!(report.exit, RunExit::Stopped);
    assert_eq!(report.ticks, 2);
    assert!(!svc.is_initialized(w.id));
    assert!(!svc.stop_world(w.id));
}

#[test]
fn action_submitted_mid_tick_lands_in_the_next_step() {
    let (gate, sim) = Gate::pair();
    let (svc, store) = service(|p| {
        p.register_cloned("GATED", sim);
    });
    let w = store.create_world("w", "GATED", None);

    assert!(matches!(
        svc.submit_action(w.id, WorldAction::new("EARLY")),
        Err(ControlError::NotRunning { .. })
    ));
    assert!(svc
        .submit_action(WorldId(404), WorldAction::new("X"))
        .unwrap_err()
        .is_not_found());

    let handle = svc.start_world(w.id, Some(2)).unwrap().started().unwrap();
    assert_eq!(gate.wait_entered(WAIT), Some(u64::MAX));
    svc.submit_action(w.id, WorldAction::new("GO")).unwrap();
    gate.release();
    assert_eq!(gate.wait_entered(WAIT), Some(0));
    gate.release();
    handle.join().unwrap();

    let steps = store.steps_for_world(w.id).unwrap();
    assert_eq!(steps[1].actions, "[]");
    assert_eq!(steps[0].actions, r#"[{"name":"GO"}]"#);
}

#[test]
fn resume_world_from_an_older_step() {
    let (svc, store) = service(|_| {});
    let w = store.create_world("w", "COUNTER", None);
    let first = svc
        .start_world(w.id, Some(3))
        .unwrap()
        .started()
        .unwrap()
        .join()
        .unwrap()
        .first_step
        .unwrap();

    let report = svc
        .resume_world(w.id, first, Some(1))
        .unwrap()
        .started()
        .unwrap()
        .join()
        .unwrap();
    let described = svc.describe_step(report.last_step.unwrap()).unwrap();
    assert_eq!(described["n"], "1");
}

#[test]
fn panicking_plugin_surfaces_on_join_and_releases_the_world() {
    let (svc, store) = service(|_| {});
    let w = store.create_world("w", "PANIC", None);
    let handle = svc.start_world(w.id, None).unwrap().started().unwrap();
    assert!(matches!(
        handle.join(),
        Err(ControlError::RunPanicked { world }) if world == w.id
    ));
    assert!(!svc.is_running(w.id));
    assert_eq!(store.steps_for_world(w.id).unwrap().len(), 1);
    assert!(svc.start_world(w.id, Some(1)).unwrap().started().is_some());
}

// ── Status watching ─────────────────────────────────────────────

#[test]
fn watchers_hear_each_persisted_step() {
    let (gate, sim) = Gate::pair();
    let (svc, store) = service(|p| {
        p.register_cloned("GATED", sim);
    });
    let w = store.create_world("w", "GATED", None);
    let topic = status_topic(w.id);

    let (mut conn, client) = channel_connection();
    let watcher = {
        let svc = Arc::clone(&svc);
        thread::spawn(move || svc.watch_status(w.id, &mut conn))
    };
    wait_until(WAIT, || svc.bus().observer_count(&topic) == 1);

    let handle = svc.start_world(w.id, Some(2)).unwrap().started().unwrap();
    assert_eq!(gate.wait_entered(WAIT), Some(u64::MAX));
    gate.release();
    assert_eq!(client.recv_timeout(WAIT).as_deref(), Some(r#"{"status":"OK"}"#));

    assert_eq!(gate.wait_entered(WAIT), Some(0));
    gate.release();
    assert_eq!(client.recv_timeout(WAIT).as_deref(), Some(r#"{"status":"OK"}"#));
    handle.join().unwrap();

    let status = svc.world_status(w.id).unwrap();
    assert!(!status.is_running);
    assert_eq!(status.steps.len(), 2);

    svc.shutdown();
    assert_eq!(watcher.join().unwrap().unwrap(), ObserverExit::TopicStopped);
    assert!(client.is_closed());
}

#[test]
fn manual_notification_and_disconnect() {
    let (svc, store) = service(|_| {});
    let w = store.create_world("w", "COUNTER", None);
    let topic = status_topic(w.id);

    let (mut conn, mut client) = channel_connection();
    let watcher = {
        let svc = Arc::clone(&svc);
        thread::spawn(move || svc.watch_status(w.id, &mut conn))
    };
    wait_until(WAIT, || svc.bus().observer_count(&topic) == 1);

    svc.notify_status_changed(w.id).unwrap();
    assert_eq!(client.recv_timeout(WAIT).as_deref(), Some(r#"{"status":"OK"}"#));

    client.disconnect();
    assert_eq!(watcher.join().unwrap().unwrap(), ObserverExit::Disconnected);
    wait_until(WAIT, || svc.bus().observer_count(&topic) == 0);
}

#[test]
fn watching_an_unknown_world_fails_before_subscribing() {
    let (svc, _store) = service(|_| {});
    let (mut conn, _client) = channel_connection();
    assert!(svc
        .watch_status(WorldId(5), &mut conn)
        .unwrap_err()
        .is_not_found());
    assert!(svc.bus().topics().is_empty());
}
