//! World service: the operations a request surface calls.
//!
//! [`WorldService`] owns the plugin registry, the history store, the
//! run registry and the notification bus. `start_world` claims the world
//! synchronously and runs its loop on a named background thread; every
//! persisted step publishes a [`StatusEvent`] on the world's status topic.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use orrery_bus::{BusError, Connection, NotificationBus, ObserverExit, PublishOutcome};
use orrery_core::{
    Plugin, StageId, StateDescription, StepId, WorldAction, WorldActionDef, WorldId, WorldRecord,
};
use orrery_history::{HistoryStore, WorldCatalog};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{ConfigError, EngineConfig};
use crate::controller::{RunController, StartOutcome};
use crate::error::ControlError;
use crate::metrics::RunReport;
use crate::plugins::PluginRegistry;
use crate::run::RunRegistry;

/// Topic on which a world's status changes are published.
pub fn status_topic(world: WorldId) -> String {
    format!("world/{world}/status-watch")
}

/// The "re-fetch status" signal pushed to status watchers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Always `"OK"`.
    pub status: String,
}

impl StatusEvent {
    /// The only event the engine publishes.
    pub fn ok() -> Self {
        Self {
            status: "OK".into(),
        }
    }
}

/// One row of [`WorldStatus::steps`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSummary {
    /// The step.
    pub id: StepId,
    /// Its owning stage.
    pub stage_id: StageId,
}

/// What a status watcher re-fetches after a [`StatusEvent`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldStatus {
    /// Whether the world has a live run.
    pub is_running: bool,
    /// The world's steps in ascending id order.
    pub steps: Vec<StepSummary>,
}

/// Handle to a world's background run thread.
#[derive(Debug)]
pub struct RunHandle {
    world: WorldId,
    thread: JoinHandle<Result<RunReport, ControlError>>,
}

impl RunHandle {
    /// The world being run.
    pub fn world(&self) -> WorldId {
        self.world
    }

    /// Whether the run thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the run loop to exit and return its outcome.
    pub fn join(self) -> Result<RunReport, ControlError> {
        let world = self.world;
        self.thread
            .join()
            .map_err(|_| ControlError::RunPanicked { world })?
    }
}

/// Entry point for everything outside the engine.
pub struct WorldService {
    config: EngineConfig,
    plugins: Arc<PluginRegistry>,
    history: Arc<dyn HistoryStore>,
    worlds: Arc<dyn WorldCatalog>,
    bus: Arc<NotificationBus>,
    controller: RunController,
}

impl WorldService {
    /// Build a service over one store that is both history and catalog.
    pub fn new<S>(
        config: EngineConfig,
        plugins: PluginRegistry,
        store: Arc<S>,
        bus: Arc<NotificationBus>,
    ) -> Result<Self, ConfigError>
    where
        S: HistoryStore + WorldCatalog + 'static,
    {
        config.validate()?;
        let plugins = Arc::new(plugins);
        let controller = RunController::new(
            Arc::clone(&plugins),
            Arc::clone(&store),
            Arc::new(RunRegistry::new()),
        );
        Ok(Self {
            config,
            plugins,
            history: store.clone(),
            worlds: store,
            bus,
            controller,
        })
    }

    /// The validated configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The registered plugins.
    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// The live-run registry.
    pub fn runs(&self) -> &Arc<RunRegistry> {
        self.controller.runs()
    }

    /// The notification bus status events go to.
    pub fn bus(&self) -> &Arc<NotificationBus> {
        &self.bus
    }

    /// A controller sharing this service's registries, for callers that
    /// want to drive a run on their own thread.
    pub fn controller(&self) -> &RunController {
        &self.controller
    }

    // ── Run control ─────────────────────────────────────────────

    /// Start `world` from its newest step (or from scratch).
    ///
    /// `max_steps` falls back to [`EngineConfig::default_max_steps`].
    /// Unknown worlds and plugins fail here, before any thread exists.
    pub fn start_world(
        &self,
        world: WorldId,
        max_steps: Option<u64>,
    ) -> Result<StartOutcome<RunHandle>, ControlError> {
        self.launch(world, None, max_steps)
    }

    /// Start `world` from the given step instead of its newest one.
    pub fn resume_world(
        &self,
        world: WorldId,
        from: StepId,
        max_steps: Option<u64>,
    ) -> Result<StartOutcome<RunHandle>, ControlError> {
        self.launch(world, Some(from), max_steps)
    }

    fn launch(
        &self,
        world: WorldId,
        resume_from: Option<StepId>,
        max_steps: Option<u64>,
    ) -> Result<StartOutcome<RunHandle>, ControlError> {
        let record = self.worlds.world(world)?;
        if !self.plugins.contains(&record.plugin) {
            return Err(ControlError::UnknownPlugin {
                plugin: record.plugin,
            });
        }
        let Some(claim) = self.runs().claim(world) else {
            log::warn!("world {world} is already running; start ignored");
            return Ok(StartOutcome::AlreadyRunning);
        };

        let max_steps = max_steps.or(self.config.default_max_steps);
        let controller = self.controller.clone();
        let bus = Arc::clone(&self.bus);
        let thread = thread::Builder::new()
            .name(self.config.thread_name(world))
            .spawn(move || {
                let on_step_changed = |_: StepId| publish_status(&bus, world);
                controller.run(claim, &on_step_changed, resume_from, max_steps)
            })
            .map_err(|e| ControlError::ThreadSpawnFailed {
                reason: e.to_string(),
            })?;
        Ok(StartOutcome::Started(RunHandle { world, thread }))
    }

    /// Ask `world` to stop after its in-flight tick. Returns whether it
    /// was running.
    pub fn stop_world(&self, world: WorldId) -> bool {
        let was_running = self.runs().stop(world);
        if was_running {
            log::info!("world {world} stop requested");
        }
        was_running
    }

    /// Whether `world` has a live run that has not been asked to stop.
    pub fn is_running(&self, world: WorldId) -> bool {
        self.runs().is_running(world)
    }

    /// Whether `world` has a live engine holding a state.
    pub fn is_initialized(&self, world: WorldId) -> bool {
        self.runs().is_initialized(world)
    }

    /// Queue `action` for the next tick of `world`.
    pub fn submit_action(&self, world: WorldId, action: WorldAction) -> Result<(), ControlError> {
        self.worlds.world(world)?;
        self.runs().submit(world, action)
    }

    /// Stop every world and every status topic.
    pub fn shutdown(&self) {
        let stopped = self.runs().stop_all();
        self.bus.shutdown();
        log::info!("world service shut down ({stopped} run(s) stopped)");
    }

    // ── Plugin queries ──────────────────────────────────────────

    /// Actions understood by the world's plugin.
    pub fn defined_actions(&self, world: WorldId) -> Result<Vec<WorldActionDef>, ControlError> {
        let record = self.worlds.world(world)?;
        Ok(self.configured_plugin(&record)?.define_actions())
    }

    /// Render the state persisted in `step`.
    pub fn render_step(&self, step: StepId) -> Result<Vec<u8>, ControlError> {
        let (plugin, state) = self.plugin_for_step(step)?;
        Ok(plugin.render_state(&state)?)
    }

    /// Describe the state persisted in `step`.
    pub fn describe_step(&self, step: StepId) -> Result<StateDescription, ControlError> {
        let (plugin, state) = self.plugin_for_step(step)?;
        Ok(plugin.describe_state(&state)?)
    }

    fn configured_plugin(&self, record: &WorldRecord) -> Result<Box<dyn Plugin>, ControlError> {
        let mut plugin = self.plugins.create(&record.plugin)?;
        if let Some(config) = &record.config {
            plugin.configure(config)?;
        }
        Ok(plugin)
    }

    fn plugin_for_step(&self, step: StepId) -> Result<(Box<dyn Plugin>, Value), ControlError> {
        let loaded = self.history.load_step(step)?;
        let record = self.worlds.world(loaded.world_id())?;
        let plugin = self.configured_plugin(&record)?;
        let state = plugin.parse_state(&loaded.step.state)?;
        Ok((plugin, state))
    }

    // ── Status ──────────────────────────────────────────────────

    /// Running flag and step list of `world`, oldest step first.
    pub fn world_status(&self, world: WorldId) -> Result<WorldStatus, ControlError> {
        let steps = self
            .history
            .steps_for_world(world)?
            .into_iter()
            .rev()
            .map(|s| StepSummary {
                id: s.id,
                stage_id: s.stage_id,
            })
            .collect();
        Ok(WorldStatus {
            is_running: self.is_running(world),
            steps,
        })
    }

    /// Serve `conn` as a status watcher of `world` until it disconnects
    /// or the service shuts down.
    pub fn watch_status(
        &self,
        world: WorldId,
        conn: &mut dyn Connection,
    ) -> Result<ObserverExit, ControlError> {
        self.worlds.world(world)?;
        log::debug!("status watcher attached to world {world}");
        Ok(self.bus.subscribe(&status_topic(world), conn)?)
    }

    /// Publish a [`StatusEvent`] for `world`, e.g. after an edit made
    /// outside the run loop.
    pub fn notify_status_changed(&self, world: WorldId) -> Result<PublishOutcome, ControlError> {
        Ok(self.bus.publish(&status_topic(world), &StatusEvent::ok())?)
    }
}

fn publish_status(bus: &NotificationBus, world: WorldId) {
    match bus.publish(&status_topic(world), &StatusEvent::ok()) {
        Ok(_) => {}
        Err(BusError::Overrun { pending, .. }) => {
            log::warn!("world {world}: status watchers behind by {pending} event(s)");
        }
        Err(e) => log::warn!("world {world}: status notification dropped: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_bus::BusConfig;
    use orrery_history::MemoryHistory;
    use orrery_test_utils::CounterSim;

    fn service() -> (WorldService, Arc<MemoryHistory>) {
        let mut plugins = PluginRegistry::new();
        plugins.register_default::<CounterSim>("COUNTER");
        let store = Arc::new(MemoryHistory::new());
        let bus = Arc::new(NotificationBus::new(BusConfig::default()));
        let svc = WorldService::new(EngineConfig::default(), plugins, Arc::clone(&store), bus)
            .unwrap();
        (svc, store)
    }

    #[test]
    fn topic_name_format() {
        assert_eq!(status_topic(WorldId(12)), "world/12/status-watch");
        assert_eq!(
            serde_json::to_string(&StatusEvent::ok()).unwrap(),
            r#"{"status":"OK"}"#
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        let store = Arc::new(MemoryHistory::new());
        let bus = Arc::new(NotificationBus::default());
        let config = EngineConfig {
            thread_name_prefix: String::new(),
            ..EngineConfig::default()
        };
        assert!(matches!(
            WorldService::new(config, PluginRegistry::new(), store, bus),
            Err(ConfigError::EmptyThreadPrefix)
        ));
    }

    #[test]
    fn start_checks_world_and_plugin_before_spawning() {
        let (svc, store) = service();
        assert!(svc.start_world(WorldId(99), None).unwrap_err().is_not_found());
        let w = store.create_world("w", "MISSING", None);
        assert!(matches!(
            svc.start_world(w.id, None),
            Err(ControlError::UnknownPlugin { .. })
        ));
        assert!(!svc.is_running(w.id));
    }

    #[test]
    fn default_step_cap_applies() {
        let mut plugins = PluginRegistry::new();
        plugins.register_default::<CounterSim>("COUNTER");
        let store = Arc::new(MemoryHistory::new());
        let config = EngineConfig {
            default_max_steps: Some(2),
            ..EngineConfig::default()
        };
        let svc = WorldService::new(
            config,
            plugins,
            Arc::clone(&store),
            Arc::new(NotificationBus::default()),
        )
        .unwrap();
        let w = store.create_world("w", "COUNTER", None);
        let report = svc
            .start_world(w.id, None)
            .unwrap()
            .started()
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(report.ticks, 2);
    }

    #[test]
    fn world_status_lists_steps_oldest_first() {
        let (svc, store) = service();
        let w = store.create_world("w", "COUNTER", None);
        svc.start_world(w.id, Some(3))
            .unwrap()
            .started()
            .unwrap()
            .join()
            .unwrap();
        let status = svc.world_status(w.id).unwrap();
        assert!(!status.is_running);
        let ids: Vec<_> = status.steps.iter().map(|s| s.id).collect();
        let mut ascending = ids.clone();
        ascending.sort();
        assert_eq!(ids.len(), 3);
        assert_eq!(ids, ascending);
        assert_eq!(
            status.steps.last().map(|s| s.id),
            store.find_highest_step_id(w.id).unwrap()
        );
        assert!(svc.world_status(WorldId(77)).unwrap_err().is_not_found());
    }

    #[test]
    fn describe_and_render_read_history() {
        let (svc, store) = service();
        let w = store.create_world("w", "COUNTER", None);
        let last = svc
            .start_world(w.id, Some(4))
            .unwrap()
            .started()
            .unwrap()
            .join()
            .unwrap()
            .last_step
            .unwrap();
        let description = svc.describe_step(last).unwrap();
        assert_eq!(description.get("n").map(String::as_str), Some("3"));
        assert_eq!(svc.render_step(last).unwrap(), 3u64.to_le_bytes().to_vec());
        assert!(svc.describe_step(StepId(9999)).unwrap_err().is_not_found());
    }

    #[test]
    fn defined_actions_come_from_the_plugin() {
        let (svc, store) = service();
        let w = store.create_world("w", "COUNTER", None);
        let names: Vec<_> = svc
            .defined_actions(w.id)
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["PING", "PONG"]);
    }

    #[test]
    fn notify_without_watchers_is_a_noop() {
        let (svc, store) = service();
        let w = store.create_world("w", "COUNTER", None);
        assert_eq!(
            svc.notify_status_changed(w.id).unwrap(),
            PublishOutcome::NoObservers
        );
    }
}
