//! Plugin identifier → factory table.

use indexmap::IndexMap;
use orrery_core::{Plugin, Simulation, SimulationPlugin};

use crate::error::ControlError;

type PluginFactory = Box<dyn Fn() -> Box<dyn Plugin> + Send + Sync>;

/// Maps the plugin identifier stored on a world record to a factory
/// producing fresh plugin instances.
///
/// Every run, and every describe/render request, gets its own instance.
///
/// # Examples
///
/// ```
/// use orrery_core::{ExternalInput, PluginError, Simulation, StateDescription, TickContext};
/// use orrery_engine::PluginRegistry;
///
/// #[derive(Default)]
/// struct Idle;
/// impl Simulation for Idle {
///     type State = ();
///     fn initialize(&mut self, _: &mut TickContext<'_>) -> Result<(), PluginError> { Ok(()) }
///     fn step(&mut self, _: &mut TickContext<'_>, _: &(), _: &ExternalInput)
///         -> Result<(), PluginError> { Ok(()) }
///     fn describe_state(&self, _: &()) -> StateDescription { StateDescription::new() }
/// }
///
/// let mut plugins = PluginRegistry::new();
/// plugins.register_default::<Idle>("IDLE");
/// assert!(plugins.contains("IDLE"));
/// assert!(plugins.create("IDLE").is_ok());
/// assert!(plugins.create("MISSING").is_err());
/// ```
#[derive(Default)]
pub struct PluginRegistry {
    factories: IndexMap<String, PluginFactory>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `id`, replacing any previous one.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        self.factories.insert(id.into(), Box::new(factory));
        self
    }

    /// Register a [`Simulation`] built with `Default::default()`.
    pub fn register_default<S: Simulation + Default>(&mut self, id: impl Into<String>) -> &mut Self {
        self.register(id, || SimulationPlugin::boxed(S::default()))
    }

    /// Register a [`Simulation`] that is cloned for every instance.
    pub fn register_cloned<S: Simulation + Clone + Sync>(
        &mut self,
        id: impl Into<String>,
        prototype: S,
    ) -> &mut Self {
        self.register(id, move || SimulationPlugin::boxed(prototype.clone()))
    }

    /// Build a fresh plugin instance.
    pub fn create(&self, id: &str) -> Result<Box<dyn Plugin>, ControlError> {
        match self.factories.get(id) {
            Some(factory) => Ok(factory()),
            None => Err(ControlError::UnknownPlugin {
                plugin: id.to_string(),
            }),
        }
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Registered identifiers, in registration order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}
