//! The [`Simulation`] and [`Plugin`] capability traits.
//!
//! Plugin authors implement [`Simulation`], which is typed over its own
//! state. The engine only ever sees [`Plugin`], an object-safe view where
//! state travels as a `serde_json::Value`. [`SimulationPlugin`] bridges the
//! two, so adding a new kind of world means writing a `Simulation` and
//! registering a factory for it; the engine never changes.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::{ExternalInput, WorldActionDef};
use crate::context::TickContext;
use crate::error::PluginError;

/// Human-readable key/value summary of a state, in plugin-defined order.
pub type StateDescription = IndexMap<String, String>;

/// A pluggable step simulation, typed over its state.
///
/// # Contract
///
/// - `initialize` produces the first state of a world with no history.
/// - `step` produces the next state from the previous one and the
///   actions consumed this tick. It takes `prev` by reference: a failed
///   step leaves the engine on the old state.
/// - `step`/`initialize` may block (e.g. to pace the tick rate); they run
///   on the world's own run thread.
/// - Logs, interactions and stage changes go through the [`TickContext`].
///
/// # Examples
///
/// ```
/// use orrery_core::{ExternalInput, PluginError, Simulation, StateDescription, TickContext};
///
/// struct Counter;
///
/// impl Simulation for Counter {
///     type State = u64;
///
///     fn initialize(&mut self, _ctx: &mut TickContext<'_>) -> Result<u64, PluginError> {
///         Ok(0)
///     }
///
///     fn step(
///         &mut self,
///         ctx: &mut TickContext<'_>,
///         prev: &u64,
///         input: &ExternalInput,
///     ) -> Result<u64, PluginError> {
///         ctx.debug(format!("{} actions", input.actions.len()));
///         Ok(prev + 1)
///     }
///
///     fn describe_state(&self, state: &u64) -> StateDescription {
///         [("count".to_string(), state.to_string())].into_iter().collect()
///     }
/// }
/// ```
pub trait Simulation: Send + 'static {
    /// The plugin's state. Persisted as JSON after every tick.
    type State: Serialize + DeserializeOwned + Send;

    /// Apply the world's opaque configuration blob.
    ///
    /// Called once per run, before the first tick, when the world has a
    /// configuration. Default: ignore it.
    fn configure(&mut self, config: &str) -> Result<(), PluginError> {
        let _ = config;
        Ok(())
    }

    /// Actions this plugin understands. Default: none.
    fn define_actions(&self) -> Vec<WorldActionDef> {
        Vec::new()
    }

    /// Create the initial state.
    fn initialize(&mut self, ctx: &mut TickContext<'_>) -> Result<Self::State, PluginError>;

    /// Create the next state from the previous one.
    fn step(
        &mut self,
        ctx: &mut TickContext<'_>,
        prev: &Self::State,
        input: &ExternalInput,
    ) -> Result<Self::State, PluginError>;

    /// Summarize a state for display.
    fn describe_state(&self, state: &Self::State) -> StateDescription;

    /// Render a state as an image. Default: rendering is not supported.
    fn render_state(&self, state: &Self::State) -> Result<Vec<u8>, PluginError> {
        let _ = state;
        Err(PluginError::Render {
            reason: "plugin does not render states".into(),
        })
    }
}

/// Object-safe plugin interface used by the tick engine and world service.
///
/// State is erased to `serde_json::Value`. Implemented for every
/// [`Simulation`] through [`SimulationPlugin`]; implement it directly only
/// when a plugin genuinely works on untyped JSON.
pub trait Plugin: Send + 'static {
    /// See [`Simulation::configure`].
    fn configure(&mut self, config: &str) -> Result<(), PluginError>;

    /// See [`Simulation::define_actions`].
    fn define_actions(&self) -> Vec<WorldActionDef>;

    /// Decode a persisted state dump, validating it against the plugin's
    /// state type.
    fn parse_state(&self, dump: &str) -> Result<Value, PluginError>;

    /// See [`Simulation::initialize`].
    fn initialize(&mut self, ctx: &mut TickContext<'_>) -> Result<Value, PluginError>;

    /// See [`Simulation::step`].
    fn step(
        &mut self,
        ctx: &mut TickContext<'_>,
        prev: &Value,
        input: &ExternalInput,
    ) -> Result<Value, PluginError>;

    /// See [`Simulation::describe_state`].
    fn describe_state(&self, state: &Value) -> Result<StateDescription, PluginError>;

    /// See [`Simulation::render_state`].
    fn render_state(&self, state: &Value) -> Result<Vec<u8>, PluginError>;
}

/// Adapter exposing a typed [`Simulation`] as an erased [`Plugin`].
pub struct SimulationPlugin<S> {
    inner: S,
}

impl<S: Simulation> SimulationPlugin<S> {
    /// Wrap a simulation.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Wrap a simulation and box it for the plugin registry.
    pub fn boxed(inner: S) -> Box<dyn Plugin> {
        Box::new(Self::new(inner))
    }

    /// Borrow the wrapped simulation.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn decode(state: &Value) -> Result<S::State, PluginError> {
        S::State::deserialize(state).map_err(PluginError::from)
    }

    fn encode(state: &S::State) -> Result<Value, PluginError> {
        serde_json::to_value(state).map_err(PluginError::from)
    }
}

impl<S: Simulation> Plugin for SimulationPlugin<S> {
    fn configure(&mut self, config: &str) -> Result<(), PluginError> {
        self.inner.configure(config)
    }

    fn define_actions(&self) -> Vec<WorldActionDef> {
        self.inner.define_actions()
    }

    fn parse_state(&self, dump: &str) -> Result<Value, PluginError> {
        let typed: S::State = serde_json::from_str(dump)?;
        Self::encode(&typed)
    }

    fn initialize(&mut self, ctx: &mut TickContext<'_>) -> Result<Value, PluginError> {
        let state = self.inner.initialize(ctx)?;
        Self::encode(&state)
    }

    fn step(
        &mut self,
        ctx: &mut TickContext<'_>,
        prev: &Value,
        input: &ExternalInput,
    ) -> Result<Value, PluginError> {
        let prev = Self::decode(prev)?;
        let next = self.inner.step(ctx, &prev, input)?;
        Self::encode(&next)
    }

    fn describe_state(&self, state: &Value) -> Result<StateDescription, PluginError> {
        let state = Self::decode(state)?;
        Ok(self.inner.describe_state(&state))
    }

    fn render_state(&self, state: &Value) -> Result<Vec<u8>, PluginError> {
        let state = Self::decode(state)?;
        self.inner.render_state(&state)
    }
}
