//! Demo game: a point moving across a wrapping grid.
//!
//! Each step the point moves by its velocity and the score goes up by
//! one. `TURN_*` actions replace the velocity component they name; with
//! no turn action the previous velocity is kept. The stage advances
//! every five points (`stage_{score / 5}`).

use std::thread;
use std::time::Duration;

use orrery_core::{
    ExternalInput, PluginError, Simulation, StateDescription, TickContext, WorldActionDef,
};
use serde::{Deserialize, Serialize};

/// Plugin identifier the demo game registers under.
pub const DEMO_GAME: &str = "DEMO_GAME";

/// Width of rendered images, in pixels.
pub const RENDER_WIDTH: usize = 640;
/// Height of rendered images, in pixels.
pub const RENDER_HEIGHT: usize = 480;

const POINTS_PER_STAGE: u64 = 5;

const EMPTY_CELL: [u8; 3] = [64, 0, 64];
const CURRENT_CELL: [u8; 3] = [255, 255, 0];
const CELL_OUTLINE: [u8; 3] = [255, 0, 0];

// ── Actions ─────────────────────────────────────────────────────

/// A turn command understood by [`DemoGame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Turn {
    /// Move towards row 0.
    Up,
    /// Move towards the last row.
    Down,
    /// Move towards column 0.
    Left,
    /// Move towards the last column.
    Right,
}

impl Turn {
    const ALL: [Turn; 4] = [Turn::Up, Turn::Down, Turn::Left, Turn::Right];

    /// Action name as submitted by clients.
    pub fn name(self) -> &'static str {
        match self {
            Turn::Up => "TURN_UP",
            Turn::Down => "TURN_DOWN",
            Turn::Left => "TURN_LEFT",
            Turn::Right => "TURN_RIGHT",
        }
    }

    /// Parse an action name; unknown names are ignored by the game.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    fn def(self) -> WorldActionDef {
        let (title, shortcut) = match self {
            Turn::Up => ("Turn Up", "ArrowUp"),
            Turn::Down => ("Turn Down", "ArrowDown"),
            Turn::Left => ("Turn Left", "ArrowLeft"),
            Turn::Right => ("Turn Right", "ArrowRight"),
        };
        WorldActionDef::new(self.name(), title).with_shortcut(shortcut)
    }
}

// ── Config and state ────────────────────────────────────────────

/// World configuration for [`DemoGame`], parsed from the world's config
/// blob. Missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoGameConfig {
    /// Pause inside every step, in milliseconds. Default: 200.
    pub tick_delay_ms: u64,
    /// Grid size as `[columns, rows]`. Default: `[24, 16]`.
    pub field_size: [u32; 2],
}

impl Default for DemoGameConfig {
    fn default() -> Self {
        Self {
            tick_delay_ms: 200,
            field_size: [24, 16],
        }
    }
}

impl DemoGameConfig {
    /// Reject grids with a zero dimension.
    pub fn validate(&self) -> Result<(), PluginError> {
        if self.field_size.contains(&0) {
            return Err(PluginError::InvalidConfig {
                reason: format!("field_size {:?} has a zero dimension", self.field_size),
            });
        }
        Ok(())
    }
}

/// Persisted state of [`DemoGame`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoGameState {
    /// Grid size as `[columns, rows]`.
    pub field_size: [u32; 2],
    /// Current cell as `[column, row]`.
    pub pos: [u32; 2],
    /// Movement per step as `[dx, dy]`.
    pub velocity: [i32; 2],
    /// Steps taken since initialization.
    pub score: u64,
}

// ── DemoGame ────────────────────────────────────────────────────

/// The demo game simulation.
#[derive(Clone, Debug, Default)]
pub struct DemoGame {
    config: DemoGameConfig,
}

impl DemoGame {
    /// A game with the given configuration.
    pub fn new(config: DemoGameConfig) -> Result<Self, PluginError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active configuration.
    pub fn config(&self) -> &DemoGameConfig {
        &self.config
    }
}

fn wrap(pos: u32, delta: i32, size: u32) -> u32 {
    (i64::from(pos) + i64::from(delta)).rem_euclid(i64::from(size)) as u32
}

impl Simulation for DemoGame {
    type State = DemoGameState;

    fn configure(&mut self, config: &str) -> Result<(), PluginError> {
        let config: DemoGameConfig =
            serde_json::from_str(config).map_err(|e| PluginError::InvalidConfig {
                reason: e.to_string(),
            })?;
        *self = Self::new(config)?;
        Ok(())
    }

    fn define_actions(&self) -> Vec<WorldActionDef> {
        Turn::ALL.into_iter().map(Turn::def).collect()
    }

    fn initialize(&mut self, _ctx: &mut TickContext<'_>) -> Result<DemoGameState, PluginError> {
        Ok(DemoGameState {
            field_size: self.config.field_size,
            pos: [0, 0],
            velocity: [1, 1],
            score: 0,
        })
    }

    fn step(
        &mut self,
        ctx: &mut TickContext<'_>,
        prev: &DemoGameState,
        input: &ExternalInput,
    ) -> Result<DemoGameState, PluginError> {
        let [cols, rows] = prev.field_size;
        if cols == 0 || rows == 0 {
            return Err(PluginError::InvalidState {
                reason: format!("field_size {:?} has a zero dimension", prev.field_size),
            });
        }

        let score = prev.score + 1;
        let stage = score / POINTS_PER_STAGE;
        ctx.set_stage(format!("stage_{stage}"), format!("Stage {stage}"));

        let mut velocity = [0, 0];
        for turn in input.actions.iter().filter_map(|a| Turn::from_name(&a.name)) {
            match turn {
                Turn::Up => velocity[1] = -1,
                Turn::Down => velocity[1] = 1,
                Turn::Left => velocity[0] = -1,
                Turn::Right => velocity[0] = 1,
            }
        }
        if velocity == [0, 0] {
            velocity = prev.velocity;
        }
        ctx.debug(format!("vel_x={} vel_y={}", velocity[0], velocity[1]));

        let pos = [
            wrap(prev.pos[0], velocity[0], cols),
            wrap(prev.pos[1], velocity[1], rows),
        ];

        if self.config.tick_delay_ms > 0 {
            thread::sleep(Duration::from_millis(self.config.tick_delay_ms));
        }

        Ok(DemoGameState {
            field_size: prev.field_size,
            pos,
            velocity,
            score,
        })
    }

    fn describe_state(&self, state: &DemoGameState) -> StateDescription {
        let mut d = StateDescription::new();
        d.insert("score".into(), state.score.to_string());
        d.insert("s_score".into(), state.score.saturating_mul(state.score).to_string());
        d.insert("chances".into(), (state.score % 61 + 7).to_string());
        d
    }

    /// Binary PPM (`P6`) of the grid with the current cell highlighted.
    fn render_state(&self, state: &DemoGameState) -> Result<Vec<u8>, PluginError> {
        let [cols, rows] = state.field_size;
        if cols == 0 || rows == 0 {
            return Err(PluginError::Render {
                reason: "empty field".into(),
            });
        }
        let (cols, rows) = (cols as usize, rows as usize);
        let header = format!("P6\n{RENDER_WIDTH} {RENDER_HEIGHT}\n255\n");
        let mut out = Vec::with_capacity(header.len() + RENDER_WIDTH * RENDER_HEIGHT * 3);
        out.extend_from_slice(header.as_bytes());

        let current = (state.pos[0] as usize, state.pos[1] as usize);
        for y in 0..RENDER_HEIGHT {
            let row = y * rows / RENDER_HEIGHT;
            let row_edge = y == row * RENDER_HEIGHT / rows;
            for x in 0..RENDER_WIDTH {
                let col = x * cols / RENDER_WIDTH;
                let col_edge = x == col * RENDER_WIDTH / cols;
                let pixel = if row_edge || col_edge {
                    CELL_OUTLINE
                } else if (col, row) == current {
                    CURRENT_CELL
                } else {
                    EMPTY_CELL
                };
                out.extend_from_slice(&pixel);
            }
        }
        Ok(out)
    }
}
