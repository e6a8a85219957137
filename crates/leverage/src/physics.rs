//! Spring-mass-damper animation of the shock under load.
//!
//! The shock is modelled as a unit mass on the coil spring, loaded by the
//! rider's rear-wheel weight multiplied by the leverage at the current
//! stroke position. Each tick integrates one explicit Euler step:
//!
//! ```text
//! k     = spring rate (N/mm)
//! F     = rider load · L(pos) (N)
//! c     = 2·√(k·F)·dt, divided by 3 while compressing
//! acc   = (simulating ? F : 0) − k·pos − c·vel
//! vel  += acc·dt
//! pos  += vel·dt, held inside [0, stroke]
//! ```
//!
//! Compression is damped at a third of the rebound rate, the usual
//! asymmetry of a coil shock's damper.
//!
//! [`tick_physics`] is the pure step. [`PhysicsIntegrator`] wraps it with
//! the frame clock, the idle detector and the Idle/Running mode a host
//! animation loop needs.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use leverage::{CurveConfig, PhysicsIntegrator};
//!
//! let config = CurveConfig::default();
//! let mut shock = PhysicsIntegrator::new();
//! shock.set_simulating(true);
//!
//! let frame = Duration::from_micros(16_667);
//! let mut now = Duration::ZERO;
//! while let Some(out) = shock.tick(now, &config) {
//!     assert!(out.pos >= 0.0 && out.pos <= config.stroke);
//!     now += frame;
//!     if now > Duration::from_secs(30) {
//!         break;
//!     }
//! }
//! ```

use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::config::CurveConfig;
use crate::transform::{Segment, evaluate_transform, leverage_at_stroke};
use crate::units::{lbf_to_newtons, mm_to_inches, spring_rate_n_per_mm};

/// Number of recent speeds the idle detector keeps.
pub const IDLE_BUFFER_LEN: usize = 25;

/// The loop idles once the buffered speeds sum below this (mm/s).
pub const IDLE_THRESHOLD: f64 = 0.5;

/// Longest frame gap integrated; longer gaps restart the clock.
pub const MAX_TICK: Duration = Duration::from_millis(100);

/// Compression damping is this many times weaker than rebound damping.
const COMPRESSION_DAMPING_DIVISOR: f64 = 3.0;

/// Shock position and motion.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimulationState {
    /// Stroke position in mm, `0 <= pos <= stroke`.
    pub pos: f64,
    /// Velocity in mm/s, positive while compressing.
    pub vel: f64,
    /// Acceleration from the last tick, mm/s².
    pub acc: f64,
    /// Whether the rider's load is applied.
    pub simulating: bool,
}

impl SimulationState {
    /// Creates a state at rest at full extension.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shock to full extension at rest, keeping the load flag.
    pub fn reset(&mut self) {
        self.pos = 0.0;
        self.vel = 0.0;
        self.acc = 0.0;
    }
}

/// Advances the simulation by `dt` seconds.
///
/// `segments` should come from a fresh [`evaluate_transform`] of `config`;
/// positions outside every segment use the config's base leverage.
pub fn tick_physics(
    state: SimulationState,
    config: &CurveConfig,
    segments: &[Segment],
    dt: f64,
) -> SimulationState {
    let stroke = config.stroke.max(0.0);
    let spring_constant = spring_rate_n_per_mm(config.spring_weight);
    let leverage = leverage_at_stroke(segments, mm_to_inches(state.pos), config.base_leverage());
    let load_force = lbf_to_newtons(config.norm_weight() * leverage);

    let mut damping = 2.0 * (spring_constant * load_force).max(0.0).sqrt() * dt;
    if state.vel > 0.0 {
        damping /= COMPRESSION_DAMPING_DIVISOR;
    }

    let applied = if state.simulating { load_force } else { 0.0 };
    let acc = applied - spring_constant * state.pos - state.vel * damping;

    let mut vel = state.vel + acc * dt;
    let mut pos = state.pos;
    if vel > 0.0 && pos >= stroke {
        vel = 0.0;
        pos = stroke;
    } else if vel < 0.0 && pos <= 0.0 {
        vel = 0.0;
        pos = 0.0;
    } else {
        pos += vel * dt;
    }

    SimulationState {
        pos: pos.clamp(0.0, stroke),
        vel,
        acc,
        simulating: state.simulating,
    }
}

/// Ring buffer of recent absolute velocities.
///
/// Slots that have never been written count as 1, so a freshly reset buffer
/// cannot report idle until it has been filled with real samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdleVelocityBuffer {
    samples: [Option<f64>; IDLE_BUFFER_LEN],
    next: usize,
}

impl Default for IdleVelocityBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl IdleVelocityBuffer {
    /// Creates an empty buffer.
    pub const fn new() -> Self {
        Self {
            samples: [None; IDLE_BUFFER_LEN],
            next: 0,
        }
    }

    /// Records a velocity sample, overwriting the oldest one.
    pub fn push(&mut self, vel: f64) {
        self.samples[self.next] = Some(vel.abs());
        self.next = (self.next + 1) % IDLE_BUFFER_LEN;
    }

    /// Sum of the buffered speeds, with unset slots counted as 1.
    pub fn sum(&self) -> f64 {
        self.samples.iter().map(|s| s.unwrap_or(1.0)).sum()
    }

    /// Returns true when the shock has essentially stopped moving.
    pub fn is_idle(&self) -> bool {
        self.sum() < IDLE_THRESHOLD
    }

    /// Forgets every sample.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Whether the animation loop is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// No tick scheduled.
    #[default]
    Idle,
    /// Ticking every frame.
    Running,
}

/// What the renderer needs after each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutput {
    /// Stroke position in mm.
    pub pos: f64,
    /// Whether the rider's load is applied.
    pub simulating: bool,
}

/// Frame-driven shock simulation.
///
/// Owns the [`SimulationState`], the idle detector and the frame clock. The
/// host calls [`tick`](Self::tick) once per display refresh while
/// [`is_running`](Self::is_running) and calls [`resume`](Self::resume)
/// (directly or through the input helpers) when something may have set the
/// shock moving again.
#[derive(Debug, Clone)]
pub struct PhysicsIntegrator {
    state: SimulationState,
    buffer: IdleVelocityBuffer,
    mode: Mode,
    visible: bool,
    last: Option<Duration>,
}

impl Default for PhysicsIntegrator {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsIntegrator {
    /// Creates an idle integrator at rest, unloaded and visible.
    pub fn new() -> Self {
        Self::with_state(SimulationState::default())
    }

    /// Creates an idle integrator starting from `state`.
    pub fn with_state(state: SimulationState) -> Self {
        Self {
            state,
            buffer: IdleVelocityBuffer::new(),
            mode: Mode::Idle,
            visible: true,
            last: None,
        }
    }

    /// Current simulation state.
    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// Mutable access to the simulation state.
    pub fn state_mut(&mut self) -> &mut SimulationState {
        &mut self.state
    }

    /// Current loop mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns true while ticks should be scheduled.
    pub fn is_running(&self) -> bool {
        self.mode == Mode::Running
    }

    /// Starts the loop if it is idle and the view is visible.
    ///
    /// Starting clears the frame clock and the idle detector, so the first
    /// tick only records its timestamp and the loop runs for at least
    /// [`IDLE_BUFFER_LEN`] physics ticks.
    pub fn resume(&mut self) {
        if !self.visible || self.mode == Mode::Running {
            return;
        }
        self.mode = Mode::Running;
        self.last = None;
        self.buffer.reset();
        debug!(pos = self.state.pos, "shock simulation resumed");
    }

    /// Records a visibility change; hiding stops the loop immediately.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if visible {
            self.resume();
        } else if self.mode == Mode::Running {
            self.mode = Mode::Idle;
            debug!("shock simulation hidden");
        }
    }

    /// Applies or removes the rider's load and resumes the loop.
    pub fn set_simulating(&mut self, simulating: bool) {
        self.state.simulating = simulating;
        self.resume();
    }

    /// The user is holding the shock: the load comes off.
    pub fn press(&mut self) {
        self.set_simulating(false);
    }

    /// The user let go: the load goes back on.
    pub fn release(&mut self) {
        self.set_simulating(true);
    }

    /// The curve or rider numbers changed; the shock may need to move.
    pub fn config_changed(&mut self) {
        self.resume();
    }

    /// Advances the simulation to `timestamp` (any monotonic clock).
    ///
    /// Returns `None` while idle. The first tick after a resume, and any tick
    /// more than [`MAX_TICK`] after the previous one, only record the
    /// timestamp. The leverage transform is evaluated fresh from `config` on
    /// every physics tick.
    pub fn tick(&mut self, timestamp: Duration, config: &CurveConfig) -> Option<TickOutput> {
        if self.mode == Mode::Idle {
            return None;
        }

        let previous = self.last.replace(timestamp);
        let Some(previous) = previous else {
            return Some(self.output());
        };
        let elapsed = timestamp.saturating_sub(previous);
        if elapsed > MAX_TICK {
            debug!(elapsed_ms = elapsed.as_millis(), "frame gap too long, restarting clock");
            return Some(self.output());
        }

        let segments = evaluate_transform(config).unwrap_or_else(|err| {
            warn!(%err, "leverage transform failed, using base leverage");
            Vec::new()
        });

        self.state = tick_physics(self.state, config, &segments, elapsed.as_secs_f64());
        self.buffer.push(self.state.vel);
        trace!(pos = self.state.pos, vel = self.state.vel, "physics tick");

        if self.buffer.is_idle() {
            self.mode = Mode::Idle;
            debug!(pos = self.state.pos, "shock at rest, simulation idle");
        }

        Some(self.output())
    }

    fn output(&self) -> TickOutput {
        TickOutput {
            pos: self.state.pos,
            simulating: self.state.simulating,
        }
    }
}
