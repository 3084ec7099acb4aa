//! Arcade Loop - fixed-timestep simulation core for single-screen arcade games
//!
//! Core modules:
//! - `sim`: Deterministic simulation (scheduler, entities, collisions, lifecycle)
//! - `games`: Rule sets built on the shared loop (Asteroids, Breakout, ...)
//! - `tuning`: Data-driven difficulty curves
//! - `platform`: Input adapter (raw keys to commands)
//! - `persistence`: High score sinks
//! - `settings`: Loop configuration

pub mod error;
pub mod games;
pub mod highscores;
pub mod persistence;
pub mod platform;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use error::{PersistError, SettingsError};
pub use highscores::HighScores;
pub use settings::Settings;

/// Loop configuration constants
pub mod consts {
    /// Fixed simulation rate (120 Hz for smooth physics)
    pub const TICK_HZ: f64 = 120.0;
    /// Fixed simulation timestep in milliseconds
    pub const STEP_MS: f64 = 1000.0 / TICK_HZ;
    /// Largest real-time delta accepted per frame callback.
    ///
    /// Anything longer (backgrounded tab, debugger pause) is clamped, which
    /// bounds a single callback to `MAX_FRAME_DELTA_MS / STEP_MS` = 30 ticks.
    pub const MAX_FRAME_DELTA_MS: f64 = 250.0;
    /// Slack when comparing accumulated time against the step
    pub const TIME_EPSILON_MS: f64 = 1e-6;

    /// Round defaults
    pub const STARTING_LIVES: u8 = 3;
    pub const RESPAWN_INVULN_MS: f64 = 1200.0;
}

/// Wrap a coordinate into `[0, max)`
#[inline]
pub fn wrap(value: f32, max: f32) -> f32 {
    if max <= 0.0 {
        return 0.0;
    }
    let wrapped = value.rem_euclid(max);
    // rem_euclid can round up to exactly `max` for tiny negative inputs
    if wrapped >= max { 0.0 } else { wrapped }
}

/// Convert a tick duration in milliseconds to seconds for motion integration
#[inline]
pub fn ms_to_secs(ms: f64) -> f32 {
    (ms / 1000.0) as f32
}

/// Whole number of ticks covering `ms` at the given step (rounded up)
#[inline]
pub fn ticks_for(ms: f64, step_ms: f64) -> u64 {
    if ms <= 0.0 || step_ms <= 0.0 {
        return 0;
    }
    (ms / step_ms - consts::TIME_EPSILON_MS).ceil().max(0.0) as u64
}
