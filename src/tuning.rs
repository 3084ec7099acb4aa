//! Difficulty curves
//!
//! A curve is a pure function from level index to [`LevelParams`]. Games read
//! the parameters when a level is seeded, so a curve can be swapped without
//! touching game rules.

use serde::{Deserialize, Serialize};

/// Tunable values for one level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelParams {
    /// 1-based level index
    pub level: u32,
    /// Multiplier on hostile speeds (>= 1.0)
    pub speed_scale: f32,
    /// Obstacles seeded at level start (rocks, brick rows, invader rows)
    pub population: u32,
    /// Interval between timed spawns or steps (ms)
    pub spawn_interval_ms: f64,
    /// Simultaneous hostile projectiles allowed
    pub hostile_cap: u32,
    /// Multiplier on the actor's size (<= 1.0; paddles shrink)
    pub size_scale: f32,
}

/// Level index to parameters
pub trait Difficulty {
    fn params(&self, level: u32) -> LevelParams;
}

impl<F> Difficulty for F
where
    F: Fn(u32) -> LevelParams,
{
    fn params(&self, level: u32) -> LevelParams {
        self(level)
    }
}

/// Piecewise-linear curve with caps on every axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearCurve {
    pub speed_per_level: f32,
    pub speed_max: f32,
    pub population_base: u32,
    pub population_per_level: u32,
    pub population_max: u32,
    pub interval_base_ms: f64,
    /// Interval multiplier per level (< 1.0 speeds things up)
    pub interval_factor: f64,
    pub interval_min_ms: f64,
    pub hostile_base: u32,
    /// Levels per extra hostile projectile (0 = never grows)
    pub hostile_every: u32,
    pub hostile_max: u32,
    pub shrink_per_level: f32,
    pub size_min: f32,
}

impl Default for LinearCurve {
    fn default() -> Self {
        Self {
            speed_per_level: 0.1,
            speed_max: 3.0,
            population_base: 1,
            population_per_level: 0,
            population_max: 1,
            interval_base_ms: 1000.0,
            interval_factor: 1.0,
            interval_min_ms: 1000.0,
            hostile_base: 1,
            hostile_every: 0,
            hostile_max: 1,
            shrink_per_level: 0.0,
            size_min: 1.0,
        }
    }
}

impl Difficulty for LinearCurve {
    fn params(&self, level: u32) -> LevelParams {
        let level = level.max(1);
        let n = level - 1;

        let speed_scale = (1.0 + self.speed_per_level.max(0.0) * n as f32)
            .min(self.speed_max.max(1.0));

        let population = self
            .population_base
            .saturating_add(self.population_per_level.saturating_mul(n))
            .min(self.population_max.max(self.population_base));

        let factor = self.interval_factor.clamp(0.0, 1.0);
        let spawn_interval_ms = (self.interval_base_ms * factor.powi(n.min(i32::MAX as u32) as i32))
            .max(self.interval_min_ms.min(self.interval_base_ms));

        let hostile_cap = match self.hostile_every {
            0 => self.hostile_base,
            every => self.hostile_base.saturating_add(n / every),
        }
        .min(self.hostile_max.max(self.hostile_base));

        let size_scale = (1.0 - self.shrink_per_level.max(0.0) * n as f32)
            .max(self.size_min.min(1.0));

        LevelParams {
            level,
            speed_scale,
            population,
            spawn_interval_ms,
            hostile_cap,
            size_scale,
        }
    }
}

impl LinearCurve {
    /// 4..8 big rocks, drift speed creeping up
    pub fn asteroids() -> Self {
        Self {
            speed_per_level: 0.08,
            speed_max: 1.8,
            population_base: 4,
            population_per_level: 1,
            population_max: 8,
            ..Self::default()
        }
    }

    /// 6..10 brick rows, ball +18 px/s per level on 360, paddle -6 px per
    /// level on 110 down to 70
    pub fn breakout() -> Self {
        Self {
            speed_per_level: 18.0 / 360.0,
            speed_max: 4.0,
            population_base: 6,
            population_per_level: 1,
            population_max: 10,
            shrink_per_level: 6.0 / 110.0,
            size_min: 70.0 / 110.0,
            ..Self::default()
        }
    }

    /// March speed 18 + 3 * level on a base of 21, enemy bullets 1..3 (one
    /// more every 3 levels)
    pub fn invaders() -> Self {
        Self {
            speed_per_level: 3.0 / 21.0,
            speed_max: 6.0,
            population_base: 5,
            population_max: 5,
            hostile_base: 1,
            hostile_every: 3,
            hostile_max: 3,
            ..Self::default()
        }
    }

    /// 8 steps/s at start; the food counter speeds it up further in play
    pub fn snake() -> Self {
        Self {
            speed_per_level: 0.0,
            speed_max: 1.0,
            interval_base_ms: 125.0,
            interval_min_ms: 125.0,
            ..Self::default()
        }
    }

    /// Gravity max(60, 1000 * 0.85^(level-1)) ms per row
    pub fn tetris() -> Self {
        Self {
            speed_per_level: 0.0,
            speed_max: 1.0,
            interval_base_ms: 1000.0,
            interval_factor: 0.85,
            interval_min_ms: 60.0,
            ..Self::default()
        }
    }

    /// Lane traffic speeds up per level; spawn gaps scale by `interval / 1000`
    pub fn frogger() -> Self {
        Self {
            speed_per_level: 0.1,
            speed_max: 3.0,
            interval_base_ms: 1000.0,
            interval_factor: 0.94,
            interval_min_ms: 550.0,
            ..Self::default()
        }
    }

    /// Single-match game; nothing ramps between levels
    /// One pipe pair every 2 s at a fixed speed; a round never levels up
    pub fn flappy() -> Self {
        Self {
            speed_per_level: 0.0,
            speed_max: 1.0,
            interval_base_ms: 2000.0,
            interval_min_ms: 2000.0,
            ..Self::default()
        }
    }

    pub fn pong() -> Self {
        Self {
            speed_per_level: 0.0,
            speed_max: 1.0,
            ..Self::default()
        }
    }
}
