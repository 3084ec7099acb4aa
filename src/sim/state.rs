//! Round state and lifecycle
//!
//! Everything the session tracks across ticks that is not owned by a
//! particular game: phase, score, level, lives and the player actor.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::clock::Countdown;

/// Current phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GamePhase {
    /// Fresh board, waiting for the first start input
    #[default]
    Ready,
    /// Ticks are executing
    Running,
    /// Frozen by a pause toggle
    Paused,
    /// Round ended; only a reset leaves this state
    GameOver,
}

impl GamePhase {
    /// Ready -> Running; no-op elsewhere
    pub fn start(self) -> Self {
        match self {
            GamePhase::Ready => GamePhase::Running,
            other => other,
        }
    }

    /// Running <-> Paused; no-op elsewhere
    pub fn toggle_pause(self) -> Self {
        match self {
            GamePhase::Running => GamePhase::Paused,
            GamePhase::Paused => GamePhase::Running,
            other => other,
        }
    }

    /// Whether the scheduler may execute ticks
    #[inline]
    pub fn is_running(self) -> bool {
        self == GamePhase::Running
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GamePhase::Ready => "ready",
            GamePhase::Running => "running",
            GamePhase::Paused => "paused",
            GamePhase::GameOver => "game over",
        }
    }
}

/// Outcome of losing a life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeLoss {
    /// Lives remain: respawn the actor with invulnerability
    Respawn,
    /// Last life gone
    Exhausted,
}

/// Score, level and lives for the current round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub score: u64,
    /// Best score seen (persisted value or this session, whichever is higher)
    pub high_score: u64,
    /// 1-based level index
    pub level: u32,
    pub lives: u8,
}

impl Round {
    pub fn new(lives: u8, high_score: u64) -> Self {
        Self {
            score: 0,
            high_score,
            level: 1,
            lives,
        }
    }

    /// Add points; returns true if the score changed
    pub fn add_score(&mut self, points: u64) -> bool {
        if points == 0 {
            return false;
        }
        self.score = self.score.saturating_add(points);
        self.high_score = self.high_score.max(self.score);
        true
    }

    /// Decrement lives; the round ends when the count reaches zero
    pub fn lose_life(&mut self) -> LifeLoss {
        self.lives = self.lives.saturating_sub(1);
        if self.lives == 0 {
            LifeLoss::Exhausted
        } else {
            LifeLoss::Respawn
        }
    }

    pub fn next_level(&mut self) -> u32 {
        self.level = self.level.saturating_add(1);
        self.level
    }
}

/// Player-controlled entity (ship, paddle, frog)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Facing angle in radians (only meaningful for rotating actors)
    pub angle: f32,
    /// Where the actor reappears after losing a life
    pub spawn_point: Vec2,
    pub invuln: Countdown,
}

impl Actor {
    pub fn new(spawn_point: Vec2) -> Self {
        Self {
            pos: spawn_point,
            vel: Vec2::ZERO,
            angle: 0.0,
            spawn_point,
            invuln: Countdown::default(),
        }
    }

    /// Back to the spawn point at rest
    pub fn respawn(&mut self) {
        self.pos = self.spawn_point;
        self.vel = Vec2::ZERO;
        self.angle = 0.0;
    }

    pub fn grant_invulnerability(&mut self, ms: f64) {
        self.invuln.set(ms);
    }

    #[inline]
    pub fn is_invulnerable(&self) -> bool {
        self.invuln.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_toggle_is_its_own_inverse() {
        for phase in [
            GamePhase::Ready,
            GamePhase::Running,
            GamePhase::Paused,
            GamePhase::GameOver,
        ] {
            assert_eq!(phase.toggle_pause().toggle_pause(), phase);
        }
    }

    #[test]
    fn test_start_only_from_ready() {
        assert_eq!(GamePhase::Ready.start(), GamePhase::Running);
        assert_eq!(GamePhase::Paused.start(), GamePhase::Paused);
        assert_eq!(GamePhase::GameOver.start(), GamePhase::GameOver);
    }

    #[test]
    fn test_lives_countdown() {
        let mut round = Round::new(3, 0);
        assert_eq!(round.lose_life(), LifeLoss::Respawn);
        assert_eq!(round.lose_life(), LifeLoss::Respawn);
        assert_eq!(round.lose_life(), LifeLoss::Exhausted);
        assert_eq!(round.lives, 0);
        assert_eq!(round.lose_life(), LifeLoss::Exhausted);
    }

    #[test]
    fn test_high_score_follows_score() {
        let mut round = Round::new(3, 50);
        round.add_score(30);
        assert_eq!(round.high_score, 50);
        round.add_score(30);
        assert_eq!(round.high_score, 60);
        assert!(!round.add_score(0));
    }
}
