//! Rule sets built on the shared loop
//!
//! Each game owns its entities and implements [`Game`](crate::sim::Game);
//! timing, lives, levels and scoring are left to the session.

pub mod asteroids;
pub mod breakout;
pub mod flappy;
pub mod frogger;
pub mod invaders;
pub mod pong;
pub mod snake;
pub mod tetris;

pub use asteroids::Asteroids;
pub use breakout::Breakout;
pub use flappy::Flappy;
pub use frogger::Frogger;
pub use invaders::Invaders;
pub use pong::Pong;
pub use snake::Snake;
pub use tetris::Tetris;

use glam::Vec2;

/// Games the driver can run, by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameKind {
    Asteroids,
    Breakout,
    Flappy,
    Frogger,
    Invaders,
    Pong,
    Snake,
    Tetris,
}

impl GameKind {
    pub const ALL: [GameKind; 8] = [
        GameKind::Asteroids,
        GameKind::Breakout,
        GameKind::Flappy,
        GameKind::Frogger,
        GameKind::Invaders,
        GameKind::Pong,
        GameKind::Snake,
        GameKind::Tetris,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GameKind::Asteroids => "asteroids",
            GameKind::Breakout => "breakout",
            GameKind::Flappy => "flappy",
            GameKind::Frogger => "frogger",
            GameKind::Invaders => "invaders",
            GameKind::Pong => "pong",
            GameKind::Snake => "snake",
            GameKind::Tetris => "tetris",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        let name = match name.as_str() {
            "space-invaders" => "invaders",
            "flappy-bird" => "flappy",
            other => other,
        };
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

/// Unit vector for an angle in radians
#[inline]
pub(crate) fn heading(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Keep a velocity's direction, set its length
#[inline]
pub(crate) fn with_speed(vel: Vec2, speed: f32) -> Vec2 {
    vel.normalize_or_zero() * speed
}

#[cfg(test)]
pub(crate) mod testing {
    //! Drive a game directly, without a session

    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    use crate::consts::STEP_MS;
    use crate::sim::{Event, EventQueue, Game, TickCtx, TickInput};
    use crate::tuning::LevelParams;

    pub struct Harness {
        pub rng: Pcg32,
        pub events: EventQueue,
        pub tick: u64,
        pub params: LevelParams,
        pub invulnerable: bool,
    }

    impl Harness {
        /// New round at level 1 of the game's own curve
        pub fn start<G: Game>(game: &mut G) -> Self {
            let mut rng = Pcg32::seed_from_u64(7);
            let params = game.default_difficulty().params(1);
            game.new_round(&mut rng);
            game.start_level(&params, &mut rng);
            Self {
                rng,
                events: EventQueue::new(),
                tick: 0,
                params,
                invulnerable: false,
            }
        }

        /// One tick; returns the events it queued
        pub fn step<G: Game>(&mut self, game: &mut G, input: TickInput) -> Vec<Event> {
            self.events.clear();
            let mut ctx = TickCtx {
                input,
                dt_ms: STEP_MS,
                tick: self.tick,
                params: self.params,
                invulnerable: self.invulnerable,
                rng: &mut self.rng,
                events: &mut self.events,
            };
            game.tick(&mut ctx);
            self.tick += 1;
            self.events.events().to_vec()
        }

        /// Run `n` idle ticks, collecting every event
        pub fn idle<G: Game>(&mut self, game: &mut G, n: usize) -> Vec<Event> {
            (0..n)
                .flat_map(|_| self.step(game, TickInput::default()))
                .collect()
        }
    }
}
