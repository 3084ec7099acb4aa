//! Fixed timestep session driver
//!
//! [`Session::frame`] is the single entry point an external loop calls with
//! the real time since its previous callback. The session turns that into
//! whole ticks, runs the game rules for each one and applies the resulting
//! events to the round.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::clock::Scheduler;
use super::collision::{Event, EventQueue};
use super::command::{Command, CommandLatch, TickInput};
use super::state::{Actor, GamePhase, LifeLoss, Round};
use crate::persistence::{ScoreSink, ScoreSubmission};
use crate::settings::Settings;
use crate::tuning::{Difficulty, LevelParams};

/// Everything a game sees during one tick
pub struct TickCtx<'a> {
    pub input: TickInput,
    /// Fixed tick duration (ms)
    pub dt_ms: f64,
    /// Ticks executed before this one
    pub tick: u64,
    pub params: LevelParams,
    /// Actor hazard collisions are suppressed this tick
    pub invulnerable: bool,
    pub rng: &'a mut Pcg32,
    pub events: &'a mut EventQueue,
}

impl TickCtx<'_> {
    #[inline]
    pub fn dt_secs(&self) -> f32 {
        crate::ms_to_secs(self.dt_ms)
    }
}

/// Rules of one arcade game, driven by a [`Session`]
pub trait Game {
    /// Read-only render data
    type View: Clone + std::fmt::Debug + Serialize;

    /// Key under which high scores are stored
    fn name(&self) -> &'static str;

    fn default_difficulty(&self) -> Box<dyn Difficulty>;

    /// Wipe all round state (new board, zeroed counters)
    fn new_round(&mut self, rng: &mut Pcg32);

    /// Seed the board for a level: clear transient entities and respawn the
    /// obstacle formation from `params`
    fn start_level(&mut self, params: &LevelParams, rng: &mut Pcg32);

    /// Advance one tick, queueing outcomes on `ctx.events`
    fn tick(&mut self, ctx: &mut TickCtx<'_>);

    /// Put the actor back after a life is lost
    fn respawn(&mut self, _rng: &mut Pcg32) {
        if let Some(actor) = self.actor_mut() {
            actor.respawn();
        }
    }

    fn actor(&self) -> Option<&Actor> {
        None
    }

    fn actor_mut(&mut self) -> Option<&mut Actor> {
        None
    }

    /// Per-game invulnerability after respawn (ms); `None` uses the settings
    fn respawn_invuln_ms(&self) -> Option<f64> {
        None
    }

    /// False when internal state has gone bad (non-finite positions)
    fn is_consistent(&self) -> bool {
        true
    }

    fn view(&self) -> Self::View;
}

/// Render snapshot taken between tick batches
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot<V> {
    pub phase: GamePhase,
    pub round: Round,
    pub tick: u64,
    pub actor: Option<Actor>,
    pub view: V,
}

/// One player's run of a game: lifecycle, round state and timing
pub struct Session<G: Game> {
    game: G,
    phase: GamePhase,
    round: Round,
    params: LevelParams,
    scheduler: Scheduler,
    latch: CommandLatch,
    events: EventQueue,
    rng: Pcg32,
    difficulty: Box<dyn Difficulty>,
    sink: Box<dyn ScoreSink>,
    starting_lives: u8,
    invuln_ms: f64,
}

impl<G: Game> Session<G> {
    pub fn new(game: G, settings: &Settings, sink: Box<dyn ScoreSink>) -> Self {
        let difficulty = game.default_difficulty();
        let params = difficulty.params(1);
        let starting_lives = settings.starting_lives.max(1);
        let mut session = Self {
            game,
            phase: GamePhase::Ready,
            round: Round::new(starting_lives, 0),
            params,
            scheduler: Scheduler::new(settings.step_ms(), settings.max_frame_delta_ms),
            latch: CommandLatch::new(),
            events: EventQueue::new(),
            rng: Pcg32::seed_from_u64(settings.seed),
            difficulty,
            sink,
            starting_lives,
            invuln_ms: settings.respawn_invuln_ms,
        };
        session.prepare_round();
        session
    }

    /// Replace the difficulty curve; the ready board is re-seeded
    pub fn with_difficulty(mut self, difficulty: impl Difficulty + 'static) -> Self {
        self.difficulty = Box::new(difficulty);
        self.prepare_round();
        self
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn round(&self) -> &Round {
        &self.round
    }

    pub fn params(&self) -> &LevelParams {
        &self.params
    }

    /// Total ticks executed
    pub fn ticks(&self) -> u64 {
        self.scheduler.ticks()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut G {
        &mut self.game
    }

    /// Queue a command for the next frame
    pub fn push(&mut self, command: Command) {
        if self.phase == GamePhase::Ready && command.starts_round() && command != Command::Start {
            self.latch.push(Command::Start);
        }
        self.latch.push(command);
    }

    /// Feed real elapsed time; returns the number of ticks executed
    pub fn frame(&mut self, elapsed_ms: f64) -> u32 {
        for command in self.latch.take_lifecycle() {
            self.apply_lifecycle(command);
        }

        if !self.phase.is_running() {
            self.scheduler.discard();
            return 0;
        }

        let due = self.scheduler.accumulate(elapsed_ms);
        let mut executed = 0;
        while executed < due && self.phase.is_running() {
            self.run_tick();
            self.scheduler.consume_tick();
            executed += 1;
        }

        if !self.phase.is_running() {
            self.scheduler.discard();
        }
        executed
    }

    pub fn snapshot(&self) -> Snapshot<G::View> {
        Snapshot {
            phase: self.phase,
            round: self.round,
            tick: self.scheduler.ticks(),
            actor: self.game.actor().copied(),
            view: self.game.view(),
        }
    }

    /// End the round immediately (unrecoverable state inside a tick)
    pub fn force_game_over(&mut self, reason: &str) {
        if matches!(self.phase, GamePhase::Running | GamePhase::Paused) {
            log::warn!("{}: forcing game over: {}", self.game.name(), reason);
            self.end_round();
        }
    }

    fn apply_lifecycle(&mut self, command: Command) {
        match command {
            Command::Start => {
                if self.phase == GamePhase::Ready {
                    self.phase = self.phase.start();
                    log::info!("{}: round started", self.game.name());
                }
            }
            Command::Pause => {
                let next = self.phase.toggle_pause();
                if next != self.phase {
                    log::debug!("{}: {} -> {}", self.game.name(), self.phase.as_str(), next.as_str());
                    self.phase = next;
                }
            }
            Command::Reset => {
                if self.phase == GamePhase::Ready {
                    return;
                }
                if matches!(self.phase, GamePhase::Running | GamePhase::Paused) && self.round.score > 0 {
                    self.submit(true);
                }
                self.prepare_round();
                log::info!("{}: reset", self.game.name());
            }
            _ => {}
        }
    }

    /// Fresh board in the Ready phase
    fn prepare_round(&mut self) {
        let stored = self.sink.load_high(self.game.name());
        self.round = Round::new(self.starting_lives, stored.max(self.round.high_score));
        self.params = self.difficulty.params(1);
        self.game.new_round(&mut self.rng);
        self.game.start_level(&self.params, &mut self.rng);
        if let Some(actor) = self.game.actor_mut() {
            actor.invuln.clear();
        }
        self.events.clear();
        self.scheduler.discard();
        let _ = self.latch.take_tick_input();
        self.phase = GamePhase::Ready;
    }

    fn run_tick(&mut self) {
        let input = self.latch.take_tick_input();
        let dt_ms = self.scheduler.step_ms();
        self.events.clear();

        let invulnerable = match self.game.actor_mut() {
            Some(actor) => {
                actor.invuln.tick(dt_ms);
                actor.is_invulnerable()
            }
            None => false,
        };

        let mut ctx = TickCtx {
            input,
            dt_ms,
            tick: self.scheduler.ticks(),
            params: self.params,
            invulnerable,
            rng: &mut self.rng,
            events: &mut self.events,
        };
        self.game.tick(&mut ctx);

        if !self.game.is_consistent() {
            self.force_game_over("non-finite game state");
            return;
        }
        self.resolve_events(invulnerable);
    }

    fn resolve_events(&mut self, invulnerable: bool) {
        if self.round.add_score(self.events.points()) {
            self.submit(false);
        }

        let events = self.events.events();
        let lost = events.contains(&Event::Lost);
        let life_lost = self.events.life_lost();
        let cleared = events.contains(&Event::LevelClear);

        if lost {
            self.end_round();
            return;
        }
        if life_lost && !invulnerable {
            self.lose_life();
            if !self.phase.is_running() {
                return;
            }
        }
        if cleared {
            self.advance_level();
        }
    }

    fn lose_life(&mut self) {
        match self.round.lose_life() {
            LifeLoss::Exhausted => self.end_round(),
            LifeLoss::Respawn => {
                let invuln_ms = self.game.respawn_invuln_ms().unwrap_or(self.invuln_ms);
                self.game.respawn(&mut self.rng);
                if let Some(actor) = self.game.actor_mut() {
                    actor.grant_invulnerability(invuln_ms);
                }
                log::info!("{}: life lost, {} left", self.game.name(), self.round.lives);
            }
        }
    }

    fn advance_level(&mut self) {
        let level = self.round.next_level();
        self.params = self.difficulty.params(level);
        self.game.start_level(&self.params, &mut self.rng);
        log::info!("{}: level {}", self.game.name(), level);
    }

    fn end_round(&mut self) {
        self.phase = GamePhase::GameOver;
        self.submit(true);
        log::info!(
            "{}: game over, score {} at level {}",
            self.game.name(),
            self.round.score,
            self.round.level
        );
    }

    fn submit(&mut self, round_over: bool) {
        let submission = ScoreSubmission {
            game: self.game.name(),
            score: self.round.score,
            level: self.round.level,
            round_over,
        };
        if let Err(err) = self.sink.submit(&submission) {
            log::warn!("{}: score not saved: {}", submission.game, err);
        }
    }
}
