//! Asteroids: a wrapping ship shooting splitting rocks

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::heading;
use crate::sim::{
    first_contacts, shapes_overlap, Actor, Category, Countdown, EdgePolicy, EntityStore, Game,
    Motion, Playfield, Shape, Spawn, TickCtx,
};
use crate::tuning::{Difficulty, LevelParams, LinearCurve};

pub const FIELD: Playfield = Playfield::new(960.0, 640.0);

const SHIP_RADIUS: f32 = 14.0;
/// Ship hitbox is a little smaller than the drawn hull
const SHIP_HIT_RADIUS: f32 = SHIP_RADIUS * 0.8;
const TURN_RATE: f32 = 3.6;
const THRUST: f32 = 240.0;
const DAMPING: f32 = 0.992;

const BULLET_SPEED: f32 = 520.0;
const BULLET_COOLDOWN_MS: f64 = 200.0;
const BULLET_LIFE_MS: f64 = 900.0;
const MAX_BULLETS: usize = 8;

const MAX_ROCKS: usize = 64;
const SPAWN_SAFE_RADIUS: f32 = 120.0;
const SPAWN_ATTEMPTS: usize = 64;
const RESPAWN_INVULN_MS: f64 = 1500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Bullet,
    Rock,
}

impl Category for Kind {
    fn cap(self) -> Option<usize> {
        match self {
            Kind::Bullet => Some(MAX_BULLETS),
            Kind::Rock => Some(MAX_ROCKS),
        }
    }

    fn motion(self) -> Motion {
        Motion::Free
    }

    fn edge(self) -> EdgePolicy {
        EdgePolicy::Wrap
    }
}

/// Rock size class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tier {
    Big,
    Medium,
    Small,
}

impl Tier {
    pub fn radius(self) -> f32 {
        match self {
            Tier::Big => 44.0,
            Tier::Medium => 28.0,
            Tier::Small => 16.0,
        }
    }

    pub fn points(self) -> u32 {
        match self {
            Tier::Big => 20,
            Tier::Medium => 50,
            Tier::Small => 100,
        }
    }

    /// What a hit breaks this rock into
    pub fn next(self) -> Option<Tier> {
        match self {
            Tier::Big => Some(Tier::Medium),
            Tier::Medium => Some(Tier::Small),
            Tier::Small => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RockView {
    pub pos: Vec2,
    pub radius: f32,
    pub tier: Tier,
}

#[derive(Debug, Clone, Serialize)]
pub struct AsteroidsView {
    pub rocks: Vec<RockView>,
    pub bullets: Vec<Vec2>,
    pub thrusting: bool,
}

pub struct Asteroids {
    ship: Actor,
    /// Bullets carry no tier
    world: EntityStore<Kind, Option<Tier>>,
    cooldown: Countdown,
    thrusting: bool,
}

impl Default for Asteroids {
    fn default() -> Self {
        Self::new()
    }
}

impl Asteroids {
    pub fn new() -> Self {
        let mut ship = Actor::new(FIELD.center());
        ship.angle = -FRAC_PI_2;
        Self {
            ship,
            world: EntityStore::new(),
            cooldown: Countdown::default(),
            thrusting: false,
        }
    }

    pub fn rock_count(&self) -> usize {
        self.world.count(Kind::Rock)
    }

    pub fn rocks(&self) -> impl Iterator<Item = (Vec2, Tier)> + '_ {
        self.world
            .of(Kind::Rock)
            .filter_map(|r| r.data.map(|tier| (r.pos, tier)))
    }

    fn spawn_rock(&mut self, tier: Tier, pos: Vec2, vel: Vec2) {
        self.world.spawn(
            Kind::Rock,
            Spawn::new(pos, vel, Shape::Circle { radius: tier.radius() }, Some(tier)),
        );
    }

    /// A random point at least [`SPAWN_SAFE_RADIUS`] from the ship
    fn safe_point(&self, rng: &mut Pcg32) -> Vec2 {
        let mut pos = Vec2::ZERO;
        for _ in 0..SPAWN_ATTEMPTS {
            pos = Vec2::new(
                rng.random_range(0.0..FIELD.width),
                rng.random_range(0.0..FIELD.height),
            );
            if pos.distance(self.ship.pos) > SPAWN_SAFE_RADIUS {
                break;
            }
        }
        pos
    }

    fn fire(&mut self) {
        if self.cooldown.is_active() {
            return;
        }
        let dir = heading(self.ship.angle);
        let spawned = self.world.spawn(
            Kind::Bullet,
            Spawn::new(
                self.ship.pos + dir * (SHIP_RADIUS + 4.0),
                self.ship.vel + dir * BULLET_SPEED,
                Shape::Point,
                None,
            )
            .with_ttl(BULLET_LIFE_MS),
        );
        if spawned.is_some() {
            self.cooldown.set(BULLET_COOLDOWN_MS);
        }
    }

    fn fly(&mut self, ctx: &TickCtx<'_>) {
        let dt = ctx.dt_secs();
        self.ship.angle += ctx.input.axis_x() * TURN_RATE * dt;
        self.thrusting = ctx.input.axis_y() < 0.0;
        if self.thrusting {
            self.ship.vel += heading(self.ship.angle) * THRUST * dt;
        }
        self.ship.vel *= DAMPING;
        self.ship.pos = FIELD.wrap(self.ship.pos + self.ship.vel * dt);
    }

    /// Children of a destroyed rock, flung out from its centre
    fn break_rock(&mut self, pos: Vec2, tier: Tier, into: u8, rng: &mut Pcg32) {
        let Some(next) = tier.next() else {
            return;
        };
        for _ in 0..into {
            let dir = heading(rng.random_range(0.0..TAU));
            let speed = rng.random_range(60.0..120.0);
            self.spawn_rock(next, pos + dir * 8.0, dir * speed);
        }
    }

    #[cfg(test)]
    fn place_rock(&mut self, tier: Tier, pos: Vec2) {
        self.world.clear_category(Kind::Rock);
        self.spawn_rock(tier, pos, Vec2::ZERO);
    }
}

impl Game for Asteroids {
    type View = AsteroidsView;

    fn name(&self) -> &'static str {
        "asteroids"
    }

    fn default_difficulty(&self) -> Box<dyn Difficulty> {
        Box::new(LinearCurve::asteroids())
    }

    fn new_round(&mut self, _rng: &mut Pcg32) {
        self.respawn_ship();
        self.world.clear();
    }

    fn start_level(&mut self, params: &LevelParams, rng: &mut Pcg32) {
        self.world.clear();
        for _ in 0..params.population {
            let pos = self.safe_point(rng);
            let dir = heading(rng.random_range(0.0..TAU));
            let speed = rng.random_range(40.0..90.0) * params.speed_scale;
            self.spawn_rock(Tier::Big, pos, dir * speed);
        }
        log::debug!("asteroids: {} rocks", self.rock_count());
    }

    fn tick(&mut self, ctx: &mut TickCtx<'_>) {
        self.fly(ctx);
        self.cooldown.tick(ctx.dt_ms);
        if ctx.input.fire {
            self.fire();
        }
        self.world.advance(ctx.dt_ms, &FIELD);

        for hit in first_contacts(&self.world, Kind::Bullet, Kind::Rock) {
            let Some(tier) = self.world.get(hit.b).and_then(|r| r.data) else {
                continue;
            };
            ctx.events.destroy(hit.a);
            match tier.next() {
                Some(_) => ctx.events.split(hit.b, 2, tier.points()),
                None => ctx.events.destroy_scored(hit.b, tier.points()),
            };
        }

        if !ctx.invulnerable {
            // Rocks shot this tick no longer count
            let hull = Shape::Circle { radius: SHIP_HIT_RADIUS };
            let struck = self.world.of(Kind::Rock).any(|rock| {
                !ctx.events.is_removed(rock.id)
                    && shapes_overlap(self.ship.pos, hull, rock.pos, rock.shape)
            });
            if struck {
                ctx.events.lose_life();
            }
        }

        for (rock, into) in ctx.events.apply_removals(&mut self.world) {
            if let (Some(tier), true) = (rock.data, into > 0) {
                self.break_rock(rock.pos, tier, into, ctx.rng);
            }
        }

        if self.rock_count() == 0 {
            ctx.events.level_clear();
        }
    }

    fn respawn(&mut self, _rng: &mut Pcg32) {
        self.respawn_ship();
        self.world.clear_category(Kind::Bullet);
    }

    fn actor(&self) -> Option<&Actor> {
        Some(&self.ship)
    }

    fn actor_mut(&mut self) -> Option<&mut Actor> {
        Some(&mut self.ship)
    }

    fn respawn_invuln_ms(&self) -> Option<f64> {
        Some(RESPAWN_INVULN_MS)
    }

    fn is_consistent(&self) -> bool {
        self.ship.pos.is_finite()
            && self.ship.vel.is_finite()
            && self.world.iter().all(|e| e.pos.is_finite())
    }

    fn view(&self) -> AsteroidsView {
        AsteroidsView {
            rocks: self
                .rocks()
                .map(|(pos, tier)| RockView {
                    pos,
                    radius: tier.radius(),
                    tier,
                })
                .collect(),
            bullets: self.world.of(Kind::Bullet).map(|b| b.pos).collect(),
            thrusting: self.thrusting,
        }
    }
}

impl Asteroids {
    fn respawn_ship(&mut self) {
        self.ship.respawn();
        self.ship.angle = -FRAC_PI_2;
        self.cooldown.clear();
        self.thrusting = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::STEP_MS;
    use crate::games::testing::Harness;
    use crate::persistence::MemorySink;
    use crate::settings::Settings;
    use crate::sim::{Command, Direction, Event, GamePhase, Session, TickInput};

    fn fire() -> TickInput {
        TickInput {
            fire: true,
            ..TickInput::default()
        }
    }

    #[test]
    fn test_level_rocks_spawn_clear_of_ship() {
        let mut game = Asteroids::new();
        let _h = Harness::start(&mut game);
        assert_eq!(game.rock_count(), 4);
        let ship = game.ship.pos;
        assert!(game.rocks().all(|(pos, tier)| {
            tier == Tier::Big && pos.distance(ship) > SPAWN_SAFE_RADIUS
        }));
    }

    #[test]
    fn test_turn_left_decreases_angle() {
        let mut game = Asteroids::new();
        let mut h = Harness::start(&mut game);
        let before = game.ship.angle;
        h.step(&mut game, TickInput::holding(&[Direction::Left]));
        assert!(game.ship.angle < before);
    }

    #[test]
    fn test_thrust_moves_ship_forward() {
        let mut game = Asteroids::new();
        let mut h = Harness::start(&mut game);
        game.world.clear_category(Kind::Rock);
        let y0 = game.ship.pos.y;
        for _ in 0..30 {
            h.step(&mut game, TickInput::holding(&[Direction::Up]));
        }
        assert!(game.ship.pos.y < y0);
    }

    #[test]
    fn test_bullet_splits_big_rock() {
        let mut game = Asteroids::new();
        let mut h = Harness::start(&mut game);
        game.place_rock(Tier::Big, game.ship.pos - Vec2::new(0.0, 70.0));

        let mut events = h.step(&mut game, fire());
        events.extend(h.idle(&mut game, 10));

        assert!(events.contains(&Event::Score(20)));
        assert_eq!(game.rock_count(), 2);
        assert!(game.rocks().all(|(_, tier)| tier == Tier::Medium));
        assert_eq!(game.world.count(Kind::Bullet), 0);
    }

    #[test]
    fn test_last_small_rock_clears_level() {
        let mut game = Asteroids::new();
        let mut h = Harness::start(&mut game);
        game.place_rock(Tier::Small, game.ship.pos - Vec2::new(0.0, 60.0));

        let mut events = h.step(&mut game, fire());
        events.extend(h.idle(&mut game, 10));

        assert!(events.contains(&Event::Score(100)));
        assert!(events.contains(&Event::LevelClear));
        assert_eq!(game.rock_count(), 0);
    }

    #[test]
    fn test_fire_respects_cooldown() {
        let mut game = Asteroids::new();
        let mut h = Harness::start(&mut game);
        game.world.clear_category(Kind::Rock);
        h.step(&mut game, fire());
        h.step(&mut game, fire());
        assert_eq!(game.world.count(Kind::Bullet), 1);
        h.idle(&mut game, 24);
        h.step(&mut game, fire());
        assert_eq!(game.world.count(Kind::Bullet), 2);
    }

    #[test]
    fn test_rock_on_ship_costs_one_life() {
        let mut game = Asteroids::new();
        let mut h = Harness::start(&mut game);
        game.place_rock(Tier::Big, game.ship.pos);
        let events = h.step(&mut game, TickInput::default());
        assert_eq!(events.iter().filter(|e| **e == Event::LoseLife).count(), 1);

        h.invulnerable = true;
        let events = h.step(&mut game, TickInput::default());
        assert!(!events.contains(&Event::LoseLife));
    }

    #[test]
    fn test_second_rock_still_hits_when_first_is_shot() {
        let mut game = Asteroids::new();
        let mut h = Harness::start(&mut game);
        let ship = game.ship.pos;
        game.place_rock(Tier::Small, ship - Vec2::new(0.0, 16.0));
        game.spawn_rock(Tier::Big, ship + Vec2::new(0.0, 30.0), Vec2::ZERO);

        let events = h.step(&mut game, fire());
        assert!(events.contains(&Event::Score(100)));
        assert!(events.contains(&Event::LoseLife));
        assert_eq!(game.rock_count(), 1);
    }

    #[test]
    fn test_respawn_through_session() {
        let mut session = Session::new(
            Asteroids::new(),
            &Settings::default(),
            Box::new(MemorySink::new()),
        );
        session.push(Command::Start);
        let ship = session.game().ship.pos;
        session.game_mut().place_rock(Tier::Big, ship);
        session.frame(STEP_MS);

        assert_eq!(session.phase(), GamePhase::Running);
        assert_eq!(session.round().lives, 2);
        let actor = session.snapshot().actor.unwrap();
        assert!(actor.is_invulnerable());
        assert_eq!(actor.pos, FIELD.center());
        assert!((actor.angle + FRAC_PI_2).abs() < 1e-6);
    }
}
