//! Flappy Bird: flap through the gaps
//!
//! The bird only moves vertically. Pipe pairs enter from the right on a
//! [`Cadence`] and slide left until the store drops them past the left edge.
//! Nothing moves until the first flap, and any hit ends the round.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::sim::{
    shapes_overlap, Aabb, Actor, Cadence, Category, Direction, EdgePolicy, EntityStore, Game,
    Motion, Playfield, Shape, Spawn, TickCtx,
};
use crate::tuning::{Difficulty, LevelParams, LinearCurve};

pub const FIELD: Playfield = Playfield::new(480.0, 640.0);

const GRAVITY: f32 = 980.0;
/// Vertical speed set by a flap (px/s, negative is up)
const FLAP_SPEED: f32 = -300.0;
const BIRD_RADIUS: f32 = 14.0;
const PIPE_W: f32 = 66.0;
const PIPE_GAP: f32 = 150.0;
const PIPE_SPEED: f32 = 140.0;
/// Closest a gap may come to the ceiling or the ground
const GAP_MARGIN: f32 = 40.0;
const PASS_POINTS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Pipe,
}

impl Category for Kind {
    fn cap(self) -> Option<usize> {
        Some(12)
    }

    fn motion(self) -> Motion {
        Motion::Lane
    }

    fn edge(self) -> EdgePolicy {
        EdgePolicy::Kill
    }
}

/// Half of a pipe pair; the upper half carries the pass flag for the pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Upper { passed: bool },
    Lower,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlappyView {
    pub bird: Vec2,
    pub bird_radius: f32,
    pub bird_vy: f32,
    pub pipes: Vec<Aabb>,
    pub started: bool,
}

pub struct Flappy {
    bird: Actor,
    pipes: EntityStore<Kind, Segment>,
    spawn: Cadence,
    pipe_speed: f32,
    started: bool,
}

impl Default for Flappy {
    fn default() -> Self {
        Self::new()
    }
}

impl Flappy {
    pub fn new() -> Self {
        Self {
            bird: Actor::new(Vec2::new(FIELD.width * 0.28, FIELD.height * 0.5)),
            pipes: EntityStore::new(),
            spawn: Cadence::new(2000.0),
            pipe_speed: PIPE_SPEED,
            started: false,
        }
    }

    pub fn bird(&self) -> &Actor {
        &self.bird
    }

    pub fn started(&self) -> bool {
        self.started
    }

    /// The bird's hitbox is its bounding square
    fn hull() -> Shape {
        Shape::rect(BIRD_RADIUS * 2.0, BIRD_RADIUS * 2.0)
    }

    /// A pair whose left edge sits on `left` with the gap opening at `gap_top`
    fn spawn_pair(&mut self, left: f32, gap_top: f32) {
        let x = left + PIPE_W / 2.0;
        let vel = Vec2::new(-self.pipe_speed, 0.0);
        let gap_bottom = gap_top + PIPE_GAP;
        self.pipes.spawn(
            Kind::Pipe,
            Spawn::new(
                Vec2::new(x, gap_top / 2.0),
                vel,
                Shape::rect(PIPE_W, gap_top),
                Segment::Upper { passed: false },
            ),
        );
        self.pipes.spawn(
            Kind::Pipe,
            Spawn::new(
                Vec2::new(x, (gap_bottom + FIELD.height) / 2.0),
                vel,
                Shape::rect(PIPE_W, FIELD.height - gap_bottom),
                Segment::Lower,
            ),
        );
    }

    /// Points for every upper pipe whose right edge is now behind the bird
    fn mark_passed(&mut self) -> u32 {
        let bird_x = self.bird.pos.x;
        let mut passed = 0;
        for pipe in self.pipes.of_mut(Kind::Pipe) {
            if let Segment::Upper { passed: false } = pipe.data {
                if pipe.pos.x + PIPE_W / 2.0 < bird_x {
                    pipe.data = Segment::Upper { passed: true };
                    passed += 1;
                }
            }
        }
        passed
    }

    fn crashed(&self) -> bool {
        let y = self.bird.pos.y;
        if y - BIRD_RADIUS < 0.0 || y + BIRD_RADIUS > FIELD.height {
            return true;
        }
        let hull = Self::hull();
        self.pipes
            .of(Kind::Pipe)
            .any(|pipe| shapes_overlap(self.bird.pos, hull, pipe.pos, pipe.shape))
    }
}

impl Game for Flappy {
    type View = FlappyView;

    fn name(&self) -> &'static str {
        "flappy"
    }

    fn default_difficulty(&self) -> Box<dyn Difficulty> {
        Box::new(LinearCurve::flappy())
    }

    fn new_round(&mut self, _rng: &mut Pcg32) {
        self.bird.respawn();
        self.pipes.clear();
        self.spawn.restart();
        self.started = false;
    }

    fn start_level(&mut self, params: &LevelParams, _rng: &mut Pcg32) {
        self.pipe_speed = PIPE_SPEED * params.speed_scale;
        self.spawn.set_interval(params.spawn_interval_ms);
    }

    fn tick(&mut self, ctx: &mut TickCtx<'_>) {
        let flap = ctx.input.fire || ctx.input.pressed == Some(Direction::Up);
        if !self.started {
            if !flap {
                return;
            }
            log::debug!("first flap");
            self.started = true;
        }

        let dt = ctx.dt_secs();
        if flap {
            self.bird.vel.y = FLAP_SPEED;
        }
        self.bird.vel.y += GRAVITY * dt;
        self.bird.pos.y += self.bird.vel.y * dt;

        for _ in 0..self.spawn.tick(ctx.dt_ms) {
            let gap_top =
                GAP_MARGIN + ctx.rng.random_range(0.0..=FIELD.height - 2.0 * GAP_MARGIN - PIPE_GAP);
            self.spawn_pair(FIELD.width, gap_top);
        }
        self.pipes.advance(ctx.dt_ms, &FIELD);

        let passed = self.mark_passed();
        if passed > 0 {
            ctx.events.score(passed * PASS_POINTS);
        }

        if self.crashed() {
            log::debug!("bird down at y {:.1}", self.bird.pos.y);
            ctx.events.lost();
        }
    }

    fn actor(&self) -> Option<&Actor> {
        Some(&self.bird)
    }

    fn actor_mut(&mut self) -> Option<&mut Actor> {
        Some(&mut self.bird)
    }

    fn is_consistent(&self) -> bool {
        self.bird.pos.is_finite()
            && self.bird.vel.is_finite()
            && self.pipes.iter().all(|p| p.pos.is_finite())
    }

    fn view(&self) -> FlappyView {
        FlappyView {
            bird: self.bird.pos,
            bird_radius: BIRD_RADIUS,
            bird_vy: self.bird.vel.y,
            pipes: self
                .pipes
                .iter()
                .map(|p| Aabb::from_center(p.pos, p.shape.half_extent()))
                .collect(),
            started: self.started,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::STEP_MS;
    use crate::games::testing::Harness;
    use crate::sim::{Event, TickInput};

    fn flap() -> TickInput {
        TickInput {
            fire: true,
            ..TickInput::default()
        }
    }

    /// Keep the bird aloft: a flap every half second
    fn fly(game: &mut Flappy, h: &mut Harness, ticks: usize) -> Vec<Event> {
        (0..ticks)
            .flat_map(|i| {
                let input = if i % 60 == 0 { flap() } else { TickInput::default() };
                h.step(game, input)
            })
            .collect()
    }

    #[test]
    fn test_nothing_moves_before_first_flap() {
        let mut game = Flappy::new();
        let mut h = Harness::start(&mut game);
        let events = h.idle(&mut game, 600);
        assert!(events.is_empty());
        assert!(!game.started());
        assert_eq!(game.bird().pos, game.bird().spawn_point);
        assert_eq!(game.pipes.count(Kind::Pipe), 0);
    }

    #[test]
    fn test_flap_then_gravity() {
        let mut game = Flappy::new();
        let mut h = Harness::start(&mut game);
        let dt = (STEP_MS / 1000.0) as f32;
        h.step(&mut game, flap());
        assert!(game.started());
        assert!((game.bird().vel.y - (FLAP_SPEED + GRAVITY * dt)).abs() < 1e-3);
        assert!(game.bird().pos.y < game.bird().spawn_point.y);

        h.idle(&mut game, 10);
        assert!((game.bird().vel.y - (FLAP_SPEED + 11.0 * GRAVITY * dt)).abs() < 1e-2);
    }

    #[test]
    fn test_pipe_pair_every_two_seconds() {
        let mut game = Flappy::new();
        let mut h = Harness::start(&mut game);
        fly(&mut game, &mut h, 239);
        assert_eq!(game.pipes.count(Kind::Pipe), 0);
        fly(&mut game, &mut h, 1);
        assert_eq!(game.pipes.count(Kind::Pipe), 2);

        let view = game.view();
        let (upper, lower) = (view.pipes[0], view.pipes[1]);
        assert!(upper.min.y.abs() < 1e-3);
        assert!((lower.max.y - FIELD.height).abs() < 1e-3);
        assert!((lower.min.y - upper.max.y - PIPE_GAP).abs() < 1e-3);
        assert!(upper.max.y >= GAP_MARGIN);
        assert!(lower.min.y <= FIELD.height - GAP_MARGIN);
    }

    #[test]
    fn test_passing_a_pair_scores_once() {
        let mut game = Flappy::new();
        let mut h = Harness::start(&mut game);
        let bird = game.bird().pos;
        game.spawn_pair(bird.x + 1.0 - PIPE_W, bird.y - PIPE_GAP / 2.0);
        let events = h.step(&mut game, flap());
        assert!(events.contains(&Event::Score(PASS_POINTS)));
        assert!(!events.contains(&Event::Lost));

        let events = h.idle(&mut game, 5);
        assert!(!events.iter().any(|e| matches!(e, Event::Score(_))));
    }

    #[test]
    fn test_pipe_hit_ends_round() {
        let mut game = Flappy::new();
        let mut h = Harness::start(&mut game);
        let bird = game.bird().pos;
        // Gap well above the bird, pair straddling it
        game.spawn_pair(bird.x - PIPE_W / 2.0, GAP_MARGIN);
        let events = h.step(&mut game, flap());
        assert!(events.contains(&Event::Lost));
    }

    #[test]
    fn test_ground_ends_round() {
        let mut game = Flappy::new();
        let mut h = Harness::start(&mut game);
        h.step(&mut game, flap());
        let events = h.idle(&mut game, 200);
        assert!(events.contains(&Event::Lost));
        assert!(game.bird().pos.y + BIRD_RADIUS > FIELD.height);
    }

    #[test]
    fn test_ceiling_ends_round() {
        let mut game = Flappy::new();
        let mut h = Harness::start(&mut game);
        game.bird.pos.y = BIRD_RADIUS + 1.0;
        let events = h.step(&mut game, flap());
        assert!(events.contains(&Event::Lost));
    }

    #[test]
    fn test_pipes_drop_off_the_left_edge() {
        let mut game = Flappy::new();
        let mut h = Harness::start(&mut game);
        game.spawn_pair(-PIPE_W + 0.5, 200.0);
        h.step(&mut game, flap());
        assert_eq!(game.pipes.count(Kind::Pipe), 0);
    }

    #[test]
    fn test_new_round_resets_bird_and_pipes() {
        let mut game = Flappy::new();
        let mut h = Harness::start(&mut game);
        fly(&mut game, &mut h, 300);
        assert!(game.started());
        game.new_round(&mut h.rng);
        assert!(!game.started());
        assert_eq!(game.bird().pos, game.bird().spawn_point);
        assert_eq!(game.bird().vel, Vec2::ZERO);
        assert_eq!(game.pipes.count(Kind::Pipe), 0);
    }
}
