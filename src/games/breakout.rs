//! Breakout: paddle, balls, a brick wall and multi-ball capsules

use std::f32::consts::{FRAC_PI_2, PI};

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::{heading, with_speed};
use crate::sim::{
    circle_rect_overlap, first_contacts, rects_overlap, Aabb, Actor, Category, EdgePolicy,
    EntityId, EntityStore, Game, Motion, Playfield, Shape, Spawn, TickCtx,
};
use crate::tuning::{Difficulty, LevelParams, LinearCurve};

pub const FIELD: Playfield = Playfield::new(800.0, 600.0);

const PADDLE_W_BASE: f32 = 110.0;
const PADDLE_H: f32 = 14.0;
const PADDLE_SPEED: f32 = 520.0;
/// Top edge of the paddle
const PADDLE_Y: f32 = FIELD.height - 36.0;
const PADDLE_MARGIN: f32 = 8.0;

const BALL_RADIUS: f32 = 6.0;
const BALL_SPEED_BASE: f32 = 360.0;
const MAX_DEFLECT: f32 = PI * 0.78;
const MAX_BALLS: usize = 4;
const MULTIBALL_SPREAD: f32 = 0.32;

const BRICK_COLS: u32 = 12;
const BRICK_H: f32 = 18.0;
const BRICK_GAP: f32 = 4.0;
const BRICK_MARGIN_X: f32 = 20.0;
const BRICK_MARGIN_TOP: f32 = 60.0;
const BRICK_POINTS: u32 = 10;

const CAPSULE_CHANCE: f64 = 0.18;
const CAPSULE_SPEED: f32 = 180.0;
const CAPSULE_SIZE: Vec2 = Vec2::new(28.0, 14.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Ball,
    Brick,
    Capsule,
}

impl Category for Kind {
    fn cap(self) -> Option<usize> {
        match self {
            Kind::Ball => Some(MAX_BALLS),
            Kind::Brick | Kind::Capsule => None,
        }
    }

    fn motion(self) -> Motion {
        match self {
            Kind::Brick => Motion::Static,
            Kind::Ball | Kind::Capsule => Motion::Free,
        }
    }

    fn edge(self) -> EdgePolicy {
        match self {
            // Walls bounce balls; the bottom is handled by the rules
            Kind::Ball | Kind::Brick => EdgePolicy::Ignore,
            Kind::Capsule => EdgePolicy::Kill,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Body {
    Ball { stuck: bool },
    Brick { row: u32 },
    Capsule,
}

impl Body {
    fn is_stuck(self) -> bool {
        matches!(self, Body::Ball { stuck: true })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BallView {
    pub pos: Vec2,
    pub vel: Vec2,
    pub stuck: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakoutView {
    pub paddle: Aabb,
    pub balls: Vec<BallView>,
    /// Brick boxes with their row (colour band)
    pub bricks: Vec<(Aabb, u32)>,
    pub capsules: Vec<Aabb>,
}

pub struct Breakout {
    /// Paddle centre
    paddle: Actor,
    paddle_w: f32,
    world: EntityStore<Kind, Body>,
    /// Ball speed at the start of the level
    base_speed: f32,
    /// Bricks destroyed this level, drives the speed ramp
    cleared: u32,
}

impl Default for Breakout {
    fn default() -> Self {
        Self::new()
    }
}

impl Breakout {
    pub fn new() -> Self {
        Self {
            paddle: Actor::new(Vec2::new(FIELD.width / 2.0, PADDLE_Y + PADDLE_H / 2.0)),
            paddle_w: PADDLE_W_BASE,
            world: EntityStore::new(),
            base_speed: BALL_SPEED_BASE,
            cleared: 0,
        }
    }

    pub fn paddle_rect(&self) -> Aabb {
        Aabb::from_corner(
            self.paddle.pos.x - self.paddle_w / 2.0,
            PADDLE_Y,
            self.paddle_w,
            PADDLE_H,
        )
    }

    pub fn paddle_width(&self) -> f32 {
        self.paddle_w
    }

    pub fn ball_count(&self) -> usize {
        self.world.count(Kind::Ball)
    }

    pub fn brick_count(&self) -> usize {
        self.world.count(Kind::Brick)
    }

    fn build_bricks(&mut self, rows: u32) {
        let usable = FIELD.width - BRICK_MARGIN_X * 2.0 - BRICK_GAP * (BRICK_COLS - 1) as f32;
        let bw = (usable / BRICK_COLS as f32).floor();
        for row in 0..rows {
            for col in 0..BRICK_COLS {
                let x = BRICK_MARGIN_X + col as f32 * (bw + BRICK_GAP);
                let y = BRICK_MARGIN_TOP + row as f32 * (BRICK_H + BRICK_GAP);
                let rect = Aabb::from_corner(x, y, bw, BRICK_H);
                self.world.spawn(
                    Kind::Brick,
                    Spawn::new(
                        rect.center(),
                        Vec2::ZERO,
                        Shape::rect(bw, BRICK_H),
                        Body::Brick { row },
                    ),
                );
            }
        }
    }

    /// Where a stuck ball rides
    fn rest_point(&self) -> Vec2 {
        Vec2::new(
            self.paddle.pos.x.clamp(BALL_RADIUS + 2.0, FIELD.width - BALL_RADIUS - 2.0),
            PADDLE_Y - BALL_RADIUS - 2.0,
        )
    }

    fn spawn_ball(&mut self, pos: Vec2, vel: Vec2, stuck: bool) -> Option<EntityId> {
        self.world.spawn(
            Kind::Ball,
            Spawn::new(pos, vel, Shape::Circle { radius: BALL_RADIUS }, Body::Ball { stuck }),
        )
    }

    fn serve_stuck_ball(&mut self) {
        self.world.clear_category(Kind::Ball);
        let rest = self.rest_point();
        self.spawn_ball(rest, Vec2::ZERO, true);
    }

    fn launch(&mut self, rng: &mut Pcg32) {
        let speed = self.base_speed;
        if let Some(ball) = self.world.of_mut(Kind::Ball).find(|b| b.data.is_stuck()) {
            let angle = rng.random_range(-0.65 * PI..-0.35 * PI);
            ball.vel = heading(angle) * speed;
            ball.data = Body::Ball { stuck: false };
        }
    }

    fn move_paddle(&mut self, ctx: &TickCtx<'_>) {
        let half = self.paddle_w / 2.0;
        let x = self.paddle.pos.x + ctx.input.axis_x() * PADDLE_SPEED * ctx.dt_secs();
        self.paddle.pos.x = x.clamp(
            PADDLE_MARGIN + half,
            (FIELD.width - PADDLE_MARGIN - half).max(PADDLE_MARGIN + half),
        );
    }

    /// Walls, floor and paddle for every ball; returns balls that fell out
    fn bounce_balls(&mut self) -> Vec<EntityId> {
        let paddle = self.paddle_rect();
        let paddle_x = self.paddle.pos.x;
        let half = self.paddle_w / 2.0;
        let rest = self.rest_point();
        let mut fallen = Vec::new();

        for ball in self.world.of_mut(Kind::Ball) {
            if ball.data.is_stuck() {
                ball.pos = rest;
                continue;
            }
            let r = BALL_RADIUS;
            if ball.pos.x - r <= 0.0 {
                ball.pos.x = r;
                ball.vel.x = ball.vel.x.abs();
            }
            if ball.pos.x + r >= FIELD.width {
                ball.pos.x = FIELD.width - r;
                ball.vel.x = -ball.vel.x.abs();
            }
            if ball.pos.y - r <= 0.0 {
                ball.pos.y = r;
                ball.vel.y = ball.vel.y.abs();
            }
            if ball.pos.y - r > FIELD.height {
                fallen.push(ball.id);
                continue;
            }
            if ball.vel.y > 0.0 && circle_rect_overlap(ball.pos, r, &paddle) {
                ball.pos.y = PADDLE_Y - r - 0.5;
                let hit = ((ball.pos.x - paddle_x) / half).clamp(-1.0, 1.0);
                let angle = -FRAC_PI_2 + hit * (MAX_DEFLECT / 2.0);
                let speed = ball.vel.length().max(BALL_SPEED_BASE * 0.85) * 1.02;
                ball.vel = heading(angle) * speed;
            }
        }
        fallen
    }

    /// Extra balls fanned out around a live one
    fn multiball(&mut self) {
        let current = self.ball_count();
        if current >= MAX_BALLS {
            return;
        }
        let source = self
            .world
            .of(Kind::Ball)
            .find(|b| !b.data.is_stuck())
            .or_else(|| self.world.of(Kind::Ball).next())
            .map(|b| (b.pos, b.vel));
        let Some((pos, vel)) = source else {
            return;
        };
        let dir = vel.y.atan2(vel.x);
        let speed = vel.length().max(BALL_SPEED_BASE);
        let angles = if MAX_BALLS - current >= 2 {
            vec![dir - MULTIBALL_SPREAD, dir + MULTIBALL_SPREAD]
        } else {
            vec![dir + MULTIBALL_SPREAD]
        };
        for angle in angles {
            self.spawn_ball(pos, heading(angle) * speed, false);
        }
    }

    #[cfg(test)]
    fn free_ball(&mut self, pos: Vec2, vel: Vec2) {
        if let Some(ball) = self.world.of_mut(Kind::Ball).next() {
            ball.pos = pos;
            ball.vel = vel;
            ball.data = Body::Ball { stuck: false };
        }
    }
}

/// Flip the axis of least penetration
fn reflect_off(pos: Vec2, vel: &mut Vec2, brick: &Aabb) {
    let r = BALL_RADIUS;
    let overlap_x = if pos.x < brick.min.x {
        pos.x + r - brick.min.x
    } else {
        brick.max.x - (pos.x - r)
    };
    let overlap_y = if pos.y < brick.min.y {
        pos.y + r - brick.min.y
    } else {
        brick.max.y - (pos.y - r)
    };
    if overlap_x.abs() < overlap_y.abs() {
        vel.x = -vel.x;
    } else {
        vel.y = -vel.y;
    }
}

impl Game for Breakout {
    type View = BreakoutView;

    fn name(&self) -> &'static str {
        "breakout"
    }

    fn default_difficulty(&self) -> Box<dyn Difficulty> {
        Box::new(LinearCurve::breakout())
    }

    fn new_round(&mut self, _rng: &mut Pcg32) {
        self.world.clear();
        self.paddle = Actor::new(Vec2::new(FIELD.width / 2.0, PADDLE_Y + PADDLE_H / 2.0));
    }

    fn start_level(&mut self, params: &LevelParams, _rng: &mut Pcg32) {
        self.paddle_w = PADDLE_W_BASE * params.size_scale;
        self.paddle.pos.x = FIELD.width / 2.0;
        self.base_speed = BALL_SPEED_BASE * params.speed_scale;
        self.cleared = 0;
        self.world.clear();
        self.build_bricks(params.population);
        self.serve_stuck_ball();
        log::debug!(
            "breakout: {} bricks, paddle {:.0}px",
            self.brick_count(),
            self.paddle_w
        );
    }

    fn tick(&mut self, ctx: &mut TickCtx<'_>) {
        self.move_paddle(ctx);
        if ctx.input.fire {
            self.launch(ctx.rng);
        }
        self.world.advance(ctx.dt_ms, &FIELD);

        for id in self.bounce_balls() {
            ctx.events.destroy(id);
        }

        let mut drops = Vec::new();
        for hit in first_contacts(&self.world, Kind::Ball, Kind::Brick) {
            if ctx.events.is_removed(hit.a) {
                continue;
            }
            let Some(brick) = self.world.get(hit.b) else {
                continue;
            };
            let rect = Aabb::from_center(brick.pos, brick.shape.half_extent());
            if !ctx.events.destroy_scored(hit.b, BRICK_POINTS) {
                continue;
            }
            self.cleared += 1;
            let speed = self.base_speed + (10.0 + self.cleared as f32 * 0.25).min(120.0);
            if let Some(ball) = self.world.get_mut(hit.a) {
                let pos = ball.pos;
                reflect_off(pos, &mut ball.vel, &rect);
                ball.vel = with_speed(ball.vel, speed);
            }
            if ctx.rng.random_bool(CAPSULE_CHANCE) {
                drops.push(rect.center());
            }
        }

        let paddle = self.paddle_rect();
        let caught: Vec<EntityId> = self
            .world
            .of(Kind::Capsule)
            .filter(|c| rects_overlap(&Aabb::from_center(c.pos, c.shape.half_extent()), &paddle))
            .map(|c| c.id)
            .collect();
        for &id in &caught {
            ctx.events.destroy(id);
        }

        ctx.events.apply_removals(&mut self.world);

        for _ in &caught {
            self.multiball();
        }
        for pos in drops {
            self.world.spawn(
                Kind::Capsule,
                Spawn::new(
                    pos,
                    Vec2::new(0.0, CAPSULE_SPEED),
                    Shape::rect(CAPSULE_SIZE.x, CAPSULE_SIZE.y),
                    Body::Capsule,
                ),
            );
        }

        if self.ball_count() == 0 {
            ctx.events.lose_life();
        }
        if self.brick_count() == 0 {
            ctx.events.level_clear();
        }
    }

    /// The paddle stays put; a fresh ball sits on it
    fn respawn(&mut self, _rng: &mut Pcg32) {
        self.serve_stuck_ball();
    }

    fn actor(&self) -> Option<&Actor> {
        Some(&self.paddle)
    }

    fn actor_mut(&mut self) -> Option<&mut Actor> {
        Some(&mut self.paddle)
    }

    fn respawn_invuln_ms(&self) -> Option<f64> {
        Some(0.0)
    }

    fn is_consistent(&self) -> bool {
        self.paddle.pos.is_finite() && self.world.iter().all(|e| e.pos.is_finite() && e.vel.is_finite())
    }

    fn view(&self) -> BreakoutView {
        let rect = |pos: Vec2, shape: Shape| Aabb::from_center(pos, shape.half_extent());
        BreakoutView {
            paddle: self.paddle_rect(),
            balls: self
                .world
                .of(Kind::Ball)
                .map(|b| BallView {
                    pos: b.pos,
                    vel: b.vel,
                    stuck: b.data.is_stuck(),
                })
                .collect(),
            bricks: self
                .world
                .of(Kind::Brick)
                .filter_map(|b| match b.data {
                    Body::Brick { row } => Some((rect(b.pos, b.shape), row)),
                    _ => None,
                })
                .collect(),
            capsules: self
                .world
                .of(Kind::Capsule)
                .map(|c| rect(c.pos, c.shape))
                .collect(),
        }
    }
}
