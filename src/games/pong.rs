//! Two-player Pong
//!
//! Player 1 (left) steers with the up/down pair. Player 2 (right) steers with
//! the left/right pair, left moving the paddle up. The round score follows
//! player 1; the match ends when either side reaches [`WIN_SCORE`].

use std::f32::consts::PI;

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::sim::{
    first_contacts, Aabb, Category, EdgePolicy, EntityId, EntityStore, Game, Motion, Playfield,
    Shape, Spawn, TickCtx,
};
use crate::tuning::{Difficulty, LevelParams, LinearCurve};

pub const FIELD: Playfield = Playfield::new(800.0, 500.0);
pub const WIN_SCORE: u32 = 11;

const PADDLE_W: f32 = 10.0;
const PADDLE_H: f32 = 90.0;
const PADDLE_SPEED: f32 = 360.0;
/// Paddle inset from the side walls
const MARGIN: f32 = 0.03 * 800.0;
const BALL: f32 = 8.0;
const BASE_SPEED: f32 = 256.0;
const MAX_SPEED: f32 = 760.0;
const SPEED_UP: f32 = 1.045;
const MAX_DEFLECT: f32 = PI / 3.0;
const SERVE_SPREAD: f32 = PI / 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Ball,
    Paddle,
}

impl Category for Kind {
    fn cap(self) -> Option<usize> {
        match self {
            Kind::Ball => Some(1),
            Kind::Paddle => Some(2),
        }
    }

    /// Paddles are steered directly from input
    fn motion(self) -> Motion {
        match self {
            Kind::Ball => Motion::Free,
            Kind::Paddle => Motion::Static,
        }
    }

    /// The ball bounces off the long walls and scores past the short ones
    fn edge(self) -> EdgePolicy {
        EdgePolicy::Ignore
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Horizontal direction a ball leaves this paddle in
    fn facing(self) -> f32 {
        match self {
            Side::Left => 1.0,
            Side::Right => -1.0,
        }
    }

    fn home_x(self) -> f32 {
        match self {
            Side::Left => MARGIN + PADDLE_W / 2.0,
            Side::Right => FIELD.width - MARGIN - PADDLE_W / 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Body {
    /// Current speed, kept apart from `vel` so deflections keep the ramp
    Ball { speed: f32 },
    Paddle(Side),
}

#[derive(Debug, Clone, Serialize)]
pub struct PongView {
    pub left: Aabb,
    pub right: Aabb,
    pub ball: Option<Aabb>,
    pub scores: [u32; 2],
    /// Ball speed relative to the serve speed
    pub speed_ratio: f32,
}

pub struct Pong {
    world: EntityStore<Kind, Body>,
    serve_speed: f32,
    scores: [u32; 2],
}

impl Default for Pong {
    fn default() -> Self {
        Self::new()
    }
}

impl Pong {
    pub fn new() -> Self {
        let mut world = EntityStore::new();
        for side in [Side::Left, Side::Right] {
            world.spawn(
                Kind::Paddle,
                Spawn::new(
                    Vec2::new(side.home_x(), FIELD.height / 2.0),
                    Vec2::ZERO,
                    Shape::rect(PADDLE_W, PADDLE_H),
                    Body::Paddle(side),
                ),
            );
        }
        Self {
            world,
            serve_speed: BASE_SPEED,
            scores: [0, 0],
        }
    }

    pub fn scores(&self) -> [u32; 2] {
        self.scores
    }

    fn paddle(&self, side: Side) -> Aabb {
        let center = self
            .world
            .of(Kind::Paddle)
            .find(|p| p.data == Body::Paddle(side))
            .map(|p| p.pos)
            .unwrap_or(Vec2::new(side.home_x(), FIELD.height / 2.0));
        Aabb::from_center(center, Vec2::new(PADDLE_W / 2.0, PADDLE_H / 2.0))
    }

    /// Center serve within ±30° of horizontal
    fn serve(&mut self, to_right: bool, rng: &mut Pcg32) {
        let angle = rng.random_range(-SERVE_SPREAD..SERVE_SPREAD);
        let dir = if to_right { 1.0 } else { -1.0 };
        self.world.clear_category(Kind::Ball);
        self.world.spawn(
            Kind::Ball,
            Spawn::new(
                FIELD.center(),
                Vec2::new(angle.cos() * dir, angle.sin()) * self.serve_speed,
                Shape::rect(BALL, BALL),
                Body::Ball {
                    speed: self.serve_speed,
                },
            ),
        );
    }

    fn steer(&mut self, left: f32, right: f32, dt: f32) {
        let half = PADDLE_H / 2.0;
        for paddle in self.world.of_mut(Kind::Paddle) {
            let axis = match paddle.data {
                Body::Paddle(Side::Left) => left,
                _ => right,
            };
            paddle.pos.y = (paddle.pos.y + axis * PADDLE_SPEED * dt).clamp(half, FIELD.height - half);
        }
    }

    fn bounce_walls(&mut self) {
        let half = BALL / 2.0;
        for ball in self.world.of_mut(Kind::Ball) {
            if ball.pos.y - half <= 0.0 {
                ball.pos.y = half;
                ball.vel.y = ball.vel.y.abs();
            }
            if ball.pos.y + half >= FIELD.height {
                ball.pos.y = FIELD.height - half;
                ball.vel.y = -ball.vel.y.abs();
            }
        }
    }

    /// Outgoing angle follows where the ball met the paddle
    fn deflect(&mut self, ball: EntityId, paddle: EntityId) {
        let Some((center, Body::Paddle(side))) = self.world.get(paddle).map(|p| (p.pos, p.data))
        else {
            return;
        };
        let Some(ball) = self.world.get_mut(ball) else {
            return;
        };
        let Body::Ball { speed } = ball.data else {
            return;
        };
        let dir = side.facing();
        // Already on its way out
        if ball.vel.x * dir > 0.0 {
            return;
        }
        let rel = ((ball.pos.y - center.y) / (PADDLE_H / 2.0)).clamp(-1.0, 1.0);
        let angle = rel * MAX_DEFLECT;
        let speed = (speed * SPEED_UP).min(MAX_SPEED);
        ball.pos.x = center.x + dir * (PADDLE_W + BALL) / 2.0;
        ball.vel = Vec2::new(angle.cos() * dir, angle.sin()) * speed;
        ball.data = Body::Ball { speed };
    }

    /// Side that won the point, if the ball left the field
    fn point_for(&self) -> Option<(EntityId, Side)> {
        self.world.of(Kind::Ball).find_map(|ball| {
            if ball.pos.x + BALL / 2.0 < 0.0 {
                Some((ball.id, Side::Right))
            } else if ball.pos.x - BALL / 2.0 > FIELD.width {
                Some((ball.id, Side::Left))
            } else {
                None
            }
        })
    }

    fn ball_speed(&self) -> Option<f32> {
        self.world.of(Kind::Ball).find_map(|b| match b.data {
            Body::Ball { speed } => Some(speed),
            Body::Paddle(_) => None,
        })
    }

    #[cfg(test)]
    fn place_ball(&mut self, pos: Vec2, vel: Vec2) {
        self.world.clear_category(Kind::Ball);
        self.world.spawn(
            Kind::Ball,
            Spawn::new(
                pos,
                vel,
                Shape::rect(BALL, BALL),
                Body::Ball {
                    speed: vel.length(),
                },
            ),
        );
    }
}

impl Game for Pong {
    type View = PongView;

    fn name(&self) -> &'static str {
        "pong"
    }

    fn default_difficulty(&self) -> Box<dyn Difficulty> {
        Box::new(LinearCurve::pong())
    }

    fn new_round(&mut self, _rng: &mut Pcg32) {
        self.scores = [0, 0];
    }

    fn start_level(&mut self, params: &LevelParams, rng: &mut Pcg32) {
        self.serve_speed = BASE_SPEED * params.speed_scale;
        for paddle in self.world.of_mut(Kind::Paddle) {
            paddle.pos.y = FIELD.height / 2.0;
        }
        let to_right = rng.random_bool(0.5);
        self.serve(to_right, rng);
    }

    fn tick(&mut self, ctx: &mut TickCtx<'_>) {
        self.steer(ctx.input.axis_y(), ctx.input.axis_x(), ctx.dt_secs());
        self.world.advance(ctx.dt_ms, &FIELD);
        self.bounce_walls();

        for contact in first_contacts(&self.world, Kind::Ball, Kind::Paddle) {
            self.deflect(contact.a, contact.b);
        }

        let point = self.point_for();
        match point {
            Some((ball, Side::Left)) => {
                self.scores[0] += 1;
                ctx.events.destroy_scored(ball, 1);
                log::debug!("player 1 scores: {:?}", self.scores);
            }
            Some((ball, Side::Right)) => {
                self.scores[1] += 1;
                ctx.events.destroy(ball);
                log::debug!("player 2 scores: {:?}", self.scores);
            }
            None => {}
        }
        ctx.events.apply_removals(&mut self.world);

        if let Some((_, scorer)) = point {
            self.serve(scorer == Side::Right, ctx.rng);
        }
        if self.scores.iter().any(|&s| s >= WIN_SCORE) {
            ctx.events.lost();
        }
    }

    fn is_consistent(&self) -> bool {
        self.world
            .iter()
            .all(|e| e.pos.is_finite() && e.vel.is_finite())
    }

    fn view(&self) -> PongView {
        PongView {
            left: self.paddle(Side::Left),
            right: self.paddle(Side::Right),
            ball: self
                .world
                .of(Kind::Ball)
                .next()
                .map(|b| Aabb::from_center(b.pos, b.shape.half_extent())),
            scores: self.scores,
            speed_ratio: self.ball_speed().unwrap_or(self.serve_speed) / self.serve_speed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::testing::Harness;
    use crate::sim::{Direction, Event, TickInput};

    /// Position, velocity and tracked speed of the ball
    fn ball(game: &Pong) -> (Vec2, Vec2, f32) {
        let ball = game.world.of(Kind::Ball).next().unwrap();
        let Body::Ball { speed } = ball.data else {
            panic!("ball carries paddle data");
        };
        (ball.pos, ball.vel, speed)
    }

    #[test]
    fn test_serve_from_center_within_spread() {
        let mut game = Pong::new();
        let _h = Harness::start(&mut game);
        let (pos, vel, speed) = ball(&game);
        assert_eq!(pos, FIELD.center());
        assert!((vel.length() - BASE_SPEED).abs() < 1e-3);
        assert_eq!(speed, BASE_SPEED);
        let angle = (vel.y / vel.x.abs()).atan();
        assert!(angle.abs() <= SERVE_SPREAD + 1e-4);
    }

    #[test]
    fn test_paddles_steer_independently_and_clamp() {
        let mut game = Pong::new();
        let mut h = Harness::start(&mut game);
        game.place_ball(FIELD.center(), Vec2::ZERO);
        for _ in 0..200 {
            h.step(&mut game, TickInput::holding(&[Direction::Up, Direction::Right]));
        }
        assert_eq!(game.paddle(Side::Left).min.y, 0.0);
        assert_eq!(game.paddle(Side::Right).max.y, FIELD.height);
    }

    #[test]
    fn test_center_hit_returns_flat_and_faster() {
        let mut game = Pong::new();
        let mut h = Harness::start(&mut game);
        let left = game.paddle(Side::Left);
        game.place_ball(
            Vec2::new(left.max.x + BALL / 2.0 + 1.0, left.center().y),
            Vec2::new(-BASE_SPEED, 0.0),
        );
        h.step(&mut game, TickInput::default());
        let (pos, vel, speed) = ball(&game);
        assert!(vel.x > 0.0);
        assert!(vel.y.abs() < 1e-3);
        assert!((speed - BASE_SPEED * SPEED_UP).abs() < 1e-3);
        assert_eq!(pos.x, left.max.x + BALL / 2.0);
    }

    #[test]
    fn test_edge_hit_deflects_and_speed_caps() {
        let mut game = Pong::new();
        let mut h = Harness::start(&mut game);
        let right = game.paddle(Side::Right);
        game.place_ball(
            Vec2::new(right.min.x - BALL / 2.0 - 1.0, right.max.y),
            Vec2::new(750.0, 0.0),
        );
        h.step(&mut game, TickInput::default());
        let (_, vel, speed) = ball(&game);
        assert!(vel.x < 0.0);
        assert!(vel.y > 0.0);
        assert_eq!(speed, MAX_SPEED);
    }

    #[test]
    fn test_outgoing_ball_is_not_turned_back() {
        let mut game = Pong::new();
        let mut h = Harness::start(&mut game);
        let left = game.paddle(Side::Left);
        game.place_ball(left.center(), Vec2::new(BASE_SPEED, 0.0));
        h.step(&mut game, TickInput::default());
        let (_, vel, speed) = ball(&game);
        assert!(vel.x > 0.0);
        assert_eq!(speed, BASE_SPEED);
    }

    #[test]
    fn test_wall_reflects() {
        let mut game = Pong::new();
        let mut h = Harness::start(&mut game);
        game.place_ball(Vec2::new(400.0, 5.0), Vec2::new(100.0, -200.0));
        h.step(&mut game, TickInput::default());
        let (pos, vel, _) = ball(&game);
        assert!(vel.y > 0.0);
        assert_eq!(pos.y, BALL / 2.0);
    }

    #[test]
    fn test_player_one_point_scores_and_serves_back() {
        let mut game = Pong::new();
        let mut h = Harness::start(&mut game);
        game.place_ball(Vec2::new(805.0, 100.0), Vec2::new(BASE_SPEED, 0.0));
        let events = h.step(&mut game, TickInput::default());
        assert!(events.contains(&Event::Score(1)));
        assert_eq!(game.scores(), [1, 0]);
        assert_eq!(game.world.count(Kind::Ball), 1);
        let (pos, vel, _) = ball(&game);
        assert_eq!(pos, FIELD.center());
        assert!(vel.x < 0.0);
    }

    #[test]
    fn test_player_two_point_is_not_round_score() {
        let mut game = Pong::new();
        let mut h = Harness::start(&mut game);
        game.place_ball(Vec2::new(-5.0, 100.0), Vec2::new(-BASE_SPEED, 0.0));
        let events = h.step(&mut game, TickInput::default());
        assert!(!events.iter().any(|e| matches!(e, Event::Score(_))));
        assert_eq!(game.scores(), [0, 1]);
        assert!(ball(&game).1.x > 0.0);
    }

    #[test]
    fn test_match_point_ends_round() {
        let mut game = Pong::new();
        let mut h = Harness::start(&mut game);
        game.scores = [3, WIN_SCORE - 1];
        game.place_ball(Vec2::new(-5.0, 100.0), Vec2::new(-BASE_SPEED, 0.0));
        let events = h.step(&mut game, TickInput::default());
        assert!(events.contains(&Event::Lost));
    }
}
