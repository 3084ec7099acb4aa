//! Snake on a 24x24 grid
//!
//! The body moves one cell per step of a [`Cadence`]; every fourth food
//! shortens the step by 1.15x. Walls and the body itself end the round.

use std::collections::VecDeque;

use rand::Rng;
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::sim::{Cadence, Direction, Game, Grid, TickCtx};
use crate::tuning::{Difficulty, LevelParams, LinearCurve};

pub const GRID: i32 = 24;
const START_LEN: i32 = 4;
const FOOD_POINTS: u32 = 10;
const SPEEDUP_FOOD: u32 = 4;
const SPEED_FACTOR: f64 = 1.15;

pub type Cell = (i32, i32);

#[derive(Debug, Clone, Serialize)]
pub struct SnakeView {
    /// Head first
    pub body: Vec<Cell>,
    pub food: Option<Cell>,
    pub dir: Direction,
    /// Current speed relative to the level's base step
    pub speed: f64,
}

pub struct Snake {
    body: VecDeque<Cell>,
    occupied: Grid<()>,
    dir: Direction,
    next_dir: Direction,
    food: Option<Cell>,
    eaten: u32,
    speed_stage: u32,
    step: Cadence,
}

impl Default for Snake {
    fn default() -> Self {
        Self::new()
    }
}

impl Snake {
    pub fn new() -> Self {
        Self {
            body: VecDeque::new(),
            occupied: Grid::new(GRID as usize, GRID as usize),
            dir: Direction::Right,
            next_dir: Direction::Right,
            food: None,
            eaten: 0,
            speed_stage: 0,
            step: Cadence::new(1000.0 / 8.0),
        }
    }

    pub fn head(&self) -> Option<Cell> {
        self.body.front().copied()
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn step_ms(&self) -> f64 {
        self.step.interval_ms()
    }

    /// Buffer a turn; reversing onto the neck is ignored
    fn steer(&mut self, dir: Direction) {
        if dir != self.dir.opposite() {
            self.next_dir = dir;
        }
    }

    fn spawn_food(&mut self, rng: &mut Pcg32) -> Option<Cell> {
        let free: Vec<Cell> = (0..GRID)
            .flat_map(|y| (0..GRID).map(move |x| (x, y)))
            .filter(|&(x, y)| !self.occupied.is_occupied(x, y))
            .collect();
        if free.is_empty() {
            return None;
        }
        Some(free[rng.random_range(0..free.len())])
    }

    /// Move one cell; returns false when the snake dies
    fn advance(&mut self, ctx: &mut TickCtx<'_>) -> bool {
        self.dir = self.next_dir;
        let Some((hx, hy)) = self.head() else {
            return false;
        };
        let (dx, dy) = self.dir.delta();
        let head = (hx + dx, hy + dy);

        if !self.occupied.in_bounds(head.0, head.1) || self.occupied.is_occupied(head.0, head.1) {
            log::debug!("snake died at {:?}", head);
            return false;
        }

        self.body.push_front(head);
        self.occupied.set(head.0, head.1, ());

        if self.food == Some(head) {
            ctx.events.score(FOOD_POINTS);
            self.eaten += 1;
            if self.eaten % SPEEDUP_FOOD == 0 {
                self.speed_stage += 1;
                self.step.set_interval(self.step.interval_ms() / SPEED_FACTOR);
            }
            self.food = self.spawn_food(ctx.rng);
            if self.food.is_none() {
                ctx.events.level_clear();
            }
        } else if let Some((tx, ty)) = self.body.pop_back() {
            self.occupied.take(tx, ty);
        }
        true
    }

    #[cfg(test)]
    fn place_food(&mut self, cell: Cell) {
        self.food = Some(cell);
    }
}

impl Game for Snake {
    type View = SnakeView;

    fn name(&self) -> &'static str {
        "snake"
    }

    fn default_difficulty(&self) -> Box<dyn Difficulty> {
        Box::new(LinearCurve::snake())
    }

    fn new_round(&mut self, _rng: &mut Pcg32) {
        self.eaten = 0;
        self.speed_stage = 0;
    }

    fn start_level(&mut self, params: &LevelParams, rng: &mut Pcg32) {
        let center = GRID / 2;
        self.body = (0..START_LEN).map(|i| (center - i, center)).collect();
        self.occupied.clear();
        for &(x, y) in &self.body {
            self.occupied.set(x, y, ());
        }
        self.dir = Direction::Right;
        self.next_dir = Direction::Right;
        self.speed_stage = 0;
        self.step = Cadence::new(params.spawn_interval_ms);
        self.food = self.spawn_food(rng);
    }

    fn tick(&mut self, ctx: &mut TickCtx<'_>) {
        if let Some(dir) = ctx.input.pressed {
            self.steer(dir);
        }
        for _ in 0..self.step.tick(ctx.dt_ms) {
            if !self.advance(ctx) {
                ctx.events.lost();
                return;
            }
        }
    }

    fn view(&self) -> SnakeView {
        SnakeView {
            body: self.body.iter().copied().collect(),
            food: self.food,
            dir: self.dir,
            speed: SPEED_FACTOR.powi(self.speed_stage as i32),
        }
    }
}
