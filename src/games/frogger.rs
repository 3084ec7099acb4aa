//! Frogger: hop across traffic and ride logs home
//!
//! The frog moves in whole tiles. Cars and logs are lane-confined entities
//! spawned by a per-lane [`Cadence`].

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::sim::{
    contacts_with, Aabb, Actor, Cadence, Category, Direction, EdgePolicy, EntityStore, Game,
    Motion, Playfield, Shape, Spawn, TickCtx,
};
use crate::tuning::{Difficulty, LevelParams, LinearCurve};

pub const TILE: f32 = 36.0;
pub const COLS: i32 = 20;
pub const ROWS: i32 = 15;
pub const FIELD: Playfield = Playfield::new(COLS as f32 * TILE, ROWS as f32 * TILE);

const ROW_HOME: i32 = 1;
const RIVER_FROM: i32 = 2;
const RIVER_TO: i32 = 6;
const ROAD_FROM: i32 = 8;
const ROAD_TO: i32 = 12;
const ROW_START: i32 = 14;

const FROG_SIZE: f32 = 26.0;
const HOME_COLS: [i32; 5] = [2, 6, 10, 14, 18];

const HOP_POINTS: u32 = 1;
const HOME_POINTS: u32 = 50;
const LEVEL_BONUS: u32 = 100;

const ROAD_SPEEDS: [f32; 5] = [120.0, 160.0, 100.0, 180.0, 140.0];
const RIVER_SPEEDS: [f32; 5] = [80.0, 120.0, 90.0, 110.0, 70.0];
/// Extra px/s per unit of difficulty speed scale above 1.0
const ROAD_RAMP: f32 = 100.0;
const RIVER_RAMP: f32 = 80.0;
const TRUCK_CHANCE: f64 = 0.35;
/// How far past the far edge an item travels before it is culled
const CULL_MARGIN: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Car,
    Log,
}

impl Category for Kind {
    fn cap(self) -> Option<usize> {
        None
    }

    fn motion(self) -> Motion {
        Motion::Lane
    }

    /// Items enter from outside the field, so edges are culled by the rules
    fn edge(self) -> EdgePolicy {
        EdgePolicy::Ignore
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Surface {
    Road,
    River,
}

#[derive(Debug, Clone)]
struct Lane {
    row: i32,
    surface: Surface,
    dir: f32,
    speed: f32,
    spawn: Cadence,
}

impl Lane {
    fn center_y(&self) -> f32 {
        row_center(self.row)
    }
}

fn row_center(row: i32) -> f32 {
    row as f32 * TILE + TILE / 2.0
}

fn col_center(col: i32) -> f32 {
    col as f32 * TILE + TILE / 2.0
}

#[derive(Debug, Clone, Serialize)]
pub struct FroggerView {
    pub frog: (i32, i32),
    /// Car boxes, flagged when the car is a truck
    pub cars: Vec<(Aabb, bool)>,
    pub logs: Vec<Aabb>,
    pub homes: [bool; 5],
}

pub struct Frogger {
    frog: Actor,
    cell: (i32, i32),
    lanes: Vec<Lane>,
    /// Payload marks trucks
    traffic: EntityStore<Kind, bool>,
    homes: [bool; 5],
}

impl Default for Frogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Frogger {
    pub fn new() -> Self {
        let start = (COLS / 2, ROW_START);
        Self {
            frog: Actor::new(Vec2::new(col_center(start.0), row_center(start.1))),
            cell: start,
            lanes: Vec::new(),
            traffic: EntityStore::new(),
            homes: [false; 5],
        }
    }

    pub fn cell(&self) -> (i32, i32) {
        self.cell
    }

    pub fn homes(&self) -> [bool; 5] {
        self.homes
    }

    fn place_frog(&mut self) {
        self.cell = (COLS / 2, ROW_START);
        self.frog.respawn();
    }

    fn build_lanes(&mut self, params: &LevelParams) {
        let ramp = params.speed_scale - 1.0;
        let scale = params.spawn_interval_ms / 1000.0;
        self.lanes.clear();
        for (i, &base) in ROAD_SPEEDS.iter().enumerate() {
            self.lanes.push(Lane {
                row: ROAD_FROM + i as i32,
                surface: Surface::Road,
                dir: if i % 2 == 0 { 1.0 } else { -1.0 },
                speed: base + ramp * ROAD_RAMP,
                spawn: Cadence::new((1200.0 - 80.0 * i as f64) * scale),
            });
        }
        for (i, &base) in RIVER_SPEEDS.iter().enumerate() {
            self.lanes.push(Lane {
                row: RIVER_FROM + i as i32,
                surface: Surface::River,
                dir: if i % 2 == 0 { -1.0 } else { 1.0 },
                speed: base + ramp * RIVER_RAMP,
                spawn: Cadence::new((1300.0 - 60.0 * i as f64) * scale),
            });
        }
    }

    fn spawn_item(&mut self, lane: usize, rng: &mut Pcg32) {
        let Some(lane) = self.lanes.get(lane).cloned() else {
            return;
        };
        let (kind, w, h, truck) = match lane.surface {
            Surface::Road => {
                let truck = rng.random_bool(TRUCK_CHANCE);
                let w = if truck { TILE * 2.2 } else { TILE * 1.2 };
                (Kind::Car, w, TILE * 0.8, truck)
            }
            Surface::River => (Kind::Log, TILE * rng.random_range(2.0..3.6), TILE * 0.7, false),
        };
        // Just outside the entry edge
        let x = if lane.dir > 0.0 {
            -w / 2.0 - 2.0
        } else {
            FIELD.width + 2.0 + w / 2.0
        };
        self.traffic.spawn(
            kind,
            Spawn::new(
                Vec2::new(x, lane.center_y()),
                Vec2::new(lane.dir * lane.speed, 0.0),
                Shape::rect(w, h),
                truck,
            ),
        );
    }

    /// One tile hop; upward hops score
    fn hop(&mut self, dir: Direction, ctx: &mut TickCtx<'_>) {
        let (dx, dy) = dir.delta();
        let col = (self.cell.0 + dx).clamp(0, COLS - 1);
        let row = (self.cell.1 + dy).clamp(0, ROWS - 1);
        if (col, row) == self.cell {
            return;
        }
        self.cell = (col, row);
        self.frog.pos = Vec2::new(col_center(col), row_center(row));
        if dy < 0 {
            ctx.events.score(HOP_POINTS);
        }
    }

    fn frog_shape() -> Shape {
        Shape::rect(FROG_SIZE, FROG_SIZE)
    }

    /// Road, river and home rules for the frog's current row
    fn check_frog(&mut self, ctx: &mut TickCtx<'_>) {
        let row = self.cell.1;
        if (ROAD_FROM..=ROAD_TO).contains(&row) {
            if contacts_with(&self.traffic, Kind::Car, self.frog.pos, Self::frog_shape()).is_some()
                && !ctx.invulnerable
            {
                ctx.events.lose_life();
            }
        } else if (RIVER_FROM..=RIVER_TO).contains(&row) {
            let log = contacts_with(&self.traffic, Kind::Log, self.frog.pos, Self::frog_shape())
                .and_then(|id| self.traffic.get(id))
                .map(|log| log.vel.x);
            match log {
                Some(vx) => {
                    self.frog.pos.x += vx * ctx.dt_secs();
                    self.cell.0 = ((self.frog.pos.x - TILE / 2.0) / TILE).round() as i32;
                    if (self.frog.pos.x < 0.0 || self.frog.pos.x > FIELD.width) && !ctx.invulnerable {
                        ctx.events.lose_life();
                    }
                }
                None if !ctx.invulnerable => {
                    ctx.events.lose_life();
                }
                None => {}
            }
        } else if row == ROW_HOME {
            let x = self.frog.pos.x;
            let bay = HOME_COLS
                .iter()
                .enumerate()
                .position(|(i, &c)| !self.homes[i] && (col_center(c) - x).abs() <= TILE);
            match bay {
                Some(i) => {
                    self.homes[i] = true;
                    ctx.events.score(HOME_POINTS);
                    if self.homes.iter().all(|&h| h) {
                        ctx.events.score(LEVEL_BONUS);
                        ctx.events.level_clear();
                    }
                    self.place_frog();
                }
                None if !ctx.invulnerable => {
                    ctx.events.lose_life();
                }
                None => {}
            }
        }
    }

    #[cfg(test)]
    fn place_at(&mut self, col: i32, row: i32) {
        self.cell = (col, row);
        self.frog.pos = Vec2::new(col_center(col), row_center(row));
    }

    #[cfg(test)]
    fn put_item(&mut self, kind: Kind, pos: Vec2, vx: f32, w: f32) {
        self.traffic
            .spawn(kind, Spawn::new(pos, Vec2::new(vx, 0.0), Shape::rect(w, TILE * 0.7), false));
    }
}

impl Game for Frogger {
    type View = FroggerView;

    fn name(&self) -> &'static str {
        "frogger"
    }

    fn default_difficulty(&self) -> Box<dyn Difficulty> {
        Box::new(LinearCurve::frogger())
    }

    fn new_round(&mut self, _rng: &mut Pcg32) {
        self.traffic.clear();
        self.place_frog();
    }

    fn start_level(&mut self, params: &LevelParams, _rng: &mut Pcg32) {
        self.build_lanes(params);
        self.traffic.clear();
        self.homes = [false; 5];
        self.place_frog();
    }

    fn tick(&mut self, ctx: &mut TickCtx<'_>) {
        if let Some(dir) = ctx.input.pressed {
            self.hop(dir, ctx);
        }

        for i in 0..self.lanes.len() {
            for _ in 0..self.lanes[i].spawn.tick(ctx.dt_ms) {
                self.spawn_item(i, ctx.rng);
            }
        }
        self.traffic.advance(ctx.dt_ms, &FIELD);
        for item in self.traffic.iter() {
            let half = item.shape.half_extent().x;
            let left = item.pos.x - half;
            let gone = if item.vel.x > 0.0 {
                left > FIELD.width + half * 2.0 + CULL_MARGIN
            } else {
                left < -half * 2.0 - CULL_MARGIN
            };
            if gone {
                ctx.events.destroy(item.id);
            }
        }

        self.check_frog(ctx);
        ctx.events.apply_removals(&mut self.traffic);
    }

    fn respawn(&mut self, _rng: &mut Pcg32) {
        self.place_frog();
    }

    fn actor(&self) -> Option<&Actor> {
        Some(&self.frog)
    }

    fn actor_mut(&mut self) -> Option<&mut Actor> {
        Some(&mut self.frog)
    }

    /// Hazards are tile-aligned; a fresh frog is never inside one
    fn respawn_invuln_ms(&self) -> Option<f64> {
        Some(0.0)
    }

    fn is_consistent(&self) -> bool {
        self.frog.pos.is_finite() && self.traffic.iter().all(|e| e.pos.is_finite())
    }

    fn view(&self) -> FroggerView {
        let rect = |pos: Vec2, shape: Shape| Aabb::from_center(pos, shape.half_extent());
        FroggerView {
            frog: self.cell,
            cars: self
                .traffic
                .of(Kind::Car)
                .map(|c| (rect(c.pos, c.shape), c.data))
                .collect(),
            logs: self
                .traffic
                .of(Kind::Log)
                .map(|l| rect(l.pos, l.shape))
                .collect(),
            homes: self.homes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::testing::Harness;
    use crate::sim::{Event, TickInput};

    fn press(dir: Direction) -> TickInput {
        TickInput {
            pressed: Some(dir),
            ..TickInput::default()
        }
    }

    #[test]
    fn test_hops_score_only_upward() {
        let mut game = Frogger::new();
        let mut h = Harness::start(&mut game);
        assert_eq!(game.cell(), (10, 14));

        let events = h.step(&mut game, press(Direction::Down));
        assert!(events.is_empty());
        assert_eq!(game.cell(), (10, 14));

        let events = h.step(&mut game, press(Direction::Up));
        assert_eq!(events, vec![Event::Score(HOP_POINTS)]);
        assert_eq!(game.cell(), (10, 13));

        let events = h.step(&mut game, press(Direction::Left));
        assert!(events.is_empty());
        assert_eq!(game.cell(), (9, 13));
    }

    #[test]
    fn test_lanes_spawn_on_their_cadence() {
        let mut game = Frogger::new();
        let mut h = Harness::start(&mut game);
        h.idle(&mut game, 143);
        assert_eq!(game.traffic.count(Kind::Car), 4);
        h.idle(&mut game, 1);
        assert_eq!(game.traffic.count(Kind::Car), 5);
    }

    #[test]
    fn test_car_costs_life() {
        let mut game = Frogger::new();
        let mut h = Harness::start(&mut game);
        game.place_at(10, 9);
        let at = game.frog.pos;
        game.put_item(Kind::Car, at, 0.0, TILE);
        let events = h.step(&mut game, TickInput::default());
        assert!(events.contains(&Event::LoseLife));
    }

    #[test]
    fn test_open_water_costs_life() {
        let mut game = Frogger::new();
        let mut h = Harness::start(&mut game);
        game.place_at(10, 4);
        let events = h.step(&mut game, TickInput::default());
        assert!(events.contains(&Event::LoseLife));
    }

    #[test]
    fn test_frog_rides_log() {
        let mut game = Frogger::new();
        let mut h = Harness::start(&mut game);
        game.place_at(10, 4);
        let x0 = game.frog.pos.x;
        let at = game.frog.pos;
        game.put_item(Kind::Log, at, 120.0, TILE * 3.0);
        let events = h.idle(&mut game, 12);
        assert!(!events.contains(&Event::LoseLife));
        assert!((game.frog.pos.x - (x0 + 12.0)).abs() < 0.1);
    }

    #[test]
    fn test_carried_off_screen() {
        let mut game = Frogger::new();
        let mut h = Harness::start(&mut game);
        game.place_at(19, 4);
        game.frog.pos.x = FIELD.width - 0.1;
        let at = game.frog.pos;
        game.put_item(Kind::Log, at, 70.0, TILE * 3.0);
        let events = h.step(&mut game, TickInput::default());
        assert!(events.contains(&Event::LoseLife));
    }

    #[test]
    fn test_home_bay_scores_and_resets_frog() {
        let mut game = Frogger::new();
        let mut h = Harness::start(&mut game);
        game.place_at(HOME_COLS[0], ROW_HOME);
        let events = h.step(&mut game, TickInput::default());
        assert!(events.contains(&Event::Score(HOME_POINTS)));
        assert_eq!(game.homes(), [true, false, false, false, false]);
        assert_eq!(game.cell(), (10, ROW_START));
    }

    #[test]
    fn test_between_bays_costs_life() {
        let mut game = Frogger::new();
        let mut h = Harness::start(&mut game);
        game.place_at(4, ROW_HOME);
        let events = h.step(&mut game, TickInput::default());
        assert!(events.contains(&Event::LoseLife));
        assert_eq!(game.homes(), [false; 5]);
    }

    #[test]
    fn test_all_bays_clear_level() {
        let mut game = Frogger::new();
        let mut h = Harness::start(&mut game);
        let mut events = Vec::new();
        for col in HOME_COLS {
            game.place_at(col, ROW_HOME);
            events.extend(h.step(&mut game, TickInput::default()));
        }
        assert!(events.contains(&Event::Score(LEVEL_BONUS)));
        assert!(events.contains(&Event::LevelClear));
    }

    #[test]
    fn test_lane_speeds_ramp_with_level() {
        let mut game = Frogger::new();
        let params = LinearCurve::frogger().params(3);
        game.build_lanes(&params);
        assert!((game.lanes[0].speed - 140.0).abs() < 1e-3);
        assert!((game.lanes[5].speed - 96.0).abs() < 1e-3);
    }
}
