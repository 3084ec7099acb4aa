//! Space Invaders: a marching formation, shields and return fire
//!
//! Invaders are static entities repositioned from the formation origin every
//! tick. Shields are cell grids eroded one cell per bullet.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::consts::STEP_MS;
use crate::sim::{
    contacts_with, first_contacts, rects_overlap, Aabb, Actor, Category, Countdown, EdgePolicy,
    EntityStore, Game, Grid, Motion, Playfield, ScheduledEvents, Shape, Spawn, TickCtx,
};
use crate::ticks_for;
use crate::tuning::{Difficulty, LevelParams, LinearCurve};

pub const FIELD: Playfield = Playfield::new(800.0, 600.0);

const PLAYER_W: f32 = 46.0;
const PLAYER_H: f32 = 18.0;
const PLAYER_SPEED: f32 = 360.0;
/// Top edge of the player
const PLAYER_Y: f32 = FIELD.height - 50.0;
const PLAYER_COOLDOWN_MS: f64 = 220.0;
const RESPAWN_INVULN_MS: f64 = 1200.0;

const SHOT_W: f32 = 3.0;
const SHOT_H: f32 = 10.0;
const SHOT_SPEED: f32 = 520.0;
const ENEMY_SHOT_SPEED: f32 = 180.0;

const INV_COLS: u32 = 11;
const INV_ROWS_MAX: u32 = 5;
const INV_W: f32 = 28.0;
const INV_H: f32 = 20.0;
const INV_HSPACING: f32 = 46.0;
const INV_VSPACING: f32 = 36.0;
const ORIGIN: Vec2 = Vec2::new(80.0, 60.0);
/// March speed at level 1 before kills
const MARCH_BASE: f32 = 21.0;
const SPEED_PER_KILL: f32 = 0.6;
const STEP_DOWN: f32 = 8.0;
const STEP_COOLDOWN_MS: f64 = 650.0;
const EDGE_MARGIN: f32 = 10.0;

const FIRE_RATE_BASE: f64 = 1.0 / 5000.0;
const HOLD_FIRE_MS: f64 = 3000.0;

const SHIELDS: usize = 3;
const SHIELD_COLS: usize = 9;
const SHIELD_ROWS: usize = 5;
const SHIELD_CELL: f32 = 8.0;

const ROW_SCORE: [u32; 5] = [40, 30, 20, 20, 10];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Invader,
    Shot,
    EnemyShot,
}

impl Category for Kind {
    fn cap(self) -> Option<usize> {
        match self {
            Kind::Invader => None,
            Kind::Shot => Some(8),
            Kind::EnemyShot => Some(3),
        }
    }

    fn motion(self) -> Motion {
        match self {
            Kind::Invader => Motion::Static,
            Kind::Shot | Kind::EnemyShot => Motion::Free,
        }
    }

    fn edge(self) -> EdgePolicy {
        match self {
            Kind::Invader => EdgePolicy::Ignore,
            Kind::Shot | Kind::EnemyShot => EdgePolicy::Kill,
        }
    }
}

/// Formation slot of an invader (unused for shots)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slot {
    pub row: u32,
    pub col: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cue {
    OpenFire,
}

#[derive(Debug)]
struct Formation {
    origin: Vec2,
    dir: f32,
    bounces: u32,
    edge_lock: bool,
    last_step_ms: f64,
}

impl Formation {
    fn new() -> Self {
        Self {
            origin: ORIGIN,
            dir: 1.0,
            bounces: 0,
            edge_lock: false,
            last_step_ms: 0.0,
        }
    }

    fn slot_center(&self, slot: Slot) -> Vec2 {
        self.origin
            + Vec2::new(
                slot.col as f32 * INV_HSPACING + INV_W / 2.0,
                slot.row as f32 * INV_VSPACING + INV_H / 2.0,
            )
    }
}

#[derive(Debug, Clone)]
struct Shield {
    origin: Vec2,
    cells: Grid<()>,
}

impl Shield {
    fn new(origin: Vec2) -> Self {
        let mut cells = Grid::filled(SHIELD_COLS, SHIELD_ROWS, ());
        for x in 0..SHIELD_COLS as i32 {
            if x < 2 || x > SHIELD_COLS as i32 - 3 {
                cells.take(x, 0);
            }
        }
        cells.take(SHIELD_COLS as i32 / 2, SHIELD_ROWS as i32 - 1);
        Self { origin, cells }
    }

    fn bounds(&self) -> Aabb {
        Aabb::from_corner(
            self.origin.x,
            self.origin.y,
            SHIELD_COLS as f32 * SHIELD_CELL,
            SHIELD_ROWS as f32 * SHIELD_CELL,
        )
    }

    /// Erase the first intact cell under `area`; true if one was hit
    fn erode(&mut self, area: &Aabb) -> bool {
        if !rects_overlap(area, &self.bounds()) {
            return false;
        }
        let (c0, r0, c1, r1) = self.cells.cells_under(self.origin, SHIELD_CELL, area);
        for row in r0..=r1 {
            for col in c0..=c1 {
                if self.cells.take(col, row).is_some() {
                    return true;
                }
            }
        }
        false
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShieldView {
    pub origin: Vec2,
    pub cells: Vec<(i32, i32)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvadersView {
    /// Invader boxes with their row
    pub invaders: Vec<(Aabb, u32)>,
    pub player: Aabb,
    pub shots: Vec<Aabb>,
    pub enemy_shots: Vec<Aabb>,
    pub shields: Vec<ShieldView>,
}

pub struct Invaders {
    /// Player centre
    player: Actor,
    world: EntityStore<Kind, Slot>,
    formation: Formation,
    shields: Vec<Shield>,
    cooldown: Countdown,
    cues: ScheduledEvents<Cue>,
    fire_open: bool,
    /// Time since the level started
    level_ms: f64,
}

impl Default for Invaders {
    fn default() -> Self {
        Self::new()
    }
}

fn shot_box(pos: Vec2) -> Aabb {
    Aabb::from_center(pos, Vec2::new(SHOT_W / 2.0, SHOT_H / 2.0))
}

impl Invaders {
    pub fn new() -> Self {
        Self {
            player: Actor::new(Self::player_spawn()),
            world: EntityStore::new(),
            formation: Formation::new(),
            shields: Vec::new(),
            cooldown: Countdown::default(),
            cues: ScheduledEvents::new(),
            fire_open: false,
            level_ms: 0.0,
        }
    }

    fn player_spawn() -> Vec2 {
        Vec2::new(FIELD.width / 2.0, PLAYER_Y + PLAYER_H / 2.0)
    }

    pub fn player_rect(&self) -> Aabb {
        Aabb::from_center(self.player.pos, Vec2::new(PLAYER_W / 2.0, PLAYER_H / 2.0))
    }

    pub fn invader_count(&self) -> usize {
        self.world.count(Kind::Invader)
    }

    pub fn shield_cells(&self) -> usize {
        self.shields.iter().map(|s| s.cells.occupied_count()).sum()
    }

    /// Formation speed in px/s: faster with every kill and every level
    pub fn march_speed(params: &LevelParams, killed: u32) -> f32 {
        (MARCH_BASE * params.speed_scale + killed as f32 * SPEED_PER_KILL)
            * (1.0 + (params.level.max(1) - 1) as f32 * 0.03)
    }

    /// Box around the live invaders, `None` once they are all dead
    fn formation_bounds(&self) -> Option<Aabb> {
        self.world.of(Kind::Invader).fold(None, |acc, inv| {
            let rect = Aabb::from_center(inv.pos, inv.shape.half_extent());
            Some(match acc {
                None => rect,
                Some(b) => Aabb::new(b.min.min(rect.min), b.max.max(rect.max)),
            })
        })
    }

    fn build_formation(&mut self, rows: u32) {
        for row in 0..rows.min(INV_ROWS_MAX) {
            for col in 0..INV_COLS {
                let slot = Slot { row, col };
                self.world.spawn(
                    Kind::Invader,
                    Spawn::new(
                        self.formation.slot_center(slot),
                        Vec2::ZERO,
                        Shape::rect(INV_W, INV_H),
                        slot,
                    ),
                );
            }
        }
    }

    fn build_shields(&mut self) {
        let spacing = FIELD.width / (SHIELDS + 1) as f32;
        let width = SHIELD_COLS as f32 * SHIELD_CELL;
        self.shields = (0..SHIELDS)
            .map(|i| {
                let x = (spacing * (i + 1) as f32 - width / 2.0).round();
                Shield::new(Vec2::new(x, FIELD.height - 140.0))
            })
            .collect();
    }

    fn move_player(&mut self, ctx: &TickCtx<'_>) {
        let half = PLAYER_W / 2.0;
        let x = self.player.pos.x + ctx.input.axis_x() * PLAYER_SPEED * ctx.dt_secs();
        self.player.pos.x = x.clamp(EDGE_MARGIN + half, FIELD.width - EDGE_MARGIN - half);
    }

    fn fire(&mut self) {
        if self.cooldown.is_active() {
            return;
        }
        let pos = Vec2::new(self.player.pos.x, PLAYER_Y - SHOT_H / 2.0);
        let spawned = self.world.spawn(
            Kind::Shot,
            Spawn::new(
                pos,
                Vec2::new(0.0, -SHOT_SPEED),
                Shape::rect(SHOT_W, SHOT_H),
                Slot::default(),
            ),
        );
        if spawned.is_some() {
            self.cooldown.set(PLAYER_COOLDOWN_MS);
        }
    }

    /// Slide sideways; bounce off the walls and drop every second bounce
    fn march(&mut self, ctx: &TickCtx<'_>) {
        let killed = (INV_COLS * ctx.params.population.min(INV_ROWS_MAX))
            .saturating_sub(self.invader_count() as u32);
        let speed = Self::march_speed(&ctx.params, killed);
        self.formation.origin.x += self.formation.dir * speed * ctx.dt_secs();
        self.place_invaders();

        let Some(bounds) = self.formation_bounds() else {
            return;
        };
        let at_edge =
            bounds.min.x <= EDGE_MARGIN || bounds.max.x >= FIELD.width - EDGE_MARGIN;
        if at_edge && !self.formation.edge_lock {
            let f = &mut self.formation;
            f.dir = -f.dir;
            f.edge_lock = true;
            f.bounces += 1;
            if f.bounces % 2 == 0 && self.level_ms - f.last_step_ms >= STEP_COOLDOWN_MS {
                f.origin.y += STEP_DOWN;
                f.last_step_ms = self.level_ms;
                log::debug!("invaders step down to {}", f.origin.y);
                self.place_invaders();
            }
        }
        if self.formation.edge_lock && !at_edge {
            self.formation.edge_lock = false;
        }
    }

    fn place_invaders(&mut self) {
        let formation = &self.formation;
        for inv in self.world.of_mut(Kind::Invader) {
            inv.pos = formation.slot_center(inv.data);
        }
    }

    /// Random shot from the lowest invader of a random live column
    fn enemy_fire(&mut self, ctx: &mut TickCtx<'_>) {
        if !self.fire_open || self.world.count(Kind::EnemyShot) >= ctx.params.hostile_cap as usize {
            return;
        }
        let level = ctx.params.level.max(1) as f64;
        let chance = FIRE_RATE_BASE * (1.0 + (level - 1.0) * 0.3) * ctx.dt_ms;
        if !ctx.rng.random_bool(chance.clamp(0.0, 1.0)) {
            return;
        }
        let mut cols: Vec<u32> = self.world.of(Kind::Invader).map(|i| i.data.col).collect();
        cols.sort_unstable();
        cols.dedup();
        if cols.is_empty() {
            return;
        }
        let col = cols[ctx.rng.random_range(0..cols.len())];
        let shooter = self
            .world
            .of(Kind::Invader)
            .filter(|i| i.data.col == col)
            .max_by_key(|i| i.data.row)
            .map(|i| i.pos);
        if let Some(pos) = shooter {
            let muzzle = pos + Vec2::new(0.0, INV_H / 2.0 + 2.0 + SHOT_H / 2.0);
            self.world.spawn(
                Kind::EnemyShot,
                Spawn::new(
                    muzzle,
                    Vec2::new(0.0, ENEMY_SHOT_SPEED),
                    Shape::rect(SHOT_W, SHOT_H),
                    Slot::default(),
                ),
            );
        }
    }

    fn shots_vs_shields(&mut self, ctx: &mut TickCtx<'_>) {
        let shots: Vec<_> = self
            .world
            .iter()
            .filter(|e| e.category != Kind::Invader)
            .map(|e| (e.id, shot_box(e.pos)))
            .collect();
        for (id, area) in shots {
            if self.shields.iter_mut().any(|s| s.erode(&area)) {
                ctx.events.destroy(id);
            }
        }
    }
}

impl Game for Invaders {
    type View = InvadersView;

    fn name(&self) -> &'static str {
        "invaders"
    }

    fn default_difficulty(&self) -> Box<dyn Difficulty> {
        Box::new(LinearCurve::invaders())
    }

    fn new_round(&mut self, _rng: &mut Pcg32) {
        self.player = Actor::new(Self::player_spawn());
        self.world.clear();
        self.cues.clear();
    }

    fn start_level(&mut self, params: &LevelParams, _rng: &mut Pcg32) {
        self.world.clear();
        self.formation = Formation::new();
        self.build_formation(params.population);
        self.build_shields();
        self.cooldown.clear();
        self.level_ms = 0.0;
        self.fire_open = false;
        self.cues.clear();
        self.cues
            .schedule_in(ticks_for(HOLD_FIRE_MS, STEP_MS), Cue::OpenFire);
    }

    fn tick(&mut self, ctx: &mut TickCtx<'_>) {
        for cue in self.cues.due(ctx.tick) {
            match cue {
                Cue::OpenFire => self.fire_open = true,
            }
        }
        self.level_ms += ctx.dt_ms;

        self.move_player(ctx);
        self.cooldown.tick(ctx.dt_ms);
        if ctx.input.fire {
            self.fire();
        }

        self.march(ctx);
        if let Some(bounds) = self.formation_bounds() {
            if bounds.max.y >= PLAYER_Y - 2.0 && !ctx.invulnerable {
                ctx.events.lose_life();
            }
        }

        self.enemy_fire(ctx);
        self.world.advance(ctx.dt_ms, &FIELD);
        self.shots_vs_shields(ctx);

        for hit in first_contacts(&self.world, Kind::Shot, Kind::Invader) {
            if ctx.events.is_removed(hit.a) {
                continue;
            }
            let row = self.world.get(hit.b).map_or(0, |i| i.data.row);
            ctx.events.destroy(hit.a);
            ctx.events
                .destroy_scored(hit.b, ROW_SCORE.get(row as usize).copied().unwrap_or(10));
        }

        if !ctx.invulnerable {
            let body = Shape::rect(PLAYER_W, PLAYER_H);
            let hit = contacts_with(&self.world, Kind::EnemyShot, self.player.pos, body);
            if let Some(id) = hit.filter(|id| !ctx.events.is_removed(*id)) {
                ctx.events.destroy(id);
                ctx.events.lose_life();
            }
        }

        ctx.events.apply_removals(&mut self.world);

        if self.invader_count() == 0 {
            ctx.events.level_clear();
        }
    }

    fn respawn(&mut self, _rng: &mut Pcg32) {
        self.player.respawn();
        self.cooldown.clear();
        self.world.clear_category(Kind::Shot);
        self.world.clear_category(Kind::EnemyShot);
    }

    fn actor(&self) -> Option<&Actor> {
        Some(&self.player)
    }

    fn actor_mut(&mut self) -> Option<&mut Actor> {
        Some(&mut self.player)
    }

    fn respawn_invuln_ms(&self) -> Option<f64> {
        Some(RESPAWN_INVULN_MS)
    }

    fn is_consistent(&self) -> bool {
        self.player.pos.is_finite()
            && self.formation.origin.is_finite()
            && self.world.iter().all(|e| e.pos.is_finite())
    }

    fn view(&self) -> InvadersView {
        let boxes = |kind: Kind| -> Vec<Aabb> {
            self.world
                .of(kind)
                .map(|e| Aabb::from_center(e.pos, e.shape.half_extent()))
                .collect()
        };
        InvadersView {
            invaders: self
                .world
                .of(Kind::Invader)
                .map(|e| (Aabb::from_center(e.pos, e.shape.half_extent()), e.data.row))
                .collect(),
            player: self.player_rect(),
            shots: boxes(Kind::Shot),
            enemy_shots: boxes(Kind::EnemyShot),
            shields: self
                .shields
                .iter()
                .map(|s| ShieldView {
                    origin: s.origin,
                    cells: s.cells.iter_occupied().map(|(c, r, _)| (c, r)).collect(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::testing::Harness;
    use crate::sim::{Event, TickInput};

    fn spawn(game: &mut Invaders, kind: Kind, pos: Vec2, vel: Vec2) {
        game.world
            .spawn(kind, Spawn::new(pos, vel, Shape::rect(SHOT_W, SHOT_H), Slot::default()));
    }

    #[test]
    fn test_level_layout() {
        let mut game = Invaders::new();
        let _h = Harness::start(&mut game);
        assert_eq!(game.invader_count(), 55);
        assert_eq!(game.shields.len(), 3);
        assert_eq!(game.shield_cells(), 3 * 40);
        assert_eq!(game.shields[0].origin, Vec2::new(164.0, 460.0));
    }

    #[test]
    fn test_march_speed_curve() {
        let curve = LinearCurve::invaders();
        let one = curve.params(1);
        assert!((Invaders::march_speed(&one, 0) - 21.0).abs() < 1e-4);
        assert!((Invaders::march_speed(&one, 10) - 27.0).abs() < 1e-4);
        let two = curve.params(2);
        assert!((Invaders::march_speed(&two, 0) - 24.0 * 1.03).abs() < 1e-3);
    }

    #[test]
    fn test_formation_bounces_and_steps_down() {
        let mut game = Invaders::new();
        let mut h = Harness::start(&mut game);
        h.idle(&mut game, 80);
        assert!(game.formation.origin.x > ORIGIN.x);

        // Right wall: first bounce only reverses
        game.formation.origin.x = 301.0;
        h.idle(&mut game, 10);
        assert_eq!(game.formation.dir, -1.0);
        assert_eq!(game.formation.bounces, 1);
        assert_eq!(game.formation.origin.y, ORIGIN.y);

        // Left wall: second bounce steps down
        game.formation.origin.x = 10.1;
        h.idle(&mut game, 3);
        assert_eq!(game.formation.dir, 1.0);
        assert_eq!(game.formation.bounces, 2);
        assert_eq!(game.formation.origin.y, ORIGIN.y + STEP_DOWN);
    }

    #[test]
    fn test_shot_scores_by_row() {
        let mut game = Invaders::new();
        let mut h = Harness::start(&mut game);
        // Bottom-left invader sits at (94, 214)
        spawn(&mut game, Kind::Shot, Vec2::new(94.0, 240.0), Vec2::new(0.0, -SHOT_SPEED));
        let events = h.idle(&mut game, 5);
        assert!(events.contains(&Event::Score(10)));
        assert_eq!(game.invader_count(), 54);
        assert_eq!(game.world.count(Kind::Shot), 0);
    }

    #[test]
    fn test_shield_erodes_one_cell() {
        let mut game = Invaders::new();
        let mut h = Harness::start(&mut game);
        spawn(
            &mut game,
            Kind::EnemyShot,
            Vec2::new(200.0, 450.0),
            Vec2::new(0.0, ENEMY_SHOT_SPEED),
        );
        h.idle(&mut game, 5);
        assert_eq!(game.shield_cells(), 3 * 40 - 1);
        assert_eq!(game.world.count(Kind::EnemyShot), 0);
    }

    #[test]
    fn test_enemy_shot_costs_life_unless_invulnerable() {
        let mut game = Invaders::new();
        let mut h = Harness::start(&mut game);
        let at = game.player.pos;
        spawn(&mut game, Kind::EnemyShot, at, Vec2::ZERO);
        h.invulnerable = true;
        let events = h.step(&mut game, TickInput::default());
        assert!(!events.contains(&Event::LoseLife));

        h.invulnerable = false;
        let events = h.step(&mut game, TickInput::default());
        assert!(events.contains(&Event::LoseLife));
        assert_eq!(game.world.count(Kind::EnemyShot), 0);
    }

    #[test]
    fn test_invasion_costs_life() {
        let mut game = Invaders::new();
        let mut h = Harness::start(&mut game);
        game.formation.origin.y = PLAYER_Y - 2.0 - 4.0 * INV_VSPACING - INV_H;
        let events = h.step(&mut game, TickInput::default());
        assert!(events.contains(&Event::LoseLife));
    }

    #[test]
    fn test_enemy_fire_held_for_three_seconds() {
        let mut game = Invaders::new();
        let mut h = Harness::start(&mut game);
        h.idle(&mut game, 360);
        assert!(!game.fire_open);
        assert_eq!(game.world.count(Kind::EnemyShot), 0);
        h.idle(&mut game, 1);
        assert!(game.fire_open);
    }

    #[test]
    fn test_player_fire_cooldown() {
        let mut game = Invaders::new();
        let mut h = Harness::start(&mut game);
        let fire = TickInput {
            fire: true,
            ..TickInput::default()
        };
        h.step(&mut game, fire);
        h.step(&mut game, fire);
        assert_eq!(game.world.count(Kind::Shot), 1);
    }

    #[test]
    fn test_empty_formation_clears_level() {
        let mut game = Invaders::new();
        let mut h = Harness::start(&mut game);
        game.world.clear_category(Kind::Invader);
        let events = h.step(&mut game, TickInput::default());
        assert!(events.contains(&Event::LevelClear));
    }
}
