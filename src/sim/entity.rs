//! Entity store: typed game objects with bounded populations
//!
//! Every entity carries the motion rule and edge policy of its category,
//! fixed when it is spawned. Iteration order is spawn order.

use std::fmt::Debug;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::TIME_EPSILON_MS;
use crate::wrap;

/// Stable entity handle (never reused within a store)
pub type EntityId = u32;

/// How an entity moves each tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Motion {
    /// Continuous motion along `vel` (px/s)
    Free,
    /// Horizontal motion only; `y` is pinned to the lane
    Lane,
    /// Moves `vel` whole cells once every `every_ticks` ticks
    GridStep { every_ticks: u32 },
    /// Never moves on its own
    Static,
}

/// What happens when an entity crosses the playfield edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgePolicy {
    /// Re-enter from the opposite edge
    Wrap,
    /// Stop at the edge
    Clamp,
    /// Despawn once fully outside
    Kill,
    /// Leave position untouched (the game handles edges itself)
    Ignore,
}

/// Collision shape, centred on the entity position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Point,
    Circle { radius: f32 },
    Rect { half: Vec2 },
}

impl Shape {
    pub fn rect(width: f32, height: f32) -> Self {
        Shape::Rect {
            half: Vec2::new(width / 2.0, height / 2.0),
        }
    }

    /// Half extent of the bounding box
    pub fn half_extent(&self) -> Vec2 {
        match *self {
            Shape::Point => Vec2::ZERO,
            Shape::Circle { radius } => Vec2::splat(radius),
            Shape::Rect { half } => half,
        }
    }
}

/// Fixed-size region entities live in; immutable for a level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Playfield {
    pub width: f32,
    pub height: f32,
}

impl Playfield {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// True when a box of `half` extent around `pos` is entirely outside
    pub fn fully_outside(&self, pos: Vec2, half: Vec2) -> bool {
        pos.x + half.x < 0.0
            || pos.x - half.x > self.width
            || pos.y + half.y < 0.0
            || pos.y - half.y > self.height
    }

    pub fn clamp(&self, pos: Vec2, half: Vec2) -> Vec2 {
        Vec2::new(
            pos.x.clamp(half.x, (self.width - half.x).max(half.x)),
            pos.y.clamp(half.y, (self.height - half.y).max(half.y)),
        )
    }

    pub fn wrap(&self, pos: Vec2) -> Vec2 {
        Vec2::new(wrap(pos.x, self.width), wrap(pos.y, self.height))
    }
}

/// Category of an entity: decides motion, edge handling and population cap.
///
/// Implemented by a small `Copy` enum per game.
pub trait Category: Copy + Eq + Debug {
    /// Maximum simultaneous entities of this category (`None` = unbounded)
    fn cap(self) -> Option<usize>;
    fn motion(self) -> Motion;
    fn edge(self) -> EdgePolicy;
}

/// Initial state for a spawn request
#[derive(Debug, Clone)]
pub struct Spawn<D> {
    pub pos: Vec2,
    pub vel: Vec2,
    pub shape: Shape,
    /// Lifetime in ms (`None` = until removed by edge or collision)
    pub ttl_ms: Option<f64>,
    pub data: D,
}

impl<D> Spawn<D> {
    pub fn new(pos: Vec2, vel: Vec2, shape: Shape, data: D) -> Self {
        Self {
            pos,
            vel,
            shape,
            ttl_ms: None,
            data,
        }
    }

    pub fn with_ttl(mut self, ttl_ms: f64) -> Self {
        self.ttl_ms = Some(ttl_ms);
        self
    }
}

/// A simulated object owned by an [`EntityStore`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity<C, D> {
    pub id: EntityId,
    pub category: C,
    pub pos: Vec2,
    pub vel: Vec2,
    pub shape: Shape,
    pub ttl_ms: Option<f64>,
    /// Game-specific payload (rock tier, brick row, ...)
    pub data: D,
    motion: Motion,
    edge: EdgePolicy,
    step_ticks: u32,
}

impl<C: Category, D> Entity<C, D> {
    #[inline]
    pub fn motion(&self) -> Motion {
        self.motion
    }

    #[inline]
    pub fn edge(&self) -> EdgePolicy {
        self.edge
    }

    /// Integrate one tick; returns false when the entity should be removed
    fn advance(&mut self, dt_secs: f32, dt_ms: f64, field: &Playfield) -> bool {
        match self.motion {
            Motion::Free => self.pos += self.vel * dt_secs,
            Motion::Lane => self.pos.x += self.vel.x * dt_secs,
            Motion::GridStep { every_ticks } => {
                self.step_ticks += 1;
                if self.step_ticks >= every_ticks.max(1) {
                    self.step_ticks = 0;
                    self.pos += self.vel;
                }
            }
            Motion::Static => {}
        }

        if let Some(ttl) = self.ttl_ms.as_mut() {
            *ttl -= dt_ms;
            if *ttl <= TIME_EPSILON_MS {
                return false;
            }
        }

        match self.edge {
            EdgePolicy::Wrap => self.pos = field.wrap(self.pos),
            EdgePolicy::Clamp => self.pos = field.clamp(self.pos, self.shape.half_extent()),
            EdgePolicy::Kill => {
                if field.fully_outside(self.pos, self.shape.half_extent()) {
                    return false;
                }
            }
            EdgePolicy::Ignore => {}
        }
        true
    }
}

/// Exclusive owner of all entities in a game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityStore<C, D> {
    entities: Vec<Entity<C, D>>,
    next_id: EntityId,
}

impl<C: Category, D> Default for EntityStore<C, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Category, D> EntityStore<C, D> {
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            next_id: 1,
        }
    }

    /// Spawn an entity; dropped silently (returns `None`) at the category cap
    pub fn spawn(&mut self, category: C, spawn: Spawn<D>) -> Option<EntityId> {
        if let Some(cap) = category.cap() {
            if self.count(category) >= cap {
                log::trace!("spawn of {:?} dropped at cap {}", category, cap);
                return None;
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        self.entities.push(Entity {
            id,
            category,
            pos: spawn.pos,
            vel: spawn.vel,
            shape: spawn.shape,
            ttl_ms: spawn.ttl_ms,
            data: spawn.data,
            motion: category.motion(),
            edge: category.edge(),
            step_ticks: 0,
        });
        Some(id)
    }

    /// Move every entity one tick and drop expired / escaped ones
    pub fn advance(&mut self, dt_ms: f64, field: &Playfield) {
        let dt_secs = crate::ms_to_secs(dt_ms);
        self.entities
            .retain_mut(|entity| entity.advance(dt_secs, dt_ms, field));
    }

    /// Move only the entities of one category
    pub fn advance_category(&mut self, category: C, dt_ms: f64, field: &Playfield) {
        let dt_secs = crate::ms_to_secs(dt_ms);
        self.entities.retain_mut(|entity| {
            entity.category != category || entity.advance(dt_secs, dt_ms, field)
        });
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity<C, D>> {
        let index = self.entities.iter().position(|e| e.id == id)?;
        Some(self.entities.remove(index))
    }

    /// Remove every entity of a category (e.g. transient bullets on respawn)
    pub fn clear_category(&mut self, category: C) {
        self.entities.retain(|e| e.category != category);
    }

    pub fn clear(&mut self) {
        self.entities.clear();
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity<C, D>> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity<C, D>> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    pub fn count(&self, category: C) -> usize {
        self.entities
            .iter()
            .filter(|e| e.category == category)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity<C, D>> {
        self.entities.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity<C, D>> {
        self.entities.iter_mut()
    }

    pub fn of(&self, category: C) -> impl Iterator<Item = &Entity<C, D>> {
        self.entities.iter().filter(move |e| e.category == category)
    }

    pub fn of_mut(&mut self, category: C) -> impl Iterator<Item = &mut Entity<C, D>> {
        self.entities
            .iter_mut()
            .filter(move |e| e.category == category)
    }
}
