//! Collision detection and event resolution
//!
//! Geometric predicates for the four shape rules (circle-circle, circle-rect,
//! rect-rect, grid-cell occupancy), the per-tick pair pass, and the event
//! queue that defers every side effect until the scan has finished.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entity::{Category, Entity, EntityId, EntityStore, Shape};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Box from a top-left corner and size
    pub fn from_corner(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self::new(Vec2::new(x, y), Vec2::new(x + w, y + h))
    }

    pub fn from_center(center: Vec2, half: Vec2) -> Self {
        Self::new(center - half, center + half)
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Closest point inside the box to `p`
    pub fn clamp_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max)
    }
}

/// Point inside (or on) a circle
#[inline]
pub fn point_in_circle(p: Vec2, center: Vec2, radius: f32) -> bool {
    p.distance_squared(center) <= radius * radius
}

/// Circles touch when the distance between centres is at most the radius sum
#[inline]
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let r = ra + rb;
    a.distance_squared(b) <= r * r
}

/// Clamp-point test: nearest point of the box within the circle radius
#[inline]
pub fn circle_rect_overlap(center: Vec2, radius: f32, rect: &Aabb) -> bool {
    let nearest = rect.clamp_point(center);
    center.distance_squared(nearest) <= radius * radius
}

/// Strict axis-aligned overlap (touching edges do not count)
#[inline]
pub fn rects_overlap(a: &Aabb, b: &Aabb) -> bool {
    a.min.x < b.max.x && a.max.x > b.min.x && a.min.y < b.max.y && a.max.y > b.min.y
}

/// Dispatch on the shape pair
pub fn shapes_overlap(pos_a: Vec2, a: Shape, pos_b: Vec2, b: Shape) -> bool {
    match (a, b) {
        (Shape::Point, Shape::Point) => pos_a == pos_b,
        (Shape::Point, Shape::Circle { radius }) => point_in_circle(pos_a, pos_b, radius),
        (Shape::Circle { radius }, Shape::Point) => point_in_circle(pos_b, pos_a, radius),
        (Shape::Point, Shape::Rect { half }) => {
            circle_rect_overlap(pos_a, 0.0, &Aabb::from_center(pos_b, half))
        }
        (Shape::Rect { half }, Shape::Point) => {
            circle_rect_overlap(pos_b, 0.0, &Aabb::from_center(pos_a, half))
        }
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            circles_overlap(pos_a, ra, pos_b, rb)
        }
        (Shape::Circle { radius }, Shape::Rect { half }) => {
            circle_rect_overlap(pos_a, radius, &Aabb::from_center(pos_b, half))
        }
        (Shape::Rect { half }, Shape::Circle { radius }) => {
            circle_rect_overlap(pos_b, radius, &Aabb::from_center(pos_a, half))
        }
        (Shape::Rect { half: ha }, Shape::Rect { half: hb }) => rects_overlap(
            &Aabb::from_center(pos_a, ha),
            &Aabb::from_center(pos_b, hb),
        ),
    }
}

#[inline]
fn entities_overlap<C: Category, D>(a: &Entity<C, D>, b: &Entity<C, D>) -> bool {
    shapes_overlap(a.pos, a.shape, b.pos, b.shape)
}

/// A matched pair from one category-pair pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub a: EntityId,
    pub b: EntityId,
}

/// One destructive pass over `a_cat` × `b_cat`.
///
/// Entities are visited in spawn order. Each `a` takes the first unclaimed
/// overlapping `b`; both are then claimed, so no entity appears in more than
/// one contact of the pass.
pub fn first_contacts<C: Category, D>(
    store: &EntityStore<C, D>,
    a_cat: C,
    b_cat: C,
) -> Vec<Contact> {
    let mut claimed: Vec<EntityId> = Vec::new();
    let mut contacts = Vec::new();

    for a in store.of(a_cat) {
        if claimed.contains(&a.id) {
            continue;
        }
        let hit = store
            .of(b_cat)
            .find(|b| b.id != a.id && !claimed.contains(&b.id) && entities_overlap(a, b));
        if let Some(b) = hit {
            claimed.push(a.id);
            claimed.push(b.id);
            contacts.push(Contact { a: a.id, b: b.id });
        }
    }
    contacts
}

/// First entity of `category` (in spawn order) overlapping an arbitrary shape
pub fn contacts_with<C: Category, D>(
    store: &EntityStore<C, D>,
    category: C,
    pos: Vec2,
    shape: Shape,
) -> Option<EntityId> {
    store
        .of(category)
        .find(|e| shapes_overlap(pos, shape, e.pos, e.shape))
        .map(|e| e.id)
}

/// Fixed grid of optional cells (settled blocks, shields, snake body)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    cols: usize,
    rows: usize,
    cells: Vec<Option<T>>,
}

impl<T: Clone> Grid<T> {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![None; cols * rows],
        }
    }

    /// Grid with every cell set to `value`
    pub fn filled(cols: usize, rows: usize, value: T) -> Self {
        Self {
            cols,
            rows,
            cells: vec![Some(value); cols * rows],
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn in_bounds(&self, col: i32, row: i32) -> bool {
        col >= 0 && row >= 0 && (col as usize) < self.cols && (row as usize) < self.rows
    }

    fn index(&self, col: i32, row: i32) -> Option<usize> {
        self.in_bounds(col, row)
            .then(|| row as usize * self.cols + col as usize)
    }

    pub fn get(&self, col: i32, row: i32) -> Option<&T> {
        self.index(col, row).and_then(|i| self.cells[i].as_ref())
    }

    /// Direct index lookup; out-of-range cells are never occupied
    #[inline]
    pub fn is_occupied(&self, col: i32, row: i32) -> bool {
        self.get(col, row).is_some()
    }

    /// Set a cell; out-of-range writes are ignored
    pub fn set(&mut self, col: i32, row: i32, value: T) {
        if let Some(i) = self.index(col, row) {
            self.cells[i] = Some(value);
        }
    }

    /// Empty a cell, returning what was there
    pub fn take(&mut self, col: i32, row: i32) -> Option<T> {
        let i = self.index(col, row)?;
        self.cells[i].take()
    }

    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = None);
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn row_full(&self, row: usize) -> bool {
        row < self.rows
            && self.cells[row * self.cols..(row + 1) * self.cols]
                .iter()
                .all(Option::is_some)
    }

    /// Remove full rows, shifting everything above down; returns rows removed
    pub fn clear_full_rows(&mut self) -> usize {
        let kept: Vec<Option<T>> = (0..self.rows)
            .filter(|&r| !self.row_full(r))
            .flat_map(|r| self.cells[r * self.cols..(r + 1) * self.cols].to_vec())
            .collect();
        let removed = self.rows - kept.len() / self.cols.max(1);
        let mut cells = vec![None; removed * self.cols];
        cells.extend(kept);
        self.cells = cells;
        removed
    }

    /// Occupied cells as (col, row, value), row-major
    pub fn iter_occupied(&self) -> impl Iterator<Item = (i32, i32, &T)> {
        self.cells.iter().enumerate().filter_map(|(i, c)| {
            c.as_ref()
                .map(|v| ((i % self.cols) as i32, (i / self.cols) as i32, v))
        })
    }

    /// Cell range covered by a box, for a grid placed at `origin` with square cells
    pub fn cells_under(&self, origin: Vec2, cell: f32, area: &Aabb) -> (i32, i32, i32, i32) {
        let c0 = ((area.min.x - origin.x) / cell).floor() as i32;
        let r0 = ((area.min.y - origin.y) / cell).floor() as i32;
        let c1 = ((area.max.x - origin.x) / cell).floor() as i32;
        let r1 = ((area.max.y - origin.y) / cell).floor() as i32;
        (c0, r0, c1, r1)
    }
}

/// Discrete outcome of a tick, applied after the collision scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Remove an entity
    Destroy(EntityId),
    /// Remove an entity and let the game spawn `into` children
    Split { id: EntityId, into: u8 },
    /// Add points to the round score
    Score(u32),
    /// Actor hit a hazard
    LoseLife,
    /// Clear condition met; advance to the next level
    LevelClear,
    /// Loss condition independent of lives (top-out, self-collision, match point)
    Lost,
}

/// Per-tick event buffer with the exclusivity rules baked in
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Vec<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn removes(&self, id: EntityId) -> bool {
        self.events.iter().any(|e| match *e {
            Event::Destroy(x) | Event::Split { id: x, .. } => x == id,
            _ => false,
        })
    }

    /// True if the entity is already scheduled for removal this tick
    pub fn is_removed(&self, id: EntityId) -> bool {
        self.removes(id)
    }

    /// Queue a removal; returns false if the entity was already removed
    pub fn destroy(&mut self, id: EntityId) -> bool {
        if self.removes(id) {
            return false;
        }
        self.events.push(Event::Destroy(id));
        true
    }

    /// Queue a removal worth `points`; scored only for the first removal
    pub fn destroy_scored(&mut self, id: EntityId, points: u32) -> bool {
        if !self.destroy(id) {
            return false;
        }
        self.score(points);
        true
    }

    /// Queue a split worth `points`; scored only for the first removal
    pub fn split(&mut self, id: EntityId, into: u8, points: u32) -> bool {
        if self.removes(id) {
            return false;
        }
        self.events.push(Event::Split { id, into });
        self.score(points);
        true
    }

    pub fn score(&mut self, points: u32) {
        if points > 0 {
            self.events.push(Event::Score(points));
        }
    }

    /// At most one life loss per tick; later hazards are ignored
    pub fn lose_life(&mut self) -> bool {
        if self.events.contains(&Event::LoseLife) {
            return false;
        }
        self.events.push(Event::LoseLife);
        true
    }

    pub fn level_clear(&mut self) {
        if !self.events.contains(&Event::LevelClear) {
            self.events.push(Event::LevelClear);
        }
    }

    pub fn lost(&mut self) {
        if !self.events.contains(&Event::Lost) {
            self.events.push(Event::Lost);
        }
    }

    pub fn life_lost(&self) -> bool {
        self.events.contains(&Event::LoseLife)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Sum of queued score events
    pub fn points(&self) -> u64 {
        self.events
            .iter()
            .map(|e| match *e {
                Event::Score(p) => p as u64,
                _ => 0,
            })
            .sum()
    }

    /// Apply queued removals to a store.
    ///
    /// Returns each removed entity with its split count (0 for a plain
    /// destroy), in queue order, so the caller can spawn children.
    pub fn apply_removals<C: Category, D>(
        &self,
        store: &mut EntityStore<C, D>,
    ) -> Vec<(Entity<C, D>, u8)> {
        self.events
            .iter()
            .filter_map(|e| match *e {
                Event::Destroy(id) => store.remove(id).map(|ent| (ent, 0)),
                Event::Split { id, into } => store.remove(id).map(|ent| (ent, into)),
                _ => None,
            })
            .collect()
    }
}
