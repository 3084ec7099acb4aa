//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (spawn order)
//! - No rendering or platform dependencies

pub mod clock;
pub mod collision;
pub mod command;
pub mod entity;
pub mod schedule;
pub mod state;
pub mod tick;

pub use clock::{Cadence, Countdown, Scheduler};
pub use collision::{
    Aabb, Contact, Event, EventQueue, Grid, circle_rect_overlap, circles_overlap, contacts_with,
    first_contacts, point_in_circle, rects_overlap, shapes_overlap,
};
pub use command::{Command, CommandLatch, Direction, Spin, TickInput};
pub use entity::{Category, EdgePolicy, Entity, EntityId, EntityStore, Motion, Playfield, Shape, Spawn};
pub use schedule::ScheduledEvents;
pub use state::{Actor, GamePhase, LifeLoss, Round};
pub use tick::{Game, Session, Snapshot, TickCtx};
