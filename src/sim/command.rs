//! Discrete command signals and per-tick input
//!
//! Commands arrive between ticks in any number; the latch coalesces them so
//! each tick sees one consistent [`TickInput`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    fn index(self) -> usize {
        match self {
            Direction::Left => 0,
            Direction::Right => 1,
            Direction::Up => 2,
            Direction::Down => 3,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// Unit grid offset (y grows downward)
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
        }
    }
}

/// Rotation sense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Spin {
    Clockwise,
    CounterClockwise,
}

impl Spin {
    pub fn sign(self) -> i32 {
        match self {
            Spin::Clockwise => 1,
            Spin::CounterClockwise => -1,
        }
    }
}

/// Signal from the input adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Press (`active = true`) or release of a direction
    Move { dir: Direction, active: bool },
    Fire,
    Rotate(Spin),
    Pause,
    Reset,
    Hold,
    Start,
}

impl Command {
    /// Commands handled by the session rather than the game
    pub fn is_lifecycle(self) -> bool {
        matches!(self, Command::Pause | Command::Reset | Command::Start)
    }

    /// Inputs that begin a round from the ready screen
    pub fn starts_round(self) -> bool {
        matches!(self, Command::Start | Command::Fire)
    }
}

/// Input seen by one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    pub(crate) held: [bool; 4],
    /// Most recent direction pressed since the previous tick
    pub pressed: Option<Direction>,
    pub fire: bool,
    pub rotate: Option<Spin>,
    pub hold: bool,
}

impl TickInput {
    #[inline]
    pub fn is_held(&self, dir: Direction) -> bool {
        self.held[dir.index()]
    }

    /// -1, 0 or +1 from the held left/right pair
    pub fn axis_x(&self) -> f32 {
        (self.is_held(Direction::Right) as i32 - self.is_held(Direction::Left) as i32) as f32
    }

    /// -1, 0 or +1 from the held up/down pair (down is positive)
    pub fn axis_y(&self) -> f32 {
        (self.is_held(Direction::Down) as i32 - self.is_held(Direction::Up) as i32) as f32
    }

    /// Input with the given directions held, for scripted drivers and tests
    pub fn holding(dirs: &[Direction]) -> Self {
        let mut input = Self::default();
        for dir in dirs {
            input.held[dir.index()] = true;
        }
        input
    }
}

/// Accumulates commands between ticks
#[derive(Debug, Clone, Default)]
pub struct CommandLatch {
    held: [bool; 4],
    pressed: Option<Direction>,
    fire: bool,
    rotate: Option<Spin>,
    hold: bool,
    lifecycle: Vec<Command>,
}

impl CommandLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        match command {
            Command::Move { dir, active } => {
                self.held[dir.index()] = active;
                if active {
                    self.pressed = Some(dir);
                }
            }
            Command::Fire => self.fire = true,
            Command::Rotate(spin) => self.rotate = Some(spin),
            Command::Hold => self.hold = true,
            Command::Pause | Command::Reset | Command::Start => self.lifecycle.push(command),
        }
    }

    /// Lifecycle commands in arrival order
    pub fn take_lifecycle(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.lifecycle)
    }

    /// Snapshot for one tick; one-shot signals are cleared, held state stays
    pub fn take_tick_input(&mut self) -> TickInput {
        TickInput {
            held: self.held,
            pressed: self.pressed.take(),
            fire: std::mem::take(&mut self.fire),
            rotate: self.rotate.take(),
            hold: std::mem::take(&mut self.hold),
        }
    }
}
