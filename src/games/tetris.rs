//! Tetris on a 10x20 well
//!
//! Settled blocks live in a [`Grid`]; the falling piece is tested against it
//! by direct cell lookup. Gravity is a [`Cadence`] whose interval comes from
//! the level curve.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::sim::{Cadence, Direction, Game, Grid, Spin, TickCtx};
use crate::tuning::{Difficulty, LevelParams, LinearCurve};

pub const COLS: i32 = 10;
pub const ROWS: i32 = 20;
const LINES_PER_LEVEL: u32 = 10;
const SOFT_DROP_POINTS: u32 = 1;
const HARD_DROP_POINTS: u32 = 2;
const LINE_POINTS: [u32; 5] = [0, 100, 300, 500, 800];
const PREVIEW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PieceKind {
    I,
    J,
    L,
    O,
    S,
    T,
    Z,
}

type Cells = [(i32, i32); 4];

impl PieceKind {
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::J,
        PieceKind::L,
        PieceKind::O,
        PieceKind::S,
        PieceKind::T,
        PieceKind::Z,
    ];

    /// Occupied cells of each rotation within the piece's bounding matrix
    fn rotations(self) -> &'static [Cells; 4] {
        const I: [Cells; 4] = [
            [(0, 1), (1, 1), (2, 1), (3, 1)],
            [(2, 0), (2, 1), (2, 2), (2, 3)],
            [(0, 2), (1, 2), (2, 2), (3, 2)],
            [(1, 0), (1, 1), (1, 2), (1, 3)],
        ];
        const J: [Cells; 4] = [
            [(0, 0), (0, 1), (1, 1), (2, 1)],
            [(1, 0), (2, 0), (1, 1), (1, 2)],
            [(0, 1), (1, 1), (2, 1), (2, 2)],
            [(1, 0), (1, 1), (0, 2), (1, 2)],
        ];
        const L: [Cells; 4] = [
            [(2, 0), (0, 1), (1, 1), (2, 1)],
            [(1, 0), (1, 1), (1, 2), (2, 2)],
            [(0, 1), (1, 1), (2, 1), (0, 2)],
            [(0, 0), (1, 0), (1, 1), (1, 2)],
        ];
        const O: [Cells; 4] = [[(0, 0), (1, 0), (0, 1), (1, 1)]; 4];
        const S: [Cells; 4] = [
            [(1, 0), (2, 0), (0, 1), (1, 1)],
            [(1, 0), (1, 1), (2, 1), (2, 2)],
            [(1, 1), (2, 1), (0, 2), (1, 2)],
            [(0, 0), (0, 1), (1, 1), (1, 2)],
        ];
        const T: [Cells; 4] = [
            [(1, 0), (0, 1), (1, 1), (2, 1)],
            [(1, 0), (1, 1), (2, 1), (1, 2)],
            [(0, 1), (1, 1), (2, 1), (1, 2)],
            [(1, 0), (0, 1), (1, 1), (1, 2)],
        ];
        const Z: [Cells; 4] = [
            [(0, 0), (1, 0), (1, 1), (2, 1)],
            [(2, 0), (1, 1), (2, 1), (1, 2)],
            [(0, 1), (1, 1), (1, 2), (2, 2)],
            [(1, 0), (0, 1), (1, 1), (0, 2)],
        ];
        match self {
            PieceKind::I => &I,
            PieceKind::J => &J,
            PieceKind::L => &L,
            PieceKind::O => &O,
            PieceKind::S => &S,
            PieceKind::T => &T,
            PieceKind::Z => &Z,
        }
    }

    fn matrix_width(self) -> i32 {
        match self {
            PieceKind::I => 4,
            PieceKind::O => 2,
            _ => 3,
        }
    }

    fn kicks(self) -> &'static [i32] {
        match self {
            PieceKind::I => &[0, -2, 2, -1, 1],
            _ => &[0, -1, 1, -2, 2],
        }
    }
}

/// The falling piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub rotation: usize,
    pub x: i32,
    pub y: i32,
}

impl Piece {
    /// Centred, with its top filled row just above the well
    fn spawn(kind: PieceKind) -> Self {
        let top = kind.rotations()[0].iter().map(|&(_, r)| r).min().unwrap_or(0);
        Self {
            kind,
            rotation: 0,
            x: (COLS - kind.matrix_width()) / 2,
            y: -(top + 1),
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.kind.rotations()[self.rotation]
            .iter()
            .map(move |&(c, r)| (self.x + c, self.y + r))
    }

    fn shifted(mut self, dx: i32, dy: i32) -> Self {
        self.x += dx;
        self.y += dy;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TetrisView {
    /// Settled blocks (col, row, kind)
    pub settled: Vec<(i32, i32, PieceKind)>,
    pub active: Piece,
    pub active_cells: Vec<(i32, i32)>,
    /// Row the active piece would land on
    pub ghost_y: i32,
    pub next: Vec<PieceKind>,
    pub hold: Option<PieceKind>,
    pub lines: u32,
}

pub struct Tetris {
    well: Grid<PieceKind>,
    active: Piece,
    queue: VecDeque<PieceKind>,
    bag: Vec<PieceKind>,
    hold: Option<PieceKind>,
    can_hold: bool,
    lines: u32,
    gravity: Cadence,
}

impl Default for Tetris {
    fn default() -> Self {
        Self::new()
    }
}

impl Tetris {
    pub fn new() -> Self {
        Self {
            well: Grid::new(COLS as usize, ROWS as usize),
            active: Piece::spawn(PieceKind::T),
            queue: VecDeque::new(),
            bag: Vec::new(),
            hold: None,
            can_hold: true,
            lines: 0,
            gravity: Cadence::new(1000.0),
        }
    }

    pub fn active(&self) -> &Piece {
        &self.active
    }

    pub fn lines(&self) -> u32 {
        self.lines
    }

    pub fn well(&self) -> &Grid<PieceKind> {
        &self.well
    }

    fn collides(&self, piece: &Piece) -> bool {
        piece
            .cells()
            .any(|(x, y)| x < 0 || x >= COLS || y >= ROWS || self.well.is_occupied(x, y))
    }

    /// Draw from the 7-bag, refilling and shuffling when it runs dry
    fn draw(&mut self, rng: &mut Pcg32) -> PieceKind {
        if self.bag.is_empty() {
            self.bag = PieceKind::ALL.to_vec();
            self.bag.shuffle(rng);
        }
        self.bag.pop().unwrap_or(PieceKind::T)
    }

    fn refill(&mut self, rng: &mut Pcg32) {
        while self.queue.len() < PREVIEW {
            let kind = self.draw(rng);
            self.queue.push_back(kind);
        }
    }

    /// Next piece from the queue; false on top-out
    fn spawn_next(&mut self, rng: &mut Pcg32) -> bool {
        self.refill(rng);
        let kind = self.queue.pop_front().unwrap_or(PieceKind::T);
        self.refill(rng);
        self.active = Piece::spawn(kind);
        self.can_hold = true;
        // Every piece gets a full gravity interval before its first fall
        self.gravity.restart();
        !self.collides(&self.active)
    }

    fn try_move(&mut self, dx: i32, dy: i32) -> bool {
        let moved = self.active.shifted(dx, dy);
        if self.collides(&moved) {
            return false;
        }
        self.active = moved;
        true
    }

    fn rotate(&mut self, spin: Spin) -> bool {
        let mut turned = self.active;
        turned.rotation = (turned.rotation as i32 + spin.sign()).rem_euclid(4) as usize;
        for &kick in self.active.kind.kicks() {
            let candidate = turned.shifted(kick, 0);
            if !self.collides(&candidate) {
                self.active = candidate;
                return true;
            }
        }
        false
    }

    fn ghost_y(&self) -> i32 {
        let mut ghost = self.active;
        while !self.collides(&ghost.shifted(0, 1)) {
            ghost.y += 1;
        }
        ghost.y
    }

    /// Settle the active piece, clear lines and bring in the next one
    fn lock(&mut self, ctx: &mut TickCtx<'_>) {
        let cells: Vec<_> = self.active.cells().collect();
        if cells.iter().all(|&(_, y)| y < 0) {
            log::debug!("locked out above the well");
            ctx.events.lost();
            return;
        }
        for (x, y) in cells {
            self.well.set(x, y, self.active.kind);
        }

        let cleared = self.well.clear_full_rows();
        if cleared > 0 {
            let level = ctx.params.level;
            ctx.events
                .score(LINE_POINTS[cleared.min(4)].saturating_mul(level));
            let before = self.lines / LINES_PER_LEVEL;
            self.lines += cleared as u32;
            if self.lines / LINES_PER_LEVEL > before {
                ctx.events.level_clear();
            }
            log::debug!("cleared {} lines ({} total)", cleared, self.lines);
        }

        if !self.spawn_next(ctx.rng) {
            log::debug!("top out");
            ctx.events.lost();
        }
    }

    fn hard_drop(&mut self, ctx: &mut TickCtx<'_>) {
        let mut cells = 0;
        while self.try_move(0, 1) {
            cells += 1;
        }
        ctx.events.score(cells * HARD_DROP_POINTS);
        self.lock(ctx);
    }

    fn hold_piece(&mut self, ctx: &mut TickCtx<'_>) {
        if !self.can_hold {
            return;
        }
        let current = self.active.kind;
        match self.hold.replace(current) {
            None => {
                if !self.spawn_next(ctx.rng) {
                    ctx.events.lost();
                }
            }
            Some(held) => {
                self.active = Piece::spawn(held);
                self.gravity.restart();
                if self.collides(&self.active) {
                    ctx.events.lost();
                }
            }
        }
        self.can_hold = false;
    }

    #[cfg(test)]
    fn force_active(&mut self, kind: PieceKind) {
        self.active = Piece::spawn(kind);
    }
}

impl Game for Tetris {
    type View = TetrisView;

    fn name(&self) -> &'static str {
        "tetris"
    }

    fn default_difficulty(&self) -> Box<dyn Difficulty> {
        Box::new(LinearCurve::tetris())
    }

    fn new_round(&mut self, rng: &mut Pcg32) {
        self.well.clear();
        self.queue.clear();
        self.bag.clear();
        self.hold = None;
        self.lines = 0;
        self.spawn_next(rng);
    }

    /// Only gravity changes between levels; the well carries over
    fn start_level(&mut self, params: &LevelParams, _rng: &mut Pcg32) {
        self.gravity.set_interval(params.spawn_interval_ms);
    }

    fn tick(&mut self, ctx: &mut TickCtx<'_>) {
        let input = ctx.input;
        match input.pressed {
            Some(Direction::Left) => {
                self.try_move(-1, 0);
            }
            Some(Direction::Right) => {
                self.try_move(1, 0);
            }
            Some(Direction::Down) => {
                if self.try_move(0, 1) {
                    ctx.events.score(SOFT_DROP_POINTS);
                }
            }
            Some(Direction::Up) => {
                self.rotate(Spin::Clockwise);
            }
            None => {}
        }
        if let Some(spin) = input.rotate {
            self.rotate(spin);
        }
        if input.hold {
            self.hold_piece(ctx);
        }
        if input.fire {
            self.hard_drop(ctx);
        }

        for _ in 0..self.gravity.tick(ctx.dt_ms) {
            if !self.try_move(0, 1) {
                self.lock(ctx);
            }
        }
    }

    fn view(&self) -> TetrisView {
        TetrisView {
            settled: self.well.iter_occupied().map(|(c, r, k)| (c, r, *k)).collect(),
            active: self.active,
            active_cells: self.active.cells().collect(),
            ghost_y: self.ghost_y(),
            next: self.queue.iter().copied().collect(),
            hold: self.hold,
            lines: self.lines,
        }
    }
}
