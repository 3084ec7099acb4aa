//! High score persistence
//!
//! The session reads the stored best once when a round is prepared and
//! submits the running score on every change. Sinks are best-effort: a
//! failed write is reported to the caller, which logs it and carries on.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::PersistError;
use crate::highscores::HighScores;

#[cfg(not(target_arch = "wasm32"))]
mod file;
#[cfg(target_arch = "wasm32")]
mod local_storage;

#[cfg(not(target_arch = "wasm32"))]
pub use file::JsonFileSink;
#[cfg(target_arch = "wasm32")]
pub use local_storage::LocalStorageSink;

/// Boards for every game, keyed by game name
pub type ScoreBook = BTreeMap<String, HighScores>;

/// One score report from the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreSubmission<'a> {
    pub game: &'a str,
    pub score: u64,
    pub level: u32,
    /// True for the final report of a round
    pub round_over: bool,
}

/// External high score store
pub trait ScoreSink {
    /// Best stored score for a game (0 when unknown)
    fn load_high(&mut self, game: &str) -> u64;

    fn submit(&mut self, submission: &ScoreSubmission<'_>) -> Result<(), PersistError>;
}

impl<S: ScoreSink + ?Sized> ScoreSink for Rc<RefCell<S>> {
    fn load_high(&mut self, game: &str) -> u64 {
        self.borrow_mut().load_high(game)
    }

    fn submit(&mut self, submission: &ScoreSubmission<'_>) -> Result<(), PersistError> {
        self.borrow_mut().submit(submission)
    }
}

/// Apply a submission to a score book; returns true if anything changed
pub fn apply_submission(book: &mut ScoreBook, submission: &ScoreSubmission<'_>, now_ms: f64) -> bool {
    let board = book.entry(submission.game.to_string()).or_default();
    let mut changed = board.record(submission.score);
    if submission.round_over {
        if let Some(rank) = board.add_score(submission.score, submission.level, now_ms) {
            log::info!(
                "{}: new high score {} (rank {})",
                submission.game,
                submission.score,
                rank
            );
            changed = true;
        }
    }
    changed
}

/// Current wall-clock time in ms, for leaderboard timestamps
#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> f64 {
    js_sys::Date::now()
}

/// In-memory sink (tests, headless runs)
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub book: ScoreBook,
    /// Every submission received, in order
    pub log: Vec<(String, u64, bool)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that already knows a best score for `game`
    pub fn with_high(game: &str, score: u64) -> Self {
        let mut sink = Self::new();
        sink.book.entry(game.to_string()).or_default().record(score);
        sink
    }
}

impl ScoreSink for MemorySink {
    fn load_high(&mut self, game: &str) -> u64 {
        self.book.get(game).map(HighScores::top_score).unwrap_or(0)
    }

    fn submit(&mut self, submission: &ScoreSubmission<'_>) -> Result<(), PersistError> {
        self.log.push((
            submission.game.to_string(),
            submission.score,
            submission.round_over,
        ));
        apply_submission(&mut self.book, submission, 0.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(score: u64, round_over: bool) -> ScoreSubmission<'static> {
        ScoreSubmission {
            game: "snake",
            score,
            level: 1,
            round_over,
        }
    }

    #[test]
    fn test_running_scores_do_not_fill_the_table() {
        let mut sink = MemorySink::new();
        for score in [10, 20, 30] {
            sink.submit(&report(score, false)).unwrap();
        }
        assert_eq!(sink.load_high("snake"), 30);
        assert!(sink.book["snake"].is_empty());

        sink.submit(&report(30, true)).unwrap();
        assert_eq!(sink.book["snake"].entries.len(), 1);
        assert_eq!(sink.log.len(), 4);
    }

    #[test]
    fn test_unknown_game_loads_zero() {
        let mut sink = MemorySink::with_high("pong", 7);
        assert_eq!(sink.load_high("tetris"), 0);
        assert_eq!(sink.load_high("pong"), 7);
    }

    #[test]
    fn test_shared_sink() {
        let shared = Rc::new(RefCell::new(MemorySink::new()));
        let mut handle = shared.clone();
        handle.submit(&report(5, false)).unwrap();
        assert_eq!(shared.borrow().log.len(), 1);
    }
}
