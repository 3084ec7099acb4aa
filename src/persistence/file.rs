//! JSON file score store (native)

use std::fs;
use std::path::{Path, PathBuf};

use super::{ScoreBook, ScoreSink, ScoreSubmission, apply_submission, now_ms};
use crate::error::PersistError;

/// Keeps every game's board in one JSON file
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
    book: ScoreBook,
}

impl JsonFileSink {
    /// Open (or start) a score file; a missing file is an empty book
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let path = path.into();
        let book = match fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => ScoreBook::new(),
            Err(err) => return Err(err.into()),
        };
        log::info!("Loaded {} score boards from {}", book.len(), path.display());
        Ok(Self { path, book })
    }

    /// Open, falling back to an empty in-memory book on any error
    pub fn open_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::open(&path) {
            Ok(sink) => sink,
            Err(err) => {
                log::warn!("Ignoring unreadable score file {}: {}", path.display(), err);
                Self {
                    path,
                    book: ScoreBook::new(),
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn book(&self) -> &ScoreBook {
        &self.book
    }

    /// Write the whole book, via a temp file so a crash never truncates it
    pub fn save(&self) -> Result<(), PersistError> {
        let json = serde_json::to_string_pretty(&self.book)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl ScoreSink for JsonFileSink {
    fn load_high(&mut self, game: &str) -> u64 {
        self.book.get(game).map(|b| b.top_score()).unwrap_or(0)
    }

    fn submit(&mut self, submission: &ScoreSubmission<'_>) -> Result<(), PersistError> {
        if apply_submission(&mut self.book, submission, now_ms()) {
            self.save()?;
        }
        Ok(())
    }
}
