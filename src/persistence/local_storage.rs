//! Browser LocalStorage score store (wasm32)

use super::{ScoreBook, ScoreSink, ScoreSubmission, apply_submission, now_ms};
use crate::error::PersistError;

/// LocalStorage key
const STORAGE_KEY: &str = "arcade_loop_highscores";

fn storage() -> Result<web_sys::Storage, PersistError> {
    web_sys::window()
        .and_then(|w| w.local_storage().ok())
        .flatten()
        .ok_or_else(|| PersistError::Unavailable("LocalStorage not available".to_string()))
}

/// Keeps every game's board under one LocalStorage key
#[derive(Debug, Clone, Default)]
pub struct LocalStorageSink {
    book: ScoreBook,
}

impl LocalStorageSink {
    /// Load the stored book; missing or corrupt data starts fresh
    pub fn load() -> Self {
        let book = storage()
            .ok()
            .and_then(|s| s.get_item(STORAGE_KEY).ok().flatten())
            .and_then(|json| serde_json::from_str::<ScoreBook>(&json).ok());

        match book {
            Some(book) => {
                log::info!("Loaded {} score boards", book.len());
                Self { book }
            }
            None => {
                log::info!("No high scores found, starting fresh");
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<(), PersistError> {
        let json = serde_json::to_string(&self.book)?;
        storage()?
            .set_item(STORAGE_KEY, &json)
            .map_err(|_| PersistError::Unavailable("LocalStorage write rejected".to_string()))
    }
}

impl ScoreSink for LocalStorageSink {
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
