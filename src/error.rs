//! Errors for the fallible edges around the simulation
//!
//! The simulation itself never fails; only storage and configuration I/O do.

use thiserror::Error;

/// Failure while loading or storing high scores
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("score storage unavailable: {0}")]
    Unavailable(String),
    #[error("failed to access score file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed score data: {0}")]
    Format(#[from] serde_json::Error),
}

/// Failure while loading or storing settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed settings: {0}")]
    Format(#[from] serde_json::Error),
    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("settings storage unavailable: {0}")]
    Unavailable(String),
}
