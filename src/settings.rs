//! Loop configuration
//!
//! Persisted as JSON: a file on native builds, LocalStorage in the browser.
//! Anything missing falls back to the defaults.

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_FRAME_DELTA_MS, RESPAWN_INVULN_MS, STARTING_LIVES, TICK_HZ};
use crate::error::SettingsError;

/// Session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Simulation rate (ticks per second)
    pub tick_hz: f64,
    /// Largest frame delta accepted per callback (ms)
    pub max_frame_delta_ms: f64,
    /// Lives at the start of a round
    pub starting_lives: u8,
    /// Invulnerability after a respawn (ms), unless a game overrides it
    pub respawn_invuln_ms: f64,
    /// RNG seed (same seed and inputs replay the same session)
    pub seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_hz: TICK_HZ,
            max_frame_delta_ms: MAX_FRAME_DELTA_MS,
            starting_lives: STARTING_LIVES,
            respawn_invuln_ms: RESPAWN_INVULN_MS,
            seed: 0x5EED,
        }
    }
}

impl Settings {
    /// LocalStorage key
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    const STORAGE_KEY: &'static str = "arcade_loop_settings";

    /// Fixed tick duration (ms)
    pub fn step_ms(&self) -> f64 {
        1000.0 / self.tick_hz
    }

    /// Reject values the scheduler cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.tick_hz.is_finite() && (1.0..=1000.0).contains(&self.tick_hz)) {
            return Err(SettingsError::Invalid {
                field: "tick_hz",
                reason: format!("{} is outside 1..=1000", self.tick_hz),
            });
        }
        if !(self.max_frame_delta_ms.is_finite() && self.max_frame_delta_ms >= self.step_ms()) {
            return Err(SettingsError::Invalid {
                field: "max_frame_delta_ms",
                reason: format!("{} is shorter than one tick", self.max_frame_delta_ms),
            });
        }
        if self.starting_lives == 0 {
            return Err(SettingsError::Invalid {
                field: "starting_lives",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.respawn_invuln_ms.is_finite() && self.respawn_invuln_ms >= 0.0) {
            return Err(SettingsError::Invalid {
                field: "respawn_invuln_ms",
                reason: format!("{} is not a duration", self.respawn_invuln_ms),
            });
        }
        Ok(())
    }

    /// Parse and validate JSON
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from a JSON file (native)
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from(path: &std::path::Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Save to a JSON file (native)
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), SettingsError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load from a file, or defaults if it is missing or unusable
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_or_default(path: &std::path::Path) -> Self {
        match Self::load_from(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(SettingsError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(err) => {
                log::warn!("Ignoring settings in {}: {}", path.display(), err);
                Self::default()
            }
        }
    }

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let json = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .and_then(|s| s.get_item(Self::STORAGE_KEY).ok().flatten());

        match json.map(|j| Self::from_json(&j)) {
            Some(Ok(settings)) => {
                log::info!("Loaded settings from LocalStorage");
                settings
            }
            Some(Err(err)) => {
                log::warn!("Ignoring stored settings: {}", err);
                Self::default()
            }
            None => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) -> Result<(), SettingsError> {
        let json = self.to_json()?;
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or_else(|| SettingsError::Unavailable("LocalStorage not available".to_string()))?;
        storage
            .set_item(Self::STORAGE_KEY, &json)
            .map_err(|_| SettingsError::Unavailable("LocalStorage write rejected".to_string()))?;
        log::info!("Settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert!((settings.step_ms() - 1000.0 / 120.0).abs() < 1e-12);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings = Settings::from_json(r#"{ "starting_lives": 5 }"#).unwrap();
        assert_eq!(settings.starting_lives, 5);
        assert_eq!(settings.tick_hz, TICK_HZ);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = Settings::from_json(r#"{ "tick_hz": 0 }"#).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { field: "tick_hz", .. }));

        let err = Settings::from_json(r#"{ "starting_lives": 0 }"#).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { field: "starting_lives", .. }));

        assert!(matches!(
            Settings::from_json("[1, 2"),
            Err(SettingsError::Format(_))
        ));
    }

    #[test]
    fn test_unwritable_target_is_an_error() {
        let dir = std::env::temp_dir().join(format!("arcade-loop-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        // A directory cannot be overwritten as a file
        let err = Settings::default().save_to(&dir).unwrap_err();
        assert!(matches!(err, SettingsError::Io(_)));
        let _ = std::fs::remove_dir_all(&dir);

        let err = SettingsError::Unavailable("LocalStorage write rejected".to_string());
        assert_eq!(
            err.to_string(),
            "settings storage unavailable: LocalStorage write rejected"
        );
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("arcade-loop-no-such-settings.json");
        assert_eq!(Settings::load_or_default(&path), Settings::default());
    }
}
