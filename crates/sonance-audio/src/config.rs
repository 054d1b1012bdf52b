//! Audio configuration.
//!
//! Loaded from a TOML file; missing keys take their defaults.
//!
//! ```toml
//! backend = "rodio"
//! max_sounds = 200
//! default_volume = 0.8
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::backend::BackendKind;
use crate::error::{AudioError, AudioResult};
use crate::handle::MAX_SOUND_CHANNELS;
use crate::instance::{MAX_VOLUME, MIN_VOLUME};

/// Configuration file name.
pub const CONFIG_FILE: &str = "sonance.toml";

/// Audio layer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Backend installed by `AudioManager::init_from_config`.
    pub backend: BackendKind,
    /// Capacity of the sound table.
    pub max_sounds: usize,
    /// Volume applied to every newly created sound (0.0-1.0).
    pub default_volume: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            max_sounds: MAX_SOUND_CHANNELS,
            default_volume: MAX_VOLUME,
        }
    }
}

impl AudioConfig {
    /// Create config with the given backend.
    #[must_use]
    pub const fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Create config with max sounds.
    #[must_use]
    pub const fn with_max_sounds(mut self, max: usize) -> Self {
        self.max_sounds = max;
        self
    }

    /// Create config with default volume.
    #[must_use]
    pub const fn with_volume(mut self, volume: f32) -> Self {
        self.default_volume = volume;
        self
    }

    /// Parse TOML, clamping out-of-range values.
    pub fn parse(contents: &str) -> AudioResult<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| AudioError::InvalidArgument(e.to_string()))?;
        Ok(config.normalized())
    }

    /// Clamp the volume into range and keep at least one slot.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.default_volume = if self.default_volume.is_finite() {
            self.default_volume.clamp(MIN_VOLUME, MAX_VOLUME)
        } else {
            MAX_VOLUME
        };
        self.max_sounds = self.max_sounds.max(1);
        self
    }

    /// Load configuration from a specific path.
    /// Returns default config if the file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match Self::parse(&contents) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path, creating parent directories.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> AudioResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| AudioError::InvalidArgument(e.to_string()))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_config_default() {
        let config = AudioConfig::default();
        assert_eq!(config.backend, BackendKind::Rodio);
        assert_eq!(config.max_sounds, MAX_SOUND_CHANNELS);
        assert!((config.default_volume - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_audio_config_builder() {
        let config = AudioConfig::default()
            .with_backend(BackendKind::Null)
            .with_max_sounds(16)
            .with_volume(0.8);

        assert_eq!(config.backend, BackendKind::Null);
        assert_eq!(config.max_sounds, 16);
        assert!((config.default_volume - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_partial() {
        let config = AudioConfig::parse("backend = \"null\"\n").expect("parse");
        assert_eq!(config.backend, BackendKind::Null);
        assert_eq!(config.max_sounds, MAX_SOUND_CHANNELS);
    }

    #[test]
    fn test_parse_clamps() {
        let config = AudioConfig::parse("max_sounds = 0\ndefault_volume = 3.5\n").expect("parse");
        assert_eq!(config.max_sounds, 1);
        assert!((config.default_volume - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_rejects_unknown_backend() {
        let result = AudioConfig::parse("backend = \"openal\"\n");
        assert!(matches!(result, Err(AudioError::InvalidArgument(_))));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = AudioConfig::load_from(dir.path().join(CONFIG_FILE));
        assert_eq!(config, AudioConfig::default());
    }

    #[test]
    fn test_load_invalid_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "max_sounds = \"lots\"").expect("write");
        assert_eq!(AudioConfig::load_from(&path), AudioConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let config = AudioConfig::default()
            .with_backend(BackendKind::Null)
            .with_max_sounds(8)
            .with_volume(0.5);

        config.save_to(&path).expect("save");
        assert_eq!(AudioConfig::load_from(&path), config);
    }

    #[test]
    fn test_save_reports_io_errors() {
        let dir = tempfile::tempdir().expect("temp dir");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").expect("write");

        let result = AudioConfig::default().save_to(blocker.join(CONFIG_FILE));
        assert!(matches!(result, Err(AudioError::Io(_))));
    }
}
