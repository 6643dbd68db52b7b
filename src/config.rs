//=========================================================================
// Configuration
//=========================================================================
//
// Engine pacing and tower-climb tuning, loaded from a RON document.
//
//   (
//       engine: (tps: 60.0, channel_capacity: 128),
//       tower: (max_floor: 100, boss_interval: 10),
//   )
//
// Every field is optional; omitted fields take their defaults.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use serde::Deserialize;
use thiserror::Error;

//=== ConfigError =========================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config is not valid RON: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

//=== EngineConfig ========================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Logic ticks per second.
    pub tps: f64,

    /// Capacity of the engine command channel.
    pub channel_capacity: usize,

    /// Upper bound on commands handled in a single tick.
    pub commands_per_tick: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tps: 60.0,
            channel_capacity: 128,
            commands_per_tick: 32,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tps.is_nan() || self.tps <= 0.0 {
            return Err(ConfigError::Invalid(format!("tps must be positive, got {}", self.tps)));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid("channel_capacity must be positive".into()));
        }
        if self.commands_per_tick == 0 {
            return Err(ConfigError::Invalid("commands_per_tick must be positive".into()));
        }
        Ok(())
    }
}

//=== TowerConfig =========================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TowerConfig {
    /// Last floor of the tower; clearing it clears the game.
    pub max_floor: u32,

    /// Every floor divisible by this gets a boss map.
    pub boss_interval: u32,

    /// Side length of the first floor's map.
    pub base_map_size: u32,

    /// Growth of the map side per `map_size_interval` floors.
    pub map_size_step: u32,
    pub map_size_interval: u32,

    /// Boot splash progress per second.
    pub splash_speed: f32,

    /// Pause after the splash completes, in seconds.
    pub post_splash_delay: f32,

    pub map_seed: u64,
    pub save_path: PathBuf,
}

impl Default for TowerConfig {
    fn default() -> Self {
        Self {
            max_floor: 100,
            boss_interval: 10,
            base_map_size: 50,
            map_size_step: 5,
            map_size_interval: 10,
            splash_speed: 0.5,
            post_splash_delay: 1.0,
            map_seed: 0x7057_3EED,
            save_path: PathBuf::from("saves/progress.ron"),
        }
    }
}

impl TowerConfig {
    /// Side length of the map generated for `floor`.
    pub fn map_size_for(&self, floor: u32) -> u32 {
        self.base_map_size + (floor / self.map_size_interval) * self.map_size_step
    }

    pub fn is_boss_floor(&self, floor: u32) -> bool {
        floor % self.boss_interval == 0
    }

    pub fn post_splash_delay(&self) -> Duration {
        Duration::try_from_secs_f32(self.post_splash_delay.max(0.0)).unwrap_or(Duration::ZERO)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_floor == 0 {
            return Err(ConfigError::Invalid("max_floor must be at least 1".into()));
        }
        if self.boss_interval == 0 || self.map_size_interval == 0 {
            return Err(ConfigError::Invalid("floor intervals must be positive".into()));
        }
        if self.base_map_size == 0 {
            return Err(ConfigError::Invalid("base_map_size must be positive".into()));
        }
        if self.splash_speed.is_nan() || self.splash_speed <= 0.0 {
            return Err(ConfigError::Invalid("splash_speed must be positive".into()));
        }
        if !self.post_splash_delay.is_finite() {
            return Err(ConfigError::Invalid("post_splash_delay must be finite".into()));
        }
        Ok(())
    }
}

//=== Config ==============================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub tower: TowerConfig,
}

impl Config {
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = ron::from_str(text)?;
        config.engine.validate()?;
        config.tower.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_ron_str(&text)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::from_ron_str("()").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.tower.max_floor, 100);
        assert_eq!(config.engine.tps, 60.0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_ron_str("(tower: (max_floor: 30))").unwrap();
        assert_eq!(config.tower.max_floor, 30);
        assert_eq!(config.tower.boss_interval, 10);
        assert_eq!(config.engine.channel_capacity, 128);
    }

    #[test]
    fn map_size_grows_every_ten_floors() {
        let tower = TowerConfig::default();
        assert_eq!(tower.map_size_for(1), 50);
        assert_eq!(tower.map_size_for(9), 50);
        assert_eq!(tower.map_size_for(10), 55);
        assert_eq!(tower.map_size_for(25), 60);
        assert!(tower.is_boss_floor(20));
        assert!(!tower.is_boss_floor(21));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            Config::from_ron_str("(engine: (tps: 0.0))"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_ron_str("(tower: (boss_interval: 0))"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(Config::from_ron_str("(tower: "), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tower.ron");
        fs::write(&path, "(engine: (tps: 30.0))").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.engine.tps, 30.0);

        let missing = Config::load(dir.path().join("nope.ron"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
