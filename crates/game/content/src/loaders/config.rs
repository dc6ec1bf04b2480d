//! Game configuration loader.

use std::path::Path;

use arena_core::GameConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for gameplay tunables from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config data from a TOML file.
    ///
    /// Missing keys keep their [`GameConfig::default`] values.
    pub fn load(path: &Path) -> LoadResult<GameConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<GameConfig> {
        let config: GameConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;
        anyhow::ensure!(
            (0.0..=1.0).contains(&config.knock_down_health_fraction),
            "knock_down_health_fraction must be within [0, 1], got {}",
            config.knock_down_health_fraction
        );
        anyhow::ensure!(
            config.move_speed_min <= config.move_speed_max,
            "move_speed_min ({}) exceeds move_speed_max ({})",
            config.move_speed_min,
            config.move_speed_max
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_use_defaults() {
        let config = ConfigLoader::parse("drop_radius = 80.0").unwrap();
        assert_eq!(config.drop_radius, 80.0);
        assert_eq!(config.revive_duration, GameConfig::DEFAULT_REVIVE_DURATION);
    }

    #[test]
    fn out_of_range_fraction_is_rejected() {
        assert!(ConfigLoader::parse("knock_down_health_fraction = 1.5").is_err());
    }
}
