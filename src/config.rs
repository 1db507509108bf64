use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::game::{DEFAULT_BOARD_SIZE, validate_board_size};

/// Settings for a [`crate::registry::GameRegistry`], loadable from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Side length of every board created by the registry.
    pub board_size: u8,
    /// Games untouched for this long are evicted.
    pub game_ttl_secs: u64,
    /// Upper bound on live games; the least recently used one is evicted to make room.
    pub max_games: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            board_size: DEFAULT_BOARD_SIZE,
            game_ttl_secs: 60 * 60,
            max_games: 1024,
        }
    }
}

impl RegistryConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RegistryConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_board_size(self.board_size)
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        if self.game_ttl_secs == 0 {
            return Err(ConfigError::Validation("game_ttl_secs must be > 0".into()));
        }
        if self.max_games == 0 {
            return Err(ConfigError::Validation("max_games must be > 0".into()));
        }
        Ok(())
    }

    pub fn game_ttl(&self) -> Duration {
        Duration::from_secs(self.game_ttl_secs)
    }
}
