//! Engine configuration

use serde::{Deserialize, Serialize};

/// Engine tunables, usually loaded from the host's configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiblockConfig {
    /// Ticks between recipe searches while a controller is idle
    pub recipe_search_interval: u32,
    /// Ticks between re-checks of unformed controllers, 0 disables re-checking
    pub reform_interval: u32,
}

impl Default for MultiblockConfig {
    fn default() -> Self {
        Self {
            recipe_search_interval: 5,
            reform_interval: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MultiblockConfig::default();
        assert_eq!(config.recipe_search_interval, 5);
        assert_eq!(config.reform_interval, 20);
    }

    #[test]
    fn test_bincode_roundtrip_keeps_values() {
        let config = MultiblockConfig {
            recipe_search_interval: 1,
            reform_interval: 0,
        };
        let bytes = bincode::serialize(&config).unwrap();
        let decoded: MultiblockConfig = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, config);
    }
}
