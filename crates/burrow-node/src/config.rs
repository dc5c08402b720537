//! Node configuration

use burrow_dht::{DhtConfig, DEFAULT_KEY_BITS, DEFAULT_K, MAX_ID};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Key width in bits
    pub key_bits: usize,

    /// Lookup parallelism and answer fan-out
    pub k: usize,

    /// Maximum number of concurrently pending operations
    pub capacity: usize,

    /// Addresses of peers to contact on startup
    pub bootstrap: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_bits: DEFAULT_KEY_BITS,
            k: DEFAULT_K,
            capacity: MAX_ID as usize,
            bootstrap: vec![],
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// The engine-level slice of this configuration
    pub fn dht(&self) -> DhtConfig {
        DhtConfig {
            key_bits: self.key_bits,
            k: self.k,
            capacity: self.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_engine_constants() {
        let config = Config::default();
        assert_eq!(config.key_bits, DEFAULT_KEY_BITS);
        assert_eq!(config.k, DEFAULT_K);
        assert_eq!(config.capacity, MAX_ID as usize);
    }

    #[test]
    fn load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config {
            key_bits: 64,
            k: 5,
            capacity: 16,
            bootstrap: vec!["seed-node".to_string()],
        };
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.key_bits, 64);
        assert_eq!(loaded.k, 5);
        assert_eq!(loaded.capacity, 16);
        assert_eq!(loaded.bootstrap, vec!["seed-node".to_string()]);
    }
}
