//! Server Configuration
//!
//! Read once at startup from environment variables.

use log::warn;
use std::env;
use std::path::PathBuf;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MODEL_DIR: &str = "models";
const DEFAULT_DATABASE_PATH: &str = "career_recommendation.db";

/// Database path value selecting a throwaway in-memory database
pub const IN_MEMORY_DATABASE: &str = ":memory:";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Directory holding scaler.json, model.json and label_encoder.json
    pub model_dir: PathBuf,
    pub database_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            database_path: DEFAULT_DATABASE_PATH.to_string(),
        }
    }
}

impl Config {
    /// HOST, PORT, MODEL_DIR and DATABASE_PATH, each falling back to its default
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!("Invalid PORT value {:?}, using {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            None => defaults.port,
        };

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port,
            model_dir: lookup("MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            database_path: lookup("DATABASE_PATH").unwrap_or(defaults.database_path),
        }
    }

    pub fn uses_in_memory_database(&self) -> bool {
        self.database_path == IN_MEMORY_DATABASE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config_from(&[]), Config::default());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "9000"),
            ("MODEL_DIR", "/srv/models"),
            ("DATABASE_PATH", ":memory:"),
        ]);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.model_dir, PathBuf::from("/srv/models"));
        assert!(config.uses_in_memory_database());
    }

    #[test]
    fn test_invalid_port_falls_back() {
        assert_eq!(config_from(&[("PORT", "eighty")]).port, DEFAULT_PORT);
    }
}
