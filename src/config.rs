//! Service configuration.
//!
//! Load order: TOML file → environment variables → defaults. The file path
//! comes from `GROUPER_CONFIG`, else `grouper.toml` in the working directory;
//! a missing file is not an error.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "GROUPER_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "grouper.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server listens on.
    pub bind_addr: String,
    /// Largest roster accepted by the generate endpoint.
    pub max_students: usize,
    /// Seed used when a request does not carry one.
    pub default_seed: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            max_students: 500,
            default_seed: 0,
        }
    }
}

fn env_override<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(v) = std::env::var(var) {
        if let Ok(parsed) = v.trim().parse() {
            *target = parsed;
        }
    }
}

impl ServerConfig {
    /// Loads from the configured path with environment overrides applied.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let mut config = Self::from_file(&path)?;

        env_override("GROUPER_BIND_ADDR", &mut config.bind_addr);
        env_override("GROUPER_MAX_STUDENTS", &mut config.max_students);
        env_override("GROUPER_DEFAULT_SEED", &mut config.default_seed);

        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML file, falling back to defaults if it does not exist.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bind_addr.trim().is_empty() {
            anyhow::bail!("bind_addr must not be empty");
        }
        if self.max_students == 0 {
            anyhow::bail!("max_students must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.max_students, 500);
        assert_eq!(config.default_seed, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ServerConfig = toml::from_str("max_students = 40\n").unwrap();
        assert_eq!(config.max_students, 40);
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind_addr = \"0.0.0.0:9000\"\ndefault_seed = 7").unwrap();
        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.default_seed, 7);
        assert_eq!(config.max_students, 500);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::from_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = ServerConfig {
            max_students: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ServerConfig {
            bind_addr: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_students = \"many\"").unwrap();
        assert!(ServerConfig::from_file(file.path()).is_err());
    }
}
