//! Console configuration: `console.toml`, environment and CLI overrides.
//!
//! Precedence, highest first: CLI flags, `HOMEVOICE_API_URL` / `HOMEVOICE_LOG`,
//! the config file, built-in defaults. A missing default config file is not an
//! error; a missing file passed explicitly with `--config` is.

use homevoice_client::{GatewayConfig, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_API_URL: &str = "HOMEVOICE_API_URL";
pub const ENV_LOG: &str = "HOMEVOICE_LOG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub api: ApiConfig,
    pub log: LogConfig,
    pub export: ExportConfig,
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

impl ConsoleConfig {
    /// `<config_dir>/homevoice/console.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("homevoice").join("console.toml"))
    }

    /// Load from `explicit` or the default location, then layer environment
    /// and CLI overrides on top.
    pub fn resolve(explicit: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        let mut cfg = match explicit {
            Some(path) => Self::load_from(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from(&path)?,
                _ => Self::default(),
            },
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        cfg.apply_overrides(overrides);
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|s| !s.trim().is_empty()) {
            self.api.base_url = url;
        }
        if let Some(level) = lookup(ENV_LOG).filter(|s| !s.trim().is_empty()) {
            self.log.level = level;
        }
    }

    pub fn apply_overrides(&mut self, o: &Overrides) {
        if let Some(url) = &o.base_url {
            self.api.base_url = url.clone();
        }
        if let Some(secs) = o.timeout_secs {
            self.api.timeout_secs = secs;
        }
        if let Some(level) = &o.log_level {
            self.log.level = level.clone();
        }
    }

    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig {
            base_url: self.api.base_url.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs.max(1)),
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log.dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|d| d.join("homevoice").join("logs"))
                .unwrap_or_else(|| PathBuf::from("logs"))
        })
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export.dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api]\nbase_url = \"http://10.0.0.5:5000/api\"").unwrap();
        let cfg = ConsoleConfig::load_from(file.path()).unwrap();
        assert_eq!(cfg.api.base_url, "http://10.0.0.5:5000/api");
        assert_eq!(cfg.api.timeout_secs, 30);
        assert_eq!(cfg.log.level, "info");
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api\nbase_url = 3").unwrap();
        assert!(matches!(
            ConsoleConfig::load_from(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn explicit_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            ConsoleConfig::resolve(Some(&missing), &Overrides::default()),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn cli_beats_env_beats_file() {
        let mut cfg = ConsoleConfig::default();
        cfg.api.base_url = "http://file/api".into();
        cfg.apply_env(|k| match k {
            ENV_API_URL => Some("http://env/api".into()),
            ENV_LOG => Some("debug".into()),
            _ => None,
        });
        assert_eq!(cfg.api.base_url, "http://env/api");
        assert_eq!(cfg.log.level, "debug");

        cfg.apply_overrides(&Overrides {
            base_url: Some("http://cli/api".into()),
            timeout_secs: Some(5),
            log_level: None,
        });
        assert_eq!(cfg.api.base_url, "http://cli/api");
        assert_eq!(cfg.log.level, "debug");
        assert_eq!(cfg.gateway().timeout, Duration::from_secs(5));
    }

    #[test]
    fn blank_env_is_ignored() {
        let mut cfg = ConsoleConfig::default();
        cfg.apply_env(|_| Some("  ".into()));
        assert_eq!(cfg.api.base_url, DEFAULT_BASE_URL);
    }
}
