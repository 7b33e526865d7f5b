//! Settings file loading.
//!
//! Settings come from a YAML file; every section has defaults so a missing
//! file still yields a runnable (if source-less) server. A few values can be
//! overridden from the command line or environment, see [`crate::cli`].

use crate::scrapers::registry::SourceRegistry;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unknown environment `{0}` (expected development, production or test)")]
    Environment(String),
}

/// Runtime environment marker.
///
/// `Test` suppresses the process signal listener so embedding the server in
/// tests does not steal Ctrl-C from the harness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnv {
    #[default]
    Development,
    Production,
    Test,
}

impl std::str::FromStr for RuntimeEnv {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(RuntimeEnv::Development),
            "production" | "prod" => Ok(RuntimeEnv::Production),
            "test" => Ok(RuntimeEnv::Test),
            other => Err(ConfigError::Environment(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub environment: RuntimeEnv,
    pub server: ServerSettings,
    pub content: ContentSettings,
    pub scraper: ScraperSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContentSettings {
    /// Directory holding `articles.json` and `events.json`. Without one the
    /// corpus lives in memory only.
    pub snapshot_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperSettings {
    /// Seconds between background passes; unset means a single pass per start.
    pub interval_secs: Option<u64>,
    /// How many sources a pass scrapes at once.
    pub concurrency: usize,
    pub request_timeout_secs: u64,
    pub max_retries: usize,
    pub sources: SourceRegistry,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            interval_secs: None,
            concurrency: 4,
            request_timeout_secs: 20,
            max_retries: 3,
            sources: SourceRegistry::default(),
        }
    }
}

impl ScraperSettings {
    pub fn interval(&self) -> Option<Duration> {
        self.interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults when the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            warn!(path = %path.display(), "Settings file not found; using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            path = %path.display(),
            sources = settings.scraper.sources.len(),
            environment = ?settings.environment,
            "Loaded settings"
        );
        Ok(settings)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.environment, RuntimeEnv::Development);
        assert_eq!(settings.server.bind_addr(), "0.0.0.0:3000");
        assert!(settings.content.snapshot_dir.is_none());
        assert!(settings.scraper.interval().is_none());
        assert!(settings.scraper.sources.is_empty());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let settings = Settings::from_yaml(
            r#"
environment: production
server:
  port: 8080
scraper:
  interval_secs: 900
  sources:
    weather:
      sourceName: Weather Service
      url: https://example.org/weather.xml
      kind: { type: rss }
"#,
        )
        .unwrap();

        assert_eq!(settings.environment, RuntimeEnv::Production);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.scraper.concurrency, 4);
        assert_eq!(settings.scraper.interval(), Some(Duration::from_secs(900)));
        assert!(settings.scraper.sources.lookup("Weather Service").is_some());
    }

    #[test]
    fn test_zero_interval_means_single_pass() {
        let settings = Settings::from_yaml("scraper:\n  interval_secs: 0\n").unwrap();
        assert!(settings.scraper.interval().is_none());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let settings = Settings::load(Path::new("/nonexistent/portal.yaml")).unwrap();
        assert_eq!(settings.server.port, 3000);
    }

    #[test]
    fn test_runtime_env_from_str() {
        assert_eq!("PROD".parse::<RuntimeEnv>().unwrap(), RuntimeEnv::Production);
        assert_eq!("test".parse::<RuntimeEnv>().unwrap(), RuntimeEnv::Test);
        assert!("staging".parse::<RuntimeEnv>().is_err());
    }
}
