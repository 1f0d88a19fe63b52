//! Client configuration.
//!
//! Values are resolved in this order: command-line flag (or its environment
//! variable, handled by clap), `~/.repodigest/config.json`, built-in default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::api::DEFAULT_TIMEOUT_SECS;
use crate::domain::PatternMode;
use crate::session::{FormValues, DEFAULT_DISMISS_AFTER};
use crate::size_scale::{DEFAULT_SIZE_KB, MAX_SIZE_KB};

/// Default ingestion service
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000/";

const CONFIG_DIR_NAME: &str = ".repodigest";
const CONFIG_FILE_NAME: &str = "config.json";

/// On-disk configuration; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub server_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub dismiss_after_secs: Option<u64>,
    pub csrf_token: Option<String>,
    pub default_max_file_size_kb: Option<u32>,
    pub pattern_mode: Option<PatternMode>,
}

/// Values given on the command line (or via their environment variables).
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub server_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub csrf_token: Option<String>,
}

/// Resolved configuration
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub server_url: String,
    pub timeout: Duration,
    pub dismiss_after: Duration,
    pub csrf_token: Option<String>,
    pub default_max_file_size_kb: u32,
    pub pattern_mode: PatternMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            dismiss_after: DEFAULT_DISMISS_AFTER,
            csrf_token: None,
            default_max_file_size_kb: DEFAULT_SIZE_KB,
            pattern_mode: PatternMode::Exclude,
        }
    }
}

impl Config {
    /// Load the config file (from `path`, or the default location) and apply overrides.
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let file = match path {
            Some(path) => Self::read_file(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::read_file(&path).unwrap_or_else(|e| {
                    warn!("Ignoring config file {:?}: {:#}", path, e);
                    ConfigFile::default()
                }),
                _ => ConfigFile::default(),
            },
        };
        Ok(Self::resolve(file, overrides))
    }

    /// `~/.repodigest/config.json`, if a home directory is known.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    fn read_file(path: &Path) -> Result<ConfigFile> {
        let content = std::fs::read_to_string(path)?;
        let file = serde_json::from_str(&content).context("Invalid config JSON")?;
        debug!("Loaded config from {:?}", path);
        Ok(file)
    }

    fn resolve(file: ConfigFile, overrides: ConfigOverrides) -> Self {
        let defaults = Self::default();

        let timeout_secs = overrides
            .timeout_secs
            .or(file.timeout_secs)
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let default_max_file_size_kb = file
            .default_max_file_size_kb
            .filter(|kb| (1..=MAX_SIZE_KB).contains(kb))
            .unwrap_or(defaults.default_max_file_size_kb);

        Self {
            server_url: overrides
                .server_url
                .or(file.server_url)
                .unwrap_or(defaults.server_url),
            timeout: Duration::from_secs(timeout_secs),
            dismiss_after: file
                .dismiss_after_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.dismiss_after),
            csrf_token: overrides
                .csrf_token
                .or(file.csrf_token)
                .filter(|t| !t.trim().is_empty()),
            default_max_file_size_kb,
            pattern_mode: file.pattern_mode.unwrap_or(defaults.pattern_mode),
        }
    }

    /// Form values a new session starts with.
    pub fn initial_form(&self) -> FormValues {
        let mut form = FormValues {
            pattern_mode: self.pattern_mode,
            ..FormValues::default()
        };
        form.set_size_kb(self.default_max_file_size_kb);
        form
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server_url", &self.server_url)
            .field("timeout", &self.timeout)
            .field("dismiss_after", &self.dismiss_after)
            .field("csrf_token", &self.csrf_token.as_ref().map(|_| "[REDACTED]"))
            .field("default_max_file_size_kb", &self.default_max_file_size_kb)
            .field("pattern_mode", &self.pattern_mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::resolve(ConfigFile::default(), ConfigOverrides::default());
        assert_eq!(config, Config::default());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.dismiss_after, Duration::from_secs(5));
        assert_eq!(config.initial_form().max_file_size_kb(), 50);
    }

    #[test]
    fn test_overrides_win_over_file() {
        let file = ConfigFile {
            server_url: Some("http://file.example/".to_string()),
            timeout_secs: Some(60),
            csrf_token: Some("from-file".to_string()),
            ..ConfigFile::default()
        };
        let overrides = ConfigOverrides {
            server_url: Some("http://flag.example/".to_string()),
            timeout_secs: None,
            csrf_token: Some("from-flag".to_string()),
        };
        let config = Config::resolve(file, overrides);
        assert_eq!(config.server_url, "http://flag.example/");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.csrf_token.as_deref(), Some("from-flag"));
    }

    #[test]
    fn test_out_of_range_values_fall_back() {
        let file = ConfigFile {
            timeout_secs: Some(0),
            default_max_file_size_kb: Some(MAX_SIZE_KB + 1),
            csrf_token: Some("  ".to_string()),
            ..ConfigFile::default()
        };
        let config = Config::resolve(file, ConfigOverrides::default());
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.default_max_file_size_kb, DEFAULT_SIZE_KB);
        assert_eq!(config.csrf_token, None);
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"server_url":"http://ingest.local/","pattern_mode":"include","default_max_file_size_kb":1024,"dismiss_after_secs":2}"#,
        )
        .unwrap();

        let config = Config::load(Some(&path), ConfigOverrides::default()).unwrap();
        assert_eq!(config.server_url, "http://ingest.local/");
        assert_eq!(config.pattern_mode, PatternMode::Include);
        assert_eq!(config.dismiss_after, Duration::from_secs(2));

        let form = config.initial_form();
        assert_eq!(form.pattern_mode, PatternMode::Include);
        assert_eq!(form.max_file_size_kb(), 1024);
    }

    #[test]
    fn test_default_cutoff_is_not_snapped_to_slider() {
        let config = Config {
            default_max_file_size_kb: 200,
            ..Config::default()
        };
        let form = config.initial_form();
        assert_eq!(form.size_kb, Some(200));
        assert_eq!(form.max_file_size_kb(), 200);
    }

    #[test]
    fn test_explicit_invalid_file_is_an_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(Config::load(Some(&path), ConfigOverrides::default()).is_err());
        assert!(Config::load(Some(&tmp.path().join("missing.json")), ConfigOverrides::default())
            .is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = Config {
            csrf_token: Some("secret-token-123".to_string()),
            ..Config::default()
        };
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("secret-token-123"));
    }
}
