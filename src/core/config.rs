use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_FIXER_URL: &str = "http://data.fixer.io/api";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FixerProviderConfig {
    pub base_url: String,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for FixerProviderConfig {
    fn default() -> Self {
        FixerProviderConfig {
            base_url: DEFAULT_FIXER_URL.to_string(),
            access_key: None,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub fixer: Option<FixerProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            fixer: Some(FixerProviderConfig::default()),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub base_currency: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "stronger", "stronger")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Fixer settings, falling back to the public endpoint when none are configured.
    pub fn fixer(&self) -> FixerProviderConfig {
        self.providers.fixer.clone().unwrap_or_default()
    }
}
