use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::LocsongError;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub cache: CacheSettings,
    pub browse: BrowseConfig,
    pub progress: ProgressConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_version: String,
    pub cdn_image_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    pub gc_time_secs: u64,
    pub gc_interval_secs: u64,
    pub max_entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowseConfig {
    pub page_size: u32,
    pub search_debounce_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    pub max_entries: usize,
    pub expire_days: u32,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl BrowseConfig {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

impl AppConfig {
    /// Load config: user file (if exists) merged over built-in defaults.
    ///
    /// Keys missing from the user file keep their default values.
    pub fn load() -> Result<Self, LocsongError> {
        let user_path = Self::config_path();
        if user_path.exists() {
            Self::load_from(&user_path)
        } else {
            Self::from_toml("")
        }
    }

    /// Load config from an explicit file, merged over built-in defaults.
    pub fn load_from(path: &Path) -> Result<Self, LocsongError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| LocsongError::Config(e.to_string()))?;
        Self::from_toml(&content)
    }

    fn from_toml(user: &str) -> Result<Self, LocsongError> {
        let mut merged = parse_table(DEFAULT_CONFIG)?;
        merge_tables(&mut merged, parse_table(user)?);
        toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| LocsongError::Config(e.to_string()))
    }

    /// Save current config to the user config file.
    pub fn save(&self) -> Result<(), LocsongError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), LocsongError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| LocsongError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Path to user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Directory holding the watch-progress file.
    pub fn data_dir() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "locsong")
    }
}

fn parse_table(content: &str) -> Result<toml::Table, LocsongError> {
    content
        .parse::<toml::Table>()
        .map_err(|e| LocsongError::Config(e.to_string()))
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(table) => match base.get_mut(&key) {
                Some(toml::Value::Table(existing)) => merge_tables(existing, table),
                _ => {
                    base.insert(key, toml::Value::Table(table));
                }
            },
            value => {
                base.insert(key, value);
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}
