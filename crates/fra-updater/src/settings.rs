use std::path::Path;

use fra_core::{DEFAULT_GITHUB_API_BASE, PluginIdentity, UpdateSourceConfig};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdaterSettings {
    #[serde(default)]
    pub update_url: Option<String>,

    #[serde(default)]
    pub github_repo: Option<String>,

    #[serde(default = "default_github_api_base")]
    pub github_api_base: String,

    #[serde(default = "default_current_version")]
    pub current_version: String,

    #[serde(default = "default_plugin_slug")]
    pub plugin_slug: String,

    #[serde(default = "default_plugin_basename")]
    pub plugin_basename: String,

    #[serde(default = "default_plugin_name")]
    pub plugin_name: String,

    #[serde(default)]
    pub nonce_secret: Option<String>,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,
}

fn default_github_api_base() -> String {
    DEFAULT_GITHUB_API_BASE.to_string()
}

fn default_current_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_plugin_slug() -> String {
    PluginIdentity::default().slug
}

fn default_plugin_basename() -> String {
    PluginIdentity::default().basename
}

fn default_plugin_name() -> String {
    PluginIdentity::default().name
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for UpdaterSettings {
    fn default() -> Self {
        Self {
            update_url: None,
            github_repo: None,
            github_api_base: default_github_api_base(),
            current_version: default_current_version(),
            plugin_slug: default_plugin_slug(),
            plugin_basename: default_plugin_basename(),
            plugin_name: default_plugin_name(),
            nonce_secret: None,
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
        }
    }
}

impl UpdaterSettings {
    /// Load and validate settings. A missing file means defaults.
    pub fn load_from_path(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| AppError::SettingsRead {
            path: path.display().to_string(),
            source,
        })?;
        let settings: Self =
            serde_json::from_str(&content).map_err(|source| AppError::SettingsParse {
                path: path.display().to_string(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate and write settings, creating the parent directory.
    pub fn save_to_path(&self, path: &Path) -> Result<(), AppError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|source| AppError::io("create settings dir", source))?;
        }
        let content = serde_json::to_string_pretty(self).map_err(AppError::Json)?;
        std::fs::write(path, content).map_err(|source| AppError::io("write settings", source))
    }

    fn validate(&self) -> Result<(), AppError> {
        self.source_config()?;
        if self.current_version.trim().is_empty() {
            return Err(AppError::InvalidSetting {
                key: "current_version",
                reason: "must not be empty".to_string(),
            });
        }
        if self.plugin_slug.trim().is_empty() || self.plugin_basename.trim().is_empty() {
            return Err(AppError::InvalidSetting {
                key: "plugin_slug",
                reason: "plugin slug and basename must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn source_config(&self) -> Result<UpdateSourceConfig, AppError> {
        UpdateSourceConfig::new(self.update_url.as_deref(), self.github_repo.as_deref())
            .map_err(AppError::from)
    }

    pub fn identity(&self) -> PluginIdentity {
        PluginIdentity {
            slug: self.plugin_slug.clone(),
            basename: self.plugin_basename.clone(),
            name: self.plugin_name.clone(),
        }
    }

    pub fn nonce_secret(&self) -> Result<&str, AppError> {
        self.nonce_secret
            .as_deref()
            .filter(|secret| !secret.trim().is_empty())
            .ok_or(AppError::InvalidSetting {
                key: "nonce_secret",
                reason: "must be set to issue or verify manual-check tokens".to_string(),
            })
    }
}
