use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR_NAME: &str = "fra-updater";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AppPathsError {
    #[error("Could not determine home directory")]
    HomeDirUnavailable,
    #[error("Could not determine config directory")]
    ConfigDirUnavailable,
    #[error("Could not determine data directory")]
    DataDirUnavailable,
}

/// Per-user locations of the updater's settings, record store and log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

#[cfg(target_os = "macos")]
fn base_dirs() -> Result<(PathBuf, PathBuf), AppPathsError> {
    // Settings and data share one folder under Application Support.
    let support = dirs::home_dir()
        .ok_or(AppPathsError::HomeDirUnavailable)?
        .join("Library/Application Support");
    Ok((support.clone(), support))
}

#[cfg(not(target_os = "macos"))]
fn base_dirs() -> Result<(PathBuf, PathBuf), AppPathsError> {
    let config = dirs::config_dir().ok_or(AppPathsError::ConfigDirUnavailable)?;
    let data = dirs::data_dir().ok_or(AppPathsError::DataDirUnavailable)?;
    Ok((config, data))
}

impl AppPaths {
    /// Resolve the per-user directories for this platform.
    ///
    /// # Errors
    /// Returns an error when the platform has no home, config or data
    /// directory for the current user.
    pub fn new() -> Result<Self, AppPathsError> {
        let (config_base, data_base) = base_dirs()?;
        Ok(Self {
            config_dir: config_base.join(APP_DIR_NAME),
            data_dir: data_base.join(APP_DIR_NAME),
        })
    }

    /// Keep everything under one directory, as in tests or portable installs.
    #[must_use]
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            config_dir: root.join("config"),
            data_dir: root.join("data"),
        }
    }

    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    /// Record store shared by the update cache and the self-update history.
    #[must_use]
    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("store")
    }

    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("debug.log")
    }

    /// Create the settings and store directories.
    ///
    /// # Errors
    /// Returns an error if a directory cannot be created.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [self.config_dir.clone(), self.store_dir()] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
