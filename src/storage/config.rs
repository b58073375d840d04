//! Tool settings
//!
//! Settings are read from `config.toml` in the global config directory
//! (`~/.config/cac/config.toml` on Linux) and from `cac.toml` next to the
//! manifest. Values in `cac.toml` win over global ones; command-line flags win
//! over both.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::LogFormat;

/// Name of the settings file next to a manifest
pub const LOCAL_SETTINGS_FILE: &str = "cac.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to parse settings file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// Settings as written in one file; unset keys fall through to the next layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsFile {
    pub parallel_deploy: Option<bool>,
    pub continue_on_error: Option<bool>,
    pub log_format: Option<LogFormat>,
}

impl SettingsFile {
    /// Layers `other` on top of `self`
    fn overlay(self, other: SettingsFile) -> SettingsFile {
        SettingsFile {
            parallel_deploy: other.parallel_deploy.or(self.parallel_deploy),
            continue_on_error: other.continue_on_error.or(self.continue_on_error),
            log_format: other.log_format.or(self.log_format),
        }
    }

    fn read(path: &Path) -> Result<Option<SettingsFile>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;

        let file = toml::from_str(&content).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Some(file))
    }
}

/// Effective settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Deploy independent components concurrently
    pub parallel_deploy: bool,

    /// Default for `--continue-on-error`
    pub continue_on_error: bool,

    pub log_format: LogFormat,

    /// Files the settings were read from, lowest precedence first
    pub sources: Vec<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            parallel_deploy: true,
            continue_on_error: false,
            log_format: LogFormat::Text,
            sources: Vec::new(),
        }
    }
}

impl Settings {
    /// Loads the global settings and the settings next to `manifest`
    pub fn load(manifest: Option<&Path>) -> Result<Self> {
        let global = Self::global_config_dir().map(|dir| dir.join("config.toml"));
        let local = manifest.map(Self::local_path);
        Self::from_files(global.as_deref(), local.as_deref())
    }

    /// Loads settings from explicit files; missing files are skipped
    pub fn from_files(global: Option<&Path>, local: Option<&Path>) -> Result<Self> {
        let mut merged = SettingsFile::default();
        let mut sources = Vec::new();

        for path in [global, local].into_iter().flatten() {
            if let Some(file) = SettingsFile::read(path)? {
                merged = merged.overlay(file);
                sources.push(path.to_path_buf());
            }
        }

        let defaults = Settings::default();
        Ok(Settings {
            parallel_deploy: merged.parallel_deploy.unwrap_or(defaults.parallel_deploy),
            continue_on_error: merged.continue_on_error.unwrap_or(defaults.continue_on_error),
            log_format: merged.log_format.unwrap_or(defaults.log_format),
            sources,
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "cac", "cac").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Path of the settings file belonging to a manifest
    pub fn local_path(manifest: &Path) -> PathBuf {
        manifest
            .parent()
            .map(|dir| dir.join(LOCAL_SETTINGS_FILE))
            .unwrap_or_else(|| PathBuf::from(LOCAL_SETTINGS_FILE))
    }
}
