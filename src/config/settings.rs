//! Application settings and paths.
//!
//! Settings live in an XDG-compliant config directory and only provide
//! defaults; anything given on the command line wins.

use crate::error::{ConfigError, ConfigResult};
use crate::types::DEFAULT_HOST_LIMIT;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application directory paths following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/portsweep)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Locate the platform directories. Nothing is created on disk.
    pub fn discover() -> ConfigResult<Self> {
        let project =
            ProjectDirs::from("", "", "portsweep").ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Defaults applied to every scan unless overridden on the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Maximum simultaneous connect attempts.
    pub concurrency: usize,
    /// Per-attempt connect timeout in seconds.
    pub timeout_secs: f64,
    /// Grab banners by default.
    pub banner: bool,
    /// Banner read timeout in milliseconds.
    pub banner_timeout_ms: u64,
    /// Maximum banner bytes read per open port.
    pub banner_max_bytes: usize,
    /// Largest target set accepted without an explicit override.
    pub max_hosts: u64,
}

impl AppSettings {
    pub const DEFAULT_MAX_HOSTS: u64 = DEFAULT_HOST_LIMIT;
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            concurrency: 500,
            timeout_secs: 1.0,
            banner: false,
            banner_timeout_ms: 500,
            banner_max_bytes: 1024,
            max_hosts: Self::DEFAULT_MAX_HOSTS,
        }
    }
}

impl AppSettings {
    /// Load settings from the default location, falling back to built-in
    /// defaults when no settings file exists.
    pub fn load() -> ConfigResult<Self> {
        let file = Paths::discover()?.settings_file();
        if !file.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&file)
    }

    /// Load settings from a specific file. The file must exist.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))
    }
}
