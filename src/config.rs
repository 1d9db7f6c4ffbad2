//! Settings file and directory lookup.
//!
//! Directories resolve in this order: `--config-dir`, `SCENERY_CONFIG_DIR`, the
//! working directory when it already holds `scenery.json` or `scenery.log`, then
//! the platform config/data dirs (`~/.config/scenery`, `~/.local/share/scenery`
//! on Linux).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::actions::ExportSettings;
use crate::host::{ExportFormat, ExportOptions};

/// Settings file name inside the config directory
pub const SETTINGS_FILE: &str = "scenery.json";
/// Default log file name inside the data directory
pub const LOG_FILE: &str = "scenery.log";

const APP_DIR: &str = "scenery";
const ENV_CONFIG_DIR: &str = "SCENERY_CONFIG_DIR";

/// Where settings and logs live.
///
/// `override_dir` comes from `--config-dir` or `SCENERY_CONFIG_DIR` and, when set,
/// holds both settings and logs.
#[derive(Debug, Clone, Default)]
pub struct PathConfig {
    pub override_dir: Option<PathBuf>,
}

impl PathConfig {
    /// CLI directory first, then the environment.
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let override_dir = cli_dir.or_else(|| std::env::var_os(ENV_CONFIG_DIR).map(PathBuf::from));
        Self { override_dir }
    }

    pub fn config_file(&self, name: &str) -> PathBuf {
        self.dir(dirs_next::config_dir()).join(name)
    }

    pub fn data_file(&self, name: &str) -> PathBuf {
        self.dir(dirs_next::data_dir()).join(name)
    }

    /// Create the settings and log folders if missing.
    pub fn ensure_dirs(&self) -> Result<()> {
        let config_dir = self.dir(dirs_next::config_dir());
        let data_dir = self.dir(dirs_next::data_dir());
        for dir in [&config_dir, &data_dir] {
            fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }

    fn dir(&self, platform: Option<PathBuf>) -> PathBuf {
        if let Some(dir) = &self.override_dir {
            return dir.clone();
        }
        // A working directory that already has our files acts as a portable install
        if let Ok(cwd) = std::env::current_dir() {
            if [SETTINGS_FILE, LOG_FILE].iter().any(|f| cwd.join(f).exists()) {
                return cwd;
            }
        }
        platform.map_or_else(|| PathBuf::from("."), |dir| dir.join(APP_DIR))
    }
}

/// Server settings, persisted as `scenery.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Permissive CORS (all origins, all headers, credentials)
    pub cors: bool,
    /// Delay between bridge ticks
    pub tick_interval_ms: u64,
    /// Upper bound on requests handled in one tick
    pub max_requests_per_tick: usize,
    /// HTTP worker threads; rouille picks a default when unset
    pub pool_size: Option<usize>,
    /// Export folder, relative to the project folder
    pub models_dir: String,
    pub export_format: ExportFormat,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            cors: true,
            tick_interval_ms: 100,
            max_requests_per_tick: 32,
            pool_size: None,
            models_dir: "models".to_string(),
            export_format: ExportFormat::Glb,
        }
    }
}

impl ServerSettings {
    /// Load from `path`; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path).with_context(|| format!("Failed to read settings: {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Failed to parse settings: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, json).with_context(|| format!("Failed to write settings: {}", path.display()))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn export_settings(&self) -> ExportSettings {
        ExportSettings {
            models_dir: self.models_dir.clone(),
            options: ExportOptions::new(self.export_format),
        }
    }
}
