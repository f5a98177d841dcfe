//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use ft_core::{DEFAULT_BROWSERS, TrackerConfig};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Largest gap between two observations of the same application that
    /// still extends its focus session.
    pub continuity_threshold_ms: u32,

    /// Time between samples in `ft track`.
    pub sample_interval_ms: u32,

    /// Application names whose observations go to the web track.
    pub browsers: Vec<String>,

    /// Program and arguments printing one JSON observation per run.
    #[serde(default)]
    pub probe_command: Option<Vec<String>>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("continuity_threshold_ms", &self.continuity_threshold_ms)
            .field("sample_interval_ms", &self.sample_interval_ms)
            .field("browsers", &self.browsers)
            .field("probe_command", &self.probe_command)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("ft.db"),
            continuity_threshold_ms: 1500,
            sample_interval_ms: 1000,
            browsers: DEFAULT_BROWSERS.iter().map(ToString::to_string).collect(),
            probe_command: None,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later layers win: defaults, the user config file, `config_path`,
    /// then `FT_*` environment variables.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("FT_"));

        figment.extract()
    }

    /// Tracker settings derived from this configuration.
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            continuity_threshold: chrono::Duration::milliseconds(i64::from(
                self.continuity_threshold_ms,
            )),
            browsers: self.browsers.iter().cloned().collect(),
        }
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.sample_interval_ms))
    }
}

/// Returns the platform-specific config directory for ft.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ft"))
}

/// Returns the platform-specific data directory for ft.
///
/// On Linux: `~/.local/share/ft`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("ft"))
}
