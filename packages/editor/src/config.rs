use crate::debounce::DebounceConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_NAME: &str = "bio.config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Editor configuration file format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Quiet period before an autosave fires, in milliseconds
    pub debounce_ms: u64,

    /// How long the "saved" status stays visible, in milliseconds
    pub saved_display_ms: u64,

    /// Row count of the layout grid
    pub grid_rows: i32,

    /// Default tracing filter for the CLI
    pub log_level: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1200,
            saved_display_ms: 2000,
            grid_rows: bio_layout::DEFAULT_ROWS,
            log_level: "info".to_string(),
        }
    }
}

impl EditorConfig {
    /// Load config from a directory, falling back to defaults when the file
    /// does not exist
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::path_in(dir);
        if path.exists() {
            Self::load_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: EditorConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON into `dir`
    pub fn save(&self, dir: &Path) -> Result<PathBuf, ConfigError> {
        self.validate()?;
        let path = Self::path_in(dir);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(DEFAULT_CONFIG_NAME)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_ms == 0 {
            return Err(ConfigError::Invalid("debounceMs must be positive".into()));
        }
        if self.grid_rows < bio_layout::MAX_SIZE {
            return Err(ConfigError::Invalid(format!(
                "gridRows must be at least {}",
                bio_layout::MAX_SIZE
            )));
        }
        Ok(())
    }

    pub fn debounce(&self) -> DebounceConfig {
        DebounceConfig {
            delay: Duration::from_millis(self.debounce_ms),
            saved_display: Duration::from_millis(self.saved_display_ms),
        }
    }
}
