use crate::app_dirs::AppDirs;
use crate::challenge::{difficulty, ChallengeSettings, Difficulty};
use crate::remote::{Dimensions, RemoteSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("round limit ({round_secs}s) exceeds session limit ({session_secs}s)")]
    RoundLongerThanSession { round_secs: u64, session_secs: u64 },

    #[error("difficulty level {level} asks for {items} items, at most {max} fit on the board")]
    TooManyItems {
        level: usize,
        items: usize,
        max: usize,
    },

    #[error("difficulty level {level} has max operand {max_operand}, expected 1..={limit}")]
    OperandOutOfRange {
        level: usize,
        max_operand: i64,
        limit: i64,
    },

    #[error("remote base url must start with http:// or https://: {0}")]
    BaseUrl(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub session_secs: u64,
    pub round_secs: u64,
    pub total_rounds: usize,
    pub settle_delay_ms: u64,
    pub duplicate_retry_cap: usize,
    pub difficulty_table: Vec<Difficulty>,
    pub grid_rows: usize,
    pub grid_cols: usize,
    pub grid_countdown_secs: u64,
    pub animation_tick_ms: u64,
    pub animation_buffer_ms: u64,
    pub remote_base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_secs: 240,
            round_secs: 30,
            total_rounds: 8,
            settle_delay_ms: 400,
            duplicate_retry_cap: 50,
            difficulty_table: difficulty::default_table(),
            grid_rows: 6,
            grid_cols: 6,
            grid_countdown_secs: 180,
            animation_tick_ms: 150,
            animation_buffer_ms: 600,
            remote_base_url: "http://127.0.0.1:8080/api".to_string(),
            request_timeout_secs: 10,
        }
    }
}

const BOARD_CAPACITY: usize = 9;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let nonzero = [
            ("session_secs", self.session_secs),
            ("round_secs", self.round_secs),
            ("total_rounds", self.total_rounds as u64),
            ("grid_rows", self.grid_rows as u64),
            ("grid_cols", self.grid_cols as u64),
            ("grid_countdown_secs", self.grid_countdown_secs),
            ("animation_tick_ms", self.animation_tick_ms),
            ("request_timeout_secs", self.request_timeout_secs),
        ];
        if let Some((field, _)) = nonzero.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Zero { field });
        }

        if self.round_secs > self.session_secs {
            return Err(ConfigError::RoundLongerThanSession {
                round_secs: self.round_secs,
                session_secs: self.session_secs,
            });
        }

        if let Some((level, d)) = self
            .difficulty_table
            .iter()
            .enumerate()
            .find(|(_, d)| d.item_count == 0 || d.item_count > BOARD_CAPACITY)
        {
            if d.item_count == 0 {
                return Err(ConfigError::Zero {
                    field: "difficulty_table.item_count",
                });
            }
            return Err(ConfigError::TooManyItems {
                level: level + 1,
                items: d.item_count,
                max: BOARD_CAPACITY,
            });
        }

        if let Some((level, d)) = self
            .difficulty_table
            .iter()
            .enumerate()
            .find(|(_, d)| !(1..=difficulty::MAX_OPERAND_LIMIT).contains(&d.max_operand))
        {
            return Err(ConfigError::OperandOutOfRange {
                level: level + 1,
                max_operand: d.max_operand,
                limit: difficulty::MAX_OPERAND_LIMIT,
            });
        }

        let url = self.remote_base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::BaseUrl(self.remote_base_url.clone()));
        }

        Ok(())
    }

    pub fn challenge_settings(&self) -> ChallengeSettings {
        ChallengeSettings {
            session_limit: Duration::from_secs(self.session_secs),
            round_limit: Duration::from_secs(self.round_secs),
            total_rounds: self.total_rounds,
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            retry_cap: self.duplicate_retry_cap,
            difficulty_table: self.difficulty_table.clone(),
        }
    }

    pub fn remote_settings(&self) -> RemoteSettings {
        RemoteSettings {
            dimensions: Dimensions {
                rows: self.grid_rows,
                cols: self.grid_cols,
            },
            countdown: Duration::from_secs(self.grid_countdown_secs),
            animation_tick: Duration::from_millis(self.animation_tick_ms),
            animation_buffer: Duration::from_millis(self.animation_buffer_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Missing file means defaults; an unreadable or invalid one is logged
    /// and also falls back to defaults.
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => match cfg.validate() {
                Ok(()) => cfg,
                Err(err) => {
                    warn!(path = %self.path.display(), error = %err, "invalid config, using defaults");
                    Config::default()
                }
            },
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "unreadable config, using defaults");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
