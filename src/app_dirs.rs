use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// $HOME/.local/state/reckon, or the platform data dir without $HOME
    pub fn state_dir() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("reckon")
        } else if let Some(proj_dirs) = ProjectDirs::from("", "", "reckon") {
            proj_dirs.data_local_dir().to_path_buf()
        } else {
            PathBuf::from(".")
        }
    }

    pub fn results_db_path() -> PathBuf {
        Self::state_dir().join("results.db")
    }

    pub fn log_path() -> PathBuf {
        Self::state_dir().join("reckon.log")
    }

    pub fn config_path() -> PathBuf {
        if let Some(pd) = ProjectDirs::from("", "", "reckon") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("reckon_config.json")
        }
    }
}
