use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "ritmo.json";

/// Settings remembered between runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub player_name: String,
    pub leaderboard_path: String,
    pub last_bpm: f64,
    pub last_time_signature: u32,
    /// Optional session tunables file; defaults are used when absent.
    pub session_config_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            player_name: String::new(),
            leaderboard_path: "ritmo.db".to_string(),
            last_bpm: 80.0,
            last_time_signature: 4,
            session_config_path: None,
        }
    }
}

impl AppConfig {
    /// Loads config from a specified path.
    /// Returns default config if file doesn't exist.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Saves config to a specified path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
