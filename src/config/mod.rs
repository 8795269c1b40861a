// Configuration management for Cadenza
// Handles loading/saving app-level config, with sensible defaults when missing

use anyhow::Result;
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub player: PlayerConfig,
    pub provider: ProviderConfig,
    pub download_dir: PathBuf,
}

/// Everything about the external player process and how we talk to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Player binary, must speak the mpv CLI/IPC surface.
    pub binary: String,
    /// Extra args appended after the standard set, before the URL.
    pub extra_args: Vec<String>,
    /// Directory for IPC socket endpoints. Defaults to the OS temp dir.
    pub ipc_dir: Option<PathBuf>,
    /// Seconds per seek_forward/seek_backward press.
    pub seek_step_secs: f64,
    /// Volume percent per vol_up/vol_down press.
    pub volume_step: i64,
    /// Progress redraw interval in milliseconds.
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Search/resolve tool binary, must speak the yt-dlp CLI surface.
    pub binary: String,
    pub search_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            player: PlayerConfig {
                binary: "mpv".to_string(),
                extra_args: Vec::new(),
                ipc_dir: None,
                seek_step_secs: 5.0,
                volume_step: 5,
                poll_interval_ms: 200,
            },
            provider: ProviderConfig {
                binary: "yt-dlp".to_string(),
                search_limit: 10,
            },
            download_dir: PathBuf::from("./downloads"),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path)?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = AppConfig::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(config_path, content)?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("cadenza");

        Ok(config_dir.join("config.toml"))
    }

    /// Where IPC endpoints are created when no override is configured.
    pub fn ipc_dir(&self) -> PathBuf {
        self.player
            .ipc_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_mpv_and_ytdlp() {
        let config = AppConfig::default();
        assert_eq!(config.player.binary, "mpv");
        assert_eq!(config.provider.binary, "yt-dlp");
        assert!(config.player.poll_interval_ms >= 200);
    }

    #[test]
    fn missing_file_writes_defaults_and_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let first = AppConfig::load_from(&path).unwrap();
        assert!(path.exists());

        let second = AppConfig::load_from(&path).unwrap();
        assert_eq!(first.player.binary, second.player.binary);
        assert_eq!(first.player.seek_step_secs, second.player.seek_step_secs);
    }
}
