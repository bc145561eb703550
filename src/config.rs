use crate::error::ConfigError;
use crate::media::VIDEO_EXTENSIONS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

const CONFIG_FILE: &str = "config.json";
const APP_DIR: &str = "corebot";
const BACKGROUND_AUDIO_FILE: &str = "corebot.mp3";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Folder scanned for videos on every reload.
    #[serde(default = "default_media_folder")]
    pub media_folder: PathBuf,
    /// Accepted video extensions, without the dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Audio looped while a video plays. Defaults to `corebot.mp3` in the media folder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_audio: Option<PathBuf>,
    /// Disable the background audio loop entirely.
    #[serde(default)]
    pub mute_background: bool,
    /// External program that plays one video and exits when it ends.
    #[serde(default = "default_player_command")]
    pub player_command: String,
    #[serde(default = "default_player_args")]
    pub player_args: Vec<String>,
    #[serde(default = "default_display_tick_secs")]
    pub display_tick_secs: u64,
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
}

fn default_media_folder() -> PathBuf {
    dirs::download_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn default_extensions() -> Vec<String> {
    VIDEO_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

#[cfg(target_os = "macos")]
fn default_player_command() -> String {
    "open".to_string()
}

#[cfg(target_os = "macos")]
fn default_player_args() -> Vec<String> {
    vec!["-W".to_string()]
}

#[cfg(not(target_os = "macos"))]
fn default_player_command() -> String {
    "mpv".to_string()
}

#[cfg(not(target_os = "macos"))]
fn default_player_args() -> Vec<String> {
    vec!["--really-quiet".to_string()]
}

fn default_display_tick_secs() -> u64 {
    1
}

fn default_check_interval_secs() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Config {
            media_folder: default_media_folder(),
            extensions: default_extensions(),
            background_audio: None,
            mute_background: false,
            player_command: default_player_command(),
            player_args: default_player_args(),
            display_tick_secs: default_display_tick_secs(),
            check_interval_secs: default_check_interval_secs(),
        }
    }
}

impl Config {
    /// Default config file location, e.g. `~/.config/corebot/config.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join(CONFIG_FILE)
    }

    /// Read and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or fall back to defaults if it is missing or unusable.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Config::default();
        }
        match Config::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{}, using defaults", e);
                Config::default()
            }
        }
    }

    /// Write as pretty JSON, creating parent folders.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Invalid(format!("serialize error: {}", e)))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, json).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.display_tick_secs == 0 {
            return Err(ConfigError::Invalid("display_tick_secs must be > 0".to_string()));
        }
        if self.check_interval_secs == 0 {
            return Err(ConfigError::Invalid("check_interval_secs must be > 0".to_string()));
        }
        if self.extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(ConfigError::Invalid("extensions must not be empty".to_string()));
        }
        if self.player_command.trim().is_empty() {
            return Err(ConfigError::Invalid("player_command must not be empty".to_string()));
        }
        Ok(())
    }

    /// The audio file to loop, if any.
    pub fn background_audio_path(&self) -> Option<PathBuf> {
        if self.mute_background {
            return None;
        }
        Some(
            self.background_audio
                .clone()
                .unwrap_or_else(|| self.media_folder.join(BACKGROUND_AUDIO_FILE)),
        )
    }

    pub fn display_tick(&self) -> Duration {
        Duration::from_secs(self.display_tick_secs)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}
