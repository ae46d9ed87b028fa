//! User configuration and per-game settings.
//!
//! The configuration file lives at `~/.config/baduk-rust/config.toml` (or the
//! platform equivalent). A missing file means defaults; a present but broken
//! file is an error.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::board::Color;
use crate::constants::{
    APP_NAME, DEFAULT_BOARD_SIZE, DEFAULT_ENGINE_PATH, DEFAULT_KOMI, DEFAULT_LEVEL,
    ENGINE_NAME_PREFIX, MAX_BOARD_SIZE, MAX_LEVEL, MIN_BOARD_SIZE, MIN_LEVEL,
};
use crate::error::ConfigError;
use crate::reader::GameInfo;

/// Engine binary and new-game defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path or name of the GTP engine binary.
    pub path: String,
    pub default_board_size: usize,
    pub default_komi: f64,
    pub default_level: u8,
    /// Extra arguments appended after the standard GTP-mode arguments.
    pub extra_args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_ENGINE_PATH.to_string(),
            default_board_size: DEFAULT_BOARD_SIZE,
            default_komi: DEFAULT_KOMI,
            default_level: DEFAULT_LEVEL,
            extra_args: Vec::new(),
        }
    }
}

/// Game record settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub enabled: bool,
    /// Directory for SGF records; defaults to the platform data directory.
    pub history_dir: Option<PathBuf>,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            history_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub recording: RecordingConfig,
}

impl Config {
    /// Default location of the configuration file, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join("config.toml"))
    }

    /// Load from the default location, falling back to defaults when the
    /// platform has no config directory or the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_game_settings(
            self.engine.default_board_size,
            self.engine.default_komi,
            self.engine.default_level,
        )?;
        if self.engine.path.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "engine path is empty".to_string(),
            });
        }
        Ok(())
    }

    /// Directory where game records are written and listed.
    pub fn history_dir(&self) -> PathBuf {
        if let Some(dir) = &self.recording.history_dir {
            return dir.clone();
        }
        dirs::data_dir()
            .map(|d| d.join(APP_NAME).join("history"))
            .unwrap_or_else(|| PathBuf::from("history"))
    }
}

fn validate_game_settings(board_size: usize, komi: f64, level: u8) -> Result<(), ConfigError> {
    if !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&board_size) {
        return Err(ConfigError::Invalid {
            message: format!(
                "board size {board_size} out of range {MIN_BOARD_SIZE}-{MAX_BOARD_SIZE}"
            ),
        });
    }
    if !komi.is_finite() {
        return Err(ConfigError::Invalid {
            message: format!("komi {komi} is not a finite number"),
        });
    }
    if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
        return Err(ConfigError::Invalid {
            message: format!("engine level {level} out of range {MIN_LEVEL}-{MAX_LEVEL}"),
        });
    }
    Ok(())
}

/// A saved record to resume with `loadsgf`.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedGame {
    pub path: PathBuf,
    pub move_count: usize,
}

/// Settings for one game against the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub board_size: usize,
    pub komi: f64,
    pub human_color: Color,
    pub level: u8,
    pub engine_path: String,
    pub extra_args: Vec<String>,
    pub load: Option<SavedGame>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl GameConfig {
    /// New game with the configured defaults; the human plays Black.
    pub fn from_config(config: &Config) -> Self {
        Self {
            board_size: config.engine.default_board_size,
            komi: config.engine.default_komi,
            human_color: Color::Black,
            level: config.engine.default_level,
            engine_path: config.engine.path.clone(),
            extra_args: config.engine.extra_args.clone(),
            load: None,
        }
    }

    /// Resume a recorded game. The engine's side and level are recovered
    /// from the player names the recorder writes (`GnuGo Level N`).
    pub fn for_saved_game(config: &Config, info: &GameInfo) -> Self {
        let human_color = if info.player_black.starts_with(ENGINE_NAME_PREFIX) {
            Color::White
        } else {
            Color::Black
        };
        let engine_name = match human_color {
            Color::Black => &info.player_white,
            Color::White => &info.player_black,
        };
        let level = parse_engine_level(engine_name).unwrap_or(config.engine.default_level);

        Self {
            board_size: info.board_size,
            komi: info.komi,
            human_color,
            level,
            engine_path: config.engine.path.clone(),
            extra_args: config.engine.extra_args.clone(),
            load: Some(SavedGame {
                path: info.path.clone(),
                move_count: info.move_count,
            }),
        }
    }

    pub fn engine_color(&self) -> Color {
        self.human_color.opponent()
    }

    /// Arguments that put the engine into GTP mode at the configured level.
    pub fn engine_args(&self) -> Vec<String> {
        let mut args = vec![
            "--mode".to_string(),
            "gtp".to_string(),
            "--level".to_string(),
            self.level.to_string(),
            "--quiet".to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_game_settings(self.board_size, self.komi, self.level)
    }
}

/// Level from an engine name such as `GnuGo Level 7`.
pub fn parse_engine_level(name: &str) -> Option<u8> {
    name.strip_prefix(ENGINE_NAME_PREFIX)?
        .trim()
        .parse()
        .ok()
}
