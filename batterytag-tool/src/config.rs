use std::path::{Path, PathBuf};

use batterytag_core::MAX_USAGE_ENTRIES;
use serde::Deserialize;

use crate::error::ToolError;
use crate::tag::TagModel;

pub const DEFAULT_TAG_PATH: &str = "battery-tag.ndef";

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    pub team_number: Option<String>,
    pub max_entries: Option<usize>,
    pub capacity: Option<usize>,
    pub model: Option<TagModel>,
    pub log_path: Option<PathBuf>,
    pub tag_path: Option<PathBuf>,
}

fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("batterytag").join("config.toml"))
}

pub fn load_config() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Config {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Config::default();
    };

    toml::from_str(&content).unwrap_or_default()
}

pub fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("batterytag")
        .join("log")
}

/// Tag capacity: an explicit byte count wins over a model preset, the CLI
/// wins over the config file, and NTAG215 is the fallback.
pub fn resolve_capacity(cli_capacity: Option<usize>, cli_model: Option<TagModel>, config: &Config) -> usize {
    cli_capacity
        .or(cli_model.map(TagModel::capacity))
        .or(config.capacity)
        .or(config.model.map(TagModel::capacity))
        .unwrap_or_else(|| TagModel::default().capacity())
}

/// History cap from `max_entries`. Zero is rejected: every logged event must
/// survive its own write.
pub fn resolve_history_limit(config: &Config) -> Result<usize, ToolError> {
    match config.max_entries {
        Some(0) => Err(ToolError::HistoryLimit),
        Some(limit) => Ok(limit),
        None => Ok(MAX_USAGE_ENTRIES),
    }
}

pub fn resolve_log_path(cli_path: Option<PathBuf>, config: &Config) -> PathBuf {
    cli_path
        .or_else(|| config.log_path.clone())
        .unwrap_or_else(default_log_path)
}

pub fn resolve_tag_path(cli_path: Option<PathBuf>, config: &Config) -> PathBuf {
    cli_path
        .or_else(|| config.tag_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TAG_PATH))
}

pub fn resolve_team(cli_team: Option<String>, config: &Config) -> Option<String> {
    cli_team
        .or_else(|| config.team_number.clone())
        .filter(|team| !team.trim().is_empty())
}
