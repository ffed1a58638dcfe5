use std::path::PathBuf;

use batterytag_core::{CodecError, ControllerError, SerialError};
use thiserror::Error;

use crate::tag::TagFileError;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("No tag presented at {}", .0.display())]
    NoTag(PathBuf),

    #[error("Last usage entry is already a charge. Pass --force to log another one")]
    DuplicateCharge,

    #[error("No battery code given. Pass --serial, or --new, --old or --special with a team number")]
    MissingBatteryCode,

    #[error("Team number not given. Pass --team or set team_number in ~/.config/batterytag/config.toml")]
    TeamNotFound,

    #[error("max_entries must be at least 1")]
    HistoryLimit,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tag file error: {0}")]
    TagFile(#[from] TagFileError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Invalid serial: {0}")]
    Serial(#[from] SerialError),

    #[error("{0}")]
    Controller(#[from] ControllerError),

    #[error("Log store error: {0}")]
    Log(#[from] batterytag_fjall::FjallLogError),
}
