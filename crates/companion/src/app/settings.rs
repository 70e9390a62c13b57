use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use buddy_engine::{BuddyConfig, ConfigError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::chat::ChatSettings;

/// Contents of `assets/buddy.json`. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CompanionSettings {
    pub(crate) buddy: BuddyConfig,
    pub(crate) chat: ChatSettings,
    /// Fixed wander seed for reproducible runs; random when absent.
    pub(crate) wander_seed: Option<u64>,
}

#[derive(Debug, Error)]
pub(crate) enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse settings file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid settings in {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },
}

/// A missing file yields defaults; a present but broken one is an error.
pub(crate) fn load_settings(path: &Path) -> Result<CompanionSettings, SettingsError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "settings_missing_using_defaults");
            return Ok(CompanionSettings::default());
        }
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let settings = parse_settings_json(&raw).map_err(|message| SettingsError::Parse {
        path: path.to_path_buf(),
        message,
    })?;
    settings
        .buddy
        .validate()
        .map_err(|source| SettingsError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;
    info!(
        path = %path.display(),
        gravity = settings.buddy.gravity,
        wander_speed = settings.buddy.wander_speed,
        can_wander = settings.buddy.can_wander,
        "settings_loaded"
    );
    Ok(settings)
}

fn parse_settings_json(raw: &str) -> Result<CompanionSettings, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, CompanionSettings>(&mut deserializer) {
        Ok(settings) => Ok(settings),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(source.to_string())
            } else {
                Err(format!("at {path}: {source}"))
            }
        }
    }
}
