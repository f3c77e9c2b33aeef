//! User settings persisted as JSON.
//!
//! # Responsibility
//! - Hold the user-facing preferences (display language).
//! - Load and save `<config dir>/sablenda/settings.json`.
//!
//! # Invariants
//! - Loading never fails: missing or malformed files yield defaults.
//! - Unknown language values normalize to `Language::Auto`.
//! - Saving reports failures to the caller.

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const SETTINGS_DIR_NAME: &str = "sablenda";
const SETTINGS_FILE_NAME: &str = "settings.json";
const SETTINGS_VERSION: &str = "1.0";

/// Display language preference. `Auto` follows the system locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Auto,
    En,
    Fr,
}

impl Language {
    fn from_setting(value: &str) -> Self {
        match value {
            "en" => Self::En,
            "fr" => Self::Fr,
            _ => Self::Auto,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, deserialize_with = "deserialize_language")]
    pub language: Language,
    #[serde(default = "default_version")]
    pub version: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: Language::Auto,
            version: default_version(),
        }
    }
}

fn default_version() -> String {
    SETTINGS_VERSION.to_string()
}

fn deserialize_language<'de, D>(deserializer: D) -> Result<Language, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().map_or(Language::Auto, Language::from_setting))
}

#[derive(Debug)]
pub enum SettingsError {
    ConfigDirUnavailable,
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json(serde_json::Error),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigDirUnavailable => {
                write!(f, "could not determine the user configuration directory")
            }
            Self::Io { path, source } => write!(f, "i/o error on `{}`: {source}", path.display()),
            Self::Json(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SettingsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ConfigDirUnavailable => None,
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
        }
    }
}

/// Returns `<config dir>/sablenda/settings.json`, creating the directory.
pub fn settings_path() -> Result<PathBuf, SettingsError> {
    let dir = dirs::config_dir()
        .ok_or(SettingsError::ConfigDirUnavailable)?
        .join(SETTINGS_DIR_NAME);
    std::fs::create_dir_all(&dir).map_err(|source| SettingsError::Io {
        path: dir.clone(),
        source,
    })?;
    Ok(dir.join(SETTINGS_FILE_NAME))
}

/// Loads settings from the default location, falling back to defaults.
pub fn load_settings() -> Settings {
    match settings_path() {
        Ok(path) => load_settings_from(path),
        Err(err) => {
            warn!("event=settings_load module=settings status=defaulted error={err}");
            Settings::default()
        }
    }
}

/// Loads settings from `path`, falling back to defaults.
pub fn load_settings_from(path: impl AsRef<Path>) -> Settings {
    let path = path.as_ref();
    if !path.exists() {
        return Settings::default();
    }

    let parsed = std::fs::read(path)
        .map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })
        .and_then(|bytes| serde_json::from_slice::<Settings>(&bytes).map_err(SettingsError::Json));

    match parsed {
        Ok(settings) => settings,
        Err(err) => {
            warn!("event=settings_load module=settings status=defaulted error={err}");
            Settings::default()
        }
    }
}

pub fn save_settings(settings: &Settings) -> Result<(), SettingsError> {
    save_settings_to(settings_path()?, settings)
}

pub fn save_settings_to(path: impl AsRef<Path>, settings: &Settings) -> Result<(), SettingsError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(settings).map_err(SettingsError::Json)?;
    std::fs::write(path, json).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })
}
