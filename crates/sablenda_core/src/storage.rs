//! Whole-calendar JSON backup files.
//!
//! # Responsibility
//! - Export every entry to one JSON document and load it back.
//!
//! # Invariants
//! - A missing backup file loads as an empty entry list.
//! - Saving writes a sibling temp file first and renames it into place, so
//!   a failed save never truncates an existing backup.

use crate::model::entry::Entry;
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const BACKUP_FORMAT_VERSION: u32 = 1;

#[derive(Debug)]
pub enum StorageError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    UnsupportedVersion(u32),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "i/o error on `{}`: {source}", path.display()),
            Self::Json { path, source } => {
                write!(f, "malformed backup `{}`: {source}", path.display())
            }
            Self::UnsupportedVersion(version) => write!(
                f,
                "backup format version {version} is newer than supported {BACKUP_FORMAT_VERSION}"
            ),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::UnsupportedVersion(_) => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct BackupDocument {
    version: u32,
    entries: Vec<Entry>,
}

/// JSON file holding a full copy of the calendar.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, entries: &[Entry]) -> Result<(), StorageError> {
        let document = BackupDocument {
            version: BACKUP_FORMAT_VERSION,
            entries: entries.to_vec(),
        };
        let json = serde_json::to_vec_pretty(&document).map_err(|source| StorageError::Json {
            path: self.path.clone(),
            source,
        })?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json).map_err(|source| StorageError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })?;

        info!(
            "event=backup_save module=storage status=ok count={}",
            entries.len()
        );
        Ok(())
    }

    pub fn load(&self) -> Result<Vec<Entry>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let bytes = std::fs::read(&self.path).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })?;
        let document: BackupDocument =
            serde_json::from_slice(&bytes).map_err(|source| StorageError::Json {
                path: self.path.clone(),
                source,
            })?;
        if document.version > BACKUP_FORMAT_VERSION {
            return Err(StorageError::UnsupportedVersion(document.version));
        }

        info!(
            "event=backup_load module=storage status=ok count={}",
            document.entries.len()
        );
        Ok(document.entries)
    }
}
