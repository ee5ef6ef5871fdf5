use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::day::DayMap;
use crate::models::project::Project;
use crate::storage::local::LocalStore;

/// The offline escape hatch: the full dataset as one JSON document,
/// independent of the cloud path but shaped exactly like the payload fields,
/// so a file written by any device round-trips losslessly.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct TransferDocument {
    #[serde(default)]
    pub days: DayMap,
    #[serde(default)]
    pub projects: Vec<Project>,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to serialize data to JSON: {source}")]
    SerializeFailed {
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write export to '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{path}' is not a valid data file: {source}")]
    InvalidFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not persist imported data to any storage tier")]
    PersistFailed,
}

pub struct ImportSummary {
    pub days: usize,
    pub tasks: usize,
    pub projects: usize,
}

pub fn export_to_path(store: &LocalStore, path: &Path) -> Result<(), ExportError> {
    let document = TransferDocument {
        days: store.load_days(),
        projects: store.load_projects(),
    };
    let json = serde_json::to_string_pretty(&document)
        .map_err(|e| ExportError::SerializeFailed { source: e })?;
    std::fs::write(path, json).map_err(|e| ExportError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Replace the local dataset with the file's contents. A malformed file is
/// the one user-facing sync-adjacent error: the user picked the file, so the
/// failure is reported instead of swallowed.
pub fn import_from_path(store: &LocalStore, path: &Path) -> Result<ImportSummary, ImportError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ImportError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    let document: TransferDocument =
        serde_json::from_str(&raw).map_err(|e| ImportError::InvalidFile {
            path: path.to_path_buf(),
            source: e,
        })?;

    if !store.save_days(&document.days) || !store.save_projects(&document.projects) {
        return Err(ImportError::PersistFailed);
    }
    Ok(ImportSummary {
        days: document.days.len(),
        tasks: document.days.values().map(|d| d.tasks.len()).sum(),
        projects: document.projects.len(),
    })
}
