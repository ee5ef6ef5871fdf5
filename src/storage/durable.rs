use std::fs::{self, OpenOptions, rename, write};
use std::path::PathBuf;

use fs2::FileExt;
use uuid::Uuid;

use crate::storage::StorageError;

/// Larger-capacity side-store backing the fast tiers. Writes go through a
/// unique temp file and a rename under an exclusive lock, so a copy promoted
/// at startup is never a torn write. Written opportunistically on day-map
/// saves; consulted once at startup.
pub struct DurableStore {
    dir: PathBuf,
}

impl DurableStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key.replace(['/', '\\', '.'], "_"))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|e| StorageError::DurableWriteFailed {
            path: self.dir.clone(),
            source: e,
        })?;

        let path = self.path_for(key);
        let unique_temp = format!("{}.tmp.{}", path.display(), Uuid::new_v4());
        let temp_path = PathBuf::from(&unique_temp);
        write(&temp_path, value).map_err(|e| StorageError::DurableWriteFailed {
            path: temp_path.clone(),
            source: e,
        })?;

        let lock_file_path = path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_file_path)
            .map_err(|e| StorageError::DurableWriteFailed {
                path: lock_file_path.clone(),
                source: e,
            })?;
        lock_file
            .lock_exclusive()
            .map_err(|e| StorageError::DurableWriteFailed {
                path: lock_file_path.clone(),
                source: e,
            })?;

        let renamed = rename(&temp_path, &path).map_err(|e| StorageError::DurableWriteFailed {
            path: path.clone(),
            source: e,
        });

        lock_file
            .unlock()
            .map_err(|e| StorageError::DurableWriteFailed {
                path: lock_file_path,
                source: e,
            })?;

        renamed
    }
}
