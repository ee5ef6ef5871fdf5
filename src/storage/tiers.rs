use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::debug;

use crate::storage::StorageTier;

/// Keys are fixed constants, but guard against anything path-like sneaking in.
fn file_name(key: &str) -> String {
    key.replace(['/', '\\', '.'], "_")
}

/// A directory of one-file-per-key values. Used for the data-dir, cache-dir
/// and temp-dir tiers; only the root differs.
pub struct FileTier {
    name: &'static str,
    root: PathBuf,
}

impl FileTier {
    pub fn new(name: &'static str, root: PathBuf) -> Self {
        Self { name, root }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(file_name(key))
    }
}

impl StorageTier for FileTier {
    fn name(&self) -> &'static str {
        self.name
    }

    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> bool {
        if let Err(e) = fs::create_dir_all(&self.root) {
            debug!(tier = self.name, error = %e, "tier directory unavailable");
            return false;
        }
        match fs::write(self.path_for(key), value) {
            Ok(()) => true,
            Err(e) => {
                debug!(tier = self.name, key, error = %e, "tier write failed");
                false
            }
        }
    }

    fn remove(&self, key: &str) -> bool {
        fs::remove_file(self.path_for(key)).is_ok()
    }
}

/// In-process last resort. Holds data only for the lifetime of this process,
/// which still covers the "every other tier is unavailable" session.
#[derive(Default)]
pub struct MemoryTier {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryTier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageTier for MemoryTier {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> bool {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        true
    }

    fn remove(&self, key: &str) -> bool {
        self.values.lock().unwrap().remove(key).is_some()
    }
}
