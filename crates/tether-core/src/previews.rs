//! Local storage for prefetched link-preview thumbnails.
//!
//! Several messages can point at the same thumbnail file, so files are
//! reference counted and deleted when the last message lets go of them.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::error::{CoreError, Result};

#[derive(Debug)]
pub struct PreviewStorage {
    base_path: PathBuf,
    references: Mutex<HashMap<String, usize>>,
}

impl PreviewStorage {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            references: Mutex::new(HashMap::new()),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Write `contents` as `name` (if not already present) and take a
    /// reference to it.
    pub fn store(&self, name: &str, contents: &[u8]) -> Result<()> {
        let path = self.safe_path(name)?;
        if !path.exists() {
            std::fs::create_dir_all(&self.base_path)?;
            std::fs::write(&path, contents)?;
            debug!(thumb = name, size = contents.len(), "stored preview thumbnail");
        }
        self.reference(name);
        Ok(())
    }

    /// Take one more reference to an existing thumbnail.
    pub fn reference(&self, name: &str) {
        *self.lock().entry(name.to_string()).or_insert(0) += 1;
    }

    /// Drop one reference; the file is deleted when none remain.
    pub fn dereference(&self, name: &str) {
        let remaining = {
            let mut refs = self.lock();
            match refs.get_mut(name) {
                Some(count) if *count > 1 => {
                    *count -= 1;
                    *count
                }
                Some(_) => {
                    refs.remove(name);
                    0
                }
                None => {
                    warn!(thumb = name, "dereferenced a thumbnail with no references");
                    return;
                }
            }
        };

        if remaining > 0 {
            return;
        }

        match self.safe_path(name) {
            Ok(path) => match std::fs::remove_file(&path) {
                Ok(()) => debug!(thumb = name, "removed preview thumbnail"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(thumb = name, error = %e, "failed to remove preview thumbnail"),
            },
            Err(e) => warn!(thumb = name, error = %e, "refusing to remove preview thumbnail"),
        }
    }

    pub fn references(&self, name: &str) -> usize {
        self.lock().get(name).copied().unwrap_or(0)
    }

    /// Thumbnail names are single path components inside the base directory.
    fn safe_path(&self, name: &str) -> Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.base_path.join(name)),
            _ => Err(CoreError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid thumbnail name {name:?}"),
            ))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, usize>> {
        match self.references.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
