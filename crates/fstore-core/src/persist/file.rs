//! JSON-file preference backend.
//!
//! The whole document is loaded once by [`FilePreferences::open`] and kept in
//! memory. Every mutation rewrites the file through a sibling `*.tmp` file
//! that is synced and then renamed over the original, so readers never see a
//! half-written document. A failed flush leaves both the file and the
//! in-memory map as they were.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use super::backend::{PreferenceBackend, PreferenceValue};
use crate::error::BackendError;

type Entries = BTreeMap<String, PreferenceValue>;

#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    entries: Mutex<Entries>,
}

impl FilePreferences {
    /// Load `path`, or start empty if it does not exist yet.
    ///
    /// The file and its parent directories are created on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let path = path.into();
        let entries = read_document(&path)?;
        debug!(
            message = "prefs.file.load",
            path = %path.display(),
            entries = entries.len()
        );
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file, discarding the in-memory copy.
    pub fn reload(&self) -> Result<(), BackendError> {
        let fresh = read_document(&self.path)?;
        *self.entries.lock() = fresh;
        Ok(())
    }

    /// Apply `edit` to a copy of the entries, flush it, then swap it in.
    fn update<R>(&self, edit: impl FnOnce(&mut Entries) -> Option<R>) -> Result<Option<R>, BackendError> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        let Some(outcome) = edit(&mut next) else {
            return Ok(None);
        };
        write_document(&self.path, &next)?;
        *entries = next;
        Ok(Some(outcome))
    }
}

impl PreferenceBackend for FilePreferences {
    fn get(&self, key: &str) -> Result<Option<PreferenceValue>, BackendError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: PreferenceValue) -> Result<(), BackendError> {
        self.update(|entries| {
            entries.insert(key.to_owned(), value);
            Some(())
        })?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, BackendError> {
        let removed = self.update(|entries| entries.remove(key).map(|_| ()))?;
        Ok(removed.is_some())
    }

    fn clear(&self) -> Result<(), BackendError> {
        self.update(|entries| {
            entries.clear();
            Some(())
        })?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.entries.lock().keys().cloned().collect())
    }

    fn contains_key(&self, key: &str) -> Result<bool, BackendError> {
        Ok(self.entries.lock().contains_key(key))
    }
}

fn read_document(path: &Path) -> Result<Entries, BackendError> {
    match fs::read(path) {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Entries::new()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Entries::new()),
        Err(err) => Err(err.into()),
    }
}

fn write_document(path: &Path, entries: &Entries) -> Result<(), BackendError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let bytes = serde_json::to_vec_pretty(entries)?;

    let temp_path = temp_path_for(path);
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&temp_path, path)?;

    debug!(
        message = "prefs.file.flush",
        path = %path.display(),
        entries = entries.len(),
        bytes = bytes.len()
    );
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
