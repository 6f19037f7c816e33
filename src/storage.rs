//! Namespaced key/value persistence on the local filesystem.
//!
//! Each named entry is one file under the namespace root. The shadow
//! store keeps its `corpora` and `documents-by-key` entries here; the
//! session store keeps `user` and `userId`. No cross-process
//! synchronization is provided — two processes sharing a root can
//! diverge, which callers accept by design of the fallback model.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Open (and create, if missing) the namespace directory.
    pub fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn entry_path(&self, entry: &str) -> PathBuf {
        self.root.join(entry)
    }

    /// Read an entry, returning `None` when it is missing or unreadable.
    pub fn read(&self, entry: &str) -> Option<String> {
        fs::read_to_string(self.entry_path(entry)).ok()
    }

    pub fn write(&self, entry: &str, value: &str) -> io::Result<()> {
        fs::write(self.entry_path(entry), value)
    }

    /// Remove an entry. Missing entries are not an error.
    pub fn remove(&self, entry: &str) {
        let _ = fs::remove_file(self.entry_path(entry));
    }
}
