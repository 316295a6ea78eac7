//! Persistence port for single-value state files.
//!
//! The sync cursor and the last query results each live in one small file.
//! [`FileSlot`] is the production implementation; [`MemorySlot`] backs tests
//! and can be told to fail writes with a chosen I/O error kind.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait StateSlot: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> io::Result<Option<String>>;

    fn save(&self, contents: &str) -> io::Result<()>;

    /// Where the value lives, for messages.
    fn location(&self) -> &Path;
}

/// A state file on disk. Writes are serialized by an in-process lock.
pub struct FileSlot {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

impl StateSlot for FileSlot {
    fn load(&self) -> io::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&self, contents: &str) -> io::Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, contents)
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

/// In-memory slot for tests.
#[derive(Default)]
pub struct MemorySlot {
    value: Mutex<Option<String>>,
    fail_writes: Mutex<Option<io::ErrorKind>>,
    path: PathBuf,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self {
            path: PathBuf::from("memory"),
            ..Default::default()
        }
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        let slot = Self::new();
        *slot.value.lock().unwrap_or_else(|p| p.into_inner()) = Some(value.into());
        slot
    }

    /// Make every subsequent `save` fail with `kind`.
    pub fn fail_writes_with(&self, kind: io::ErrorKind) {
        *self.fail_writes.lock().unwrap_or_else(|p| p.into_inner()) = Some(kind);
    }

    pub fn value(&self) -> Option<String> {
        self.value.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl StateSlot for MemorySlot {
    fn load(&self) -> io::Result<Option<String>> {
        Ok(self.value())
    }

    fn save(&self, contents: &str) -> io::Result<()> {
        if let Some(kind) = *self.fail_writes.lock().unwrap_or_else(|p| p.into_inner()) {
            return Err(io::Error::new(kind, "injected write failure"));
        }
        *self.value.lock().unwrap_or_else(|p| p.into_inner()) = Some(contents.to_string());
        Ok(())
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_slot_missing_file_is_none() {
        let tmp = TempDir::new().unwrap();
        let slot = FileSlot::new(tmp.path().join("nothing.txt"));
        assert_eq!(slot.load().unwrap(), None);
        assert!(!slot.exists());
    }

    #[test]
    fn file_slot_creates_parent_dirs() {
        let tmp = TempDir::new().unwrap();
        let slot = FileSlot::new(tmp.path().join("state").join("cursor.txt"));
        slot.save("2024-01-01 00:00:00").unwrap();
        assert_eq!(slot.load().unwrap().as_deref(), Some("2024-01-01 00:00:00"));
        assert!(slot.exists());
    }

    #[test]
    fn memory_slot_injected_failure() {
        let slot = MemorySlot::with_value("before");
        slot.fail_writes_with(io::ErrorKind::PermissionDenied);
        let err = slot.save("after").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(slot.value().as_deref(), Some("before"));
    }
}
