//! Where the serialized record set lives.
//!
//! [`FileBacking`] is the production target: one JSON file, rewritten in full
//! on every save. [`MemoryBacking`] keeps the bytes in memory so tests can run
//! the store without touching the filesystem.
//!
//! The rename-over write is close to atomic on most platforms. On FAT32 or
//! network shares there are no hard guarantees.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// File name of the backing file under the install directory.
pub const DEFAULT_FILE_NAME: &str = "products.json";

/// Fixed location of the backing file: `products.json` in the crate's install
/// directory. Not overridable from the environment.
#[must_use]
pub fn default_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_FILE_NAME)
}

/// Storage target for the serialized record set.
pub trait Persistence: Send + Sync {
    /// Read everything stored. `Ok(None)` means nothing has been stored yet
    /// (e.g. the file doesn't exist).
    fn read(&self) -> Result<Option<Vec<u8>>>;

    /// Replace the stored contents with `bytes`.
    fn write(&self, bytes: &[u8]) -> Result<()>;

    /// Path on disk, if this target has one.
    fn path(&self) -> Option<&Path> {
        None
    }

    /// Short description used in log fields.
    fn describe(&self) -> String;
}

// ---- file ----------------------------------------------------------------------

/// A single JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileBacking {
    path: PathBuf,
    atomic: bool,
}

impl FileBacking {
    /// Back onto `path`, writing through a temp file + rename.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            atomic: true,
        }
    }

    /// Toggle temp-file + rename writes (default: on). With it off the file
    /// is truncated and rewritten in place.
    pub fn atomic(mut self, yes: bool) -> Self {
        self.atomic = yes;
        self
    }
}

impl Persistence for FileBacking {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(b) => Ok(Some(b)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e.to_string())),
        }
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        if self.atomic {
            atomic_write(&self.path, bytes)
        } else {
            std::fs::write(&self.path, bytes).map_err(|e| Error::Io(e.to_string()))
        }
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Write `bytes` to `<path>.tmp` and then rename over `path`. This avoids
/// leaving a half-written file if the process crashes mid-write.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
    let tmp = path.with_extension(format!("{ext}.tmp"));
    std::fs::write(&tmp, bytes).map_err(|e| Error::Io(e.to_string()))?;
    std::fs::rename(&tmp, path).map_err(|e| Error::Io(e.to_string()))?;
    Ok(())
}

// ---- memory --------------------------------------------------------------------

/// In-memory target. Clones share the same buffer, so a test can keep one
/// clone to inspect what the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryBacking {
    contents: Arc<Mutex<Option<Vec<u8>>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryBacking {
    /// Nothing stored yet; the store will bootstrap it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `contents` already stored.
    pub fn with_contents(contents: impl Into<Vec<u8>>) -> Self {
        let backing = Self::default();
        *backing.contents.lock() = Some(contents.into());
        backing
    }

    /// Current stored bytes, if any.
    #[must_use]
    pub fn contents(&self) -> Option<Vec<u8>> {
        self.contents.lock().clone()
    }

    /// Current stored bytes as UTF-8 text, if any.
    #[must_use]
    pub fn contents_string(&self) -> Option<String> {
        self.contents()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn fail_writes(&self, yes: bool) {
        self.fail_writes.store(yes, Ordering::Relaxed);
    }
}

impl Persistence for MemoryBacking {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.contents())
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(Error::Io("memory backing: writes disabled".into()));
        }
        *self.contents.lock() = Some(bytes.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "<memory>".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_missing_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let backing = FileBacking::new(dir.path().join("nope.json"));
        assert_eq!(backing.read().unwrap(), None);
    }

    #[test]
    fn file_write_creates_parent_dirs_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("products.json");
        let backing = FileBacking::new(&path);
        backing.write(b"{}").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"{}");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn non_atomic_write_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.json");
        let backing = FileBacking::new(&path).atomic(false);
        backing.write(b"{\"a\":1}").unwrap();
        backing.write(b"{}").unwrap();
        assert_eq!(backing.read().unwrap(), Some(b"{}".to_vec()));
    }

    #[test]
    fn memory_clones_share_buffer() {
        let backing = MemoryBacking::new();
        let probe = backing.clone();
        backing.write(b"{}").unwrap();
        assert_eq!(probe.contents_string().as_deref(), Some("{}"));
    }

    #[test]
    fn memory_fail_writes_keeps_old_contents() {
        let backing = MemoryBacking::with_contents("{}");
        backing.fail_writes(true);
        assert!(backing.write(b"[]").is_err());
        assert_eq!(backing.contents_string().as_deref(), Some("{}"));
    }

    #[test]
    fn default_path_is_under_manifest_dir() {
        let path = default_path();
        assert!(path.ends_with(DEFAULT_FILE_NAME));
        assert!(path.starts_with(env!("CARGO_MANIFEST_DIR")));
    }
}
