//! # Module cache (C10)
//!
//! One file per module under a workspace-relative directory, storing
//! backend bitcode (`spec.md` §4.8). A cache entry's mtime is *set to* the
//! source module's last-edit time at write time, so later comparisons need
//! only the filesystem clock — callers never have to remember an out-of-band
//! timestamp. Writes go through [`tempfile::NamedTempFile`] and `persist`,
//! which relies on the OS's atomic-rename guarantee so concurrent readers
//! never observe a partially written file (`spec.md` §5).

use crate::mangle::mangle;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A directory of cached backend bitcode, one file per module path.
pub struct ModuleCache {
    root: PathBuf,
}

impl ModuleCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn file_path(&self, module_path: &str) -> PathBuf {
        // Reuses the bijective mangling scheme (`spec.md` §4.1) so cache
        // file names are both collision-free and recognizable, rather than
        // inventing a second escaping scheme for the same problem.
        self.root.join(format!("{}.bc", mangle(module_path, "module")))
    }

    /// `retrieveFromCache(path, at_least_this_new)` (`spec.md` §4.8): `None`
    /// if there is no cache entry, it is older than `at_least_this_new`, or
    /// it cannot be read.
    pub fn retrieve(&self, module_path: &str, at_least_this_new: SystemTime) -> Option<Vec<u8>> {
        let file = self.file_path(module_path);
        let metadata = fs::metadata(&file).ok()?;
        let mtime = metadata.modified().ok()?;
        if mtime < at_least_this_new {
            return None;
        }
        fs::read(&file).ok()
    }

    /// `cacheModule(path, backend_module, source_time)` (`spec.md` §4.8).
    pub fn store(&self, module_path: &str, bytes: &[u8], source_time: SystemTime) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;
        let file = self.file_path(module_path);
        let tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        fs::write(tmp.path(), bytes)?;
        let persisted = tmp.persist(&file).map_err(|e| e.error)?;
        persisted.set_modified(source_time)?;
        Ok(())
    }

    /// `invalidateCache(path)`. Tolerant of an already-missing entry.
    pub fn invalidate(&self, module_path: &str) -> io::Result<()> {
        match fs::remove_file(self.file_path(module_path)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// `cacheUpdateTime(path)`. `None` if there is no cache entry.
    pub fn update_time(&self, module_path: &str) -> Option<SystemTime> {
        fs::metadata(self.file_path(module_path)).ok()?.modified().ok()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
