//! Run lock under the installation root.
//!
//! The pipeline mutates shared filesystem state (system prefixes, library
//! directories, the linker cache) with no locking discipline of its own,
//! so two concurrent provisioning runs must never happen. An exclusive
//! advisory lock on a file under the installation root rejects the second
//! invocation at startup instead of leaving that undefined.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use fs2::FileExt;

const LOCK_FILENAME: &str = ".provision.lock";

/// Held for the lifetime of the run; the lock releases when dropped.
#[derive(Debug)]
pub struct ProvisionLock {
    path: PathBuf,
    // Keeps the locked file descriptor open.
    _file: File,
}

impl ProvisionLock {
    /// Take the exclusive run lock, failing fast if another run holds it.
    pub fn acquire(install_dir: &Path) -> Result<Self> {
        let path = install_dir.join(LOCK_FILENAME);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .with_context(|| format!("opening run lock '{}'", path.display()))?;

        if file.try_lock_exclusive().is_err() {
            bail!(
                "another provisioning run holds the lock '{}'; wait for it to finish",
                path.display()
            );
        }

        Ok(Self { path, _file: file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_creates_the_lock_file() {
        let temp = TempDir::new().unwrap();
        let lock = ProvisionLock::acquire(temp.path()).unwrap();
        assert!(lock.path().exists());
    }

    #[test]
    fn test_second_acquire_is_rejected() {
        let temp = TempDir::new().unwrap();
        let _held = ProvisionLock::acquire(temp.path()).unwrap();

        let err = ProvisionLock::acquire(temp.path()).unwrap_err();
        assert!(err.to_string().contains("another provisioning run"));
    }

    #[test]
    fn test_dropping_releases_the_lock() {
        let temp = TempDir::new().unwrap();
        drop(ProvisionLock::acquire(temp.path()).unwrap());
        assert!(ProvisionLock::acquire(temp.path()).is_ok());
    }
}
