//! Immutable per-run configuration.
//!
//! Everything a stage needs to know about the run is fixed once at startup:
//! the installation root (source trees are cloned and extracted under it)
//! and the build-parallelism degree. The config is passed explicitly into
//! every executor call rather than living in mutable process globals; the
//! executor additionally exports `IDIR` and `CORES` into each spawned
//! command's environment so stage scripts can reference them.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result};

/// Run-wide configuration, constructed once and never mutated.
#[derive(Debug, Clone)]
pub struct InstallConfig {
    /// Installation root. Source trees land here; the run lock and run
    /// report live here too.
    pub install_dir: PathBuf,
    /// Parallelism degree passed to builds as `make -j${CORES}`.
    pub cores: usize,
}

impl InstallConfig {
    /// Build the configuration for an installation directory, creating the
    /// directory if needed and detecting the host core count.
    pub fn new(install_dir: &Path) -> Result<Self> {
        fs::create_dir_all(install_dir).with_context(|| {
            format!(
                "creating installation directory '{}'",
                install_dir.display()
            )
        })?;
        let install_dir = install_dir.canonicalize().with_context(|| {
            format!(
                "resolving installation directory '{}'",
                install_dir.display()
            )
        })?;

        Ok(Self {
            install_dir,
            cores: detected_cores(),
        })
    }
}

/// Host CPU core count, falling back to 1 where detection is unavailable.
pub fn detected_cores() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_creates_install_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("opt/radar");

        let config = InstallConfig::new(&dir).unwrap();

        assert!(dir.is_dir());
        assert!(config.install_dir.is_absolute());
        assert!(config.cores >= 1);
    }

    #[test]
    fn test_new_accepts_existing_dir() {
        let temp = TempDir::new().unwrap();

        let first = InstallConfig::new(temp.path()).unwrap();
        let second = InstallConfig::new(temp.path()).unwrap();

        assert_eq!(first.install_dir, second.install_dir);
    }
}
