//! Distribution probe.
//!
//! Reads the host's os-release descriptor and extracts the distribution
//! name from the first line. Downstream package resolution matches on
//! substrings of this name, so the raw quoted value is returned as-is.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

/// Standard location of the os-release descriptor.
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Extract the distribution name from an os-release style descriptor.
///
/// The first line must have the `NAME="..."` shape; anything else is a
/// probe error. No side effects.
pub fn probe_distribution(path: &Path) -> Result<String> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading distribution descriptor '{}'", path.display()))?;

    let first_line = contents.lines().next().unwrap_or("");
    let Some(value) = first_line.strip_prefix("NAME=") else {
        bail!(
            "malformed distribution descriptor '{}': expected first line NAME=\"...\", got '{}'",
            path.display(),
            first_line
        );
    };

    let name = value.trim().trim_matches('"');
    if name.is_empty() {
        bail!(
            "malformed distribution descriptor '{}': empty NAME value",
            path.display()
        );
    }

    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_descriptor(contents: &str) -> (TempDir, std::path::PathBuf) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("os-release");
        fs::write(&path, contents).unwrap();
        (temp, path)
    }

    #[test]
    fn test_probe_extracts_quoted_name() {
        let (_temp, path) = write_descriptor("NAME=\"openSUSE Leap\"\nVERSION=\"15.1\"\n");
        assert_eq!(probe_distribution(&path).unwrap(), "openSUSE Leap");
    }

    #[test]
    fn test_probe_extracts_unquoted_name() {
        let (_temp, path) = write_descriptor("NAME=Ubuntu\n");
        assert_eq!(probe_distribution(&path).unwrap(), "Ubuntu");
    }

    #[test]
    fn test_probe_rejects_missing_name_line() {
        let (_temp, path) = write_descriptor("ID=ubuntu\nNAME=\"Ubuntu\"\n");
        let err = probe_distribution(&path).unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }

    #[test]
    fn test_probe_rejects_empty_file() {
        let (_temp, path) = write_descriptor("");
        assert!(probe_distribution(&path).is_err());
    }

    #[test]
    fn test_probe_rejects_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = probe_distribution(&temp.path().join("nope")).unwrap_err();
        assert!(err.to_string().contains("reading distribution descriptor"));
    }
}
