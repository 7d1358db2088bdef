//! Shared-library version repair.
//!
//! Distribution packages ship shared objects under fully versioned names
//! (`libboost_system.so.1.66.0`) but the UHD build links against the
//! unversioned development names (`libboost_system.so`). Without the -devel
//! packages of the exact Boost release those names do not resolve, so this
//! module synthesizes them: every versioned file's canonical base name is
//! recovered by stripping extension-like suffixes to a fixed point, and a
//! `<canonical>.so` symlink is pointed at the concrete file.
//!
//! Re-running is idempotent: existing links are overwritten (`ln -sf`
//! semantics) and never duplicated. When several versioned files share one
//! canonical name the highest version wins, decided by numeric comparison
//! of the version-suffix components rather than directory-listing order.

use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};

use crate::packages::PackageFamily;

/// What to repair: which directory, which library-family prefix, and which
/// package family decides the interpreter-runtime special case.
#[derive(Debug, Clone)]
pub struct RepairSpec {
    pub lib_dir: PathBuf,
    pub prefix: String,
    pub family: PackageFamily,
    /// Installed Python 3 minor version; detected from the host's `python3`
    /// when not pinned.
    pub python_minor: Option<u8>,
}

impl RepairSpec {
    /// The Boost repair performed before the UHD build.
    pub fn boost(family: PackageFamily) -> Self {
        Self {
            lib_dir: PathBuf::from(family.library_dir()),
            prefix: "libboost_".to_string(),
            family,
            python_minor: None,
        }
    }
}

/// A planned filesystem edge: `link` resolves to `target` after apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkRule {
    pub link: PathBuf,
    pub target: PathBuf,
}

/// Repair versioned shared-library names in one directory.
///
/// Returns the rules that were applied. A directory with zero matching
/// files is a silent no-op (the special-case interpreter link is skipped
/// too, since the family's libraries are evidently not installed there).
pub fn repair_library_links(spec: &RepairSpec) -> Result<Vec<SymlinkRule>> {
    let versioned = versioned_libraries(&spec.lib_dir, &spec.prefix)?;
    if versioned.is_empty() {
        return Ok(Vec::new());
    }

    let mut rules = plan_symlinks(&spec.lib_dir, &versioned);
    rules.push(python_runtime_rule(spec)?);

    for rule in &rules {
        apply_symlink(rule)?;
        println!(
            "  linked {} -> {}",
            rule.link.display(),
            rule.target.display()
        );
    }

    Ok(rules)
}

/// Regular files in `lib_dir` that carry a version suffix and belong to
/// the library family, by file name.
fn versioned_libraries(lib_dir: &Path, prefix: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let entries = fs::read_dir(lib_dir)
        .with_context(|| format!("scanning library directory '{}'", lib_dir.display()))?;

    for entry in entries {
        let entry = entry
            .with_context(|| format!("iterating library directory '{}'", lib_dir.display()))?;
        // Skip existing symlinks so repair output never feeds back into
        // the next scan.
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name.starts_with(prefix) && name.contains(".so.") {
            names.push(name);
        }
    }

    names.sort();
    Ok(names)
}

/// Strip extension-like suffixes until a fixed point: the canonical base
/// name a build toolchain expects (`libfoo.so.1.67.0` -> `libfoo`).
pub fn canonical_stem(file_name: &str) -> String {
    let mut stem = file_name.to_string();
    loop {
        let next = Path::new(&stem)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&stem)
            .to_string();
        if next == stem {
            return stem;
        }
        stem = next;
    }
}

/// Version-suffix components of a file name, for ordering duplicates.
/// `libfoo.so.1.67.0` -> `[1, 67, 0]`.
fn version_key(file_name: &str) -> Vec<u64> {
    file_name
        .split('.')
        .filter_map(|part| part.parse::<u64>().ok())
        .collect()
}

/// One rule per canonical name, picking the highest version among
/// duplicates deterministically.
fn plan_symlinks(lib_dir: &Path, versioned: &[String]) -> Vec<SymlinkRule> {
    let mut best: Vec<(String, &String)> = Vec::new();
    for file in versioned {
        let canonical = canonical_stem(file);
        match best.iter_mut().find(|(name, _)| *name == canonical) {
            Some((_, current)) if version_key(current) >= version_key(file) => {}
            Some((_, current)) => *current = file,
            None => best.push((canonical, file)),
        }
    }

    best.into_iter()
        .map(|(canonical, file)| SymlinkRule {
            link: lib_dir.join(format!("{canonical}.so")),
            target: lib_dir.join(file),
        })
        .collect()
}

/// The interpreter-ABI special case: the Boost.Python runtime carries a
/// family-specific qualifier, but downstream builds expect the generic
/// `libboost_python3.so`.
fn python_runtime_rule(spec: &RepairSpec) -> Result<SymlinkRule> {
    let qualified = match spec.family {
        PackageFamily::Zypper => "libboost_python-py3.so".to_string(),
        PackageFamily::Apt => {
            let minor = match spec.python_minor {
                Some(minor) => minor,
                None => detect_python_minor()?,
            };
            format!("libboost_python3{minor}.so")
        }
    };

    Ok(SymlinkRule {
        link: spec.lib_dir.join("libboost_python3.so"),
        target: spec.lib_dir.join(qualified),
    })
}

/// Installed Python 3 minor version, asked of the interpreter itself.
fn detect_python_minor() -> Result<u8> {
    let output = Command::new("python3")
        .args(["-c", "import sys; print(sys.version_info.minor)"])
        .output()
        .context("running python3 to detect the interpreter minor version")?;

    if !output.status.success() {
        bail!(
            "python3 exited with {} while detecting the interpreter minor version",
            output.status
        );
    }

    let text = String::from_utf8_lossy(&output.stdout);
    text.trim()
        .parse::<u8>()
        .with_context(|| format!("parsing python3 minor version from '{}'", text.trim()))
}

/// Create or overwrite one symlink (`ln -sf` semantics).
fn apply_symlink(rule: &SymlinkRule) -> Result<()> {
    if fs::symlink_metadata(&rule.link).is_ok() {
        fs::remove_file(&rule.link)
            .with_context(|| format!("removing existing link '{}'", rule.link.display()))?;
    }
    symlink(&rule.target, &rule.link).with_context(|| {
        format!(
            "creating symlink '{}' -> '{}'",
            rule.link.display(),
            rule.target.display()
        )
    })
}
