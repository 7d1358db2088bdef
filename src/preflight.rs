//! Preflight checks before any stage runs.
//!
//! Stage commands write to system prefixes and assume a handful of host
//! tools exist; validating both up front prevents cryptic mid-build
//! failures that leave a half-provisioned host.

use anyhow::{bail, Result};

/// Host tools invoked by stage commands, as (command, package hint) pairs.
pub const REQUIRED_TOOLS: &[(&str, &str)] = &[
    ("sh", "a POSIX shell"),
    ("git", "git"),
    ("wget", "wget"),
    ("tar", "tar"),
    ("make", "make"),
    ("cmake", "cmake"),
    ("python3", "python3"),
];

/// Check if a command resolves in PATH.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Check that specific tools are available, reporting every missing one.
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let mut missing = Vec::new();

    for (tool, package) in tools {
        if !command_exists(tool) {
            missing.push((*tool, *package));
        }
    }

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(t, p)| format!("  {} (install: {})", t, p))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Missing required host tools:\n{}", msg);
    }

    Ok(())
}

/// Check all standard provisioning prerequisites ([`REQUIRED_TOOLS`]).
pub fn check_host_tools() -> Result<()> {
    check_required_tools(REQUIRED_TOOLS)
}

/// Installs land in system prefixes and library directories; anything but
/// root fails later in confusing ways, so reject it up front.
pub fn ensure_root() -> Result<()> {
    // SAFETY: geteuid has no preconditions and cannot fail.
    let euid = unsafe { libc::geteuid() };
    if euid != 0 {
        bail!("provisioning must run as root (effective uid is {euid})");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_exists() {
        assert!(command_exists("ls"));
        assert!(!command_exists("definitely_not_a_real_command_12345"));
    }

    #[test]
    fn test_check_required_tools_success() {
        let tools = &[("ls", "coreutils"), ("cat", "coreutils")];
        assert!(check_required_tools(tools).is_ok());
    }

    #[test]
    fn test_check_required_tools_lists_every_missing_tool() {
        let tools = &[
            ("nonexistent_command_xyz", "fake-package"),
            ("ls", "coreutils"),
            ("other_missing_command_xyz", "other-package"),
        ];
        let err = check_required_tools(tools).unwrap_err().to_string();
        assert!(err.contains("nonexistent_command_xyz (install: fake-package)"));
        assert!(err.contains("other_missing_command_xyz (install: other-package)"));
        assert!(!err.contains("coreutils"));
    }
}
