//! Cross-distribution package-name resolution.
//!
//! The same conceptual dependency carries different literal package names
//! on zypper-based and apt-based distributions (and occasionally several
//! candidate names within one family). Each [`Dependency`] row lists the
//! variants per family; resolution expands only the active family's
//! variants and omits the rest. Every resolved name is attempted by the
//! system-packages stage, which continues past individual failures, so a
//! variant that does not exist on a particular release is harmless.

use thiserror::Error;

/// Raised when the probed distribution matches no known package-manager
/// family. Fatal: the pipeline never starts.
#[derive(Debug, Error)]
#[error("unsupported distribution '{0}': expected a name containing 'openSUSE' or 'Ubuntu'")]
pub struct UnsupportedDistribution(pub String);

/// Package-manager family of the host distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageFamily {
    /// zypper-based (openSUSE).
    Zypper,
    /// apt-based (Ubuntu and derivatives).
    Apt,
}

impl PackageFamily {
    /// Derive the family from a probed distribution name.
    ///
    /// Matching is case-sensitive and substring-based: release qualifiers
    /// ("openSUSE Leap", "Ubuntu 18.04.3 LTS") must not defeat it.
    pub fn from_distro_name(name: &str) -> Result<Self, UnsupportedDistribution> {
        if name.contains("openSUSE") {
            Ok(PackageFamily::Zypper)
        } else if name.contains("Ubuntu") {
            Ok(PackageFamily::Apt)
        } else {
            Err(UnsupportedDistribution(name.to_string()))
        }
    }

    /// Non-interactive install command for one package.
    pub fn install_command(&self, package: &str) -> String {
        match self {
            PackageFamily::Zypper => format!("zypper install -y {package}"),
            PackageFamily::Apt => format!("apt-get install -y {package}"),
        }
    }

    /// System library directory whose shared objects need name repair.
    pub fn library_dir(&self) -> &'static str {
        match self {
            PackageFamily::Zypper => "/usr/lib64",
            PackageFamily::Apt => "/usr/lib/x86_64-linux-gnu",
        }
    }
}

impl std::fmt::Display for PackageFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageFamily::Zypper => write!(f, "zypper"),
            PackageFamily::Apt => write!(f, "apt"),
        }
    }
}

/// One conceptual dependency with its per-family package-name variants.
///
/// An empty variant list means the family either ships the dependency by
/// default or has no packaged equivalent; resolution simply omits it.
#[derive(Debug, Clone, Copy)]
pub struct Dependency {
    pub name: &'static str,
    pub zypper: &'static [&'static str],
    pub apt: &'static [&'static str],
}

impl Dependency {
    /// The literal package names to try for one family.
    pub fn variants(&self, family: PackageFamily) -> &'static [&'static str] {
        match family {
            PackageFamily::Zypper => self.zypper,
            PackageFamily::Apt => self.apt,
        }
    }
}

/// System packages required before any source build runs.
pub const SYSTEM_DEPENDENCIES: &[Dependency] = &[
    Dependency { name: "wget", zypper: &["wget"], apt: &["wget"] },
    Dependency { name: "gcc", zypper: &["gcc"], apt: &["gcc"] },
    Dependency { name: "g++", zypper: &["gcc-c++"], apt: &["g++"] },
    Dependency { name: "vim", zypper: &["vim"], apt: &["vim"] },
    Dependency { name: "git", zypper: &["git"], apt: &["git"] },
    Dependency { name: "scons", zypper: &["scons"], apt: &["scons"] },
    Dependency { name: "pip", zypper: &["python3-pip"], apt: &["python3-pip"] },
    Dependency { name: "gdb", zypper: &["gdb"], apt: &["gdb"] },
    Dependency { name: "jq", zypper: &["jq"], apt: &["jq"] },
    Dependency { name: "HDF5 library", zypper: &["hdf5"], apt: &["libhdf5-dev"] },
    Dependency { name: "autoconf", zypper: &["autoconf"], apt: &["autoconf"] },
    Dependency { name: "automake", zypper: &["automake"], apt: &["automake"] },
    Dependency { name: "libtool", zypper: &["libtool"], apt: &["libtool"] },
    Dependency { name: "curl", zypper: &["curl"], apt: &["curl"] },
    Dependency { name: "make", zypper: &["make"], apt: &["make"] },
    Dependency { name: "unzip", zypper: &["unzip"], apt: &["unzip"] },
    Dependency { name: "Armadillo runtime", zypper: &["libarmadillo9"], apt: &[] },
    Dependency { name: "PPS tools", zypper: &["pps-tools"], apt: &["pps-tools"] },
    // Boost runtime libraries; version-wildcarded because the packaged
    // minor version differs between the two families.
    Dependency {
        name: "Boost runtime",
        zypper: &["libboost_*_66_0"],
        apt: &["libboost-*67.0*"],
    },
    Dependency { name: "Mako templates", zypper: &["python3-mako"], apt: &["python3-mako"] },
    Dependency { name: "doxygen", zypper: &["doxygen"], apt: &["doxygen"] },
    Dependency { name: "docutils", zypper: &["python3-docutils"], apt: &["python3-docutils"] },
    Dependency { name: "cmake", zypper: &["cmake"], apt: &["cmake"] },
    Dependency { name: "UHD udev rules", zypper: &["uhd-udev"], apt: &["libuhd-dev"] },
    Dependency { name: "GPS runtime", zypper: &["libgps23"], apt: &[] },
    Dependency { name: "DPDK", zypper: &["dpdk"], apt: &["dpdk"] },
    Dependency {
        name: "SNMP headers",
        zypper: &["net-snmp-devel"],
        apt: &["net-snmp-dev", "libsnmp-dev"],
    },
    Dependency { name: "libevent headers", zypper: &["libevent-devel"], apt: &["libevent-dev"] },
    Dependency { name: "DPDK headers", zypper: &["dpdk-devel"], apt: &["dpdk-dev"] },
    Dependency {
        name: "PPS headers",
        zypper: &["pps-tools-devel"],
        apt: &["pps-tools-dev"],
    },
    Dependency { name: "X11 headers", zypper: &["libX11-devel"], apt: &["libx11-dev"] },
    Dependency { name: "Python headers", zypper: &["python3-devel"], apt: &["python3-dev"] },
    Dependency {
        name: "Boost headers",
        zypper: &["boost-devel"],
        apt: &["libboost-all-dev", "libboost-dev"],
    },
    Dependency {
        name: "libusb headers",
        zypper: &["libusb-1_0-devel"],
        apt: &["libusb-1.0-0-dev"],
    },
    Dependency {
        name: "kernel headers",
        zypper: &["kernel-devel"],
        apt: &["linux-headers-generic"],
    },
];

/// Python packages installed system-wide after the system stage.
pub const PIP_PACKAGES: &[&str] = &[
    "deepdish",
    "posix_ipc",
    "inotify",
    "matplotlib",
    "virtualenv",
    "protobuf",
    "zmq",
];

/// Runtime-only packages for the isolated post-processing environment.
pub const POST_PROCESSING_PACKAGES: &[&str] = &[
    "zmq",
    "git+https://github.com/SuperDARNCanada/backscatter.git#egg=backscatter",
    "pydarn",
];

/// Expand the dependency table to the literal package names of one family,
/// in table order.
pub fn resolve_system_packages(family: PackageFamily) -> Vec<&'static str> {
    SYSTEM_DEPENDENCIES
        .iter()
        .flat_map(|dep| dep.variants(family).iter().copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_from_substring_match() {
        assert_eq!(
            PackageFamily::from_distro_name("openSUSE Leap").unwrap(),
            PackageFamily::Zypper
        );
        assert_eq!(
            PackageFamily::from_distro_name("Ubuntu 18.04.3 LTS").unwrap(),
            PackageFamily::Apt
        );
    }

    #[test]
    fn test_family_match_is_case_sensitive() {
        assert!(PackageFamily::from_distro_name("ubuntu").is_err());
        assert!(PackageFamily::from_distro_name("OPENSUSE").is_err());
    }

    #[test]
    fn test_unknown_distribution_is_an_error() {
        let err = PackageFamily::from_distro_name("Fedora").unwrap_err();
        assert!(err.to_string().contains("Fedora"));
    }

    #[test]
    fn test_resolution_selects_only_active_family_variants() {
        let apt = resolve_system_packages(PackageFamily::Apt);
        assert!(apt.contains(&"libhdf5-dev"));
        assert!(!apt.contains(&"hdf5"));

        let zypper = resolve_system_packages(PackageFamily::Zypper);
        assert!(zypper.contains(&"hdf5"));
        assert!(!zypper.contains(&"libhdf5-dev"));
    }

    #[test]
    fn test_family_only_dependencies_are_omitted_not_errors() {
        let apt = resolve_system_packages(PackageFamily::Apt);
        assert!(!apt.contains(&"libarmadillo9"));
        assert!(!apt.contains(&"libgps23"));
    }

    #[test]
    fn test_multiple_variants_within_one_family_all_resolve() {
        let apt = resolve_system_packages(PackageFamily::Apt);
        assert!(apt.contains(&"net-snmp-dev"));
        assert!(apt.contains(&"libsnmp-dev"));
    }

    #[test]
    fn test_install_command_per_family() {
        assert_eq!(
            PackageFamily::Zypper.install_command("hdf5"),
            "zypper install -y hdf5"
        );
        assert_eq!(
            PackageFamily::Apt.install_command("libhdf5-dev"),
            "apt-get install -y libhdf5-dev"
        );
    }

    #[test]
    fn test_library_dir_per_family() {
        assert_eq!(PackageFamily::Zypper.library_dir(), "/usr/lib64");
        assert_eq!(
            PackageFamily::Apt.library_dir(),
            "/usr/lib/x86_64-linux-gnu"
        );
    }
}
