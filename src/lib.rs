//! Provisioning pipeline for radar data-acquisition hosts.
//!
//! A freshly installed host needs a curated set of system packages, several
//! dependencies built from source (packaged versions do not satisfy the
//! version/ABI requirements of the acquisition software), repaired
//! shared-library names, and an isolated Python environment for
//! post-processing tools. This crate drives all of that as an ordered,
//! fail-forward stage pipeline:
//!
//! - **Distribution probe** - reads `/etc/os-release` and extracts the
//!   distribution name
//! - **Package resolver** - maps conceptual dependencies to the literal
//!   package names of the host's package-manager family
//! - **Stage pipeline** - runs stages in fixed order with a per-stage
//!   failure policy (optional package installs continue past failures,
//!   source builds abort the run)
//! - **Library repair** - synthesizes the unversioned `.so` symlinks a
//!   downstream build expects from the versioned files distributions ship
//!
//! The pipeline is strictly sequential; the only concurrency is inside
//! spawned build commands (`make -j`), parameterized by the detected core
//! count. A run lock under the installation root rejects concurrent
//! invocations, and every run leaves a JSON report of per-command outcomes.

pub mod config;
pub mod executor;
pub mod libfix;
pub mod lock;
pub mod packages;
pub mod pipeline;
pub mod plan;
pub mod preflight;
pub mod probe;
pub mod report;

pub use config::InstallConfig;
pub use executor::{CommandFailure, ShellCommand};
pub use packages::PackageFamily;
pub use pipeline::{FailurePolicy, PipelineOutcome, Stage};
