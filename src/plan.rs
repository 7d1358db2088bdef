//! The provisioning plan: which stages run, in which order, with which
//! commands.
//!
//! Source-build stages follow the same macro-sequence: fetch into the
//! installation root (clone, or download and extract), configure, compile
//! with `-j${CORES}`, optionally self-test, install, refresh the dynamic
//! linker cache. The UHD stage is the one that links against Boost by its
//! canonical names, so the shared-library repair runs inside it, before
//! any build command.

use std::path::Path;

use crate::config::InstallConfig;
use crate::executor::ShellCommand;
use crate::libfix::RepairSpec;
use crate::packages::{
    self, PackageFamily, PIP_PACKAGES, POST_PROCESSING_PACKAGES,
};
use crate::pipeline::{Action, FailurePolicy, Stage};

/// Build the full ordered stage list for one run.
pub fn build_stages(config: &InstallConfig, family: PackageFamily) -> Vec<Stage> {
    vec![
        system_packages(family),
        python_packages(),
        protobuf(config),
        zeromq(config),
        ntp(config),
        uhd(config, family),
        cuda(config),
        post_processing_env(config),
    ]
}

/// One install command per resolved package name. A variant missing on
/// this particular release must not halt provisioning.
fn system_packages(family: PackageFamily) -> Stage {
    let actions = packages::resolve_system_packages(family)
        .into_iter()
        .map(|package| Action::Run(ShellCommand::new(family.install_command(package))))
        .collect();

    Stage {
        name: "system-packages",
        policy: FailurePolicy::ContinueOnError,
        actions,
    }
}

fn python_packages() -> Stage {
    Stage {
        name: "python-packages",
        policy: FailurePolicy::AbortOnError,
        actions: vec![
            Action::Run(ShellCommand::new("pip3 install --upgrade pip")),
            Action::Run(ShellCommand::new(format!(
                "pip3 install {}",
                PIP_PACKAGES.join(" ")
            ))),
        ],
    }
}

fn protobuf(config: &InstallConfig) -> Stage {
    let src = config.install_dir.join("protobuf");
    Stage {
        name: "protobuf",
        policy: FailurePolicy::AbortOnError,
        actions: run_all([
            in_root(config, "git clone https://github.com/google/protobuf.git"),
            in_dir(&src, "./autogen.sh"),
            in_dir(&src, "./configure"),
            in_dir(&src, "make -j${CORES}"),
            in_dir(&src, "make -j${CORES} check"),
            in_dir(&src, "make install"),
            in_dir(&src, "ldconfig"),
        ]),
    }
}

/// libsodium first (libzmq's curve security needs it), then libzmq, then
/// the header-only C++ binding.
fn zeromq(config: &InstallConfig) -> Stage {
    let sodium = config.install_dir.join("libsodium");
    let zmq = config.install_dir.join("libzmq");
    let cpp = config.install_dir.join("cppzmq");
    Stage {
        name: "zeromq",
        policy: FailurePolicy::AbortOnError,
        actions: run_all([
            in_root(config, "git clone https://github.com/jedisct1/libsodium.git"),
            in_dir(&sodium, "git checkout stable"),
            in_dir(&sodium, "./autogen.sh"),
            in_dir(&sodium, "./configure"),
            in_dir(&sodium, "make -j${CORES} check"),
            in_dir(&sodium, "make install"),
            in_dir(&sodium, "ldconfig"),
            in_root(config, "git clone https://github.com/zeromq/libzmq.git"),
            in_dir(&zmq, "./autogen.sh"),
            in_dir(&zmq, "./configure --with-libsodium"),
            in_dir(&zmq, "make -j${CORES}"),
            in_dir(&zmq, "make install"),
            in_dir(&zmq, "ldconfig"),
            in_root(config, "git clone https://github.com/zeromq/cppzmq.git"),
            in_dir(&cpp, "cp zmq.hpp /usr/local/include/"),
            in_dir(&cpp, "cp zmq_addon.hpp /usr/local/include/"),
        ]),
    }
}

/// NTP with PPS support; needs timepps.h visible at the path the
/// configure script probes.
fn ntp(config: &InstallConfig) -> Stage {
    let src = config.install_dir.join("ntp-4.2.8p13");
    Stage {
        name: "ntp",
        policy: FailurePolicy::AbortOnError,
        actions: run_all([
            in_root(config, "cp -v /usr/include/sys/timepps.h /usr/include/"),
            in_root(
                config,
                "wget http://www.eecis.udel.edu/~ntp/ntp_spool/ntp4/ntp-4.2/ntp-4.2.8p13.tar.gz",
            ),
            in_root(config, "tar xf ntp-4.2.8p13.tar.gz"),
            in_dir(&src, "./configure --enable-atom"),
            in_dir(&src, "make -j${CORES}"),
            in_dir(&src, "make install"),
        ]),
    }
}

fn uhd(config: &InstallConfig, family: PackageFamily) -> Stage {
    let src = config.install_dir.join("uhd");
    let build = src.join("host/build");

    let mut actions = vec![Action::RepairSharedLibraries(RepairSpec::boost(family))];
    actions.extend(run_all([
        in_root(
            config,
            "git clone --recursive https://github.com/EttusResearch/uhd.git",
        ),
        in_dir(&src, "git checkout UHD-3.14"),
        in_dir(&src, "git submodule init"),
        in_dir(&src, "git submodule update"),
        in_dir(&src, "mkdir -p host/build"),
        in_dir(
            &build,
            "cmake -DENABLE_PYTHON3=on -DPYTHON_EXECUTABLE=$(which python3) \
             -DRUNTIME_PYTHON_EXECUTABLE=$(which python3) -DENABLE_PYTHON_API=ON \
             -DENABLE_DPDK=OFF ../",
        ),
        in_dir(&build, "make -j${CORES}"),
        in_dir(&build, "make -j${CORES} test"),
        in_dir(&build, "make install"),
        in_dir(&build, "ldconfig"),
    ]));

    Stage {
        name: "uhd",
        policy: FailurePolicy::AbortOnError,
        actions,
    }
}

fn cuda(config: &InstallConfig) -> Stage {
    let runfile = "cuda_10.2.89_440.33.01_linux.run";
    Stage {
        name: "cuda",
        policy: FailurePolicy::AbortOnError,
        actions: run_all([
            in_root(
                config,
                format!(
                    "wget http://developer.download.nvidia.com/compute/cuda/10.2/Prod/local_installers/{runfile}"
                ),
            ),
            in_root(config, format!("sh {runfile} --silent --toolkit --samples")),
        ]),
    }
}

/// Isolated virtualenv for post-processing tools, plus the hardware
/// description repository the tools read.
fn post_processing_env(config: &InstallConfig) -> Stage {
    let env_dir = config.install_dir.join("post-processing-env");
    let pip = env_dir.join("bin/pip");

    let mut commands = vec![
        ShellCommand::in_dir("git clone https://github.com/vtsuperdarn/hdw.dat.git", "/usr/local"),
        in_root(config, format!("virtualenv {}", env_dir.display())),
    ];
    commands.extend(POST_PROCESSING_PACKAGES.iter().map(|package| {
        in_root(config, format!("{} install {}", pip.display(), package))
    }));

    Stage {
        name: "post-processing-env",
        policy: FailurePolicy::AbortOnError,
        actions: commands.into_iter().map(Action::Run).collect(),
    }
}

fn in_root(config: &InstallConfig, script: impl Into<String>) -> ShellCommand {
    ShellCommand::in_dir(script, &config.install_dir)
}

fn in_dir(dir: &Path, script: impl Into<String>) -> ShellCommand {
    ShellCommand::in_dir(script, dir)
}

fn run_all<const N: usize>(commands: [ShellCommand; N]) -> Vec<Action> {
    commands.into_iter().map(Action::Run).collect()
}
