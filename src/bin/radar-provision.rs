use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Result};
use radar_provision::lock::ProvisionLock;
use radar_provision::pipeline::PipelineOutcome;
use radar_provision::report::RunReport;
use radar_provision::{pipeline, plan, preflight, probe, report, InstallConfig, PackageFamily};

fn usage() -> &'static str {
    "Usage:\n  radar-provision <installation_directory>\n\n\
     Downloads and configures every dependency of the radar data-acquisition\n\
     software: system packages, Python packages, from-source builds (protobuf,\n\
     zeromq, ntp, uhd, cuda), and an isolated post-processing environment.\n\n\
     Example:\n  radar-provision /opt/radar"
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let result = match args.as_slice() {
        [arg] if arg == "-h" || arg == "--help" => {
            println!("{}", usage());
            return ExitCode::SUCCESS;
        }
        [install_dir] => provision(Path::new(install_dir)),
        _ => {
            eprintln!("{}", usage());
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn provision(install_dir: &Path) -> Result<()> {
    let config = InstallConfig::new(install_dir)?;

    preflight::ensure_root()?;
    preflight::check_host_tools()?;
    let _lock = ProvisionLock::acquire(&config.install_dir)?;

    let distribution = probe::probe_distribution(Path::new(probe::OS_RELEASE_PATH))?;
    let family = PackageFamily::from_distro_name(&distribution)?;
    println!(
        "[provision] {} ({} family), installing under {} with {} cores",
        distribution,
        family,
        config.install_dir.display(),
        config.cores
    );

    let stages = plan::build_stages(&config, family);
    let started_at = report::now_utc()?;
    let (stage_reports, outcome) = pipeline::run(&stages, &config);
    let finished_at = report::now_utc()?;

    let run_report = RunReport {
        run_id: report::new_run_id(),
        distribution,
        package_family: family.to_string(),
        started_at_utc: started_at,
        finished_at_utc: finished_at,
        outcome: outcome.clone(),
        stages: stage_reports,
    };
    let report_path = report::write_report(&run_report, &config.install_dir)?;
    println!("[provision] run report written to {}", report_path.display());

    match outcome {
        PipelineOutcome::AllCompleted => {
            println!("[provision] all stages completed");
            Ok(())
        }
        PipelineOutcome::AbortedAt(stage) => {
            bail!("provisioning aborted at stage '{stage}'; see the run report")
        }
    }
}
