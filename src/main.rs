mod alignment_pipeline;
mod bam_utils;
mod cli;
mod confirm_clusters;
mod confirmed_output;
mod evidence;
mod evidence_bundle;
mod evidence_cluster;
mod filenames;
mod globals;
mod log_utils;
mod logger;
mod os_utils;
mod parameters;
mod pipeline;
mod read_file_type;
mod run_stats;
mod tail_extraction;

use std::{error, process};

use hhmmss::Hhmmss;
use log::{error, info};

use crate::globals::{PROGRAM_NAME, PROGRAM_VERSION};
use crate::logger::check_working_dir_and_setup_logger;
use crate::pipeline::run_confirmation;

/// Run system configuration steps prior to starting any other program logic
///
fn system_configuration_prelude() {
    os_utils::attempt_max_open_file_limit();
}

fn run(settings: &cli::Settings) -> Result<(), Box<dyn error::Error>> {
    info!("Starting {PROGRAM_NAME} {PROGRAM_VERSION}");
    info!(
        "cmdline: {}",
        std::env::args().collect::<Vec<_>>().join(" ")
    );
    info!("Running on {} threads", settings.shared.thread_count);

    let start = std::time::Instant::now();

    run_confirmation(settings)?;

    info!(
        "{PROGRAM_NAME} completed. Total Runtime: {}",
        start.elapsed().hhmmssxxx()
    );
    Ok(())
}

fn main() {
    system_configuration_prelude();

    let settings = cli::validate_and_fix_settings(cli::parse_settings());

    // The working directory must exist before the log file can be written there:
    check_working_dir_and_setup_logger(&settings.working_dir, settings.shared.debug);

    if let Err(err) = run(&settings) {
        error!("{err}");
        process::exit(2);
    }
}
