//! Methods specific to the svconfirm logger
//!

use camino::Utf8Path;

use crate::globals::PROGRAM_NAME;

/// If debug is true set the default logger to the more verbose debug level
///
/// The log file is named after the program and the start time of the run, so that repeated runs in
/// the same working directory each keep their own log.
///
fn setup_logger(working_dir: &Utf8Path, debug: bool) -> Result<(), fern::InitError> {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let logger = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                PROGRAM_NAME,
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    let log_filename = working_dir.join(format!(
        "{PROGRAM_NAME}_{}.log",
        chrono::Local::now().format("%y%m%d_%H%M%S")
    ));
    logger.chain(fern::log_file(log_filename)?).apply()?;
    Ok(())
}

/// Check that the working directory exists, then setup logger to write there
///
/// Unlike most output directories, the working directory is never created here. It holds the
/// input evidence bundle, so a missing directory is treated as a usage error.
///
/// #Arguments
/// * `debug` - If true use debug log level, and info level otherwise
///
pub fn check_working_dir_and_setup_logger(working_dir: &Utf8Path, debug: bool) {
    // All error messaging in this method needs to account for no logger being setup yet.
    if !working_dir.is_dir() {
        eprintln!("Invalid command-line setting: Working directory does not exist: \"{working_dir}\"");
        std::process::exit(exitcode::USAGE);
    }

    if let Err(err) = setup_logger(working_dir, debug) {
        eprintln!("Unable to setup logger in working directory \"{working_dir}\": {err}");
        std::process::exit(exitcode::CANTCREAT);
    }
}
