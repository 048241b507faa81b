mod shared;
mod utils;

use camino::Utf8PathBuf;
use clap::Parser;
use simple_error::SimpleResult;

use self::shared::validate_and_fix_shared_settings;
pub use self::shared::SharedSettings;
use self::utils::{check_optional_filename, check_required_filename};
use crate::filenames::EVIDENCE_BUNDLE_FILENAME;
use crate::parameters::ParameterOverrides;

#[derive(Parser)]
#[command(
    version,
    about,
    long_about = "Confirm structural variant evidence clusters from a previous collection step using \
read-tail mapping and full-read realignment. A confidence score is assigned to every deletion, \
insertion and inversion cluster, and the updated evidence bundle is written for the merge step.",
    help_template = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}"
)]
#[clap(rename_all = "kebab_case")]
pub struct Settings {
    /// Working directory, containing the evidence bundle and receiving all output (must already exist)
    #[arg(value_name = "WORKING_DIR")]
    pub working_dir: Utf8PathBuf,

    /// Read file (FASTA, FASTQ, gzipped FASTA and FASTQ)
    #[arg(value_name = "READS")]
    pub reads_filename: Utf8PathBuf,

    /// Genome reference in FASTA format
    #[arg(value_name = "GENOME")]
    pub ref_filename: Utf8PathBuf,

    /// Parameter configuration file in JSON format
    ///
    /// The file holds a single flat object mapping parameter names to values, e.g.
    /// '{"tail_span": 1000, "count_k": 13}'. Any parameter given on the command-line overrides
    /// the file value.
    ///
    #[arg(long = "config", value_name = "FILE")]
    pub config_filename: Option<Utf8PathBuf>,

    /// Evidence bundle from the collection step to confirm (default: WORKING_DIR/sv_evidences.mpack)
    #[arg(short = 'i', long = "evidence-bundle", value_name = "FILE")]
    evidence_bundle_option: Option<Utf8PathBuf>,

    /// This value will be filled in by evidence_bundle_option
    #[arg(skip)]
    pub evidence_bundle_filename: Utf8PathBuf,

    /// Long-read aligner executable
    #[arg(hide = true, long, default_value = "ngmlr")]
    pub aligner_bin: String,

    /// samtools executable
    #[arg(hide = true, long, default_value = "samtools")]
    pub samtools_bin: String,

    #[command(flatten)]
    pub shared: SharedSettings,

    #[command(flatten, next_help_heading = "Parameter overrides")]
    pub parameter_overrides: ParameterOverrides,
}

pub fn parse_settings() -> Settings {
    Settings::parse()
}

/// Validate settings and update parameters that can't be processed by clap
///
/// The working directory itself is checked during logger setup.
///
pub fn validate_and_fix_settings_impl(mut settings: Settings) -> SimpleResult<Settings> {
    settings.shared = validate_and_fix_shared_settings(settings.shared)?;

    check_required_filename(&settings.reads_filename, "reads")?;
    check_required_filename(&settings.ref_filename, "reference")?;
    check_optional_filename(settings.config_filename.as_deref(), "configuration")?;

    settings.evidence_bundle_filename = match settings.evidence_bundle_option.take() {
        Some(x) => x,
        None => settings.working_dir.join(EVIDENCE_BUNDLE_FILENAME),
    };

    Ok(settings)
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_settings(settings: Settings) -> Settings {
    match validate_and_fix_settings_impl(settings) {
        Ok(x) => x,
        Err(msg) => {
            eprintln!("Invalid command-line setting: {msg}");
            std::process::exit(exitcode::USAGE);
        }
    }
}
