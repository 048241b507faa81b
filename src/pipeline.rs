use std::time::Instant;

use log::info;
use simple_error::SimpleResult;

use crate::alignment_pipeline::{AlignmentTools, run_read_alignments};
use crate::cli;
use crate::confirm_clusters::{ConfirmSettings, confirm_evidence_bundle};
use crate::confirmed_output::write_confirmed_output;
use crate::evidence::EvidenceFiles;
use crate::evidence_bundle::read_evidence_bundle;
use crate::filenames::{
    PARAMETERS_FILENAME, RUN_STATS_FILENAME, ReadAlignmentFilenames, ReadTailFilenames,
};
use crate::parameters::{read_parameter_overrides, resolve_parameters, write_parameters};
use crate::read_file_type::get_supported_read_file_type;
use crate::run_stats::{ConfirmRunStats, write_confirm_run_stats};
use crate::tail_extraction::create_tail_files;

/// Run all confirmation stages in order, each stage completes before the next one starts
///
pub fn run_confirmation(settings: &cli::Settings) -> SimpleResult<()> {
    let start = Instant::now();
    let working_dir = &settings.working_dir;
    let mut run_stats = ConfirmRunStats::default();

    let mut bundle = read_evidence_bundle(&settings.evidence_bundle_filename)?;

    let config_file_overrides = match &settings.config_filename {
        Some(x) => Some(read_parameter_overrides(x)?),
        None => None,
    };
    let params = resolve_parameters(
        config_file_overrides.as_ref(),
        &settings.parameter_overrides,
    )?;
    write_parameters(&working_dir.join(PARAMETERS_FILENAME), &params)?;

    let reads_type = get_supported_read_file_type(&settings.reads_filename)?;

    let stage_start = Instant::now();
    let full_reads_filename = create_tail_files(
        working_dir,
        &settings.reads_filename,
        reads_type,
        params.tail_span,
    )?;
    run_stats.total_tail_extraction_time_secs = stage_start.elapsed().as_secs_f64();

    let stage_start = Instant::now();
    let tools = AlignmentTools {
        aligner_bin: &settings.aligner_bin,
        samtools_bin: &settings.samtools_bin,
        thread_count: settings.shared.thread_count,
    };
    let tail_filenames = ReadTailFilenames::new(working_dir, &settings.reads_filename);
    let alignment_filenames = ReadAlignmentFilenames::new(working_dir, &full_reads_filename);
    run_read_alignments(
        &tools,
        &settings.ref_filename,
        &tail_filenames,
        &full_reads_filename,
        &alignment_filenames,
    )?;
    run_stats.total_alignment_time_secs = stage_start.elapsed().as_secs_f64();

    let stage_start = Instant::now();
    let files = EvidenceFiles {
        full_reads: full_reads_filename,
        reference: settings.ref_filename.clone(),
        alignments: alignment_filenames,
    };
    let confirm_settings = ConfirmSettings {
        files: &files,
        params: &params,
        thread_count: settings.shared.thread_count,
        debug_confirm: settings.shared.debug_confirm,
    };
    run_stats.confirm_stats = confirm_evidence_bundle(&confirm_settings, &mut bundle)?;
    run_stats.total_confirmation_time_secs = stage_start.elapsed().as_secs_f64();
    info!("Finished confirmation of all evidence clusters");

    write_confirmed_output(working_dir, &bundle)?;

    run_stats.total_run_time_secs = start.elapsed().as_secs_f64();
    write_confirm_run_stats(&working_dir.join(RUN_STATS_FILENAME), &run_stats)?;
    Ok(())
}
