//! Names of all files read or written in the working directory
//!
//! Intermediate read and alignment files are named deterministically from the reads file basename,
//! so that a rerun in the same working directory finds and skips everything already produced.
//!

use camino::{Utf8Path, Utf8PathBuf};
use const_format::concatcp;

pub const EVIDENCE_BUNDLE_FILENAME: &str = "sv_evidences.mpack";
pub const CONFIRMED_EVIDENCE_BUNDLE_FILENAME: &str = "sv_confirmed_evidences.mpack";
pub const EVIDENCE_OUTPUT_DIRNAME: &str = "evidences";
const CONFIRMED_BED_SUFFIX: &str = "_confirmed.bed";
pub const DELETION_BED_FILENAME: &str = concatcp!("del", CONFIRMED_BED_SUFFIX);
pub const INSERTION_BED_FILENAME: &str = concatcp!("ins", CONFIRMED_BED_SUFFIX);
pub const INVERSION_BED_FILENAME: &str = concatcp!("inv", CONFIRMED_BED_SUFFIX);
pub const PARAMETERS_FILENAME: &str = "confirm.settings.json";
pub const RUN_STATS_FILENAME: &str = "confirm.run.stats.json";

/// Reads filename with its directory and final extension removed
///
/// Only the last extension is removed, so "reads.fastq.gz" yields "reads.fastq"
///
pub fn get_reads_file_prefix(reads_filename: &Utf8Path) -> &str {
    reads_filename
        .file_stem()
        .unwrap_or_else(|| reads_filename.as_str())
}

/// Intermediate read tail and full read fasta files
#[derive(Clone, Debug, PartialEq)]
pub struct ReadTailFilenames {
    pub left_tails: Utf8PathBuf,
    pub right_tails: Utf8PathBuf,

    /// Decompressed full read fasta, only used for compressed read input
    pub decompressed_reads: Utf8PathBuf,
}

impl ReadTailFilenames {
    pub fn new(working_dir: &Utf8Path, reads_filename: &Utf8Path) -> Self {
        let prefix = get_reads_file_prefix(reads_filename);
        Self {
            left_tails: working_dir.join(format!("{prefix}_left.fa")),
            right_tails: working_dir.join(format!("{prefix}_right.fa")),
            decompressed_reads: working_dir.join(format!("{prefix}.fa")),
        }
    }
}

/// One coordinate-sorted alignment file and its index
#[derive(Clone, Debug, PartialEq)]
pub struct AlignmentFilenames {
    pub bam: Utf8PathBuf,
    pub bai: Utf8PathBuf,
}

impl AlignmentFilenames {
    fn new(working_dir: &Utf8Path, basename: String) -> Self {
        let bam = working_dir.join(basename);
        let bai = Utf8PathBuf::from(format!("{bam}.bai"));
        Self { bam, bai }
    }
}

/// The three alignment artifacts, for left tails, right tails and full reads
#[derive(Clone, Debug, PartialEq)]
pub struct ReadAlignmentFilenames {
    pub left_tails: AlignmentFilenames,
    pub right_tails: AlignmentFilenames,
    pub full_reads: AlignmentFilenames,
}

impl ReadAlignmentFilenames {
    /// # Arguments
    ///
    /// * `full_reads_filename` - The full read fasta actually aligned, which is either the original
    ///   reads file or the decompressed copy
    ///
    pub fn new(working_dir: &Utf8Path, full_reads_filename: &Utf8Path) -> Self {
        let prefix = get_reads_file_prefix(full_reads_filename);
        Self {
            left_tails: AlignmentFilenames::new(
                working_dir,
                format!("{prefix}_left_aln.coordsorted.bam"),
            ),
            right_tails: AlignmentFilenames::new(
                working_dir,
                format!("{prefix}_right_aln.coordsorted.bam"),
            ),
            full_reads: AlignmentFilenames::new(
                working_dir,
                format!("{prefix}_aln.coordsorted.bam"),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_reads_file_prefix() {
        assert_eq!(get_reads_file_prefix(Utf8Path::new("/data/reads.fa")), "reads");
        assert_eq!(
            get_reads_file_prefix(Utf8Path::new("/data/reads.fastq.gz")),
            "reads.fastq"
        );
        assert_eq!(get_reads_file_prefix(Utf8Path::new("reads")), "reads");
    }

    #[test]
    fn test_alignment_filenames() {
        let names = ReadAlignmentFilenames::new(Utf8Path::new("work"), Utf8Path::new("/x/r.fa"));
        assert_eq!(names.left_tails.bam, "work/r_left_aln.coordsorted.bam");
        assert_eq!(names.right_tails.bai, "work/r_right_aln.coordsorted.bam.bai");
        assert_eq!(names.full_reads.bam, "work/r_aln.coordsorted.bam");
    }
}
