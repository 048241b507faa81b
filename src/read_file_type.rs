use camino::Utf8Path;
use log::{error, info};
use simple_error::{SimpleResult, bail};
use strum::{Display, EnumIter};

/// Read input file formats, as recognized from the filename suffix
#[derive(Clone, Copy, Debug, Display, EnumIter, Eq, PartialEq)]
pub enum ReadFileType {
    #[strum(to_string = "FASTA")]
    Fasta,
    #[strum(to_string = "FASTQ")]
    Fastq,
    #[strum(to_string = "gzipped FASTA")]
    FastaGzip,
    #[strum(to_string = "gzipped FASTQ")]
    FastqGzip,
    #[strum(to_string = "FASTA file list")]
    List,
    #[strum(to_string = "unknown")]
    Unknown,
}

impl ReadFileType {
    pub fn is_compressed(&self) -> bool {
        matches!(self, Self::FastaGzip | Self::FastqGzip)
    }

    pub fn is_fastq(&self) -> bool {
        matches!(self, Self::Fastq | Self::FastqGzip)
    }
}

/// Recognized filename suffixes for each read file type
///
/// Matching is case-sensitive.
///
const READ_FILE_SUFFIXES: &[(ReadFileType, &[&str])] = &[
    (ReadFileType::Fasta, &[".fa", ".fasta", ".FA"]),
    (ReadFileType::Fastq, &[".fq", ".fastq", ".FQ"]),
    (
        ReadFileType::FastaGzip,
        &[".fa.gz", ".fasta.gz", ".fa.gzip", ".fasta.gzip"],
    ),
    (
        ReadFileType::FastqGzip,
        &[".fq.gz", ".fastq.gz", ".fq.gzip", ".fastq.gzip"],
    ),
    (ReadFileType::List, &[".fa.fn"]),
];

/// Classify the reads file format from its filename suffix
///
/// An unrecognized suffix is logged as an error and reported as [ReadFileType::Unknown]; it is the
/// caller's responsibility to stop on this value, see [get_supported_read_file_type].
///
pub fn guess_read_file_type(reads_filename: &Utf8Path) -> ReadFileType {
    let filename = reads_filename.as_str();
    for (file_type, suffixes) in READ_FILE_SUFFIXES {
        if suffixes.iter().any(|x| filename.ends_with(x)) {
            info!("Recognized reads file as {file_type} format.");
            return *file_type;
        }
    }
    error!("Unknown file ending of reads file '{reads_filename}'");
    ReadFileType::Unknown
}

/// Classify the reads file format, and return an error for any format which can't be processed
/// by tail extraction
///
pub fn get_supported_read_file_type(reads_filename: &Utf8Path) -> SimpleResult<ReadFileType> {
    let file_type = guess_read_file_type(reads_filename);
    match file_type {
        ReadFileType::Unknown => {
            bail!("Unrecognized file ending of reads file: '{reads_filename}'")
        }
        ReadFileType::List => {
            bail!("Reads file '{reads_filename}' is a {file_type}, which is not supported for confirmation")
        }
        _ => Ok(file_type),
    }
}
