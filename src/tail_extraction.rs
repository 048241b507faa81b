//! Extract read tails from the input reads file
//!
//! A single streaming pass over the reads file writes the left (prefix) and right (suffix) tails of
//! every long read to separate fasta files. Compressed input is additionally written out in full as
//! an uncompressed fasta, because the full-read alignment and read index steps need a seekable file.
//!

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};

use bio::io::{fasta, fastq};
use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::MultiGzDecoder;
use log::{info, warn};
use simple_error::{SimpleResult, bail, try_with};
use thousands::Separable;

use crate::filenames::ReadTailFilenames;
use crate::read_file_type::ReadFileType;

/// Reads must be longer than this to contribute read tails
pub const MIN_TAIL_READ_LENGTH: usize = 2000;

type FastaFileWriter = fasta::Writer<File>;

/// Open a new fasta output file, unless it already exists
///
/// An existing file is never overwritten, which allows a failed run to be restarted in the same
/// working directory.
///
fn open_unless_exists(filename: &Utf8Path, label: &str) -> SimpleResult<Option<FastaFileWriter>> {
    if filename.exists() {
        warn!("FASTA file for {label} exists. Skip");
        return Ok(None);
    }
    let f = try_with!(
        File::create(filename),
        "Unable to create {label} fasta file: '{filename}'"
    );
    Ok(Some(fasta::Writer::from_bufwriter(BufWriter::new(f))))
}

/// All fasta output files which still need to be written
struct TailWriters {
    tail_span: usize,
    left: Option<FastaFileWriter>,
    right: Option<FastaFileWriter>,
    full: Option<FastaFileWriter>,
    tail_read_count: usize,
}

impl TailWriters {
    fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none() && self.full.is_none()
    }

    fn write_read(&mut self, id: &str, desc: Option<&str>, seq: &[u8]) -> std::io::Result<()> {
        if seq.len() > MIN_TAIL_READ_LENGTH {
            let span = std::cmp::min(self.tail_span, seq.len());
            if let Some(left) = self.left.as_mut() {
                left.write(id, desc, &seq[..span])?;
            }
            if let Some(right) = self.right.as_mut() {
                right.write(id, desc, &seq[seq.len() - span..])?;
            }
            self.tail_read_count += 1;
        }
        if let Some(full) = self.full.as_mut() {
            full.write(id, desc, seq)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        for writer in [&mut self.left, &mut self.right, &mut self.full]
            .into_iter()
            .flatten()
        {
            writer.flush()?;
        }
        Ok(())
    }
}

fn open_reads_file(
    reads_filename: &Utf8Path,
    reads_type: ReadFileType,
) -> SimpleResult<Box<dyn BufRead>> {
    let f = try_with!(
        File::open(reads_filename),
        "Unable to open reads file: '{reads_filename}'"
    );
    let reader: Box<dyn BufRead> = if reads_type.is_compressed() {
        Box::new(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    };
    Ok(reader)
}

/// Stream all reads from the input file through the tail writers
///
fn stream_reads(
    reader: Box<dyn BufRead>,
    reads_type: ReadFileType,
    writers: &mut TailWriters,
    reads_filename: &Utf8Path,
) -> SimpleResult<usize> {
    let mut read_count = 0;
    if reads_type.is_fastq() {
        for result in fastq::Reader::from_bufread(reader).records() {
            let record = try_with!(
                result,
                "Error during fastq record parsing in reads file '{reads_filename}'"
            );
            try_with!(
                writers.write_read(record.id(), record.desc(), record.seq()),
                "Error writing read tails"
            );
            read_count += 1;
        }
    } else {
        for result in fasta::Reader::from_bufread(reader).records() {
            let record = try_with!(
                result,
                "Error during fasta record parsing in reads file '{reads_filename}'"
            );
            try_with!(
                writers.write_read(record.id(), record.desc(), record.seq()),
                "Error writing read tails"
            );
            read_count += 1;
        }
    }
    Ok(read_count)
}

/// Create fasta files with read tails, and full reads for compressed input, if they do not exist
///
/// Each of the (up to three) output files is skipped with a warning if it is already present. If no
/// output needs to be written the reads file is not opened at all.
///
/// Returns the path of the full read fasta to use for the full read alignment, which is the input
/// reads file itself unless the input is compressed.
///
pub fn create_tail_files(
    working_dir: &Utf8Path,
    reads_filename: &Utf8Path,
    reads_type: ReadFileType,
    tail_span: usize,
) -> SimpleResult<Utf8PathBuf> {
    if matches!(reads_type, ReadFileType::Unknown | ReadFileType::List) {
        bail!("Can't extract read tails from {reads_type} reads file '{reads_filename}'");
    }

    let filenames = ReadTailFilenames::new(working_dir, reads_filename);

    let (full_reads_filename, full) = if reads_type.is_compressed() {
        let full = open_unless_exists(&filenames.decompressed_reads, "full reads")?;
        (filenames.decompressed_reads.clone(), full)
    } else {
        (reads_filename.to_path_buf(), None)
    };

    let mut writers = TailWriters {
        tail_span,
        left: open_unless_exists(&filenames.left_tails, "left tails")?,
        right: open_unless_exists(&filenames.right_tails, "right tails")?,
        full,
        tail_read_count: 0,
    };

    if !writers.is_empty() {
        info!("Extracting read tails from reads file '{reads_filename}'");
        let reader = open_reads_file(reads_filename, reads_type)?;
        let read_count = stream_reads(reader, reads_type, &mut writers, reads_filename)?;
        try_with!(writers.flush(), "Error writing read tails");
        info!(
            "Processed {} reads, {} reads longer than {MIN_TAIL_READ_LENGTH} bases contributed read tails",
            read_count.separate_with_commas(),
            writers.tail_read_count.separate_with_commas()
        );
    }

    info!("Read tail and full read files written");
    Ok(full_reads_filename)
}
