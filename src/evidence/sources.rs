use camino::{Utf8Path, Utf8PathBuf};
use rust_htslib::{bam, faidx};
use simple_error::{SimpleResult, try_with};

use crate::filenames::ReadAlignmentFilenames;

/// Input files needed to gather confirmation evidence
#[derive(Clone, Debug)]
pub struct EvidenceFiles {
    /// Uncompressed full read sequences
    pub full_reads: Utf8PathBuf,
    pub reference: Utf8PathBuf,
    pub alignments: ReadAlignmentFilenames,
}

fn open_bam_reader(bam_filename: &Utf8Path, ref_filename: &Utf8Path) -> SimpleResult<bam::IndexedReader> {
    let mut reader = try_with!(
        bam::IndexedReader::from_path(bam_filename),
        "Unable to open indexed alignment file: '{bam_filename}'"
    );
    try_with!(
        reader.set_reference(ref_filename),
        "Unable to set reference on alignment file: '{bam_filename}'"
    );
    Ok(reader)
}

fn open_faidx_reader(filename: &Utf8Path, label: &str) -> SimpleResult<faidx::Reader> {
    let reader = try_with!(
        faidx::Reader::from_path(filename),
        "Unable to open or index {label} file: '{filename}'"
    );
    Ok(reader)
}

/// Build the read and reference sequence indices if they don't exist
///
/// Must complete before any confirmation task opens its readers, htslib index creation is not safe
/// against concurrent readers of the same index file.
///
pub fn build_sequence_indices(files: &EvidenceFiles) -> SimpleResult<()> {
    open_faidx_reader(&files.full_reads, "full read")?;
    open_faidx_reader(&files.reference, "reference")?;
    Ok(())
}

/// Random-access sequence and alignment readers owned by one confirmation task
///
/// None of these readers can be shared between threads, so each task opens its own set and drops
/// it when the task completes.
///
pub struct EvidenceSources {
    reads: faidx::Reader,
    reference: faidx::Reader,
    pub left_tails: bam::IndexedReader,
    pub right_tails: bam::IndexedReader,
    pub full_reads: bam::IndexedReader,
}

impl EvidenceSources {
    /// Open all readers, the sequence indices should already exist, see [build_sequence_indices]
    ///
    pub fn open(files: &EvidenceFiles) -> SimpleResult<Self> {
        let reference = &files.reference;
        Ok(Self {
            reads: open_faidx_reader(&files.full_reads, "full read")?,
            reference: open_faidx_reader(reference, "reference")?,
            left_tails: open_bam_reader(&files.alignments.left_tails.bam, reference)?,
            right_tails: open_bam_reader(&files.alignments.right_tails.bam, reference)?,
            full_reads: open_bam_reader(&files.alignments.full_reads.bam, reference)?,
        })
    }

    /// Full sequence of one read, in upper case, or None if the read is not in the index
    ///
    pub fn get_read_seq(&self, qname: &str) -> SimpleResult<Option<Vec<u8>>> {
        let Some(read_len) = get_seq_len(&self.reads, qname) else {
            return Ok(None);
        };
        fetch_upper_case_seq(&self.reads, qname, 0, read_len).map(Some)
    }

    pub fn get_contig_len(&self, contig: &str) -> Option<usize> {
        get_seq_len(&self.reference, contig)
    }

    /// Reference sequence of the zero-indexed, half-open range [start,end), in upper case
    ///
    pub fn get_ref_seq(&self, contig: &str, start: usize, end: usize) -> SimpleResult<Vec<u8>> {
        fetch_upper_case_seq(&self.reference, contig, start, end)
    }
}

/// Sequence length from the index, or None for a missing or empty sequence
///
fn get_seq_len(reader: &faidx::Reader, name: &str) -> Option<usize> {
    // A missing sequence is reported as a negative length cast to u64
    let len = i64::try_from(reader.fetch_seq_len(name)).ok()?;
    if len > 0 { Some(len as usize) } else { None }
}

fn fetch_upper_case_seq(
    reader: &faidx::Reader,
    name: &str,
    start: usize,
    end: usize,
) -> SimpleResult<Vec<u8>> {
    if end <= start {
        return Ok(Vec::new());
    }
    let mut seq = try_with!(
        reader.fetch_seq(name, start, end - 1),
        "Unable to fetch sequence '{name}:{start}-{end}'"
    )
    .to_vec();
    seq.make_ascii_uppercase();
    Ok(seq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_faidx_sequence_access() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(tmp.path()).unwrap();
        let fasta_filename = dir.join("ref.fa");
        {
            let mut f = std::fs::File::create(&fasta_filename).unwrap();
            writeln!(f, ">chr1 test contig").unwrap();
            writeln!(f, "ACGTACGTAC").unwrap();
            writeln!(f, "gtacgtacgt").unwrap();
            writeln!(f, ">chr2").unwrap();
            writeln!(f, "TTTTT").unwrap();
        }

        let reader = open_faidx_reader(&fasta_filename, "test").unwrap();
        assert_eq!(get_seq_len(&reader, "chr1"), Some(20));
        assert_eq!(get_seq_len(&reader, "chr3"), None);

        let seq = fetch_upper_case_seq(&reader, "chr1", 8, 12).unwrap();
        assert_eq!(seq, b"ACGT".to_vec());
        assert!(fetch_upper_case_seq(&reader, "chr2", 3, 3).unwrap().is_empty());
    }

    #[test]
    fn test_build_sequence_indices() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(tmp.path()).unwrap();
        let reads = dir.join("reads.fa");
        let reference = dir.join("ref.fa");
        std::fs::write(&reads, ">r1\nACGTACGT\n>r2\nTTTT\n").unwrap();
        std::fs::write(&reference, ">chr1\nACGTACGTAC\n").unwrap();
        let files = EvidenceFiles {
            alignments: ReadAlignmentFilenames::new(dir, &reads),
            full_reads: reads.clone(),
            reference: reference.clone(),
        };

        build_sequence_indices(&files).unwrap();
        let reads_index = std::fs::read_to_string(format!("{reads}.fai")).unwrap();
        assert_eq!(reads_index.lines().count(), 2);
        assert!(Utf8PathBuf::from(format!("{reference}.fai")).exists());

        // A missing sequence file is an error:
        let files = EvidenceFiles {
            full_reads: dir.join("missing.fa"),
            ..files
        };
        assert!(build_sequence_indices(&files).is_err());
    }
}
