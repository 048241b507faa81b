//! Alignment record and CIGAR utilities shared by the evidence extractors
//!

use rust_htslib::bam::record::Cigar;
use rust_htslib::{bam, htslib};
use simple_error::{SimpleResult, bail};

/// Check if the alignment record should be filtered from consideration as evidence
///
pub fn filter_out_alignment_record(record: &bam::Record) -> bool {
    static FLAG_FILTER: u32 =
        htslib::BAM_FUNMAP | htslib::BAM_FSECONDARY | htslib::BAM_FQCFAIL | htslib::BAM_FDUP;

    ((record.flags() as u32) & FLAG_FILTER) != 0
}

pub fn get_qname(record: &bam::Record) -> String {
    String::from_utf8_lossy(record.qname()).to_string()
}

/// Number of read bases consumed by the cigar segment
///
/// Hard-clipped bases count as read bases, so that read positions are consistent across all split
/// segments of one read.
///
pub fn get_cigarseg_read_offset(c: &Cigar) -> usize {
    use Cigar::*;
    match c {
        Ins(len) | SoftClip(len) | HardClip(len) | Diff(len) | Equal(len) | Match(len) => {
            *len as usize
        }
        _ => 0,
    }
}

pub fn get_cigarseg_ref_offset(c: &Cigar) -> i64 {
    use Cigar::*;
    match c {
        Del(len) | RefSkip(len) | Diff(len) | Equal(len) | Match(len) => *len as i64,
        _ => 0,
    }
}

/// Reference span of an alignment, from its cigar alone
pub fn get_cigar_ref_span(cigar: &[Cigar]) -> i64 {
    cigar.iter().map(get_cigarseg_ref_offset).sum()
}

/// Report the end reference position of a bam record
///
/// The end position is the zero-indexed right-most mapped position + 1
///
pub fn get_alignment_end(record: &bam::Record) -> i64 {
    record.pos() + get_cigar_ref_span(&record.cigar())
}

/// Report the following positions in read coordinates, including hard-clipped bases:
/// 1. The first position after all left-side clipping
/// 2. The first position of all right-side clipping
/// 3. The read length
///
pub fn get_complete_read_clip_positions(cigar: &[Cigar]) -> (usize, usize, usize) {
    let mut read_pos = 0;
    let mut left_clip_size = 0;
    let mut right_clip_size = 0;
    let mut left_clip = true;
    for c in cigar.iter() {
        match c {
            Cigar::SoftClip(len) | Cigar::HardClip(len) => {
                if left_clip {
                    left_clip_size += *len as usize;
                } else {
                    right_clip_size += *len as usize;
                }
            }
            _ => {
                left_clip = false;
            }
        };
        read_pos += get_cigarseg_read_offset(c);
    }
    (left_clip_size, read_pos - right_clip_size, read_pos)
}

pub fn has_aligned_segments(cigar: &[Cigar]) -> bool {
    cigar
        .iter()
        .any(|c| matches!(c, Cigar::Match(_) | Cigar::Equal(_) | Cigar::Diff(_)))
}

/// Retrieve a string aux tag from a bam record
///
/// A tag with a non-string value is an error.
///
pub fn get_optional_string_aux_tag(
    record: &bam::Record,
    aux_tag: &[u8],
) -> SimpleResult<Option<String>> {
    match record.aux(aux_tag) {
        Ok(bam::record::Aux::String(val)) => Ok(Some(val.to_string())),
        Ok(aux_val) => bail!(
            "Unexpected {} tag format in read {}: {:?}",
            String::from_utf8_lossy(aux_tag),
            get_qname(record),
            aux_val
        ),
        Err(_) => Ok(None),
    }
}


#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use super::*;

    #[test]
    fn test_filter_out_alignment_record() {
        let header = get_test_header();

        // Unmapped read:
        let sam_line =
            b"qname\t4\t*\t0\t255\t*\t*\t0\t0\tACGCCGTATCGTCTCGAGGA\tDDDDDEEEEEDDDDDEEEEE";
        let rec = bam::Record::from_sam(&header, sam_line).unwrap();
        assert!(filter_out_alignment_record(&rec));

        // Mapped read:
        let sam_line =
            b"qname\t0\tchr1\t10\t60\t20M\t*\t0\t0\tACGCCGTATCGTCTCGAGGA\tDDDDDEEEEEDDDDDEEEEE";
        let rec = bam::Record::from_sam(&header, sam_line).unwrap();
        assert!(!filter_out_alignment_record(&rec));

        // Duplicate:
        let sam_line =
            b"qname\t1024\tchr1\t10\t60\t20M\t*\t0\t0\tACGCCGTATCGTCTCGAGGA\tDDDDDEEEEEDDDDDEEEEE";
        let rec = bam::Record::from_sam(&header, sam_line).unwrap();
        assert!(filter_out_alignment_record(&rec));
    }

    #[test]
    fn test_get_alignment_end() {
        let header = get_test_header();
        let sam_line = b"qname\t0\tchr1\t10\t60\t5S5M10D5I5M\t*\t0\t0\tACGCCGTATCGTCTCGAGGA\tDDDDDEEEEEDDDDDEEEEE";
        let rec = bam::Record::from_sam(&header, sam_line).unwrap();
        assert_eq!(get_alignment_end(&rec), 29);
    }

    #[test]
    fn test_get_complete_read_clip_positions() {
        let cigar = rust_htslib::bam::record::CigarString::try_from("10H5S20M3I7M4S".as_bytes())
            .unwrap();
        assert_eq!(get_complete_read_clip_positions(&cigar), (15, 45, 49));
    }

    #[test]
    fn test_get_optional_string_aux_tag() {
        let header = get_test_header();

        let sam_line = get_test_sam_line("q1", 0, "chr1", 10, 60, "20M", "SA:Z:FOO");
        let rec = bam::Record::from_sam(&header, &sam_line).unwrap();
        assert_eq!(
            get_optional_string_aux_tag(&rec, b"SA").unwrap(),
            Some("FOO".to_string())
        );
        assert_eq!(get_optional_string_aux_tag(&rec, b"XA").unwrap(), None);

        // Wrong format:
        let sam_line = get_test_sam_line("q1", 0, "chr1", 10, 60, "20M", "SA:i:1");
        let rec = bam::Record::from_sam(&header, &sam_line).unwrap();
        assert!(get_optional_string_aux_tag(&rec, b"SA").is_err());
    }
}
