use rust_htslib::bam::HeaderView;
use rust_htslib::bam::record::{CigarString, Record};
use simple_error::{SimpleResult, bail, try_with};

use crate::bam_utils::{
    get_cigar_ref_span, get_complete_read_clip_positions, get_optional_string_aux_tag, get_qname,
    has_aligned_segments,
};

/// Object to directly represent one segment from a BAM split alignment
pub struct SplitReadSegment {
    /// reference sequence name
    pub rname: String,

    /// reference zero-indexed alignment start position
    pub pos: i64,

    pub cigar: CigarString,

    pub is_fwd_strand: bool,

    /// mapping quality
    pub mapq: u8,
}

/// Parse one segment from the bam SA aux tag string into a split alignment object
///
pub fn parse_sa_segment(seg: &str) -> SimpleResult<SplitReadSegment> {
    let sa_fields = seg.split_terminator(',').collect::<Vec<_>>();
    if sa_fields.len() != 6 {
        bail!("Unexpected segment in bam SA tag: {seg}");
    }
    let rname = sa_fields[0].to_string();
    let pos = try_with!(
        sa_fields[1].parse::<i64>(),
        "Unexpected position in bam SA tag segment: {seg}"
    ) - 1;
    let is_fwd_strand = sa_fields[2] == "+";
    let cigar = try_with!(
        CigarString::try_from(sa_fields[3].as_bytes()),
        "Unexpected cigar in bam SA tag segment: {seg}"
    );
    let mapq = try_with!(
        sa_fields[4].parse::<u8>(),
        "Unexpected mapq in bam SA tag segment: {seg}"
    );
    Ok(SplitReadSegment {
        rname,
        pos,
        cigar,
        is_fwd_strand,
        mapq,
    })
}

/// Split the bam SA aux tag into each supplementary alignment, and parse each into a split alignment object
///
pub fn parse_sa_aux_val(sa_aux_val: &str) -> SimpleResult<Vec<SplitReadSegment>> {
    sa_aux_val
        .split_terminator(';')
        .map(parse_sa_segment)
        .collect()
}

/// One aligned segment of a read, with read coordinates in sequencing order
///
/// This represents primary, supplementary and SA-tag derived alignments alike. Read positions are
/// always expressed in the original sequencing order of the read, so that consecutive segments of a
/// split read can be compared regardless of strand.
///
#[derive(Clone, Debug, PartialEq)]
pub struct ReadAlignment {
    pub contig: String,

    /// Zero-indexed reference start position
    pub ref_start: i64,

    /// Zero-indexed reference end position, one past the last aligned base
    pub ref_end: i64,

    /// Sequencer-order read position of the left-most aligned base
    pub seq_order_read_start: usize,

    /// Sequencer-order read position one base after the right-most aligned base
    pub seq_order_read_end: usize,

    pub read_length: usize,
    pub is_fwd_strand: bool,
    pub mapq: u8,
    pub cigar: CigarString,
}

/// Get the start and end positions of a split read segment in read coordinates oriented in original sequencing order
///
/// Example:
/// For a 100 base read segment mapped in reverse orientation to the reference with CIGAR string 80S15M5S, implying start and end
/// read positions of 80 to 95 in segment mapping orientation, this method reports the position tuple (5,20)
///
fn get_seq_order_read_pos(
    read_start: usize,
    read_end: usize,
    read_size: usize,
    is_fwd_strand: bool,
) -> (usize, usize) {
    if is_fwd_strand {
        (read_start, read_end)
    } else {
        (read_size - read_end, read_size - read_start)
    }
}

impl ReadAlignment {
    fn new(
        contig: &str,
        ref_start: i64,
        cigar: CigarString,
        is_fwd_strand: bool,
        mapq: u8,
    ) -> Self {
        let (read_start, read_end, read_length) = get_complete_read_clip_positions(&cigar);
        let (seq_order_read_start, seq_order_read_end) =
            get_seq_order_read_pos(read_start, read_end, read_length, is_fwd_strand);
        Self {
            contig: contig.to_string(),
            ref_start,
            ref_end: ref_start + get_cigar_ref_span(&cigar),
            seq_order_read_start,
            seq_order_read_end,
            read_length,
            is_fwd_strand,
            mapq,
            cigar,
        }
    }
}

/// Parse all aligned segments of a read from one of its bam records, ordered by sequencing order
/// read position
///
/// Any record of a split read, primary or supplementary, lists all of the other segments in its SA
/// tag, so the complete segment set is recovered from whichever record is found first.
///
pub fn get_seq_order_read_alignments(
    header: &HeaderView,
    record: &Record,
) -> SimpleResult<Vec<ReadAlignment>> {
    const SA_AUX_TAG: &[u8] = b"SA";

    let contig = String::from_utf8_lossy(header.tid2name(record.tid() as u32)).to_string();
    let mut alignments = vec![ReadAlignment::new(
        &contig,
        record.pos(),
        record.cigar().take(),
        !record.is_reverse(),
        record.mapq(),
    )];
    let read_length = alignments[0].read_length;

    if let Some(sa_aux_val) = get_optional_string_aux_tag(record, SA_AUX_TAG)? {
        for sa_segment in parse_sa_aux_val(&sa_aux_val)? {
            if !has_aligned_segments(&sa_segment.cigar) {
                bail!(
                    "Bam record split segment is unaligned in read {}",
                    get_qname(record)
                );
            }
            let alignment = ReadAlignment::new(
                &sa_segment.rname,
                sa_segment.pos,
                sa_segment.cigar,
                sa_segment.is_fwd_strand,
                sa_segment.mapq,
            );
            if alignment.read_length != read_length {
                bail!(
                    "Inconsistent read length in split segments of read {}",
                    get_qname(record)
                );
            }
            alignments.push(alignment);
        }
    }

    alignments.sort_by_key(|x| x.seq_order_read_start);

    for s in alignments.iter() {
        if s.seq_order_read_start >= s.seq_order_read_end {
            bail!(
                "Can't parse consistent split read information from SA tag format in read: {}",
                get_qname(record)
            );
        }
    }

    Ok(alignments)
}
