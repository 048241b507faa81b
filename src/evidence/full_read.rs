//! Confirm an SV hypothesis from full read alignments
//!
//! All alignments of each read near the locus are grouped by read name. A read carrying an
//! alignment gap or split alignment signature matching the hypothesis is evidence for it. A read
//! without a matching signature that spans the whole locus in a single alignment contradicts it.
//!

use std::collections::BTreeMap;

use rust_htslib::bam::record::Cigar;
use rust_htslib::bam::{self, Read};
use simple_error::{SimpleResult, try_with};

use super::split_segments::{ReadAlignment, get_seq_order_read_alignments};
use super::{SvHypothesis, get_breakpoint_tolerance};
use crate::bam_utils::{filter_out_alignment_record, get_cigarseg_ref_offset, get_qname};
use crate::evidence_cluster::GenomeInterval;
use crate::parameters::ConfirmParameters;

/// Read alignments with a lower mapping quality are ignored
const MIN_FULL_READ_MAPQ: u8 = 20;

/// Read evidences and contradictions from the full read extractor
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FullReadEvidence {
    pub evidences: u32,
    pub contradictions: u32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum SignatureType {
    Deletion,
    Insertion,
    Inversion,
}

impl SignatureType {
    fn of(hypothesis: &SvHypothesis) -> Self {
        match hypothesis {
            SvHypothesis::Deletion { .. } => Self::Deletion,
            SvHypothesis::Insertion { .. } => Self::Insertion,
            SvHypothesis::Inversion { .. } => Self::Inversion,
        }
    }
}

/// Find alignment gap signatures of the given type within one alignment
///
/// Insertion signatures are expressed as [pos,pos+size), matching the insertion cluster convention.
///
fn get_cigar_signatures(
    alignment: &ReadAlignment,
    sig_type: SignatureType,
    params: &ConfirmParameters,
) -> Vec<GenomeInterval> {
    let mut signatures = Vec::new();
    let mut ref_pos = alignment.ref_start;
    for c in alignment.cigar.iter() {
        match (c, sig_type) {
            (Cigar::Del(len), SignatureType::Deletion) => {
                let len = *len as i64;
                if len >= params.min_length && len <= params.max_deletion_size {
                    signatures.push(GenomeInterval::new(
                        &alignment.contig,
                        ref_pos,
                        ref_pos + len,
                    ));
                }
            }
            (Cigar::Ins(len), SignatureType::Insertion) => {
                let len = *len as i64;
                if len >= params.min_length {
                    signatures.push(GenomeInterval::new(
                        &alignment.contig,
                        ref_pos,
                        ref_pos + len,
                    ));
                }
            }
            _ => {}
        }
        ref_pos += get_cigarseg_ref_offset(c);
    }
    signatures
}

/// Find the signature implied by two consecutive split alignment segments, in read order
///
fn get_split_signature(
    first: &ReadAlignment,
    second: &ReadAlignment,
    sig_type: SignatureType,
    params: &ConfirmParameters,
) -> Option<GenomeInterval> {
    if first.contig != second.contig {
        return None;
    }
    let read_gap = second.seq_order_read_start as i64 - first.seq_order_read_end as i64;
    let read_gap_ok =
        read_gap >= -params.segment_overlap_tolerance && read_gap <= params.max_segment_gap_tolerance;

    if first.is_fwd_strand != second.is_fwd_strand {
        if sig_type != SignatureType::Inversion || !read_gap_ok {
            return None;
        }
        let (pos1, pos2) = if first.is_fwd_strand {
            (first.ref_end, second.ref_end)
        } else {
            (first.ref_start, second.ref_start)
        };
        let (start, end) = (pos1.min(pos2), pos1.max(pos2));
        return if end - start >= params.min_length {
            Some(GenomeInterval::new(&first.contig, start, end))
        } else {
            None
        };
    }

    // Reference positions of the junction, in reference order
    let (upstream_end, downstream_start) = if first.is_fwd_strand {
        (first.ref_end, second.ref_start)
    } else {
        (second.ref_end, first.ref_start)
    };
    let ref_gap = downstream_start - upstream_end;

    match sig_type {
        SignatureType::Deletion => {
            if read_gap_ok && ref_gap >= params.min_length {
                Some(GenomeInterval::new(
                    &first.contig,
                    upstream_end,
                    downstream_start,
                ))
            } else {
                None
            }
        }
        SignatureType::Insertion => {
            let ref_gap_ok = ref_gap >= -params.segment_overlap_tolerance
                && ref_gap <= params.max_segment_gap_tolerance;
            let size = read_gap - ref_gap;
            if ref_gap_ok && size >= params.min_length {
                Some(GenomeInterval::new(
                    &first.contig,
                    upstream_end,
                    upstream_end + size,
                ))
            } else {
                None
            }
        }
        SignatureType::Inversion => None,
    }
}

/// All signatures of the given type found in the alignments of one read
///
fn get_read_signatures(
    alignments: &[ReadAlignment],
    sig_type: SignatureType,
    params: &ConfirmParameters,
) -> Vec<GenomeInterval> {
    let mut signatures = alignments
        .iter()
        .flat_map(|x| get_cigar_signatures(x, sig_type, params))
        .collect::<Vec<_>>();
    signatures.extend(
        alignments
            .windows(2)
            .filter_map(|x| get_split_signature(&x[0], &x[1], sig_type, params)),
    );
    signatures
}

fn is_matching_signature(
    signature: &GenomeInterval,
    locus: &GenomeInterval,
    params: &ConfirmParameters,
) -> bool {
    let tolerance = get_breakpoint_tolerance(locus.size(), params);
    signature.contig == locus.contig
        && (signature.start - locus.start).abs() <= tolerance
        && (signature.end - locus.end).abs() <= tolerance
}

/// Classify the alignments of every read as evidence, contradiction or neither
///
/// # Arguments
///
/// * `reads` - Alignments of each read, ordered by sequencing order read position
///
pub fn count_full_read_evidence(
    reads: &[Vec<ReadAlignment>],
    hypothesis: &SvHypothesis,
    params: &ConfirmParameters,
) -> FullReadEvidence {
    let sig_type = SignatureType::of(hypothesis);
    let locus = hypothesis.signature_interval();
    let (footprint_start, footprint_end) = hypothesis.ref_footprint();
    let span_start = footprint_start - params.count_win_size as i64;
    let span_end = footprint_end + params.count_win_size as i64;

    let mut evidence = FullReadEvidence::default();
    for alignments in reads.iter() {
        let alignments = alignments
            .iter()
            .filter(|x| x.mapq >= MIN_FULL_READ_MAPQ)
            .cloned()
            .collect::<Vec<_>>();
        if get_read_signatures(&alignments, sig_type, params)
            .iter()
            .any(|x| is_matching_signature(x, &locus, params))
        {
            evidence.evidences += 1;
        } else if alignments.iter().any(|x| {
            x.contig == locus.contig && x.ref_start <= span_start && x.ref_end >= span_end
        }) {
            evidence.contradictions += 1;
        }
    }
    evidence
}

/// Get the alignments of every read with a record in the region, grouped on read name
///
/// Each read's alignments are reconstructed from the first record found for it.
///
pub fn fetch_read_alignments(
    reader: &mut bam::IndexedReader,
    contig: &str,
    start: i64,
    end: i64,
) -> SimpleResult<Vec<Vec<ReadAlignment>>> {
    let header = reader.header().clone();
    let Some(tid) = header.tid(contig.as_bytes()) else {
        return Ok(Vec::new());
    };
    try_with!(
        reader.fetch(bam::FetchDefinition::Region(
            tid as i32,
            std::cmp::max(start, 0),
            end
        )),
        "Unable to fetch full read alignments in region {contig}:{start}-{end}"
    );

    let mut reads = BTreeMap::new();
    let mut record = bam::Record::new();
    while let Some(r) = reader.read(&mut record) {
        try_with!(r, "Failed to parse full read alignment record");
        if filter_out_alignment_record(&record) {
            continue;
        }
        let qname = get_qname(&record);
        if !reads.contains_key(&qname) {
            let alignments = get_seq_order_read_alignments(&header, &record)?;
            reads.insert(qname, alignments);
        }
    }
    Ok(reads.into_values().collect())
}

/// Count full read evidences and contradictions for the hypothesis
///
pub fn confirm_by_full_reads(
    reader: &mut bam::IndexedReader,
    hypothesis: &SvHypothesis,
    params: &ConfirmParameters,
) -> SimpleResult<FullReadEvidence> {
    let (footprint_start, footprint_end) = hypothesis.ref_footprint();
    let margin = get_breakpoint_tolerance(hypothesis.size(), params);
    let reads = fetch_read_alignments(
        reader,
        hypothesis.contig(),
        footprint_start - margin,
        footprint_end + margin,
    )?;
    Ok(count_full_read_evidence(&reads, hypothesis, params))
}
