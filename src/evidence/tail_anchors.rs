//! Pair the left and right tail alignments of each read around an SV footprint
//!

use std::collections::BTreeMap;

use rust_htslib::bam::{self, Read};
use simple_error::{SimpleResult, try_with};

use crate::bam_utils::{filter_out_alignment_record, get_alignment_end, get_qname};
use crate::parameters::ConfirmParameters;

/// Tail alignments are searched within this distance of the SV footprint
pub const MAX_ANCHOR_DISTANCE: i64 = 50_000;

#[derive(Clone, Debug, PartialEq)]
pub struct TailAlignment {
    pub ref_start: i64,
    pub ref_end: i64,
    pub is_fwd_strand: bool,
}

/// A read with both tails aligned on either side of the SV footprint
///
/// Upstream and downstream refer to reference order, so for a reverse strand read the upstream
/// anchor is its right tail.
///
#[derive(Clone, Debug, PartialEq)]
pub struct AnchoredRead {
    pub qname: String,
    pub is_fwd_strand: bool,
    pub upstream_start: i64,
    pub downstream_end: i64,
}

impl AnchoredRead {
    /// Reference distance between the outer ends of the two tail anchors
    pub fn ref_span(&self) -> i64 {
        self.downstream_end - self.upstream_start
    }
}

/// Get the first primary alignment of each tail in the region, keyed on read name
///
pub fn fetch_tail_alignments(
    reader: &mut bam::IndexedReader,
    contig: &str,
    start: i64,
    end: i64,
    min_mapq: u8,
) -> SimpleResult<BTreeMap<String, TailAlignment>> {
    let mut tails = BTreeMap::new();
    let Some(tid) = reader.header().tid(contig.as_bytes()) else {
        return Ok(tails);
    };
    try_with!(
        reader.fetch(bam::FetchDefinition::Region(
            tid as i32,
            std::cmp::max(start, 0),
            end
        )),
        "Unable to fetch tail alignments in region {contig}:{start}-{end}"
    );

    let mut record = bam::Record::new();
    while let Some(r) = reader.read(&mut record) {
        try_with!(r, "Failed to parse tail alignment record");
        if filter_out_alignment_record(&record)
            || record.is_supplementary()
            || record.mapq() < min_mapq
        {
            continue;
        }
        tails
            .entry(get_qname(&record))
            .or_insert_with(|| TailAlignment {
                ref_start: record.pos(),
                ref_end: get_alignment_end(&record),
                is_fwd_strand: !record.is_reverse(),
            });
    }
    Ok(tails)
}

/// Pair left and right tails of the same read which flank the reference footprint [start,end)
///
/// Both tails must align to the same strand. The upstream anchor has to start at or before the
/// footprint and the downstream anchor has to end at or after it.
///
pub fn pair_tail_alignments(
    left_tails: &BTreeMap<String, TailAlignment>,
    right_tails: &BTreeMap<String, TailAlignment>,
    footprint_start: i64,
    footprint_end: i64,
) -> Vec<AnchoredRead> {
    left_tails
        .iter()
        .filter_map(|(qname, left)| {
            let right = right_tails.get(qname)?;
            if left.is_fwd_strand != right.is_fwd_strand {
                return None;
            }
            let (upstream, downstream) = if left.is_fwd_strand {
                (left, right)
            } else {
                (right, left)
            };
            if upstream.ref_start > footprint_start
                || downstream.ref_end < footprint_end
                || upstream.ref_start >= downstream.ref_end
            {
                return None;
            }
            Some(AnchoredRead {
                qname: qname.clone(),
                is_fwd_strand: left.is_fwd_strand,
                upstream_start: upstream.ref_start,
                downstream_end: downstream.ref_end,
            })
        })
        .collect()
}

/// Find all reads anchored around the reference footprint [start,end) on `contig`
///
pub fn get_anchored_reads(
    left_reader: &mut bam::IndexedReader,
    right_reader: &mut bam::IndexedReader,
    contig: &str,
    footprint_start: i64,
    footprint_end: i64,
    params: &ConfirmParameters,
) -> SimpleResult<Vec<AnchoredRead>> {
    let search_start = footprint_start - MAX_ANCHOR_DISTANCE;
    let search_end = footprint_end + MAX_ANCHOR_DISTANCE;
    let left_tails = fetch_tail_alignments(
        left_reader,
        contig,
        search_start,
        search_end,
        params.tail_min_mapq,
    )?;
    let right_tails = fetch_tail_alignments(
        right_reader,
        contig,
        search_start,
        search_end,
        params.tail_min_mapq,
    )?;
    Ok(pair_tail_alignments(
        &left_tails,
        &right_tails,
        footprint_start,
        footprint_end,
    ))
}

/// Test if the anchor span deviates from the expected read span within the configured bounds
///
/// Deviation is relative to the expected span.
///
pub fn is_span_consistent(ref_span: i64, expected_span: i64, params: &ConfirmParameters) -> bool {
    if expected_span <= 0 {
        return false;
    }
    let deviation = (ref_span - expected_span) as f64 / expected_span as f64;
    deviation >= params.tail_min_deviation && deviation <= params.tail_max_deviation
}
