//! Confirm an SV hypothesis from reads anchored by their tail alignments
//!
//! Each anchored read is first checked for a tail anchor span consistent with the read length
//! under either the reference or the SV haplotype. The full read is then aligned to the candidate
//! haplotypes with a k-mer dot plot to decide which one it supports.
//!

use bio::alphabets::dna::revcomp;
use log::debug;
use simple_error::SimpleResult;

use super::dot_plot::{DotPlotPath, PathJump, get_read_path};
use super::sources::EvidenceSources;
use super::tail_anchors::{AnchoredRead, get_anchored_reads, is_span_consistent};
use super::{SvHypothesis, get_breakpoint_tolerance};
use crate::parameters::ConfirmParameters;

/// Minimum fraction of read windows explained by the best path for a read to be informative
const MIN_PATH_COVERAGE: f64 = 0.5;

/// Haplotypes longer than this multiple of the read length are not aligned
const MAX_HAPLOTYPE_READ_RATIO: usize = 2;

/// Successful and total k-mer confirmations from the tail extractor
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TailEvidence {
    pub successful: u32,
    pub total: u32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReadVerdict {
    Uninformative,
    Supports,
    Contradicts,
}

fn get_haplotype_path(read: &[u8], hap: &[u8], params: &ConfirmParameters) -> DotPlotPath {
    if hap.len() > read.len() * MAX_HAPLOTYPE_READ_RATIO {
        DotPlotPath::default()
    } else {
        get_read_path(read, hap, params)
    }
}

/// Decide between the reference and SV haplotype by their best path scores
fn compare_haplotypes(
    read: &[u8],
    ref_hap: &[u8],
    alt_hap: &[u8],
    params: &ConfirmParameters,
) -> ReadVerdict {
    let ref_path = get_haplotype_path(read, ref_hap, params);
    let alt_path = get_haplotype_path(read, alt_hap, params);
    if ref_path.coverage().max(alt_path.coverage()) < MIN_PATH_COVERAGE {
        ReadVerdict::Uninformative
    } else if alt_path.score > ref_path.score {
        ReadVerdict::Supports
    } else {
        ReadVerdict::Contradicts
    }
}

fn is_insertion_jump(
    jump: &PathJump,
    hap_pos: i64,
    size: i64,
    params: &ConfirmParameters,
) -> bool {
    let indel_size = jump.indel_size();
    if indel_size < params.min_length || size <= 0 {
        return false;
    }
    let size_ratio = indel_size as f64 / size as f64;
    (0.5..=2.0).contains(&size_ratio)
        && (jump.hap_pos - hap_pos).abs() <= get_breakpoint_tolerance(size, params)
}

/// Evaluate one read against the SV hypothesis
///
/// # Arguments
///
/// * `read` - Upper case read sequence in reference orientation
/// * `ref_window` - Upper case reference sequence between the read's tail anchors
/// * `window_start` - Reference position of the first base of `ref_window`
///
pub fn evaluate_read(
    read: &[u8],
    ref_window: &[u8],
    window_start: i64,
    hypothesis: &SvHypothesis,
    params: &ConfirmParameters,
) -> ReadVerdict {
    let to_window_pos =
        |pos: i64| -> usize { (pos - window_start).clamp(0, ref_window.len() as i64) as usize };
    match hypothesis {
        SvHypothesis::Deletion { start, end, .. } => {
            let (s, e) = (to_window_pos(*start), to_window_pos(*end));
            let alt_hap = [&ref_window[..s], &ref_window[e..]].concat();
            compare_haplotypes(read, ref_window, &alt_hap, params)
        }
        SvHypothesis::Inversion { start, end, .. } => {
            let (s, e) = (to_window_pos(*start), to_window_pos(*end));
            let inverted = revcomp(&ref_window[s..e]);
            let alt_hap = [&ref_window[..s], &inverted[..], &ref_window[e..]].concat();
            compare_haplotypes(read, ref_window, &alt_hap, params)
        }
        SvHypothesis::Insertion { pos, size, .. } => {
            let path = get_haplotype_path(read, ref_window, params);
            if path.coverage() < MIN_PATH_COVERAGE {
                ReadVerdict::Uninformative
            } else if path
                .jumps
                .iter()
                .any(|x| is_insertion_jump(x, pos - window_start, *size, params))
            {
                ReadVerdict::Supports
            } else {
                ReadVerdict::Contradicts
            }
        }
    }
}

/// Check the anchored read, then fetch its sequence and evaluate it
///
fn evaluate_anchored_read(
    sources: &EvidenceSources,
    anchored_read: &AnchoredRead,
    hypothesis: &SvHypothesis,
    contig_len: usize,
    params: &ConfirmParameters,
) -> SimpleResult<ReadVerdict> {
    let Some(mut read) = sources.get_read_seq(&anchored_read.qname)? else {
        debug!(
            "Anchored read {} missing from read index, skipping",
            anchored_read.qname
        );
        return Ok(ReadVerdict::Uninformative);
    };

    let ref_span = anchored_read.ref_span();
    let read_len = read.len() as i64;
    if !is_span_consistent(ref_span, read_len, params)
        && !is_span_consistent(ref_span, read_len + hypothesis.ref_span_change(), params)
    {
        return Ok(ReadVerdict::Uninformative);
    }

    if !anchored_read.is_fwd_strand {
        read = revcomp(&read);
    }

    let window_start = std::cmp::max(anchored_read.upstream_start, 0);
    let window_end = std::cmp::min(anchored_read.downstream_end, contig_len as i64);
    let ref_window = sources.get_ref_seq(
        hypothesis.contig(),
        window_start as usize,
        window_end as usize,
    )?;

    Ok(evaluate_read(
        &read,
        &ref_window,
        window_start,
        hypothesis,
        params,
    ))
}

/// Count tail-anchored reads supporting the hypothesis, out of all informative anchored reads
///
pub fn confirm_by_tails(
    sources: &mut EvidenceSources,
    hypothesis: &SvHypothesis,
    params: &ConfirmParameters,
) -> SimpleResult<TailEvidence> {
    let mut evidence = TailEvidence::default();
    let Some(contig_len) = sources.get_contig_len(hypothesis.contig()) else {
        return Ok(evidence);
    };

    let (footprint_start, footprint_end) = hypothesis.ref_footprint();
    let anchored_reads = get_anchored_reads(
        &mut sources.left_tails,
        &mut sources.right_tails,
        hypothesis.contig(),
        footprint_start,
        footprint_end,
        params,
    )?;

    for anchored_read in anchored_reads.iter() {
        match evaluate_anchored_read(sources, anchored_read, hypothesis, contig_len, params)? {
            ReadVerdict::Supports => {
                evidence.successful += 1;
                evidence.total += 1;
            }
            ReadVerdict::Contradicts => {
                evidence.total += 1;
            }
            ReadVerdict::Uninformative => {}
        }
    }
    Ok(evidence)
}

#[cfg(test)]
mod tests {
    use crate::evidence::dot_plot::test_utils::get_random_test_seq;
    use super::*;

    fn deletion(start: i64, end: i64) -> SvHypothesis {
        SvHypothesis::Deletion {
            contig: "chr1".to_string(),
            start,
            end,
        }
    }

    #[test]
    fn test_evaluate_deletion_read() {
        let params = ConfirmParameters::default();
        let ref_window = get_random_test_seq(4000, 11);
        let window_start = 10_000;

        let alt_read = [&ref_window[..1500], &ref_window[2000..]].concat();
        assert_eq!(
            evaluate_read(&alt_read, &ref_window, window_start, &deletion(11_500, 12_000), &params),
            ReadVerdict::Supports
        );

        let ref_read = ref_window.clone();
        assert_eq!(
            evaluate_read(&ref_read, &ref_window, window_start, &deletion(11_500, 12_000), &params),
            ReadVerdict::Contradicts
        );

        let unrelated_read = get_random_test_seq(3500, 12);
        assert_eq!(
            evaluate_read(
                &unrelated_read,
                &ref_window,
                window_start,
                &deletion(11_500, 12_000),
                &params
            ),
            ReadVerdict::Uninformative
        );
    }

    #[test]
    fn test_evaluate_insertion_read() {
        let params = ConfirmParameters::default();
        let ref_window = get_random_test_seq(4000, 13);
        let inserted = get_random_test_seq(400, 14);
        let alt_read = [&ref_window[..2000], &inserted[..], &ref_window[2000..]].concat();
        let hypothesis = SvHypothesis::Insertion {
            contig: "chr1".to_string(),
            pos: 2000,
            size: 380,
        };
        assert_eq!(
            evaluate_read(&alt_read, &ref_window, 0, &hypothesis, &params),
            ReadVerdict::Supports
        );
        assert_eq!(
            evaluate_read(&ref_window, &ref_window, 0, &hypothesis, &params),
            ReadVerdict::Contradicts
        );

        // Insertion far away from the hypothesis position:
        let hypothesis = SvHypothesis::Insertion {
            contig: "chr1".to_string(),
            pos: 3500,
            size: 380,
        };
        assert_eq!(
            evaluate_read(&alt_read, &ref_window, 0, &hypothesis, &params),
            ReadVerdict::Contradicts
        );
    }

    #[test]
    fn test_evaluate_inversion_read() {
        let params = ConfirmParameters::default();
        let ref_window = get_random_test_seq(4000, 15);
        let inverted = revcomp(&ref_window[1000..2500]);
        let alt_read = [&ref_window[..1000], &inverted[..], &ref_window[2500..]].concat();
        let hypothesis = SvHypothesis::Inversion {
            contig: "chr1".to_string(),
            start: 1000,
            end: 2500,
        };
        assert_eq!(
            evaluate_read(&alt_read, &ref_window, 0, &hypothesis, &params),
            ReadVerdict::Supports
        );
        assert_eq!(
            evaluate_read(&ref_window, &ref_window, 0, &hypothesis, &params),
            ReadVerdict::Contradicts
        );
    }
}
