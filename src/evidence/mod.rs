//! Evidence extractors used to confirm deletion, insertion and inversion clusters
//!
//! Every cluster is tested with two independent extractors:
//! 1. The tail extractor pairs read tail alignments around the cluster and aligns the anchored
//!    reads to the reference and SV haplotypes with a k-mer dot plot.
//! 2. The full read extractor looks for alignment gap and split-read signatures of the SV in
//!    full read alignments.
//!

mod dot_plot;
mod full_read;
mod sources;
mod split_segments;
mod tail_anchors;
mod tail_evidence;

pub use full_read::FullReadEvidence;
pub use sources::{EvidenceFiles, EvidenceSources, build_sequence_indices};
pub use tail_evidence::TailEvidence;

use simple_error::SimpleResult;

use crate::evidence_cluster::{GenomeInterval, SvLocus, SvType};
use crate::parameters::ConfirmParameters;

/// The SV allele tested by confirmation, derived from an evidence cluster locus
#[derive(Clone, Debug, PartialEq)]
pub enum SvHypothesis {
    Deletion { contig: String, start: i64, end: i64 },
    Insertion { contig: String, pos: i64, size: i64 },
    Inversion { contig: String, start: i64, end: i64 },
}

impl SvHypothesis {
    /// Get the hypothesis for a cluster locus, or None for SV types which are not confirmed
    ///
    pub fn from_locus(locus: &SvLocus) -> Option<Self> {
        let source = &locus.source;
        let contig = source.contig.clone();
        match locus.sv_type {
            SvType::Deletion => Some(Self::Deletion {
                contig,
                start: source.start,
                end: source.end,
            }),
            SvType::Insertion => Some(Self::Insertion {
                contig,
                pos: source.start,
                size: source.size(),
            }),
            SvType::Inversion => Some(Self::Inversion {
                contig,
                start: source.start,
                end: source.end,
            }),
            _ => None,
        }
    }

    pub fn contig(&self) -> &str {
        match self {
            Self::Deletion { contig, .. }
            | Self::Insertion { contig, .. }
            | Self::Inversion { contig, .. } => contig,
        }
    }

    pub fn size(&self) -> i64 {
        match self {
            Self::Deletion { start, end, .. } | Self::Inversion { start, end, .. } => end - start,
            Self::Insertion { size, .. } => *size,
        }
    }

    /// Reference range [start,end) altered by the SV, empty for an insertion
    ///
    pub fn ref_footprint(&self) -> (i64, i64) {
        match self {
            Self::Deletion { start, end, .. } | Self::Inversion { start, end, .. } => {
                (*start, *end)
            }
            Self::Insertion { pos, .. } => (*pos, *pos),
        }
    }

    /// Change of the reference span covered by a read when it carries the SV allele
    ///
    pub fn ref_span_change(&self) -> i64 {
        match self {
            Self::Deletion { .. } => self.size(),
            Self::Insertion { size, .. } => -size,
            Self::Inversion { .. } => 0,
        }
    }

    /// Interval to which read alignment signatures are compared
    ///
    /// Insertions are compared as [pos,pos+size), so a size mismatch counts like a breakpoint shift.
    ///
    pub fn signature_interval(&self) -> GenomeInterval {
        match self {
            Self::Deletion { contig, start, end } | Self::Inversion { contig, start, end } => {
                GenomeInterval::new(contig, *start, *end)
            }
            Self::Insertion { contig, pos, size } => GenomeInterval::new(contig, *pos, pos + size),
        }
    }
}

/// Maximum distance between an observed and a hypothesized breakpoint for them to match
///
pub fn get_breakpoint_tolerance(sv_size: i64, params: &ConfirmParameters) -> i64 {
    std::cmp::max(params.count_win_size as i64, sv_size / 2)
}

/// All four evidence counts gathered for one cluster
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EvidenceCounts {
    pub successful_kmer_confirmations: u32,
    pub total_kmer_confirmations: u32,
    pub read_evidences: u32,
    pub read_contradictions: u32,
}

impl EvidenceCounts {
    pub fn new(tails: TailEvidence, full_reads: FullReadEvidence) -> Self {
        Self {
            successful_kmer_confirmations: tails.successful,
            total_kmer_confirmations: tails.total,
            read_evidences: full_reads.evidences,
            read_contradictions: full_reads.contradictions,
        }
    }
}

/// Run the tail and full read extractors for the hypothesis
///
pub fn gather_evidence(
    sources: &mut EvidenceSources,
    hypothesis: &SvHypothesis,
    params: &ConfirmParameters,
) -> SimpleResult<EvidenceCounts> {
    let tails = tail_evidence::confirm_by_tails(sources, hypothesis, params)?;
    let full_reads = full_read::confirm_by_full_reads(&mut sources.full_reads, hypothesis, params)?;
    Ok(EvidenceCounts::new(tails, full_reads))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence_cluster::test_utils::get_test_cluster;

    #[test]
    fn test_hypothesis_from_locus() {
        let cluster = get_test_cluster(SvType::Insertion, "chr2", 1000, 1300, 5.0);
        let hypothesis = SvHypothesis::from_locus(cluster.locus()).unwrap();
        assert_eq!(
            hypothesis,
            SvHypothesis::Insertion {
                contig: "chr2".to_string(),
                pos: 1000,
                size: 300
            }
        );
        assert_eq!(hypothesis.ref_footprint(), (1000, 1000));
        assert_eq!(hypothesis.ref_span_change(), -300);
        assert_eq!(
            hypothesis.signature_interval(),
            GenomeInterval::new("chr2", 1000, 1300)
        );

        let cluster = get_test_cluster(SvType::Deletion, "chr1", 1000, 1300, 5.0);
        let hypothesis = SvHypothesis::from_locus(cluster.locus()).unwrap();
        assert_eq!(hypothesis.ref_footprint(), (1000, 1300));
        assert_eq!(hypothesis.ref_span_change(), 300);

        let cluster = get_test_cluster(SvType::TandemDuplication, "chr1", 1000, 1300, 5.0);
        assert!(SvHypothesis::from_locus(cluster.locus()).is_none());
    }

    #[test]
    fn test_breakpoint_tolerance() {
        let params = ConfirmParameters::default();
        assert_eq!(get_breakpoint_tolerance(60, &params), 100);
        assert_eq!(get_breakpoint_tolerance(5000, &params), 2500);
    }
}
