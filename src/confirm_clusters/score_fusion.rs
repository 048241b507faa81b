use crate::evidence::EvidenceCounts;
use crate::evidence_cluster::SvType;

/// Score of a cluster for which no informative evidence was found
pub const UNCONFIRMABLE_SCORE: f64 = -1.0;

/// Combine the evidence counts for one cluster into its confidence score
///
/// The score is the sum of square roots of the confirmed evidence count, capped at 100, and of the
/// confirmed evidence rate in percent, scaled by 5 to an approximate range of [0,100].
///
/// The confirmed evidence count adds the full read evidences to the successful k-mer confirmations
/// for deletions and insertions. Inversions instead add the cluster's prior score in the same
/// place, and an inversion with a prior score of zero is never promoted above zero.
///
/// # Arguments
///
/// * `prior_score` - Cluster score before confirmation, only used for inversions
///
pub fn get_fused_score(sv_type: SvType, counts: &EvidenceCounts, prior_score: f64) -> f64 {
    let successful = counts.successful_kmer_confirmations as f64;
    let total = counts.total_kmer_confirmations as f64;
    let read_evidences = counts.read_evidences as f64;
    let read_contradictions = counts.read_contradictions as f64;

    if total + read_evidences + read_contradictions == 0.0 {
        return UNCONFIRMABLE_SCORE;
    }

    let confirmed_evidence = match sv_type {
        SvType::Inversion => {
            if prior_score == 0.0 {
                return 0.0;
            }
            prior_score
        }
        SvType::Deletion | SvType::Insertion => read_evidences,
        _ => panic!("Score fusion is not defined for SV type {sv_type}"),
    };

    let num_confirmed = f64::min(100.0, successful + confirmed_evidence);
    let rate_confirmed = (confirmed_evidence + successful) * 100.0
        / (total + confirmed_evidence + read_contradictions);
    5.0 * (num_confirmed.sqrt() + rate_confirmed.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn counts(successful: u32, total: u32, evidences: u32, contradictions: u32) -> EvidenceCounts {
        EvidenceCounts {
            successful_kmer_confirmations: successful,
            total_kmer_confirmations: total,
            read_evidences: evidences,
            read_contradictions: contradictions,
        }
    }

    #[test]
    fn test_no_informative_evidence() {
        // Successful k-mer confirmations alone don't count as informative:
        for sv_type in [SvType::Deletion, SvType::Insertion, SvType::Inversion] {
            assert_eq!(
                get_fused_score(sv_type, &counts(3, 0, 0, 0), 10.0),
                UNCONFIRMABLE_SCORE
            );
        }
    }

    #[test]
    fn test_inversion_without_prior_score() {
        assert_eq!(
            get_fused_score(SvType::Inversion, &counts(10, 10, 5, 5), 0.0),
            0.0
        );
    }

    #[test]
    fn test_deletion_score() {
        let score = get_fused_score(SvType::Deletion, &counts(10, 10, 5, 5), 99.0);
        assert_abs_diff_eq!(score, 5.0 * (15f64.sqrt() + 75f64.sqrt()), epsilon = 1e-12);
        assert_abs_diff_eq!(score, 62.66, epsilon = 0.01);
    }

    #[test]
    fn test_inversion_score_uses_prior_score() {
        // The prior score replaces the read evidence count, read evidences are ignored:
        let score = get_fused_score(SvType::Inversion, &counts(10, 10, 0, 5), 5.0);
        assert_abs_diff_eq!(score, 5.0 * (15f64.sqrt() + 75f64.sqrt()), epsilon = 1e-12);
        let score2 = get_fused_score(SvType::Inversion, &counts(10, 10, 50, 5), 5.0);
        assert_eq!(score, score2);
    }

    #[test]
    fn test_count_cap() {
        let score = get_fused_score(SvType::Insertion, &counts(150, 150, 50, 0), 0.0);
        assert_abs_diff_eq!(score, 5.0 * (10.0 + 10.0), epsilon = 1e-12);
    }

    #[test]
    fn test_monotonicity() {
        for sv_type in [SvType::Deletion, SvType::Insertion, SvType::Inversion] {
            let mut last = f64::MIN;
            for successful in 0..=20 {
                let score = get_fused_score(sv_type, &counts(successful, 20, 4, 6), 3.0);
                assert!(score >= last);
                last = score;
            }

            let mut last = f64::MAX;
            for contradictions in 0..=20 {
                let score = get_fused_score(sv_type, &counts(8, 20, 4, contradictions), 3.0);
                assert!(score <= last);
                last = score;
            }
        }
    }
}
