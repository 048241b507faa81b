use std::collections::BTreeMap;

use crate::evidence_cluster::{EvidenceCluster, SvType};
use crate::parameters::ConfirmParameters;

/// All clusters of one SV type, split into those to confirm and those bypassing confirmation
///
/// Every input cluster is in exactly one of the two groups.
///
#[derive(Debug, Default)]
pub struct ClusterPartition {
    /// Clusters to confirm, keyed on source contig
    ///
    /// The map ordering provides the deterministic contig processing order.
    pub to_confirm: BTreeMap<String, Vec<EvidenceCluster>>,

    /// Clusters excluded from confirmation, already carrying their final score of zero
    pub bypassed: Vec<EvidenceCluster>,
}

impl ClusterPartition {
    pub fn to_confirm_count(&self) -> usize {
        self.to_confirm.values().map(|x| x.len()).sum()
    }
}

pub fn get_confirm_min_score(sv_type: SvType, params: &ConfirmParameters) -> f64 {
    match sv_type {
        SvType::Deletion => params.confirm_del_min,
        SvType::Insertion => params.confirm_ins_min,
        SvType::Inversion => params.confirm_inv_min,
        _ => panic!("No confirmation threshold for SV type {sv_type}"),
    }
}

fn is_confirmation_candidate(cluster: &EvidenceCluster, params: &ConfirmParameters) -> bool {
    let sv_type = cluster.sv_type();
    if cluster.score() < get_confirm_min_score(sv_type, params) {
        return false;
    }
    sv_type != SvType::Inversion || cluster.get_source().size() <= params.max_sv_size
}

/// Split the clusters of one SV type into per-contig confirmation groups and bypassed clusters
///
/// Clusters pass into confirmation if their score is at least the type's confirmation threshold
/// and, for inversions only, their size is at most `max_sv_size`. Any other cluster is bypassed
/// with its score set to zero.
///
pub fn partition_clusters(
    clusters: Vec<EvidenceCluster>,
    params: &ConfirmParameters,
) -> ClusterPartition {
    let mut partition = ClusterPartition::default();
    for cluster in clusters {
        if is_confirmation_candidate(&cluster, params) {
            partition
                .to_confirm
                .entry(cluster.get_source().contig.clone())
                .or_default()
                .push(cluster);
        } else {
            partition.bypassed.push(cluster.bypassed());
        }
    }
    partition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence_cluster::ScoreStage;
    use crate::evidence_cluster::test_utils::get_test_cluster;

    #[test]
    fn test_partition_is_total() {
        let params = ConfirmParameters {
            confirm_del_min: 10.0,
            ..Default::default()
        };
        let clusters = vec![
            get_test_cluster(SvType::Deletion, "chr2", 100, 400, 12.0),
            get_test_cluster(SvType::Deletion, "chr1", 100, 400, 5.0),
            get_test_cluster(SvType::Deletion, "chr1", 900, 1400, 10.0),
            get_test_cluster(SvType::Deletion, "chr10", 50, 500, 30.0),
            get_test_cluster(SvType::Deletion, "chr2", 5000, 5400, 9.99),
        ];

        let partition = partition_clusters(clusters.clone(), &params);
        assert_eq!(partition.to_confirm_count() + partition.bypassed.len(), clusters.len());
        assert_eq!(partition.to_confirm_count(), 3);
        assert_eq!(partition.bypassed.len(), 2);

        // Contigs are in sorted order:
        let contigs = partition.to_confirm.keys().cloned().collect::<Vec<_>>();
        assert_eq!(contigs, vec!["chr1", "chr10", "chr2"]);

        // Every input cluster locus appears exactly once:
        for cluster in clusters.iter() {
            let confirm_hits = partition
                .to_confirm
                .values()
                .flatten()
                .filter(|x| x.locus() == cluster.locus())
                .count();
            let bypass_hits = partition
                .bypassed
                .iter()
                .filter(|x| x.locus() == cluster.locus())
                .count();
            assert_eq!(confirm_hits + bypass_hits, 1);
        }

        for cluster in partition.bypassed.iter() {
            assert_eq!(cluster.score(), 0.0);
            assert_eq!(cluster.score_stage(), ScoreStage::Bypassed);
        }
    }

    #[test]
    fn test_inversion_size_limit() {
        let params = ConfirmParameters {
            max_sv_size: 1000,
            ..Default::default()
        };
        let clusters = vec![
            get_test_cluster(SvType::Inversion, "chr1", 100, 1100, 5.0),
            get_test_cluster(SvType::Inversion, "chr1", 100, 1101, 5.0),
        ];
        let partition = partition_clusters(clusters, &params);
        assert_eq!(partition.to_confirm_count(), 1);
        assert_eq!(partition.bypassed.len(), 1);
        assert_eq!(partition.bypassed[0].get_source().end, 1101);

        // The size limit only applies to inversions:
        let clusters = vec![get_test_cluster(SvType::Deletion, "chr1", 100, 5000, 5.0)];
        let partition = partition_clusters(clusters, &params);
        assert_eq!(partition.to_confirm_count(), 1);
    }
}
