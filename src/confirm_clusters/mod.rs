//! Confirm deletion, insertion and inversion evidence clusters
//!
//! Each confirmable SV type is processed as one wave. Clusters in a wave are first partitioned into
//! those to confirm and those bypassing confirmation, the clusters to confirm are then evaluated in
//! one worker task per contig. All tasks of a wave finish before the next wave starts.
//!

mod partition;
mod score_fusion;

pub use score_fusion::UNCONFIRMABLE_SCORE;

use std::sync::mpsc::channel;

use itertools::Itertools;
use log::info;
use simple_error::{SimpleResult, bail, try_with};
use strum::IntoEnumIterator;
use thousands::Separable;

use self::partition::{get_confirm_min_score, partition_clusters};
use self::score_fusion::get_fused_score;
use crate::evidence::{
    EvidenceFiles, EvidenceSources, SvHypothesis, build_sequence_indices, gather_evidence,
};
use crate::evidence_bundle::SvEvidenceBundle;
use crate::evidence_cluster::{EvidenceCluster, ScoreStage, SvType};
use crate::log_utils::debug_msg;
use crate::parameters::ConfirmParameters;
use crate::run_stats::{ConfirmStats, SvTypeConfirmStats};

pub struct ConfirmSettings<'a> {
    pub files: &'a EvidenceFiles,
    pub params: &'a ConfirmParameters,
    pub thread_count: usize,

    /// Print evidence counts and fused score of every confirmed cluster to stderr
    pub debug_confirm: bool,
}

/// Gather evidence for all clusters on one contig and replace each cluster score with the fused
/// evidence score
///
/// All evidence readers are opened here and dropped when the task completes.
///
fn confirm_contig_clusters(
    settings: &ConfirmSettings,
    contig: &str,
    clusters: Vec<EvidenceCluster>,
) -> SimpleResult<Vec<EvidenceCluster>> {
    let mut sources = EvidenceSources::open(settings.files)?;

    let mut confirmed = Vec::with_capacity(clusters.len());
    for cluster in clusters {
        let Some(hypothesis) = SvHypothesis::from_locus(cluster.locus()) else {
            bail!(
                "Unexpected {} cluster submitted for confirmation on contig {contig}",
                cluster.sv_type()
            );
        };
        let counts = gather_evidence(&mut sources, &hypothesis, settings.params)?;
        let score = get_fused_score(cluster.sv_type(), &counts, cluster.score());

        let source = cluster.get_source();
        debug_msg!(
            settings.debug_confirm,
            "Confirmed {} {}:{}-{} kmer_confirmations: {}/{} read_evidences: {} read_contradictions: {} score: {:.2} -> {:.2}",
            cluster.sv_type(),
            source.contig,
            source.start,
            source.end,
            counts.successful_kmer_confirmations,
            counts.total_kmer_confirmations,
            counts.read_evidences,
            counts.read_contradictions,
            cluster.score(),
            score
        );

        confirmed.push(cluster.with_score(score, ScoreStage::Confirmed));
    }
    Ok(confirmed)
}

/// Run one confirmation wave over all clusters of a single SV type
///
/// Returns every input cluster, with clusters from all contig tasks (in contig order) followed by
/// all bypassed clusters. If any task fails, the first error in contig order is returned after all
/// tasks have completed.
///
fn confirm_sv_type_clusters(
    settings: &ConfirmSettings,
    sv_type: SvType,
    clusters: Vec<EvidenceCluster>,
) -> SimpleResult<Vec<EvidenceCluster>> {
    let partition = partition_clusters(clusters, settings.params);

    info!(
        "Confirming {} {sv_type} clusters on {} contigs, {} clusters bypassed with score below {}{}",
        partition.to_confirm_count().separate_with_commas(),
        partition.to_confirm.len(),
        partition.bypassed.len().separate_with_commas(),
        get_confirm_min_score(sv_type, settings.params),
        if sv_type == SvType::Inversion {
            format!(" or size above {}", settings.params.max_sv_size)
        } else {
            String::new()
        }
    );

    if !partition.to_confirm.is_empty() {
        build_sequence_indices(settings.files)?;
    }

    let worker_pool = try_with!(
        rayon::ThreadPoolBuilder::new()
            .num_threads(settings.thread_count)
            .build(),
        "Unable to create confirmation worker pool"
    );

    let (tx, rx) = channel();
    worker_pool.scope(move |scope| {
        for (contig, contig_clusters) in partition.to_confirm {
            let tx = tx.clone();
            scope.spawn(move |_| {
                let result = confirm_contig_clusters(settings, &contig, contig_clusters);
                // The receiver outlives the worker scope
                tx.send((contig, result)).unwrap_or_default();
            });
        }
    });

    let mut sv_type_clusters = Vec::new();
    for (contig, result) in rx.into_iter().sorted_by(|a, b| a.0.cmp(&b.0)) {
        match result {
            Ok(x) => sv_type_clusters.extend(x),
            Err(e) => bail!("Failed to confirm {sv_type} clusters on contig {contig}: {e}"),
        }
    }
    sv_type_clusters.extend(partition.bypassed);
    Ok(sv_type_clusters)
}

/// Confirm the deletion, insertion and inversion clusters of the bundle in three sequential waves
///
/// The bundle's other cluster collections are left unchanged.
///
pub fn confirm_evidence_bundle(
    settings: &ConfirmSettings,
    bundle: &mut SvEvidenceBundle,
) -> SimpleResult<ConfirmStats> {
    let mut stats = ConfirmStats::default();
    // Waves follow SvType order: deletion, insertion, inversion
    for sv_type in SvType::iter().filter(|x| x.is_confirmable()) {
        let clusters = std::mem::take(bundle.get_mut(sv_type));
        let clusters = confirm_sv_type_clusters(settings, sv_type, clusters)?;

        let sv_type_stats = SvTypeConfirmStats::new(&clusters, UNCONFIRMABLE_SCORE);
        info!(
            "Finished {sv_type} confirmation: {} confirmed ({} unconfirmable), {} bypassed",
            sv_type_stats.confirmed_cluster_count.separate_with_commas(),
            sv_type_stats.unconfirmable_cluster_count.separate_with_commas(),
            sv_type_stats.bypassed_cluster_count.separate_with_commas(),
        );
        match sv_type {
            SvType::Deletion => stats.deletion = sv_type_stats,
            SvType::Insertion => stats.insertion = sv_type_stats,
            _ => stats.inversion = sv_type_stats,
        }

        *bundle.get_mut(sv_type) = clusters;
    }
    Ok(stats)
}
