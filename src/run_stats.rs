//! Track stats for the whole svconfirm run
//!

use std::fs::File;

use camino::Utf8Path;
use log::info;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, try_with};

use crate::evidence_cluster::{EvidenceCluster, ScoreStage};

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct SvTypeConfirmStats {
    pub input_cluster_count: usize,

    /// Clusters passed through evidence gathering and score fusion
    pub confirmed_cluster_count: usize,

    /// Clusters excluded from confirmation by score threshold or size, with their score set to zero
    pub bypassed_cluster_count: usize,

    /// Confirmed clusters for which no informative read evidence was found
    pub unconfirmable_cluster_count: usize,
}

impl SvTypeConfirmStats {
    /// Tally the stage and score of every cluster after confirmation
    ///
    pub fn new(clusters: &[EvidenceCluster], unconfirmable_score: f64) -> Self {
        let mut stats = Self {
            input_cluster_count: clusters.len(),
            ..Default::default()
        };
        for cluster in clusters {
            match cluster.score_stage() {
                ScoreStage::Confirmed => {
                    stats.confirmed_cluster_count += 1;
                    if cluster.score() == unconfirmable_score {
                        stats.unconfirmable_cluster_count += 1;
                    }
                }
                ScoreStage::Bypassed => {
                    stats.bypassed_cluster_count += 1;
                }
                ScoreStage::Collected => {}
            }
        }
        stats
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ConfirmStats {
    pub deletion: SvTypeConfirmStats,
    pub insertion: SvTypeConfirmStats,
    pub inversion: SvTypeConfirmStats,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConfirmRunStats {
    pub confirm_stats: ConfirmStats,

    pub total_tail_extraction_time_secs: f64,
    pub total_alignment_time_secs: f64,
    pub total_confirmation_time_secs: f64,
    pub total_run_time_secs: f64,
}

/// Write run_stats structure out in json format
pub fn write_confirm_run_stats(filename: &Utf8Path, run_stats: &ConfirmRunStats) -> SimpleResult<()> {
    info!("Writing run statistics to file: '{filename}'");

    let f = try_with!(
        File::create(filename),
        "Unable to create run statistics json file: '{filename}'"
    );
    try_with!(
        serde_json::to_writer_pretty(&f, &run_stats),
        "Unable to write run statistics json file: '{filename}'"
    );
    Ok(())
}
