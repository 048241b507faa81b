//! SV evidence clusters produced by the collection step
//!
//! A cluster is an immutable locus description plus a score. Confirmation never edits a cluster in
//! place: a new score is attached with [EvidenceCluster::with_score], which returns the updated
//! cluster and records which pipeline stage produced the score.
//!

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

#[derive(Clone, Copy, Debug, Deserialize, Display, EnumIter, Eq, Hash, PartialEq, Serialize)]
pub enum SvType {
    #[strum(to_string = "deletion")]
    Deletion,
    #[strum(to_string = "insertion")]
    Insertion,
    #[strum(to_string = "inversion")]
    Inversion,
    #[strum(to_string = "tandem duplication")]
    TandemDuplication,
    #[strum(to_string = "insertion from")]
    InsertionFrom,
    #[strum(to_string = "completed translocation")]
    CompletedTranslocation,
}

impl SvType {
    /// Short type label used in the interval file output
    pub fn bed_label(&self) -> &'static str {
        match self {
            SvType::Deletion => "del",
            SvType::Insertion => "ins",
            SvType::Inversion => "inv",
            SvType::TandemDuplication => "dup_tan",
            SvType::InsertionFrom => "ins_dup",
            SvType::CompletedTranslocation => "tra",
        }
    }

    /// True for the SV types which are scored by confirmation
    pub fn is_confirmable(&self) -> bool {
        matches!(
            self,
            SvType::Deletion | SvType::Insertion | SvType::Inversion
        )
    }
}

/// A zero-indexed, half-open genomic interval
///
/// For a single position, such as a translocation breakend, `end` is `start + 1`.
///
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GenomeInterval {
    pub contig: String,
    pub start: i64,
    pub end: i64,
}

impl GenomeInterval {
    pub fn new(contig: &str, start: i64, end: i64) -> Self {
        Self {
            contig: contig.to_string(),
            start,
            end,
        }
    }

    pub fn size(&self) -> i64 {
        self.end - self.start
    }
}

/// Everything about a cluster except its score
///
/// Insertions follow the collection step convention of a source interval whose size is the
/// inserted sequence length, starting at the insertion position.
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SvLocus {
    pub sv_type: SvType,
    pub source: GenomeInterval,

    /// Destination of inserted or translocated sequence, if any
    pub destination: Option<GenomeInterval>,

    /// Number of SV signatures merged into this cluster
    pub evidence_count: u32,

    /// Standard deviation of signature positions in the cluster
    pub position_std: f64,

    /// Standard deviation of signature sizes in the cluster
    pub size_std: f64,
}

/// Pipeline stage which last set a cluster score
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ScoreStage {
    Collected,
    Bypassed,
    Confirmed,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct ClusterScore {
    pub value: f64,
    pub stage: ScoreStage,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct EvidenceCluster {
    locus: SvLocus,
    score: ClusterScore,
}

impl EvidenceCluster {
    /// New cluster carrying the score assigned by the collection step
    pub fn new(locus: SvLocus, score: f64) -> Self {
        Self {
            locus,
            score: ClusterScore {
                value: score,
                stage: ScoreStage::Collected,
            },
        }
    }

    pub fn locus(&self) -> &SvLocus {
        &self.locus
    }

    pub fn sv_type(&self) -> SvType {
        self.locus.sv_type
    }

    pub fn get_source(&self) -> &GenomeInterval {
        &self.locus.source
    }

    pub fn score(&self) -> f64 {
        self.score.value
    }

    pub fn score_stage(&self) -> ScoreStage {
        self.score.stage
    }

    /// Replace the cluster score, the locus is carried over unchanged
    pub fn with_score(self, value: f64, stage: ScoreStage) -> Self {
        Self {
            locus: self.locus,
            score: ClusterScore { value, stage },
        }
    }

    /// Cluster excluded from confirmation, with its score forced to zero
    pub fn bypassed(self) -> Self {
        self.with_score(0.0, ScoreStage::Bypassed)
    }

    /// Render the cluster as one tab-separated interval record
    ///
    /// Columns are: contig, start, end, label, score, evidence count, position std, size std.
    /// Clusters with a destination append it to the label as ";contig:start-end".
    ///
    pub fn get_bed_entry(&self) -> String {
        let locus = &self.locus;
        let source = &locus.source;
        let label = match &locus.destination {
            Some(dest) => format!(
                "{};{}:{}-{}",
                locus.sv_type.bed_label(),
                dest.contig,
                dest.start,
                dest.end
            ),
            None => locus.sv_type.bed_label().to_string(),
        };
        format!(
            "{}\t{}\t{}\t{}\t{:.2}\t{}\t{:.2}\t{:.2}",
            source.contig,
            source.start,
            source.end,
            label,
            self.score.value,
            locus.evidence_count,
            locus.position_std,
            locus.size_std
        )
    }
}
