//! Persistence of the full set of evidence clusters passed between pipeline steps
//!

use camino::Utf8Path;
use log::info;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail, try_with};
use thousands::Separable;

use crate::evidence_cluster::{EvidenceCluster, SvType};

/// The ordered collection of all cluster types, always read and written together
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct SvEvidenceBundle {
    pub deletions: Vec<EvidenceCluster>,
    pub insertions: Vec<EvidenceCluster>,
    pub inversions: Vec<EvidenceCluster>,
    pub tandem_duplications: Vec<EvidenceCluster>,
    pub insertions_from: Vec<EvidenceCluster>,
    pub completed_translocations: Vec<EvidenceCluster>,
}

impl SvEvidenceBundle {
    /// All cluster collections in bundle order, with the SV type expected in each
    pub fn collections(&self) -> [(SvType, &Vec<EvidenceCluster>); 6] {
        [
            (SvType::Deletion, &self.deletions),
            (SvType::Insertion, &self.insertions),
            (SvType::Inversion, &self.inversions),
            (SvType::TandemDuplication, &self.tandem_duplications),
            (SvType::InsertionFrom, &self.insertions_from),
            (
                SvType::CompletedTranslocation,
                &self.completed_translocations,
            ),
        ]
    }

    /// Mutable access to the cluster collection of one SV type
    pub fn get_mut(&mut self, sv_type: SvType) -> &mut Vec<EvidenceCluster> {
        match sv_type {
            SvType::Deletion => &mut self.deletions,
            SvType::Insertion => &mut self.insertions,
            SvType::Inversion => &mut self.inversions,
            SvType::TandemDuplication => &mut self.tandem_duplications,
            SvType::InsertionFrom => &mut self.insertions_from,
            SvType::CompletedTranslocation => &mut self.completed_translocations,
        }
    }

    /// Check that every cluster is stored in the collection of its own SV type
    pub fn validate(&self) -> SimpleResult<()> {
        for (sv_type, clusters) in self.collections() {
            if let Some(cluster) = clusters.iter().find(|x| x.sv_type() != sv_type) {
                bail!(
                    "Evidence bundle {sv_type} collection contains a {} cluster",
                    cluster.sv_type()
                );
            }
        }
        Ok(())
    }

    pub fn cluster_count(&self) -> usize {
        self.collections().iter().map(|(_, x)| x.len()).sum()
    }
}

pub fn read_evidence_bundle(filename: &Utf8Path) -> SimpleResult<SvEvidenceBundle> {
    info!("Loading evidence bundle from file: '{filename}'");
    let buf = try_with!(
        std::fs::read(filename),
        "Unable to open and read evidence bundle file: '{filename}'"
    );
    let bundle: SvEvidenceBundle = try_with!(
        rmp_serde::from_slice(&buf),
        "Unable to parse evidence bundle file: '{filename}'"
    );
    bundle.validate()?;

    for (sv_type, clusters) in bundle.collections() {
        info!(
            "Loaded {} {sv_type} evidence clusters",
            clusters.len().separate_with_commas()
        );
    }
    Ok(bundle)
}

/// Write the evidence bundle in binary format
///
/// The bundle is first written to a temporary file next to the target and then renamed, so a
/// partially written bundle is never found under the final name.
///
pub fn write_evidence_bundle(filename: &Utf8Path, bundle: &SvEvidenceBundle) -> SimpleResult<()> {
    let mut buf = Vec::new();
    try_with!(
        bundle.serialize(&mut rmp_serde::Serializer::new(&mut buf)),
        "Unable to serialize evidence bundle"
    );

    info!(
        "Writing evidence bundle with {} clusters to file: '{filename}'",
        bundle.cluster_count().separate_with_commas()
    );

    let tmp_filename = format!("{filename}.tmp");
    try_with!(
        std::fs::write(&tmp_filename, buf.as_slice()),
        "Unable to open and write evidence bundle file: '{tmp_filename}'"
    );
    try_with!(
        std::fs::rename(&tmp_filename, filename),
        "Unable to move evidence bundle file into place: '{filename}'"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence_cluster::ScoreStage;
    use crate::evidence_cluster::test_utils::get_test_cluster;

    fn get_test_bundle() -> SvEvidenceBundle {
        SvEvidenceBundle {
            deletions: vec![
                get_test_cluster(SvType::Deletion, "chr1", 100, 400, 12.0),
                get_test_cluster(SvType::Deletion, "chr2", 50, 5000, 3.0),
            ],
            insertions: vec![get_test_cluster(SvType::Insertion, "chr1", 900, 1100, 8.0)],
            inversions: vec![get_test_cluster(SvType::Inversion, "chr3", 10, 2000, 0.0)],
            tandem_duplications: vec![get_test_cluster(
                SvType::TandemDuplication,
                "chr1",
                5000,
                5600,
                4.0,
            )],
            insertions_from: vec![get_test_cluster(
                SvType::InsertionFrom,
                "chr4",
                1,
                300,
                9.0,
            )],
            completed_translocations: vec![get_test_cluster(
                SvType::CompletedTranslocation,
                "chr5",
                77,
                78,
                2.0,
            )],
        }
    }

    #[test]
    fn test_bundle_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let filename = camino::Utf8PathBuf::from_path_buf(tmp.path().join("b.mpack")).unwrap();

        let mut bundle = get_test_bundle();
        let confirmed = bundle.deletions.remove(0).with_score(-1.0, ScoreStage::Confirmed);
        bundle.deletions.push(confirmed);

        write_evidence_bundle(&filename, &bundle).unwrap();
        assert!(!camino::Utf8PathBuf::from(format!("{filename}.tmp")).exists());

        let reread = read_evidence_bundle(&filename).unwrap();
        assert_eq!(reread, bundle);
        assert_eq!(reread.cluster_count(), 7);
        assert_eq!(reread.deletions[1].score_stage(), ScoreStage::Confirmed);
    }

    #[test]
    fn test_validate() {
        let mut bundle = get_test_bundle();
        assert!(bundle.validate().is_ok());

        let misplaced = bundle.inversions[0].clone();
        bundle.get_mut(SvType::Deletion).push(misplaced);
        assert!(bundle.validate().is_err());
    }
}
