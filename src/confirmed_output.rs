//! Write confirmed clusters as interval records and persist the updated evidence bundle
//!

use std::fs::File;
use std::io::{BufWriter, Write};

use camino::Utf8Path;
use log::info;
use simple_error::{SimpleResult, try_with};

use crate::evidence_bundle::{SvEvidenceBundle, write_evidence_bundle};
use crate::evidence_cluster::{EvidenceCluster, SvType};
use crate::filenames::{
    CONFIRMED_EVIDENCE_BUNDLE_FILENAME, DELETION_BED_FILENAME, EVIDENCE_OUTPUT_DIRNAME,
    INSERTION_BED_FILENAME, INVERSION_BED_FILENAME,
};
use crate::os_utils::create_dir_all;

/// Write one interval record per cluster
///
/// Records are written in collection order.
///
fn write_clusters_to_bed(filename: &Utf8Path, clusters: &[EvidenceCluster]) -> SimpleResult<()> {
    let f = try_with!(
        File::create(filename),
        "Unable to create confirmed cluster bed file: '{filename}'"
    );
    let mut f = BufWriter::new(f);
    for cluster in clusters {
        try_with!(
            writeln!(f, "{}", cluster.get_bed_entry()),
            "Unable to write confirmed cluster bed file: '{filename}'"
        );
    }
    try_with!(
        f.flush(),
        "Unable to write confirmed cluster bed file: '{filename}'"
    );
    Ok(())
}

/// Write the deletion, insertion and inversion bed files and the confirmed evidence bundle
///
pub fn write_confirmed_output(working_dir: &Utf8Path, bundle: &SvEvidenceBundle) -> SimpleResult<()> {
    let evidence_dir = working_dir.join(EVIDENCE_OUTPUT_DIRNAME);
    create_dir_all(&evidence_dir, "evidence output")?;

    for (sv_type, clusters) in [
        (SvType::Deletion, &bundle.deletions),
        (SvType::Insertion, &bundle.insertions),
        (SvType::Inversion, &bundle.inversions),
    ] {
        let basename = match sv_type {
            SvType::Deletion => DELETION_BED_FILENAME,
            SvType::Insertion => INSERTION_BED_FILENAME,
            _ => INVERSION_BED_FILENAME,
        };
        let filename = evidence_dir.join(basename);
        info!("Writing confirmed {sv_type} clusters to bed file: '{filename}'");
        write_clusters_to_bed(&filename, clusters)?;
    }

    let bundle_filename = working_dir.join(CONFIRMED_EVIDENCE_BUNDLE_FILENAME);
    write_evidence_bundle(&bundle_filename, bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence_bundle::read_evidence_bundle;
    use crate::evidence_cluster::ScoreStage;
    use crate::evidence_cluster::test_utils::get_test_cluster;
    use camino::Utf8PathBuf;

    #[test]
    fn test_write_confirmed_output() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();

        let bundle = SvEvidenceBundle {
            deletions: vec![
                get_test_cluster(SvType::Deletion, "chr1", 1000, 2000, 5.0)
                    .with_score(62.66, ScoreStage::Confirmed),
                get_test_cluster(SvType::Deletion, "chr2", 100, 400, 5.0).bypassed(),
            ],
            inversions: vec![
                get_test_cluster(SvType::Inversion, "chr1", 500, 900, 5.0)
                    .with_score(-1.0, ScoreStage::Confirmed),
            ],
            completed_translocations: vec![get_test_cluster(
                SvType::CompletedTranslocation,
                "chr1",
                100,
                101,
                3.0,
            )],
            ..Default::default()
        };

        write_confirmed_output(&dir, &bundle).unwrap();

        let evidence_dir = dir.join(EVIDENCE_OUTPUT_DIRNAME);
        let del_bed = std::fs::read_to_string(evidence_dir.join(DELETION_BED_FILENAME)).unwrap();
        let lines = del_bed.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("chr1\t1000\t2000\tdel\t62.66\t"));
        assert!(lines[1].starts_with("chr2\t100\t400\tdel\t0.00\t"));

        let ins_bed = std::fs::read_to_string(evidence_dir.join(INSERTION_BED_FILENAME)).unwrap();
        assert!(ins_bed.is_empty());

        let inv_bed = std::fs::read_to_string(evidence_dir.join(INVERSION_BED_FILENAME)).unwrap();
        assert!(inv_bed.starts_with("chr1\t500\t900\tinv\t-1.00\t"));

        let reread = read_evidence_bundle(&dir.join(CONFIRMED_EVIDENCE_BUNDLE_FILENAME)).unwrap();
        assert_eq!(reread, bundle);
    }
}
