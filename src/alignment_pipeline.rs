//! Align read tails and full reads to the reference with external tools
//!
//! Each alignment artifact is produced by the chain: aligner | samtools view -b | samtools sort,
//! followed by samtools index. Any artifact already present in the working directory is skipped.
//!

use std::process::{Child, Command, Stdio};

use camino::Utf8Path;
use log::{info, warn};
use simple_error::{SimpleResult, bail, try_with};

use crate::filenames::{AlignmentFilenames, ReadAlignmentFilenames, ReadTailFilenames};

/// External tool settings shared by all alignment steps
pub struct AlignmentTools<'a> {
    pub aligner_bin: &'a str,
    pub samtools_bin: &'a str,

    /// Thread count passed through to the aligner and samtools
    pub thread_count: usize,
}

/// One labeled process in a chained process pipeline
pub struct PipelineStage {
    pub label: String,
    pub command: Command,
}

impl PipelineStage {
    fn new(label: &str, command: Command) -> Self {
        Self {
            label: label.to_string(),
            command,
        }
    }
}

/// Stop and reap already started stages after a later stage could not be started
fn abort_stages(children: &mut [(String, Child)]) {
    for (_, child) in children.iter_mut() {
        let _ = child.kill();
        let _ = child.wait();
    }
}

/// Run all stages concurrently, with the stdout of each stage connected to the stdin of the next
///
/// Blocks until every stage has exited. Any stage exiting with a non-zero status, or failing to
/// start, is an error.
///
pub fn run_process_pipeline(stages: Vec<PipelineStage>) -> SimpleResult<()> {
    assert!(!stages.is_empty());
    let stage_count = stages.len();

    let mut children: Vec<(String, Child)> = Vec::new();
    for (stage_index, mut stage) in stages.into_iter().enumerate() {
        if let Some((_, last_child)) = children.last_mut() {
            if let Some(stdout) = last_child.stdout.take() {
                stage.command.stdin(Stdio::from(stdout));
            }
        }
        if stage_index + 1 < stage_count {
            stage.command.stdout(Stdio::piped());
        }
        match stage.command.spawn() {
            Ok(child) => children.push((stage.label, child)),
            Err(err) => {
                abort_stages(&mut children);
                bail!("Failed to start {} process: {}", stage.label, err);
            }
        }
    }

    // A failure in one stage often causes broken pipe failures in its neighbors, so report all of them
    let mut failures = Vec::new();
    for (label, mut child) in children {
        let status = try_with!(child.wait(), "Failed waiting on {label} process");
        if !status.success() {
            failures.push(format!("{label} process failed with {status}"));
        }
    }

    if !failures.is_empty() {
        bail!("{}", failures.join("; "));
    }
    Ok(())
}

/// Get the aligner, conversion and sort stages producing a coordinate-sorted bam file
///
pub fn get_alignment_stages(
    tools: &AlignmentTools,
    ref_filename: &Utf8Path,
    reads_filename: &Utf8Path,
    bam_filename: &Utf8Path,
) -> Vec<PipelineStage> {
    let threads = tools.thread_count.to_string();

    let mut align = Command::new(tools.aligner_bin);
    align.args(["-t", threads.as_str(), "-r"]);
    align.arg(ref_filename).arg("-q").arg(reads_filename);

    let mut view = Command::new(tools.samtools_bin);
    view.args(["view", "-b", "-@", threads.as_str(), "-"]);

    let mut sort = Command::new(tools.samtools_bin);
    sort.args(["sort", "-@", threads.as_str(), "-o"]);
    sort.arg(bam_filename);

    vec![
        PipelineStage::new("aligner", align),
        PipelineStage::new("samtools view", view),
        PipelineStage::new("samtools sort", sort),
    ]
}

/// Create the sorted alignment file and its index for one read set, unless present already
///
fn create_indexed_alignment(
    tools: &AlignmentTools,
    ref_filename: &Utf8Path,
    reads_filename: &Utf8Path,
    target: &AlignmentFilenames,
    label: &str,
) -> SimpleResult<()> {
    if target.bam.exists() {
        warn!("Alignment for {label} exists. Skip");
    } else {
        info!("Aligning {label} from '{reads_filename}'");
        run_process_pipeline(get_alignment_stages(
            tools,
            ref_filename,
            reads_filename,
            &target.bam,
        ))?;
    }

    if target.bai.exists() {
        warn!("Alignment index for {label} exists. Skip");
    } else {
        let mut index = Command::new(tools.samtools_bin);
        index.arg("index").arg(&target.bam);
        run_process_pipeline(vec![PipelineStage::new("samtools index", index)])?;
    }
    Ok(())
}

/// Produce all three coordinate-sorted, indexed alignment files
///
/// Artifacts are built in the fixed order left tails, right tails, full reads. Each one is complete
/// when this function moves on to the next.
///
pub fn run_read_alignments(
    tools: &AlignmentTools,
    ref_filename: &Utf8Path,
    tail_filenames: &ReadTailFilenames,
    full_reads_filename: &Utf8Path,
    alignment_filenames: &ReadAlignmentFilenames,
) -> SimpleResult<()> {
    create_indexed_alignment(
        tools,
        ref_filename,
        &tail_filenames.left_tails,
        &alignment_filenames.left_tails,
        "left tails",
    )?;
    create_indexed_alignment(
        tools,
        ref_filename,
        &tail_filenames.right_tails,
        &alignment_filenames.right_tails,
        "right tails",
    )?;
    info!("Tail alignments finished");

    create_indexed_alignment(
        tools,
        ref_filename,
        full_reads_filename,
        &alignment_filenames.full_reads,
        "full reads",
    )?;
    info!("Full read alignment finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(label: &str, program: &str, args: &[&str]) -> PipelineStage {
        let mut command = Command::new(program);
        command.args(args);
        PipelineStage::new(label, command)
    }

    #[test]
    fn test_chained_pipeline_output() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("out.txt");
        let out_str = out.to_str().unwrap();

        let mut last = Command::new("sh");
        last.args(["-c", &format!("cat > '{out_str}'")]);

        run_process_pipeline(vec![
            stage("first", "printf", &["chained\\n"]),
            stage("second", "cat", &[]),
            PipelineStage::new("third", last),
        ])
        .unwrap();

        assert_eq!(std::fs::read_to_string(&out).unwrap(), "chained\n");
    }

    #[test]
    fn test_failing_stage_is_fatal() {
        let result = run_process_pipeline(vec![
            stage("first", "true", &[]),
            stage("second", "false", &[]),
            stage("third", "cat", &[]),
        ]);
        let err = result.unwrap_err();
        assert!(err.as_str().contains("second"));
    }

    #[test]
    fn test_missing_program_is_fatal() {
        let result = run_process_pipeline(vec![
            stage("first", "printf", &["x"]),
            stage("missing", "/nonexistent/aligner", &[]),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_alignment_stages() {
        let tools = AlignmentTools {
            aligner_bin: "ngmlr",
            samtools_bin: "samtools",
            thread_count: 3,
        };
        let stages = get_alignment_stages(
            &tools,
            Utf8Path::new("ref.fa"),
            Utf8Path::new("reads_left.fa"),
            Utf8Path::new("out.bam"),
        );
        let labels = stages.iter().map(|x| x.label.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, vec!["aligner", "samtools view", "samtools sort"]);

        let align_args = stages[0]
            .command
            .get_args()
            .map(|x| x.to_str().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(
            align_args,
            vec!["-t", "3", "-r", "ref.fa", "-q", "reads_left.fa"]
        );

        let sort_args = stages[2]
            .command
            .get_args()
            .map(|x| x.to_str().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(sort_args, vec!["sort", "-@", "3", "-o", "out.bam"]);
    }

    #[test]
    fn test_existing_artifacts_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(tmp.path()).unwrap();
        let target = AlignmentFilenames {
            bam: dir.join("x.bam"),
            bai: dir.join("x.bam.bai"),
        };
        std::fs::write(&target.bam, "").unwrap();
        std::fs::write(&target.bai, "").unwrap();

        // Tools which would fail if they were ever run:
        let tools = AlignmentTools {
            aligner_bin: "false",
            samtools_bin: "false",
            thread_count: 1,
        };
        create_indexed_alignment(
            &tools,
            Utf8Path::new("ref.fa"),
            Utf8Path::new("reads.fa"),
            &target,
            "test reads",
        )
        .unwrap();
    }
}
