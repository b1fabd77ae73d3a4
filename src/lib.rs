// src/lib.rs
pub mod types;
pub mod error;
pub mod input;
pub mod hits;
pub mod distribution;
pub mod distribution_store;
pub mod summary_table;
pub mod mapping_stats;
pub mod samplesheet;
pub mod tags;

use std::fmt::Write as FmtWrite;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::distribution::{Distribution, DistributionBuilder};
use crate::distribution_store::{artifact_name, save, ARTIFACT_EXTENSION};
use crate::error::{PrismError, Result};
use crate::hits::{HitReader, TopHits};
use crate::input::open_text;
use crate::types::{ColumnSelection, WeightingMethod};

pub use crate::summary_table::{build_summary_table, SummaryTable, TableParams};

/// Everything a sample build needs.
#[derive(Debug, Clone)]
pub struct BuildParams {
    /// BLAST reports (plain or `.gz`) of one sample.
    pub inputs: Vec<PathBuf>,
    pub weighting: WeightingMethod,
    pub columns: ColumnSelection,
    /// Reject reports whose hits are not grouped by query.
    pub strict_grouping: bool,
    /// One artifact per input instead of one for all of them.
    pub separate: bool,
    /// Artifact path override; only valid when a single artifact is produced.
    pub output: Option<PathBuf>,
}

impl Default for BuildParams {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            weighting: WeightingMethod::Unweighted,
            columns: ColumnSelection::default(),
            strict_grouping: false,
            separate: false,
            output: None,
        }
    }
}

/// What was written for one artifact.
pub struct BuildSummary {
    pub artifact: PathBuf,
    pub distribution: Distribution,
}

impl BuildSummary {
    /// Total weight of the top hits, i.e. the number of sequences (or tags x counts).
    pub fn seq_count(&self) -> f64 {
        self.distribution.total_weight()
    }

    pub fn locus_count(&self) -> usize {
        self.distribution.len()
    }

    /// Human readable summary followed by the spectrum listing.
    pub fn get_report(&self) -> String {
        let mut output = String::new();
        writeln!(output, "saving distribution to {}", self.artifact.display()).unwrap();
        writeln!(output).unwrap();
        writeln!(output, "    seq count {}", self.seq_count()).unwrap();
        writeln!(output, "    locus count {}", self.locus_count()).unwrap();
        writeln!(output).unwrap();
        for key in self.distribution.sorted_keys() {
            writeln!(
                output,
                "{}\t{}\t{}",
                key.locus,
                key.database_label(),
                self.distribution.weight(key)
            )
            .unwrap();
        }
        output
    }
}

/// Builds the top-hit distribution of a single report.
pub fn build_file_distribution<P: AsRef<Path>>(
    path: P,
    weighting: WeightingMethod,
    columns: ColumnSelection,
    strict_grouping: bool,
) -> Result<Distribution> {
    let path = path.as_ref();
    let reader = open_text(path)?;
    let hits = HitReader::new(reader, path, weighting, columns);
    let top_hits = TopHits::new(hits, strict_grouping, path);

    let mut builder = DistributionBuilder::new();
    builder.extend_from(top_hits)?;
    log::info!(
        "{}: {} top hits over {} keys",
        path.display(),
        builder.observations(),
        builder.key_count()
    );
    Ok(builder.finish())
}

/// Builds, in parallel, one distribution per input and merges them.
/// Files never share a top-hit group.
pub fn build_merged_distribution(params: &BuildParams) -> Result<Distribution> {
    params
        .inputs
        .par_iter()
        .map(|path| {
            build_file_distribution(path, params.weighting, params.columns, params.strict_grouping)
        })
        .try_reduce(Distribution::new, |a, b| Ok(a.merge(b)))
}

/// Builds and persists the sample distribution(s) described by `params`.
pub fn build_sample_distribution(params: &BuildParams) -> Result<Vec<BuildSummary>> {
    if params.inputs.is_empty() {
        return Err(PrismError::InvalidArgument("no input reports given".to_string()));
    }

    if params.separate {
        if params.output.is_some() && params.inputs.len() > 1 {
            return Err(PrismError::InvalidArgument(
                "--output cannot name more than one artifact".to_string(),
            ));
        }
        // nothing is saved unless every input builds
        let built: Vec<Distribution> = params
            .inputs
            .par_iter()
            .map(|path| {
                build_file_distribution(path, params.weighting, params.columns, params.strict_grouping)
            })
            .collect::<Result<_>>()?;
        return params
            .inputs
            .iter()
            .zip(built)
            .map(|(path, distribution)| -> Result<BuildSummary> {
                let artifact = match &params.output {
                    Some(out) => out.clone(),
                    None => with_artifact_extension(path),
                };
                save(&distribution, &artifact)?;
                Ok(BuildSummary {
                    artifact,
                    distribution,
                })
            })
            .collect();
    }

    let distribution = build_merged_distribution(params)?;
    let artifact = match &params.output {
        Some(out) => out.clone(),
        None => artifact_name(params.inputs.as_slice())
            .ok_or_else(|| PrismError::InvalidArgument("no input reports given".to_string()))?,
    };
    save(&distribution, &artifact)?;
    Ok(vec![BuildSummary {
        artifact,
        distribution,
    }])
}

fn with_artifact_extension(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(ARTIFACT_EXTENSION);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution_store::load;
    use crate::types::{LocusKey, Measure, NO_HITS};
    use std::fs;

    const SAMPLE_A: &str = "\
# BLASTN 2.6.0+
# Query: seq_1 count=16
# Database: /indexes/blast/goat.fasta
# 2 hits found
seq_1\tchr1\t100.000\t64\t0\t0\t1\t64\t40\t103\t1e-25\t119
seq_1\tchr2\t98.438\t64\t1\t0\t1\t64\t40\t103\t5e-24\t113
# BLASTN 2.6.0+
# Query: seq_2 count=4
# Database: /indexes/blast/goat.fasta
# 0 hits found
# BLASTN 2.6.0+
# Query: seq_3 count=5
# Database: /indexes/blast/goat.fasta
# 1 hits found
seq_3\tchr1\t100.000\t64\t0\t0\t1\t64\t90\t153\t1e-25\t119
";

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn builds_top_hit_distribution_from_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "S1.blast", SAMPLE_A);
        let dist = build_file_distribution(
            &path,
            WeightingMethod::TagCount,
            ColumnSelection::default(),
            true,
        )
        .unwrap();
        let goat = Some("goat".to_string());
        assert_eq!(dist.weight(&LocusKey::new("chr1", goat.clone())), 21.0);
        assert_eq!(dist.weight(&LocusKey::new("chr2", goat.clone())), 0.0);
        assert_eq!(dist.weight(&LocusKey::new(NO_HITS, goat)), 4.0);
        assert_eq!(dist.total_weight(), 25.0);
    }

    #[test]
    fn merged_build_persists_under_common_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "S1_L001.blast", SAMPLE_A);
        let b = write(dir.path(), "S1_L002.blast", SAMPLE_A);
        let params = BuildParams {
            inputs: vec![a, b],
            weighting: WeightingMethod::Unweighted,
            ..BuildParams::default()
        };
        let summaries = build_sample_distribution(&params).unwrap();
        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert_eq!(summary.artifact, dir.path().join("S1_L00.prism"));
        assert_eq!(summary.seq_count(), 6.0);
        assert_eq!(summary.locus_count(), 2);

        let loaded = load(&summary.artifact).unwrap();
        assert_eq!(loaded.spectrum(), summary.distribution.spectrum());

        let report = summary.get_report();
        assert!(report.contains("seq count 6"));
        assert!(report.contains("locus count 2"));
        assert!(report.contains("chr1\tgoat\t4"));
    }

    #[test]
    fn separate_build_writes_one_artifact_per_input() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "A.blast", SAMPLE_A);
        let b = write(dir.path(), "B.blast", "# Query: q\n# 0 hits found\n");
        let params = BuildParams {
            inputs: vec![a, b],
            separate: true,
            ..BuildParams::default()
        };
        let summaries = build_sample_distribution(&params).unwrap();
        assert_eq!(summaries.len(), 2);
        assert!(dir.path().join("A.blast.prism").exists());
        assert!(dir.path().join("B.blast.prism").exists());

        let table = render_table(dir.path(), &["A.blast.prism", "B.blast.prism"]);
        assert!(table.starts_with("locus\tgenome\tA\tB\n"));
        assert!(table.contains("No hits\tNone\t0.0\t1.0\n"));
    }

    fn render_table(dir: &Path, names: &[&str]) -> String {
        let paths: Vec<PathBuf> = names.iter().map(|n| dir.join(n)).collect();
        crate::summary_table::tests::render_summary_table(paths.as_slice(), Measure::Frequency, false).unwrap()
    }

    #[test]
    fn weight_extraction_failure_aborts_build_without_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bad.blast", "# Query: seq_1\nseq_1 chr1 100 64 0 0\n");
        let params = BuildParams {
            inputs: vec![path],
            weighting: WeightingMethod::TagCount,
            ..BuildParams::default()
        };
        let err = build_sample_distribution(&params).err().unwrap();
        assert!(matches!(err, PrismError::WeightExtraction { .. }));
        assert!(!dir.path().join("bad.blast.prism").exists());
    }

    #[test]
    fn separate_build_saves_nothing_when_one_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let good = write(dir.path(), "good.blast", SAMPLE_A);
        let bad = write(dir.path(), "bad.blast", "# Query: seq_1\nseq_1 chr1 100 64 0 0\n");
        let params = BuildParams {
            inputs: vec![good, bad],
            weighting: WeightingMethod::TagCount,
            separate: true,
            ..BuildParams::default()
        };
        let err = build_sample_distribution(&params).err().unwrap();
        assert!(matches!(err, PrismError::WeightExtraction { .. }));
        assert!(!dir.path().join("good.blast.prism").exists());
        assert!(!dir.path().join("bad.blast.prism").exists());
    }

    #[test]
    fn empty_input_list_is_rejected() {
        let err = build_sample_distribution(&BuildParams::default()).err().unwrap();
        assert!(matches!(err, PrismError::InvalidArgument(_)));
    }
}
