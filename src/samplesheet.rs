//src/samplesheet.rs

use std::collections::BTreeSet;
use std::io::BufRead;
use std::path::Path;

use ahash::{AHashMap, AHashSet};

use crate::error::{PrismError, Result};

/// Whether R2 files are expected alongside R1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SequencingType {
    #[default]
    #[value(name = "paired_end")]
    PairedEnd,
    #[value(name = "single_end")]
    SingleEnd,
}

#[derive(Debug, Clone, Default)]
pub struct FastqNameOptions {
    pub sequencing_type: SequencingType,
    /// Lanes to expand every sample to, overriding the sheet.
    pub impute_lanes: Option<Vec<u32>>,
}

/// Parses a comma separated lane list such as `1,2`.
pub fn parse_lane_list(text: &str) -> Result<Vec<u32>> {
    text.split(',')
        .map(|lane| {
            lane.trim()
                .parse::<u32>()
                .map_err(|e| PrismError::parse(format!("imputed lane '{}'", lane), Some(e)))
        })
        .collect()
}

/// bcl-convert output name for one read of one sample on one lane.
pub fn fastq_name(sample: &str, s_number: usize, lane: u32, read: u8) -> String {
    format!("{}_S{}_L{:03}_R{}_001.fastq.gz", sample, s_number, lane, read)
}

/// Expected FASTQ file names for the `[Data]` section of an Illumina sample
/// sheet. Sample numbers follow first appearance; names are deduplicated and
/// keep their first-seen order.
pub fn predict_fastq_names<R: BufRead>(reader: R, options: &FastqNameOptions) -> Result<Vec<String>> {
    let mut lines = reader.lines();
    let mut header: Option<Vec<String>> = None;

    while let Some(line) = lines.next() {
        let line = line.map_err(|e| PrismError::io("<sample sheet>", e))?;
        if line.trim().split(',').next() == Some("[Data]") {
            if let Some(next) = lines.next() {
                let next = next.map_err(|e| PrismError::io("<sample sheet>", e))?;
                header = Some(next.trim().split(',').map(|f| f.trim().to_lowercase()).collect());
            }
            break;
        }
    }
    let header = match header {
        Some(h) => h,
        None => return Ok(Vec::new()),
    };

    let sample_col = header
        .iter()
        .position(|f| f == "sample_id")
        .ok_or_else(|| PrismError::parse("sample sheet", Some("[Data] header has no Sample_ID column")))?;
    let lane_col = header.iter().position(|f| f == "lane");

    let mut s_numbers: AHashMap<String, usize> = AHashMap::new();
    let mut seen: AHashSet<String> = AHashSet::new();
    let mut names = Vec::new();

    for line in lines {
        let line = line.map_err(|e| PrismError::io("<sample sheet>", e))?;
        let fields: Vec<&str> = line.trim().split(',').collect();
        let first = fields[0].trim();
        if first.is_empty() || first.starts_with('[') {
            break;
        }
        let sample = fields
            .get(sample_col)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| PrismError::parse("sample sheet", Some(format!("short row '{}'", line))))?;
        let lane = match lane_col {
            Some(i) => {
                let raw = fields.get(i).map(|s| s.trim()).unwrap_or("");
                raw.parse::<u32>()
                    .map_err(|e| PrismError::parse(format!("lane '{}'", raw), Some(e)))?
            }
            None => 1,
        };

        let next_number = s_numbers.len() + 1;
        let s_number = *s_numbers.entry(sample.clone()).or_insert(next_number);

        let lanes = match &options.impute_lanes {
            Some(imputed) => imputed.clone(),
            None => vec![lane],
        };
        for lane in lanes {
            let mut reads = vec![1u8];
            if options.sequencing_type == SequencingType::PairedEnd {
                reads.push(2);
            }
            for read in reads {
                let name = fastq_name(&sample, s_number, lane, read);
                if seen.insert(name.clone()) {
                    names.push(name);
                }
            }
        }
    }
    Ok(names)
}

/// Differences between predicted names and the FASTQ files actually present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FolderComparison {
    pub missing: Vec<String>,
    pub unexpected: Vec<String>,
}

impl FolderComparison {
    pub fn is_match(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

/// Compares against `*.fastq.gz` files in `folder`, ignoring Undetermined files.
pub fn compare_with_folder<P: AsRef<Path>>(predicted: &[String], folder: P) -> Result<FolderComparison> {
    let folder = folder.as_ref();
    let mut found = BTreeSet::new();
    for entry in std::fs::read_dir(folder).map_err(|e| PrismError::io(folder, e))? {
        let entry = entry.map_err(|e| PrismError::io(folder, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".fastq.gz") && !name.to_lowercase().contains("undetermined") {
            found.insert(name);
        }
    }
    let predicted: BTreeSet<String> = predicted.iter().cloned().collect();
    Ok(FolderComparison {
        missing: predicted.difference(&found).cloned().collect(),
        unexpected: found.difference(&predicted).cloned().collect(),
    })
}
