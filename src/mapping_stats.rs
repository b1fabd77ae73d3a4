//src/mapping_stats.rs

use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;
use std::io::BufRead;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{PrismError, Result};
use crate::input::open_text;

/// The two counts read from a `samtools flagstat` report.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlagStat {
    pub total: f64,
    pub mapped: f64,
}

impl FlagStat {
    pub fn mapped_fraction(&self) -> f64 {
        if self.total > 0.0 {
            self.mapped / self.total
        } else {
            0.0
        }
    }
}

/// Mapping rate of one sample, in percent, with its binomial standard error.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingRate {
    pub sample: String,
    pub map_pct: f64,
    pub map_std: f64,
}

impl MappingRate {
    pub fn from_flagstat(sample: impl Into<String>, stat: &FlagStat) -> Self {
        let p = stat.mapped_fraction();
        let n = stat.total;
        let std = if n > 0.0 { (p * (1.0 - p) / n).sqrt() } else { 0.0 };
        Self {
            sample: sample.into(),
            map_pct: p * 100.0,
            map_std: std * 100.0,
        }
    }
}

/// Reads `<n> + <n> in total` and `<n> + <n> mapped (...)`; stops at the mapped line.
pub fn parse_flagstat<R: BufRead>(reader: R) -> Result<FlagStat> {
    let mut stat = FlagStat::default();
    for line in reader.lines() {
        let line = line.map_err(|e| PrismError::io("<flagstat>", e))?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 5 {
            continue;
        }
        let count = || {
            tokens[0]
                .parse::<f64>()
                .map_err(|e| PrismError::parse(format!("flagstat count '{}'", tokens[0]), Some(e)))
        };
        if tokens[3] == "in" && tokens[4] == "total" {
            stat.total = count()?;
        } else if tokens[3] == "mapped" {
            stat.mapped = count()?;
            break;
        }
    }
    Ok(stat)
}

fn pipeline_suffixes() -> &'static [Regex; 2] {
    static RE: OnceLock<[Regex; 2]> = OnceLock::new();
    RE.get_or_init(|| {
        [
            Regex::new(r"\.txt\.gz\.fastq\.s\.\d+\.trimmed\.fastq\.bwa").expect("valid pattern"),
            Regex::new(r"\.B10\.stats").expect("valid pattern"),
        ]
    })
}

/// Sample/reference label of a stats file, with the pipeline's fixed name fragments removed.
pub fn sample_name_from_stats_path<P: AsRef<Path>>(path: P) -> String {
    let base = path
        .as_ref()
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let [trimmed, stats] = pipeline_suffixes();
    let name = trimmed.replace_all(&base, "");
    stats.replace_all(&name, "").into_owned()
}

/// One row per sample, ordered by sample name. A later file for the same sample wins.
pub fn collate_mapping_stats<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<MappingRate>> {
    let mut by_sample: BTreeMap<String, FlagStat> = BTreeMap::new();
    for path in paths {
        let stat = parse_flagstat(open_text(path)?).map_err(|e| match e {
            PrismError::Io { source, .. } => PrismError::io(path, source),
            other => other,
        })?;
        let sample = sample_name_from_stats_path(path);
        log::debug!("{}: {} of {} mapped", sample, stat.mapped, stat.total);
        by_sample.insert(sample, stat);
    }
    Ok(by_sample
        .iter()
        .map(|(sample, stat)| MappingRate::from_flagstat(sample.as_str(), stat))
        .collect())
}

/// `sample_ref  map_pct  map_std` table text.
pub fn get_mapping_table(rates: &[MappingRate]) -> String {
    let mut output = String::new();
    output.push_str("sample_ref\tmap_pct\tmap_std\n");
    for rate in rates {
        writeln!(output, "{}\t{:?}\t{:?}", rate.sample, rate.map_pct, rate.map_std).unwrap();
    }
    output
}
