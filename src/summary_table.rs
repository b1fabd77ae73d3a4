// src/summary_table.rs

use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;

use rayon::prelude::*;

use crate::distribution::Distribution;
use crate::distribution_store::{load, sample_name};
use crate::error::{PrismError, Result};
use crate::types::{LocusKey, Measure};

/// Inputs of a cross-sample table.
#[derive(Debug, Clone)]
pub struct TableParams {
    pub artifacts: Vec<PathBuf>,
    pub measure: Measure,
    /// Render each key as one `locus_genome` token instead of two columns.
    pub rownames: bool,
}

/// One sorted key and its value in every sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub key: LocusKey,
    pub values: Vec<f64>,
}

/// Rectangular locus x sample table.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTable {
    pub samples: Vec<String>,
    pub rows: Vec<SummaryRow>,
    pub rownames: bool,
}

/// A loaded artifact, read-only for the rest of the table build.
struct SampleColumn {
    name: String,
    dist: Distribution,
}

fn load_columns(paths: &[PathBuf]) -> Result<Vec<SampleColumn>> {
    paths
        .par_iter()
        .map(|path| -> Result<SampleColumn> {
            Ok(SampleColumn {
                name: sample_name(path),
                dist: load(path)?,
            })
        })
        .collect()
}

/// Union of all keys in canonical order.
fn union_keys(columns: &[SampleColumn]) -> Vec<LocusKey> {
    let all: BTreeSet<&LocusKey> = columns
        .iter()
        .flat_map(|c| c.dist.spectrum().keys())
        .collect();
    all.into_iter().cloned().collect()
}

/// Loads every artifact and projects it onto the union of keys.
/// Any unreadable artifact fails the whole table.
pub fn build_summary_table(params: &TableParams) -> Result<SummaryTable> {
    if params.artifacts.is_empty() {
        return Err(PrismError::InvalidArgument(
            "no distribution artifacts given".to_string(),
        ));
    }
    let columns = load_columns(&params.artifacts)?;
    let keys = union_keys(&columns);
    log::info!(
        "{} samples, {} distinct (locus, genome) keys",
        columns.len(),
        keys.len()
    );

    let projections: Vec<Vec<f64>> = columns
        .iter()
        .map(|c| match params.measure {
            Measure::Frequency => c.dist.frequency_projection(&keys),
            Measure::Information => c.dist.unsigned_information_projection(&keys),
        })
        .collect();

    let rows = keys
        .into_iter()
        .enumerate()
        .map(|(i, key)| SummaryRow {
            key,
            values: projections.iter().map(|p| p[i]).collect(),
        })
        .collect();

    Ok(SummaryTable {
        samples: columns.into_iter().map(|c| c.name).collect(),
        rows,
        rownames: params.rownames,
    })
}

impl SummaryTable {
    fn separator(&self) -> &'static str {
        if self.rownames {
            "_"
        } else {
            "\t"
        }
    }

    /// Writes the header and one tab-separated line per key.
    pub fn write_tsv<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        let sep = self.separator();
        write!(out, "locus{}genome", sep)?;
        for sample in &self.samples {
            write!(out, "\t{}", sample)?;
        }
        writeln!(out)?;

        for row in &self.rows {
            write!(out, "{}", row.key.label(sep))?;
            for v in &row.values {
                // Debug keeps a trailing ".0" on integral values
                write!(out, "\t{:?}", v)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}
