//src/types.rs

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{PrismError, Result};

/// Locus recorded for a query whose report section says `0 hits found`.
pub const NO_HITS: &str = "No hits";

/// Rendering of a database that was never declared before a hit.
pub const UNKNOWN_DATABASE: &str = "None";

/// One fully qualified hit (or explicit non-hit) for a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub query: String,
    pub database: Option<String>,
    pub locus: String,
    pub weight: f64,
}

/// Distribution key: `(locus, database)`, both binned as discrete values.
///
/// The derived ordering compares the locus first and the database second,
/// plain lexicographic on the stored strings; an undeclared database sorts
/// before every named one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocusKey {
    pub locus: String,
    pub database: Option<String>,
}

impl LocusKey {
    pub fn new(locus: impl Into<String>, database: Option<String>) -> Self {
        Self {
            locus: locus.into(),
            database,
        }
    }

    pub fn database_label(&self) -> &str {
        self.database.as_deref().unwrap_or(UNKNOWN_DATABASE)
    }

    /// Both components joined by `sep`, with `'` and `#` stripped so the
    /// label survives R-style table readers.
    pub fn label(&self, sep: &str) -> String {
        format!("{}{}{}", self.locus, sep, self.database_label())
            .chars()
            .filter(|c| *c != '\'' && *c != '#')
            .collect()
    }
}

/// How much one observation counts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum WeightingMethod {
    /// Every query counts 1.
    #[default]
    #[value(name = "none")]
    Unweighted,
    /// Weight is the `count=<number>` suffix of the query (unique tags).
    #[value(name = "tag_count")]
    TagCount,
}

fn count_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"count=(\d+(?:\.\d*)?|\.\d+)\s*$").expect("count suffix pattern is valid")
    })
}

impl WeightingMethod {
    /// The only place the query text is inspected for a weight.
    pub fn weight_for(self, query: &str) -> Result<f64> {
        match self {
            WeightingMethod::Unweighted => Ok(1.0),
            WeightingMethod::TagCount => count_suffix()
                .captures(query)
                .and_then(|caps| caps[1].parse::<f64>().ok())
                .ok_or_else(|| PrismError::WeightExtraction {
                    query: query.to_string(),
                }),
        }
    }
}

/// Per-sample value reported in the summary table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Measure {
    /// Share of the sample's total weight.
    #[default]
    Frequency,
    /// Unsigned information content `-p ln p` of that share.
    Information,
}

/// Which whitespace-separated columns of a data line feed the reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSelection {
    /// Query identifier column, used only when no `# Query:` line was seen.
    pub query: usize,
    /// Subject (locus) identifier column.
    pub locus: usize,
    /// Lines with fewer fields are not hit lines.
    pub min_fields: usize,
}

impl Default for ColumnSelection {
    fn default() -> Self {
        Self {
            query: 0,
            locus: 1,
            min_fields: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_count_weight_is_taken_from_query_suffix() {
        let w = WeightingMethod::TagCount.weight_for("seq_1 count=16").unwrap();
        assert_eq!(w, 16.0);
        let w = WeightingMethod::TagCount.weight_for("seq_9 count=2.5  ").unwrap();
        assert_eq!(w, 2.5);
    }

    #[test]
    fn tag_count_without_suffix_is_an_error() {
        let err = WeightingMethod::TagCount.weight_for("seq_1").unwrap_err();
        assert!(matches!(err, PrismError::WeightExtraction { .. }));
        // suffix must end the query
        assert!(WeightingMethod::TagCount.weight_for("seq_1 count=3 x").is_err());
    }

    #[test]
    fn unweighted_ignores_query_text() {
        assert_eq!(WeightingMethod::Unweighted.weight_for("seq_1 count=16").unwrap(), 1.0);
        assert_eq!(WeightingMethod::Unweighted.weight_for("").unwrap(), 1.0);
    }

    #[test]
    fn keys_sort_by_locus_then_database() {
        let mut keys = vec![
            LocusKey::new("chr2", Some("goat".into())),
            LocusKey::new("chr1", Some("sheep".into())),
            LocusKey::new("chr1", Some("goat".into())),
            LocusKey::new("chr1", None),
        ];
        keys.sort();
        let labels: Vec<String> = keys.iter().map(|k| k.label("_")).collect();
        assert_eq!(labels, vec!["chr1_None", "chr1_goat", "chr1_sheep", "chr2_goat"]);
    }

    #[test]
    fn label_strips_quotes_and_hashes() {
        let key = LocusKey::new("gi#12'", Some("db".into()));
        assert_eq!(key.label("\t"), "gi12\tdb");
    }
}
