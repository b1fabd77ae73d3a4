use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::types::ColumnSelection;

/// One classified line of a commented tabular BLAST report.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportLine<'a> {
    /// `# Database: <path>`, already reduced to the file stem.
    Database(&'a str),
    /// `# Query: <text>`
    Query(&'a str),
    /// `# 0 hits found`
    NoHits,
    /// A data line with enough fields.
    Hit { query: &'a str, locus: &'a str },
    Ignored,
}

struct Patterns {
    database: Regex,
    query: Regex,
    no_hits: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        database: Regex::new(r"^#\s+Database:\s+(\S+)$").expect("valid pattern"),
        query: Regex::new(r"^#\s+Query:\s+(.*)$").expect("valid pattern"),
        no_hits: Regex::new(r"(?i) 0 hits").expect("valid pattern"),
    })
}

/// Classifies a single report line. Never fails: anything unrecognised is `Ignored`.
pub fn parse_line<'a>(line: &'a str, columns: &ColumnSelection) -> ReportLine<'a> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ReportLine::Ignored;
    }

    if trimmed.starts_with('#') {
        let pats = patterns();
        if let Some(caps) = pats.database.captures(trimmed) {
            let raw = caps.get(1).map_or("", |m| m.as_str());
            let stem = Path::new(raw)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(raw);
            return ReportLine::Database(stem);
        }
        if let Some(caps) = pats.query.captures(trimmed) {
            return ReportLine::Query(caps.get(1).map_or("", |m| m.as_str()));
        }
        if pats.no_hits.is_match(line) {
            return ReportLine::NoHits;
        }
        return ReportLine::Ignored;
    }

    let needed = columns
        .min_fields
        .max(columns.locus + 1)
        .max(columns.query + 1);
    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    if fields.len() < needed {
        return ReportLine::Ignored;
    }
    ReportLine::Hit {
        query: fields[columns.query],
        locus: fields[columns.locus],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> ReportLine<'_> {
        parse_line(line, &ColumnSelection::default())
    }

    #[test]
    fn database_line_keeps_stem_only() {
        assert_eq!(
            parse("# Database: /bifo/indexes/blast/capra_hircus_PRJNA290100.fasta"),
            ReportLine::Database("capra_hircus_PRJNA290100")
        );
    }

    #[test]
    fn query_line_keeps_full_text() {
        assert_eq!(
            parse("# Query: seq_20382 count=638"),
            ReportLine::Query("seq_20382 count=638")
        );
    }

    #[test]
    fn zero_hits_marker_is_case_insensitive() {
        assert_eq!(parse("# 0 hits found"), ReportLine::NoHits);
        assert_eq!(parse("# 0 HITS FOUND"), ReportLine::NoHits);
        assert_eq!(parse("# 10 hits found"), ReportLine::Ignored);
        assert_eq!(parse("# 17 hits found"), ReportLine::Ignored);
    }

    #[test]
    fn other_comments_are_ignored() {
        assert_eq!(parse("# BLASTN 2.6.0+"), ReportLine::Ignored);
        assert_eq!(
            parse("# Fields: query acc.ver, subject acc.ver, % identity, alignment length"),
            ReportLine::Ignored
        );
        assert_eq!(parse(""), ReportLine::Ignored);
    }

    #[test]
    fn data_line_needs_five_fields() {
        let line = "seq_21074\tCM004590.1\t100.000\t64\t0\t0\t1\t64\t4028254\t4028191\t1.14e-25\t119";
        assert_eq!(
            parse(line),
            ReportLine::Hit {
                query: "seq_21074",
                locus: "CM004590.1"
            }
        );
        assert_eq!(parse("seq_1 chr1 99.0 64"), ReportLine::Ignored);
    }

    #[test]
    fn locus_column_is_configurable() {
        let columns = ColumnSelection {
            query: 0,
            locus: 7,
            min_fields: 5,
        };
        let line = "q1 s1 100 64 0 0 1 locus_x";
        assert_eq!(
            parse_line(line, &columns),
            ReportLine::Hit {
                query: "q1",
                locus: "locus_x"
            }
        );
        // fewer fields than the selected column
        assert_eq!(parse_line("q1 s1 100 64 0 0", &columns), ReportLine::Ignored);
    }
}
