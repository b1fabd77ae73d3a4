//src/tags.rs

use std::io::{BufRead, Write};

use rand::Rng;

use crate::error::{PrismError, Result};

/// One record of a tag count file: `<sequence> <length> <count>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Upper-cased sequence, cut to the recorded length.
    pub sequence: String,
    pub count: u64,
}

/// Parses a tag count line; headers and malformed lines give `None`.
pub fn parse_tag_line(line: &str) -> Option<Tag> {
    let upper = line.trim().to_uppercase();
    let fields: Vec<&str> = upper.split_whitespace().collect();
    if fields.len() != 3 {
        return None;
    }
    let length: usize = fields[1].parse().ok()?;
    let count: u64 = fields[2].parse().ok()?;
    Some(Tag {
        sequence: fields[0].chars().take(length).collect(),
        count,
    })
}

/// Bernoulli selection rate. Unset, `<= 0` and `>= 1` all select everything.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleRate(pub Option<f64>);

impl SampleRate {
    fn effective(self) -> Option<f64> {
        self.0.filter(|p| *p > 0.0 && *p < 1.0)
    }

    pub fn select<G: Rng>(self, rng: &mut G) -> bool {
        match self.effective() {
            Some(p) => rng.gen::<f64>() <= p,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FastaOptions {
    /// One record per tag carrying `count=` instead of one per count.
    pub unique: bool,
    pub sample_rate: SampleRate,
    pub minimum_count: Option<u64>,
    pub maximum_count: Option<u64>,
}

impl FastaOptions {
    fn passes_count_filters(&self, count: u64) -> bool {
        self.minimum_count.map_or(true, |min| count >= min)
            && self.maximum_count.map_or(true, |max| count <= max)
    }
}

/// Selection probability and reported count for a unique tag seen `count` times
/// when each copy would be kept with probability `p`: the tag survives with
/// `1 - (1-p)^count`, and the count is scaled to keep the expected total.
pub fn unique_sampling(p: f64, count: u64) -> (f64, f64) {
    let c = count as f64;
    if count > 1 && p > 0.0 && p < 1.0 {
        let p_tag = 1.0 - (1.0 - p).powf(c);
        (p_tag, c * p / p_tag)
    } else {
        (p, c)
    }
}

/// Counters of one filter run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagStats {
    pub tags: u64,
    pub records: u64,
}

fn write_err(e: std::io::Error) -> PrismError {
    PrismError::io("<output>", e)
}

fn read_err(e: std::io::Error) -> PrismError {
    PrismError::io("<input>", e)
}

/// Writes tags as FASTA, one record per count or one per unique tag.
/// Record numbers advance for every candidate, kept or not.
pub fn tags_to_fasta<R, W, G>(reader: R, out: &mut W, options: &FastaOptions, rng: &mut G) -> Result<TagStats>
where
    R: BufRead,
    W: Write,
    G: Rng,
{
    let mut stats = TagStats::default();
    let mut seq_number: u64 = 1;

    for line in reader.lines() {
        let line = line.map_err(read_err)?;
        let tag = match parse_tag_line(&line) {
            Some(tag) => tag,
            None => continue,
        };
        stats.tags += 1;
        let count_ok = options.passes_count_filters(tag.count);

        if options.unique {
            let (selected, count) = match options.sample_rate.0 {
                Some(p) => {
                    let (p_tag, count) = unique_sampling(p, tag.count);
                    (SampleRate(Some(p_tag)).select(rng), count)
                }
                None => (true, tag.count as f64),
            };
            if selected && count_ok {
                writeln!(out, ">seq_{} count={:.6}\n{}", seq_number, count, tag.sequence)
                    .map_err(write_err)?;
                stats.records += 1;
            }
            seq_number += 1;
        } else {
            for _ in 0..tag.count {
                if options.sample_rate.select(rng) && count_ok {
                    writeln!(out, ">seq_{}\n{}", seq_number, tag.sequence).map_err(write_err)?;
                    stats.records += 1;
                }
                seq_number += 1;
            }
        }
    }
    log::debug!("{} tags read, {} fasta records written", stats.tags, stats.records);
    Ok(stats)
}

/// Copies tag lines, optionally Bernoulli-sampled.
pub fn tags_to_tags<R, W, G>(reader: R, out: &mut W, rate: SampleRate, rng: &mut G) -> Result<TagStats>
where
    R: BufRead,
    W: Write,
    G: Rng,
{
    let mut stats = TagStats::default();
    for line in reader.lines() {
        let line = line.map_err(read_err)?;
        stats.tags += 1;
        if rate.select(rng) {
            writeln!(out, "{}", line.trim()).map_err(write_err)?;
            stats.records += 1;
        }
    }
    Ok(stats)
}
