// src/distribution_store.rs

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::distribution::{Distribution, Spectrum};
use crate::error::{PrismError, Result};
use crate::types::LocusKey;

/// Extension given to persisted distributions.
pub const ARTIFACT_EXTENSION: &str = "prism";

const FORMAT_TAG: &str = "LOCUSPRISM";
const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    format: String,
    version: u32,
    total_weight: f64,
    entries: Vec<(LocusKey, f64)>,
}

/// Writes `dist` to `path` as gzip-compressed bincode.
///
/// The bytes go to `<path>.tmp` first and are renamed into place once
/// complete, so a failed save never leaves a truncated artifact behind.
pub fn save<P: AsRef<Path>>(dist: &Distribution, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut entries: Vec<(LocusKey, f64)> = dist
        .spectrum()
        .iter()
        .map(|(k, w)| (k.clone(), *w))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let snapshot = Snapshot {
        format: FORMAT_TAG.to_string(),
        version: FORMAT_VERSION,
        total_weight: dist.total_weight(),
        entries,
    };
    let bytes = bincode::serialize(&snapshot).map_err(|e| PrismError::storage_write(path, Some(e)))?;

    let tmp = tmp_path(path);
    let write = || -> std::io::Result<()> {
        let file = File::create(&tmp)?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        encoder.write_all(&bytes)?;
        encoder.finish()?.flush()?;
        fs::rename(&tmp, path)
    };
    if let Err(e) = write() {
        let _ = fs::remove_file(&tmp);
        return Err(PrismError::storage_write(path, Some(e)));
    }

    log::info!(
        "saved distribution with {} keys (total weight {}) to {}",
        dist.len(),
        dist.total_weight(),
        path.display()
    );
    Ok(())
}

/// Reads a distribution written by [`save`].
pub fn load<P: AsRef<Path>>(path: P) -> Result<Distribution> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| PrismError::storage_read(path, Some(e)))?;
    let mut bytes = Vec::new();
    GzDecoder::new(BufReader::new(file))
        .read_to_end(&mut bytes)
        .map_err(|e| PrismError::storage_read(path, Some(e)))?;
    // slice input bounds every length prefix by the bytes actually present
    let snapshot: Snapshot =
        bincode::deserialize(&bytes).map_err(|e| PrismError::storage_read(path, Some(e)))?;

    if snapshot.format != FORMAT_TAG || snapshot.version != FORMAT_VERSION {
        return Err(PrismError::storage_read(
            path,
            Some(format!(
                "unsupported format {} v{}",
                snapshot.format, snapshot.version
            )),
        ));
    }
    if !snapshot.total_weight.is_finite()
        || snapshot.entries.iter().any(|(_, w)| !(w.is_finite() && *w > 0.0))
    {
        return Err(PrismError::storage_read(path, Some("invalid weights")));
    }

    let mut spectrum = Spectrum::with_capacity(snapshot.entries.len());
    for (key, weight) in snapshot.entries {
        if spectrum.insert(key, weight).is_some() {
            return Err(PrismError::storage_read(path, Some("duplicate key")));
        }
    }
    log::debug!("loaded {} keys from {}", spectrum.len(), path.display());
    Ok(Distribution::from_parts(spectrum, snapshot.total_weight))
}

/// Artifact name for a sample built from `inputs`: the longest common
/// (character-wise) prefix of the paths, plus the artifact extension.
pub fn artifact_name<P: AsRef<Path>>(inputs: &[P]) -> Option<PathBuf> {
    let names: Vec<String> = inputs
        .iter()
        .map(|p| p.as_ref().to_string_lossy().into_owned())
        .collect();
    let first = names.first()?;
    let mut prefix_len = first.len();
    for name in &names[1..] {
        prefix_len = first
            .char_indices()
            .zip(name.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map_or(0, |((i, a), _)| i + a.len_utf8())
            .min(prefix_len);
    }
    Some(PathBuf::from(format!(
        "{}.{}",
        &first[..prefix_len],
        ARTIFACT_EXTENSION
    )))
}

/// Column name for an artifact: its file name up to the first `.`.
pub fn sample_name<P: AsRef<Path>>(path: P) -> String {
    let file_name = path
        .as_ref()
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let trimmed = file_name.trim();
    trimmed.split('.').next().unwrap_or(trimmed).to_string()
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}
