// src/distribution.rs

use ahash::AHashMap;

use crate::error::Result;
use crate::types::{LocusKey, Observation};

/// Sparse key -> accumulated weight map.
pub type Spectrum = AHashMap<LocusKey, f64>;

/// A weighted, sparse two-dimensional frequency distribution over
/// `(locus, database)` keys.
///
/// `total_weight` always equals the sum of the spectrum values and no key
/// carries a non-positive weight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution {
    spectrum: Spectrum,
    total_weight: f64,
}

impl Distribution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulates `(key, weight)` pairs; non-positive weights are dropped.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (LocusKey, f64)>,
    {
        let mut dist = Self::new();
        for (key, weight) in entries {
            dist.add(key, weight);
        }
        dist
    }

    /// Reassembles a persisted snapshot exactly, keeping the stored total.
    pub(crate) fn from_parts(spectrum: Spectrum, total_weight: f64) -> Self {
        Self {
            spectrum,
            total_weight,
        }
    }

    pub fn spectrum(&self) -> &Spectrum {
        &self.spectrum
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.spectrum.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spectrum.is_empty()
    }

    pub fn weight(&self, key: &LocusKey) -> f64 {
        self.spectrum.get(key).copied().unwrap_or(0.0)
    }

    fn add(&mut self, key: LocusKey, weight: f64) {
        if weight <= 0.0 || weight.is_nan() {
            return;
        }
        *self.spectrum.entry(key).or_insert(0.0) += weight;
        self.total_weight += weight;
    }

    /// Folds another distribution into this one.
    pub fn merge(mut self, other: Distribution) -> Distribution {
        self.spectrum.reserve(other.spectrum.len());
        for (key, weight) in other.spectrum {
            self.add(key, weight);
        }
        self
    }

    /// Keys in canonical order (locus, then database).
    pub fn sorted_keys(&self) -> Vec<&LocusKey> {
        let mut keys: Vec<&LocusKey> = self.spectrum.keys().collect();
        keys.sort();
        keys
    }

    /// Weight at each requested key, 0 where absent, in the order given.
    pub fn raw_projection(&self, keys: &[LocusKey]) -> Vec<f64> {
        keys.iter().map(|k| self.weight(k)).collect()
    }

    /// Share of the total weight at each requested key.
    pub fn frequency_projection(&self, keys: &[LocusKey]) -> Vec<f64> {
        keys.iter().map(|k| self.share(k)).collect()
    }

    /// `-p ln p` for the share `p` at each requested key; 0 where `p` is 0.
    pub fn unsigned_information_projection(&self, keys: &[LocusKey]) -> Vec<f64> {
        keys.iter()
            .map(|k| unsigned_information(self.share(k)))
            .collect()
    }

    fn share(&self, key: &LocusKey) -> f64 {
        if self.total_weight <= 0.0 {
            0.0
        } else {
            self.weight(key) / self.total_weight
        }
    }
}

/// Unsigned information content of a share.
#[inline]
pub fn unsigned_information(p: f64) -> f64 {
    if p <= 0.0 {
        0.0
    } else {
        -p * p.ln()
    }
}

/// Accumulates top-hit observations into a `Distribution`.
#[derive(Debug, Default)]
pub struct DistributionBuilder {
    dist: Distribution,
    observations: u64,
}

impl DistributionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one observation under the key `(locus, database)`.
    #[inline]
    pub fn add(&mut self, obs: Observation) {
        self.observations += 1;
        self.dist.add(LocusKey::new(obs.locus, obs.database), obs.weight);
    }

    /// Consumes a whole top-hit stream, stopping at the first error.
    pub fn extend_from<I>(&mut self, observations: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<Observation>>,
    {
        for obs in observations {
            self.add(obs?);
        }
        Ok(())
    }

    pub fn key_count(&self) -> usize {
        self.dist.len()
    }

    pub fn observations(&self) -> u64 {
        self.observations
    }

    pub fn finish(self) -> Distribution {
        log::debug!(
            "built distribution from {} observations: {} keys, total weight {}",
            self.observations,
            self.dist.len(),
            self.dist.total_weight
        );
        self.dist
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hits::TopHits;

    fn obs(query: &str, locus: &str, weight: f64) -> Observation {
        Observation {
            query: query.into(),
            database: Some("db".into()),
            locus: locus.into(),
            weight,
        }
    }

    fn key(locus: &str) -> LocusKey {
        LocusKey::new(locus, Some("db".into()))
    }

    fn assert_conserved(dist: &Distribution) {
        let sum: f64 = dist.spectrum().values().sum();
        assert!((sum - dist.total_weight()).abs() < 1e-9);
    }

    #[test]
    fn top_hits_feed_exactly_one_key_per_query() {
        let stream = vec![
            Ok(obs("A", "chr1", 5.0)),
            Ok(obs("A", "chr2", 5.0)),
            Ok(obs("A", "chr3", 5.0)),
            Ok(obs("B", "chr9", 2.0)),
        ];
        let mut builder = DistributionBuilder::new();
        builder
            .extend_from(TopHits::new(stream.into_iter(), false, "t"))
            .unwrap();
        let dist = builder.finish();
        assert_eq!(dist.len(), 2);
        assert_eq!(dist.weight(&key("chr1")), 5.0);
        assert_eq!(dist.weight(&key("chr9")), 2.0);
        assert_eq!(dist.total_weight(), 7.0);
    }

    #[test]
    fn weights_accumulate_per_key() {
        let mut builder = DistributionBuilder::new();
        builder.add(obs("A", "chr1", 1.5));
        builder.add(obs("B", "chr1", 2.5));
        builder.add(obs("C", "chr2", 1.0));
        let dist = builder.finish();
        assert_eq!(dist.weight(&key("chr1")), 4.0);
        assert_eq!(dist.total_weight(), 5.0);
        assert_conserved(&dist);
    }

    #[test]
    fn empty_input_is_an_empty_distribution() {
        let dist = DistributionBuilder::new().finish();
        assert!(dist.is_empty());
        assert_eq!(dist.total_weight(), 0.0);
        assert_conserved(&dist);
    }

    #[test]
    fn zero_weights_never_create_keys() {
        let mut builder = DistributionBuilder::new();
        builder.add(obs("A", "chr1", 0.0));
        builder.add(obs("B", "chr2", 3.0));
        let dist = builder.finish();
        assert_eq!(dist.len(), 1);
        assert!(dist.spectrum().values().all(|w| *w > 0.0));
        assert_conserved(&dist);
    }

    #[test]
    fn merge_conserves_weight() {
        let a = Distribution::from_entries(vec![(key("chr1"), 2.0), (key("chr2"), 1.0)]);
        let b = Distribution::from_entries(vec![(key("chr1"), 3.0), (key("chr3"), 4.0)]);
        let merged = a.merge(b);
        assert_eq!(merged.weight(&key("chr1")), 5.0);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.total_weight(), 10.0);
        assert_conserved(&merged);
    }

    #[test]
    fn projections_follow_requested_key_order() {
        let dist = Distribution::from_entries(vec![(key("chr1"), 25.0), (key("chr2"), 75.0)]);
        let keys = vec![key("chr2"), key("missing"), key("chr1")];
        assert_eq!(dist.raw_projection(&keys), vec![75.0, 0.0, 25.0]);
        assert_eq!(dist.frequency_projection(&keys), vec![0.75, 0.0, 0.25]);
        let info = dist.unsigned_information_projection(&keys);
        assert_eq!(info[1], 0.0);
        assert!((info[2] - (-0.25 * 0.25f64.ln())).abs() < 1e-12);
    }

    #[test]
    fn information_rises_with_share_up_to_one_over_e() {
        assert_eq!(unsigned_information(0.0), 0.0);
        let limit = (-1.0f64).exp();
        let mut prev = 0.0;
        for step in 1..=20 {
            let p = limit * step as f64 / 20.0;
            let value = unsigned_information(p);
            assert!(value > prev, "not increasing at p={}", p);
            prev = value;
        }
    }

    #[test]
    fn information_projection_for_fixed_total() {
        // same total weight, growing share of one key
        let mut prev = -1.0;
        for w in [0.0, 5.0, 10.0, 20.0, 36.0] {
            let dist = Distribution::from_entries(vec![(key("k"), w), (key("rest"), 100.0 - w)]);
            let v = dist.unsigned_information_projection(&[key("k")])[0];
            assert!(v > prev);
            prev = v;
        }
    }
}
