use std::path::PathBuf;

use ahash::AHashSet;

use crate::error::{PrismError, Result};
use crate::types::Observation;

/// Keeps the first observation of each run of consecutive observations
/// sharing a query. Reports list hits best-first and group them by query,
/// so the first of a run is the top hit.
///
/// Grouping is by adjacency. With `strict` set, a query that shows up again
/// after its run was closed is a `GroupingViolation` instead of being
/// counted twice.
pub struct TopHits<I> {
    inner: I,
    current: Option<String>,
    closed: Option<AHashSet<String>>,
    path: PathBuf,
}

impl<I> TopHits<I>
where
    I: Iterator<Item = Result<Observation>>,
{
    pub fn new(inner: I, strict: bool, path: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            current: None,
            closed: strict.then(AHashSet::new),
            path: path.into(),
        }
    }
}

impl<I> Iterator for TopHits<I>
where
    I: Iterator<Item = Result<Observation>>,
{
    type Item = Result<Observation>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let obs = match self.inner.next()? {
                Ok(obs) => obs,
                Err(e) => return Some(Err(e)),
            };
            if self.current.as_deref() == Some(obs.query.as_str()) {
                continue;
            }
            if let Some(closed) = self.closed.as_mut() {
                if closed.contains(&obs.query) {
                    return Some(Err(PrismError::GroupingViolation {
                        query: obs.query,
                        path: self.path.clone(),
                    }));
                }
                if let Some(prev) = self.current.take() {
                    closed.insert(prev);
                }
            }
            self.current = Some(obs.query.clone());
            return Some(Ok(obs));
        }
    }
}
