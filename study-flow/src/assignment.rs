//! Condition assignment balancer
//!
//! Picks the condition with the fewest counted sessions, breaking ties
//! uniformly at random. When the counts source is unavailable the pick is
//! uniform over the whole catalog instead; assignment itself never fails.
//!
//! The tally is read without any reservation, so two concurrent starts can
//! both see the same minimum. Balance is approximate under concurrency.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use study_common::config::CountBasis;
use study_common::{db, Condition, ConditionCatalog, ConditionCount};

use crate::Result;

/// Source of per-condition session tallies
pub trait CountsSource {
    fn condition_counts(&self) -> impl Future<Output = Result<Vec<ConditionCount>>> + Send;
}

/// Counts read straight from the study database
#[derive(Clone)]
pub struct SqliteCountsSource {
    db: SqlitePool,
    basis: CountBasis,
}

impl SqliteCountsSource {
    pub fn new(db: SqlitePool, basis: CountBasis) -> Self {
        Self { db, basis }
    }
}

impl CountsSource for SqliteCountsSource {
    async fn condition_counts(&self) -> Result<Vec<ConditionCount>> {
        Ok(db::condition_counts(&self.db, self.basis).await?)
    }
}

/// Outcome of one assignment request
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub condition: Condition,
    /// True when counts were unavailable and the pick was uniform
    pub fallback: bool,
}

/// Least-completed condition balancer
pub struct ConditionAssignmentBalancer<S, R = StdRng> {
    catalog: Arc<ConditionCatalog>,
    source: S,
    rng: R,
}

impl<S: CountsSource> ConditionAssignmentBalancer<S, StdRng> {
    pub fn new(catalog: Arc<ConditionCatalog>, source: S) -> Self {
        Self::with_rng(catalog, source, StdRng::from_entropy())
    }
}

impl<S: CountsSource, R: Rng> ConditionAssignmentBalancer<S, R> {
    /// Balancer with an explicit random source (seeded in tests)
    pub fn with_rng(catalog: Arc<ConditionCatalog>, source: S, rng: R) -> Self {
        Self {
            catalog,
            source,
            rng,
        }
    }

    pub fn catalog(&self) -> &ConditionCatalog {
        &self.catalog
    }

    /// Choose a condition for a new run
    ///
    /// One counts request per call; a failed request is not retried.
    pub async fn assign(&mut self) -> Assignment {
        match self.source.condition_counts().await {
            Ok(counts) => {
                let condition = select_least_counted(&self.catalog, &counts, &mut self.rng).clone();
                info!(condition_id = %condition.id, "Assigned condition");
                Assignment {
                    condition,
                    fallback: false,
                }
            }
            Err(e) => {
                let condition = select_uniform(&self.catalog, &mut self.rng).clone();
                warn!(
                    condition_id = %condition.id,
                    "Condition counts unavailable, assigning uniformly: {}", e
                );
                Assignment {
                    condition,
                    fallback: true,
                }
            }
        }
    }
}

/// Uniform pick among the catalog conditions whose tally is minimal
///
/// Catalog conditions absent from `counts` have a tally of zero. Counted ids
/// that are not in the catalog are ignored.
pub fn select_least_counted<'a, R: Rng + ?Sized>(
    catalog: &'a ConditionCatalog,
    counts: &[ConditionCount],
    rng: &mut R,
) -> &'a Condition {
    let mut tally: HashMap<&str, i64> = catalog
        .conditions()
        .iter()
        .map(|c| (c.id.as_str(), 0))
        .collect();

    for count in counts {
        match tally.get_mut(count.condition_id.as_str()) {
            Some(slot) => *slot += count.count,
            None => debug!(condition_id = %count.condition_id, "Ignoring count for unknown condition"),
        }
    }

    let min = tally.values().copied().min().unwrap_or(0);
    let candidates: Vec<&Condition> = catalog
        .conditions()
        .iter()
        .filter(|c| tally.get(c.id.as_str()).copied() == Some(min))
        .collect();

    match candidates.choose(&mut *rng) {
        Some(condition) => *condition,
        None => select_uniform(catalog, rng),
    }
}

/// Uniform pick over the whole catalog
pub fn select_uniform<'a, R: Rng + ?Sized>(catalog: &'a ConditionCatalog, rng: &mut R) -> &'a Condition {
    // A catalog is never empty
    let conditions = catalog.conditions();
    &conditions[rng.gen_range(0..conditions.len())]
}
