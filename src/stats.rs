//! Dashboard statistics.

use crate::error::ApiResult;
use crate::query::PredicateSet;
use crate::store::TaskStore;
use crate::types::TaskStats;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

/// Computes per-owner counts in a single aggregate query.
///
/// The three status buckets only count the known statuses. A row with any
/// other stored status still counts toward `total_tasks`, so the buckets
/// can sum to less than the total.
#[derive(Clone)]
pub struct StatsAggregator {
    store: Arc<dyn TaskStore>,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    pub fn stats(&self, owner_id: i64) -> ApiResult<TaskStats> {
        self.stats_at(owner_id, Utc::now())
    }

    /// Counts with an explicit reference time for "overdue".
    pub fn stats_at(&self, owner_id: i64, now: DateTime<Utc>) -> ApiResult<TaskStats> {
        let stats = self
            .store
            .aggregate_counts_where(&PredicateSet::for_owner(owner_id), now)?;
        debug!(owner_id, total = stats.total_tasks, overdue = stats.overdue_tasks, "computed stats");
        Ok(stats)
    }
}
