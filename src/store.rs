//! Task store boundary.
//!
//! The engine components ([`QueryBuilder`](crate::query::QueryBuilder),
//! [`StatsAggregator`](crate::stats::StatsAggregator) and
//! [`TaskLifecycle`](crate::lifecycle::TaskLifecycle)) hold an injected
//! `Arc<dyn TaskStore>` and never reach for a global connection.

use crate::query::{OrderBy, PredicateSet};
use crate::types::{Task, TaskFields, TaskStats};
use anyhow::Result;
use chrono::{DateTime, Utc};

pub trait TaskStore: Send + Sync {
    /// Insert a new live task and return its assigned id.
    fn insert(&self, owner_id: i64, fields: &TaskFields, created_at: DateTime<Utc>) -> Result<i64>;

    /// Look up a task by id within one owner's rows, including soft-deleted
    /// ones. Returns `None` for absent ids and for ids owned by someone else.
    fn find_owned(&self, owner_id: i64, id: i64) -> Result<Option<Task>>;

    /// Replace the mutable fields of a task. Returns the affected row count.
    fn update_where_id(
        &self,
        id: i64,
        fields: &TaskFields,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<usize>;

    /// Set or clear the soft-delete flag. Returns the affected row count.
    fn set_deleted_flag(&self, id: i64, deleted: bool) -> Result<usize>;

    /// Fetch matching rows in order. `limit = None` returns every row
    /// from `offset` on.
    fn select_page(
        &self,
        predicates: &PredicateSet,
        order: &OrderBy,
        offset: i64,
        limit: Option<i64>,
    ) -> Result<Vec<Task>>;

    /// Count rows matching the predicate set, ignoring pagination.
    fn count_where(&self, predicates: &PredicateSet) -> Result<i64>;

    /// Compute all dashboard counts in one aggregate query, using `now`
    /// as the single reference time for overdue.
    fn aggregate_counts_where(
        &self,
        predicates: &PredicateSet,
        now: DateTime<Utc>,
    ) -> Result<TaskStats>;
}
