//! Query builder: turns a filter specification into a counted, ordered page.

use super::filter::{FilterRequest, FilterSpec, SortDirection, SortKey};
use super::predicate::{OrderBy, Predicate, PredicateSet};
use crate::config::PagingConfig;
use crate::error::ApiResult;
use crate::store::TaskStore;
use crate::types::{PagedTasks, Task};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct QueryBuilder {
    store: Arc<dyn TaskStore>,
    paging: PagingConfig,
}

impl QueryBuilder {
    pub fn new(store: Arc<dyn TaskStore>, paging: PagingConfig) -> Self {
        Self { store, paging }
    }

    /// Every live task of the owner, newest first.
    pub fn list_all(&self, owner_id: i64) -> ApiResult<Vec<Task>> {
        let set = PredicateSet::for_owner(owner_id);
        let order = OrderBy::new(SortKey::CreatedAt, SortDirection::Desc);
        let tasks = self.store.select_page(&set, &order, 0, None)?;
        debug!(owner_id, count = tasks.len(), "listed tasks");
        Ok(tasks)
    }

    /// Validate a wire filter request and run it.
    pub fn filter(&self, owner_id: i64, request: &FilterRequest) -> ApiResult<PagedTasks> {
        let spec = FilterSpec::from_request(request, &self.paging)?;
        self.run(owner_id, &spec)
    }

    /// Count, then fetch the requested page, with the same predicate set.
    pub fn run(&self, owner_id: i64, spec: &FilterSpec) -> ApiResult<PagedTasks> {
        let set = build_predicates(owner_id, spec);
        let order = OrderBy::new(spec.sort_key, spec.sort_direction);

        let total_count = self.store.count_where(&set)?;
        let tasks = if total_count == 0 {
            Vec::new()
        } else {
            self.store
                .select_page(&set, &order, spec.offset(), Some(spec.page_size))?
        };

        debug!(
            owner_id,
            total = total_count,
            page = spec.page,
            returned = tasks.len(),
            "filtered tasks"
        );

        Ok(PagedTasks {
            tasks,
            total_count,
            page: spec.page,
            page_size: spec.page_size,
            total_pages: total_pages(total_count, spec.page_size),
        })
    }
}

/// Owner and not-deleted first, then one predicate per supplied filter.
pub fn build_predicates(owner_id: i64, spec: &FilterSpec) -> PredicateSet {
    let mut set = PredicateSet::for_owner(owner_id);
    if let Some(status) = spec.status {
        set.push(Predicate::StatusIs(status));
    }
    if let Some(priority) = spec.priority {
        set.push(Predicate::PriorityIs(priority));
    }
    if let Some(category) = &spec.category {
        set.push(Predicate::CategoryIs(category.clone()));
    }
    if let Some(search) = &spec.search {
        set.push(Predicate::TextContains(search.clone()));
    }
    if let Some(from) = spec.due_from {
        set.push(Predicate::DueOnOrAfter(from));
    }
    if let Some(to) = spec.due_to {
        set.push(Predicate::DueOnOrBefore(to));
    }
    set
}

fn total_pages(total_count: i64, page_size: i64) -> i64 {
    if total_count <= 0 || page_size <= 0 {
        return 0;
    }
    (total_count + page_size - 1) / page_size
}
