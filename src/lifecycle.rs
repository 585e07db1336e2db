//! Task lifecycle: create, full update and soft delete.

use crate::error::{ApiError, ApiResult};
use crate::store::TaskStore;
use crate::types::{DEFAULT_CATEGORY, Task, TaskFields, TaskInput, TaskPriority, TaskStatus};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct TaskLifecycle {
    store: Arc<dyn TaskStore>,
}

impl TaskLifecycle {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// Create a task for `owner_id`. Unset status, priority and category
    /// take their defaults; `created_at` is stamped here.
    pub fn create(&self, owner_id: i64, input: TaskInput) -> ApiResult<Task> {
        let fields = validate_input(input)?;
        let id = self.store.insert(owner_id, &fields, Utc::now())?;
        info!(owner_id, task_id = id, "created task");
        self.load(owner_id, id)
    }

    /// Replace every mutable field of an owned, live task.
    ///
    /// `completed_at` is set to now when the new status is Completed and
    /// cleared for any other status, whatever it held before.
    pub fn update(&self, owner_id: i64, id: i64, input: TaskInput) -> ApiResult<Task> {
        self.update_at(owner_id, id, input, Utc::now())
    }

    pub fn update_at(
        &self,
        owner_id: i64,
        id: i64,
        input: TaskInput,
        now: DateTime<Utc>,
    ) -> ApiResult<Task> {
        let fields = validate_input(input)?;
        match self.store.find_owned(owner_id, id)? {
            Some(task) if !task.is_deleted => {}
            _ => return Err(ApiError::task_not_found(id)),
        }

        let completed_at = (fields.status == TaskStatus::Completed).then_some(now);
        self.store.update_where_id(id, &fields, completed_at)?;
        info!(owner_id, task_id = id, status = %fields.status, "updated task");
        self.load(owner_id, id)
    }

    /// Flag an owned task as deleted. Deleting an already-deleted task is
    /// a successful no-op.
    pub fn soft_delete(&self, owner_id: i64, id: i64) -> ApiResult<()> {
        let task = self
            .store
            .find_owned(owner_id, id)?
            .ok_or_else(|| ApiError::task_not_found(id))?;
        if task.is_deleted {
            return Ok(());
        }
        self.store.set_deleted_flag(id, true)?;
        info!(owner_id, task_id = id, "deleted task");
        Ok(())
    }

    fn load(&self, owner_id: i64, id: i64) -> ApiResult<Task> {
        self.store
            .find_owned(owner_id, id)?
            .ok_or_else(|| ApiError::task_not_found(id))
    }
}

/// Check required fields and apply defaults.
pub fn validate_input(input: TaskInput) -> ApiResult<TaskFields> {
    let title = input
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::missing_field("title"))?;

    let due_date = input.due_date.ok_or_else(|| ApiError::missing_field("dueDate"))?;

    let status = match blank_to_none(input.status) {
        Some(raw) => TaskStatus::parse(&raw).ok_or_else(|| {
            ApiError::invalid_value("status", format!("Unknown status: {}", raw))
        })?,
        None => TaskStatus::Pending,
    };

    let priority = match blank_to_none(input.priority) {
        Some(raw) => TaskPriority::parse(&raw).ok_or_else(|| {
            ApiError::invalid_value("priority", format!("Unknown priority: {}", raw))
        })?,
        None => TaskPriority::Medium,
    };

    let category = blank_to_none(input.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    Ok(TaskFields {
        title,
        description: input.description.unwrap_or_default(),
        status,
        priority,
        category,
        due_date,
    })
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
