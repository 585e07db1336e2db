//! Filter specification: which tasks to select, how to order them, and
//! which page to return.

use crate::config::PagingConfig;
use crate::error::{ApiError, ApiResult};
use crate::types::{TaskPriority, TaskStatus, flexible_datetime};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Allow-listed sort keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    CreatedAt,
    DueDate,
    Priority,
}

impl SortKey {
    /// Map caller text onto a known key. Unknown or missing keys fall back
    /// to the default so listing stays available.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        match raw.trim().to_ascii_lowercase().replace('_', "").as_str() {
            "createdat" => SortKey::CreatedAt,
            "duedate" => SortKey::DueDate,
            "priority" => SortKey::Priority,
            _ => Self::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_uppercase()).as_deref() {
            Some("ASC") => SortDirection::Asc,
            Some("DESC") => SortDirection::Desc,
            _ => Self::default(),
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Filter request as sent by the browser client.
///
/// All fields are optional; empty strings are treated like absent fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterRequest {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub search_term: Option<String>,
    #[serde(with = "flexible_datetime")]
    pub from_date: Option<DateTime<Utc>>,
    #[serde(with = "flexible_datetime")]
    pub to_date: Option<DateTime<Utc>>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// Validated filter specification.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub due_from: Option<DateTime<Utc>>,
    pub due_to: Option<DateTime<Utc>>,
    pub sort_key: SortKey,
    pub sort_direction: SortDirection,
    pub page: i64,
    pub page_size: i64,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            status: None,
            priority: None,
            category: None,
            search: None,
            due_from: None,
            due_to: None,
            sort_key: SortKey::default(),
            sort_direction: SortDirection::default(),
            page: 1,
            page_size: PagingConfig::default().default_page_size,
        }
    }
}

impl FilterSpec {
    /// Validate a wire request. Nothing here touches the store, so bad
    /// input is rejected before any query runs.
    pub fn from_request(req: &FilterRequest, paging: &PagingConfig) -> ApiResult<Self> {
        let page = req.page.unwrap_or(1);
        if page < 1 {
            return Err(ApiError::invalid_value("page", "page must be at least 1"));
        }

        let page_size = req.page_size.unwrap_or(paging.default_page_size);
        if page_size <= 0 {
            return Err(ApiError::invalid_value(
                "pageSize",
                "pageSize must be greater than 0",
            ));
        }
        let page_size = page_size.min(paging.max_page_size);

        let status = match non_blank(&req.status) {
            Some(raw) => Some(TaskStatus::parse(raw).ok_or_else(|| {
                ApiError::invalid_value("status", format!("Unknown status: {}", raw))
            })?),
            None => None,
        };

        let priority = match non_blank(&req.priority) {
            Some(raw) => Some(TaskPriority::parse(raw).ok_or_else(|| {
                ApiError::invalid_value("priority", format!("Unknown priority: {}", raw))
            })?),
            None => None,
        };

        if let (Some(from), Some(to)) = (req.from_date, req.to_date)
            && from > to
        {
            return Err(ApiError::invalid_value(
                "fromDate",
                "fromDate must not be after toDate",
            ));
        }

        Ok(Self {
            status,
            priority,
            category: non_blank(&req.category).map(str::to_string),
            search: non_blank(&req.search_term).map(str::to_string),
            due_from: req.from_date,
            due_to: req.to_date,
            sort_key: SortKey::parse_or_default(req.sort_by.as_deref()),
            sort_direction: SortDirection::parse_or_default(req.sort_order.as_deref()),
            page,
            page_size,
        })
    }

    /// Number of matching rows skipped before this page.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
