//! Structured predicates and their parameterized SQL rendering.
//!
//! A [`PredicateSet`] can only be created for a specific owner, and always
//! carries the owner and not-deleted predicates. Caller-supplied values are
//! only ever bound as parameters; every piece of SQL text rendered here is a
//! fixed string chosen by the predicate variant or an allow-listed sort key.

use super::filter::{SortDirection, SortKey};
use crate::types::{Task, TaskPriority, TaskStatus};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;

/// A single condition a task row must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    OwnerIs(i64),
    NotDeleted,
    StatusIs(TaskStatus),
    PriorityIs(TaskPriority),
    CategoryIs(String),
    /// Case-insensitive substring match against title OR description.
    TextContains(String),
    DueOnOrAfter(DateTime<Utc>),
    DueOnOrBefore(DateTime<Utc>),
}

impl Predicate {
    /// Render this predicate, binding its value into `sql`.
    fn render(&self, sql: &mut SqlParams) -> String {
        match self {
            Predicate::OwnerIs(owner_id) => format!("t.owner_id = {}", sql.bind(*owner_id)),
            Predicate::NotDeleted => "t.is_deleted = 0".to_string(),
            Predicate::StatusIs(status) => {
                format!("t.status = {}", sql.bind(status.as_str().to_string()))
            }
            Predicate::PriorityIs(priority) => {
                format!("t.priority = {}", sql.bind(priority.as_str().to_string()))
            }
            Predicate::CategoryIs(category) => {
                format!("t.category = {}", sql.bind(category.clone()))
            }
            Predicate::TextContains(term) => {
                let p = sql.bind(fold_case(term));
                format!(
                    "(instr({FOLD_CASE_FN}(t.title), {p}) > 0 OR instr({FOLD_CASE_FN}(t.description), {p}) > 0)"
                )
            }
            Predicate::DueOnOrAfter(from) => {
                format!("t.due_date >= {}", sql.bind(from.timestamp_millis()))
            }
            Predicate::DueOnOrBefore(to) => {
                format!("t.due_date <= {}", sql.bind(to.timestamp_millis()))
            }
        }
    }

    /// Evaluate this predicate against an already-loaded task.
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Predicate::OwnerIs(owner_id) => task.owner_id == *owner_id,
            Predicate::NotDeleted => !task.is_deleted,
            Predicate::StatusIs(status) => task.status == status.as_str(),
            Predicate::PriorityIs(priority) => task.priority == priority.as_str(),
            Predicate::CategoryIs(category) => task.category == *category,
            Predicate::TextContains(term) => {
                let term = fold_case(term);
                fold_case(&task.title).contains(&term)
                    || fold_case(&task.description).contains(&term)
            }
            Predicate::DueOnOrAfter(from) => task.due_date >= *from,
            Predicate::DueOnOrBefore(to) => task.due_date <= *to,
        }
    }
}

/// Name of the SQL function that applies [`fold_case`] to a column. It is
/// registered on every connection by `Database`.
pub const FOLD_CASE_FN: &str = "fold_case";

/// Case folding shared by the SQL search and [`Predicate::matches`].
/// SQLite's own `LOWER` only folds ASCII, so neither side uses it.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

/// Accumulates bound parameters and hands out numbered placeholders.
#[derive(Debug, Default)]
pub struct SqlParams {
    values: Vec<Value>,
}

impl SqlParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value and return its placeholder (`?1`, `?2`, ...).
    pub fn bind(&mut self, value: impl Into<Value>) -> String {
        self.values.push(value.into());
        format!("?{}", self.values.len())
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// A conjunction of predicates scoped to one owner's live tasks.
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateSet {
    owner_id: i64,
    predicates: Vec<Predicate>,
}

impl PredicateSet {
    /// Start a set with the mandatory owner and not-deleted predicates.
    pub fn for_owner(owner_id: i64) -> Self {
        Self {
            owner_id,
            predicates: vec![Predicate::OwnerIs(owner_id), Predicate::NotDeleted],
        }
    }

    /// Append a predicate. Owner predicates for another owner are ignored,
    /// so a set can never widen or switch its owner scope.
    pub fn push(&mut self, predicate: Predicate) {
        match predicate {
            Predicate::OwnerIs(_) | Predicate::NotDeleted => {}
            other => self.predicates.push(other),
        }
    }

    pub fn with(mut self, predicate: Predicate) -> Self {
        self.push(predicate);
        self
    }

    pub fn owner_id(&self) -> i64 {
        self.owner_id
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Render the set as an AND-joined WHERE body.
    pub fn to_where_clause(&self, sql: &mut SqlParams) -> String {
        self.predicates
            .iter()
            .map(|p| p.render(sql))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// True when the task satisfies every predicate in the set.
    pub fn matches(&self, task: &Task) -> bool {
        self.predicates.iter().all(|p| p.matches(task))
    }
}

/// Ordering for a page query. Ties on the sort key are broken by task id in
/// the same direction so that pages never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderBy {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    pub fn to_sql(&self) -> String {
        let dir = self.direction.as_sql();
        format!("{} {}, t.id {}", sort_expression(self.key), dir, dir)
    }
}

fn sort_expression(key: SortKey) -> String {
    match key {
        SortKey::CreatedAt => "t.created_at".to_string(),
        SortKey::DueDate => "t.due_date".to_string(),
        SortKey::Priority => {
            let arms: String = TaskPriority::ALL
                .iter()
                .map(|p| format!(" WHEN '{}' THEN {}", p.as_str(), p.rank()))
                .collect();
            format!("(CASE t.priority{} ELSE -1 END)", arms)
        }
    }
}
