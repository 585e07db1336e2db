//! Task store primitives.

use super::{Database, from_ms, to_ms};
use crate::query::{OrderBy, PredicateSet, SqlParams};
use crate::store::TaskStore;
use crate::types::{Task, TaskFields, TaskPriority, TaskStats, TaskStatus};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params, params_from_iter};

const TASK_COLUMNS: &str = "t.id, t.owner_id, t.title, t.description, t.status, t.priority, \
     t.category, t.due_date, t.created_at, t.completed_at, t.is_deleted";

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let completed_at: Option<i64> = row.get("completed_at")?;
    Ok(Task {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        title: row.get("title")?,
        description: row.get::<_, Option<String>>("description")?.unwrap_or_default(),
        status: row.get("status")?,
        priority: row.get("priority")?,
        category: row.get("category")?,
        due_date: from_ms(row.get("due_date")?),
        created_at: from_ms(row.get("created_at")?),
        completed_at: completed_at.map(from_ms),
        is_deleted: row.get::<_, i64>("is_deleted")? != 0,
    })
}

impl TaskStore for Database {
    fn insert(&self, owner_id: i64, fields: &TaskFields, created_at: DateTime<Utc>) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (owner_id, title, description, status, priority, category,
                                    due_date, created_at, completed_at, is_deleted)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, 0)",
                params![
                    owner_id,
                    fields.title,
                    fields.description,
                    fields.status.as_str(),
                    fields.priority.as_str(),
                    fields.category,
                    to_ms(&fields.due_date),
                    to_ms(&created_at),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn find_owned(&self, owner_id: i64, id: i64) -> Result<Option<Task>> {
        self.with_conn(|conn| {
            let task = conn
                .query_row(
                    &format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = ?1 AND t.owner_id = ?2"),
                    params![id, owner_id],
                    parse_task_row,
                )
                .optional()?;
            Ok(task)
        })
    }

    fn update_where_id(
        &self,
        id: i64,
        fields: &TaskFields,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE tasks
                 SET title = ?1, description = ?2, status = ?3, priority = ?4,
                     category = ?5, due_date = ?6, completed_at = ?7
                 WHERE id = ?8",
                params![
                    fields.title,
                    fields.description,
                    fields.status.as_str(),
                    fields.priority.as_str(),
                    fields.category,
                    to_ms(&fields.due_date),
                    completed_at.as_ref().map(to_ms),
                    id,
                ],
            )?;
            Ok(changed)
        })
    }

    fn set_deleted_flag(&self, id: i64, deleted: bool) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE tasks SET is_deleted = ?1 WHERE id = ?2",
                params![deleted, id],
            )?;
            Ok(changed)
        })
    }

    fn select_page(
        &self,
        predicates: &PredicateSet,
        order: &OrderBy,
        offset: i64,
        limit: Option<i64>,
    ) -> Result<Vec<Task>> {
        let mut sql = SqlParams::new();
        let where_clause = predicates.to_where_clause(&mut sql);
        // SQLite treats a negative LIMIT as "no limit".
        let limit = sql.bind(limit.unwrap_or(-1));
        let offset = sql.bind(offset);
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks t WHERE {where_clause} ORDER BY {} LIMIT {limit} OFFSET {offset}",
            order.to_sql()
        );

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&query)?;
            let tasks = stmt
                .query_map(params_from_iter(sql.values()), parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }

    fn count_where(&self, predicates: &PredicateSet) -> Result<i64> {
        let mut sql = SqlParams::new();
        let where_clause = predicates.to_where_clause(&mut sql);
        let query = format!("SELECT COUNT(*) FROM tasks t WHERE {where_clause}");

        self.with_conn(|conn| {
            let total = conn.query_row(&query, params_from_iter(sql.values()), |row| row.get(0))?;
            Ok(total)
        })
    }

    fn aggregate_counts_where(
        &self,
        predicates: &PredicateSet,
        now: DateTime<Utc>,
    ) -> Result<TaskStats> {
        let mut sql = SqlParams::new();
        let where_clause = predicates.to_where_clause(&mut sql);
        let completed = sql.bind(TaskStatus::Completed.as_str().to_string());
        let pending = sql.bind(TaskStatus::Pending.as_str().to_string());
        let in_progress = sql.bind(TaskStatus::InProgress.as_str().to_string());
        let now = sql.bind(to_ms(&now));
        let high = TaskPriority::ALL
            .iter()
            .filter(|p| p.is_high())
            .map(|p| sql.bind(p.as_str().to_string()))
            .collect::<Vec<_>>()
            .join(", ");

        let query = format!(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN t.status = {completed} THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN t.status = {pending} THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN t.status = {in_progress} THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN t.due_date < {now} AND t.status <> {completed} THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN t.priority IN ({high}) THEN 1 ELSE 0 END), 0)
             FROM tasks t
             WHERE {where_clause}"
        );

        self.with_conn(|conn| {
            let stats = conn.query_row(&query, params_from_iter(sql.values()), |row| {
                Ok(TaskStats {
                    total_tasks: row.get(0)?,
                    completed_tasks: row.get(1)?,
                    pending_tasks: row.get(2)?,
                    in_progress_tasks: row.get(3)?,
                    overdue_tasks: row.get(4)?,
                    high_priority_tasks: row.get(5)?,
                })
            })?;
            Ok(stats)
        })
    }
}
