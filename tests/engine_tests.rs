//! Integration tests for the query, statistics and lifecycle engine.
//!
//! These run against an in-memory database through the same store handle
//! the HTTP layer uses.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use task_manager_api::config::PagingConfig;
use task_manager_api::db::Database;
use task_manager_api::error::ErrorCode;
use task_manager_api::lifecycle::TaskLifecycle;
use task_manager_api::query::builder::build_predicates;
use task_manager_api::query::{FilterRequest, FilterSpec, QueryBuilder};
use task_manager_api::stats::StatsAggregator;
use task_manager_api::store::TaskStore;
use task_manager_api::types::{Task, TaskInput};

struct Engine {
    db: Database,
    queries: QueryBuilder,
    stats: StatsAggregator,
    lifecycle: TaskLifecycle,
}

/// Helper to create a fresh engine over an in-memory database.
fn setup() -> Engine {
    let db = Database::open_in_memory().expect("Failed to create in-memory database");
    let store: Arc<dyn TaskStore> = Arc::new(db.clone());
    Engine {
        queries: QueryBuilder::new(store.clone(), PagingConfig::default()),
        stats: StatsAggregator::new(store.clone()),
        lifecycle: TaskLifecycle::new(store),
        db,
    }
}

fn user(engine: &Engine, name: &str) -> i64 {
    engine.db.insert_user(name, "", "hash", "salt").unwrap().id
}

fn input(title: &str, due: DateTime<Utc>) -> TaskInput {
    TaskInput {
        title: Some(title.to_string()),
        due_date: Some(due),
        ..Default::default()
    }
}

fn full_input(
    title: &str,
    due: DateTime<Utc>,
    status: &str,
    priority: &str,
    category: &str,
) -> TaskInput {
    TaskInput {
        title: Some(title.to_string()),
        description: Some(format!("{} details", title)),
        status: Some(status.to_string()),
        priority: Some(priority.to_string()),
        category: Some(category.to_string()),
        due_date: Some(due),
    }
}

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, d, 12, 0, 0).unwrap()
}

fn ids(tasks: &[Task]) -> Vec<i64> {
    tasks.iter().map(|t| t.id).collect()
}

mod ownership_tests {
    use super::*;

    #[test]
    fn other_owner_never_sees_tasks() {
        let engine = setup();
        let alice = user(&engine, "alice");
        let bob = user(&engine, "bob");

        let task = engine.lifecycle.create(alice, input("alice only", day(1))).unwrap();
        engine.lifecycle.create(bob, input("bob only", day(1))).unwrap();

        let bob_list = engine.queries.list_all(bob).unwrap();
        assert!(!ids(&bob_list).contains(&task.id));

        let bob_filtered = engine
            .queries
            .filter(bob, &FilterRequest::default())
            .unwrap();
        assert_eq!(bob_filtered.total_count, 1);
        assert!(!ids(&bob_filtered.tasks).contains(&task.id));

        assert_eq!(engine.stats.stats(bob).unwrap().total_tasks, 1);
    }

    #[test]
    fn foreign_update_and_delete_are_not_found() {
        let engine = setup();
        let alice = user(&engine, "alice");
        let bob = user(&engine, "bob");
        let task = engine.lifecycle.create(alice, input("mine", day(1))).unwrap();

        let err = engine
            .lifecycle
            .update(bob, task.id, input("hijacked", day(2)))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TaskNotFound);

        let err = engine.lifecycle.soft_delete(bob, task.id).unwrap_err();
        assert_eq!(err.code, ErrorCode::TaskNotFound);

        let still = engine.queries.list_all(alice).unwrap();
        assert_eq!(still[0].title, "mine");
    }

    #[test]
    fn absent_id_is_not_found() {
        let engine = setup();
        let alice = user(&engine, "alice");
        let err = engine.lifecycle.soft_delete(alice, 9999).unwrap_err();
        assert_eq!(err.code, ErrorCode::TaskNotFound);
    }
}

mod soft_delete_tests {
    use super::*;

    #[test]
    fn deleted_task_disappears_from_every_read() {
        let engine = setup();
        let owner = user(&engine, "carol");
        let keep = engine.lifecycle.create(owner, input("keep", day(1))).unwrap();
        let gone = engine.lifecycle.create(owner, input("gone", day(1))).unwrap();

        engine.lifecycle.soft_delete(owner, gone.id).unwrap();

        assert_eq!(ids(&engine.queries.list_all(owner).unwrap()), vec![keep.id]);
        let page = engine.queries.filter(owner, &FilterRequest::default()).unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(ids(&page.tasks), vec![keep.id]);
        assert_eq!(engine.stats.stats(owner).unwrap().total_tasks, 1);
    }

    #[test]
    fn deleting_twice_is_a_no_op() {
        let engine = setup();
        let owner = user(&engine, "carol");
        let task = engine.lifecycle.create(owner, input("twice", day(1))).unwrap();

        engine.lifecycle.soft_delete(owner, task.id).unwrap();
        engine.lifecycle.soft_delete(owner, task.id).unwrap();

        let row = engine.db.find_owned(owner, task.id).unwrap().unwrap();
        assert!(row.is_deleted);
    }

    #[test]
    fn deleted_task_cannot_be_updated() {
        let engine = setup();
        let owner = user(&engine, "carol");
        let task = engine.lifecycle.create(owner, input("old", day(1))).unwrap();
        engine.lifecycle.soft_delete(owner, task.id).unwrap();

        let err = engine
            .lifecycle
            .update(owner, task.id, input("new", day(2)))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TaskNotFound);
    }
}

mod pagination_tests {
    use super::*;

    #[test]
    fn pages_partition_the_result_set() {
        let engine = setup();
        let owner = user(&engine, "dave");
        for i in 0..23 {
            // Only three distinct due dates, so most sort keys tie.
            engine
                .lifecycle
                .create(owner, input(&format!("task {i}"), day(1 + (i % 3) as u32)))
                .unwrap();
        }

        for sort_by in ["CreatedAt", "DueDate", "Priority"] {
            let first = engine
                .queries
                .filter(
                    owner,
                    &FilterRequest {
                        sort_by: Some(sort_by.to_string()),
                        page_size: Some(5),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert_eq!(first.total_count, 23);
            assert_eq!(first.total_pages, 5);

            let mut seen = HashSet::new();
            let mut returned = 0;
            for page in 1..=first.total_pages {
                let result = engine
                    .queries
                    .filter(
                        owner,
                        &FilterRequest {
                            sort_by: Some(sort_by.to_string()),
                            page: Some(page),
                            page_size: Some(5),
                            ..Default::default()
                        },
                    )
                    .unwrap();
                returned += result.tasks.len() as i64;
                for task in result.tasks {
                    assert!(seen.insert(task.id), "task {} on two pages", task.id);
                }
            }
            assert_eq!(returned, first.total_count);
        }
    }

    #[test]
    fn page_past_the_end_is_empty_but_counted() {
        let engine = setup();
        let owner = user(&engine, "dave");
        engine.lifecycle.create(owner, input("only", day(1))).unwrap();

        let result = engine
            .queries
            .filter(
                owner,
                &FilterRequest {
                    page: Some(4),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(result.tasks.is_empty());
        assert_eq!(result.total_count, 1);
        assert_eq!(result.total_pages, 1);
    }

    #[test]
    fn no_matches_means_zero_pages() {
        let engine = setup();
        let owner = user(&engine, "dave");
        let result = engine.queries.filter(owner, &FilterRequest::default()).unwrap();
        assert_eq!(result.total_count, 0);
        assert_eq!(result.total_pages, 0);
    }

    #[test]
    fn invalid_page_is_rejected_before_the_store() {
        let engine = setup();
        let owner = user(&engine, "dave");
        let err = engine
            .queries
            .filter(
                owner,
                &FilterRequest {
                    page: Some(0),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(err.code.is_validation());
    }
}

mod filter_tests {
    use super::*;

    fn seed(engine: &Engine, owner: i64) {
        let rows = [
            ("Write report", 1, "Pending", "High", "Work"),
            ("Review report", 2, "In Progress", "High", "Work"),
            ("Buy groceries", 3, "Pending", "Low", "Home"),
            ("File taxes", 4, "Completed", "Critical", "Home"),
            ("Plan trip", 5, "Pending", "Medium", "Travel"),
            ("Report bug", 6, "Pending", "High", "Home"),
        ];
        for (title, d, status, priority, category) in rows {
            engine
                .lifecycle
                .create(owner, full_input(title, day(d), status, priority, category))
                .unwrap();
        }
    }

    /// Filtered result must equal the brute-force evaluation of every
    /// predicate against the full list.
    fn assert_conjunction(engine: &Engine, owner: i64, request: FilterRequest) {
        let spec = FilterSpec::from_request(&request, &PagingConfig::default()).unwrap();
        let predicates = build_predicates(owner, &spec);

        let mut expected: Vec<i64> = engine
            .queries
            .list_all(owner)
            .unwrap()
            .iter()
            .filter(|t| predicates.matches(t))
            .map(|t| t.id)
            .collect();
        expected.sort();

        let result = engine
            .queries
            .filter(
                owner,
                &FilterRequest {
                    page_size: Some(100),
                    ..request
                },
            )
            .unwrap();
        let mut actual = ids(&result.tasks);
        actual.sort();

        assert_eq!(actual, expected);
        assert_eq!(result.total_count, expected.len() as i64);
    }

    #[test]
    fn every_supplied_field_must_match() {
        let engine = setup();
        let owner = user(&engine, "erin");
        seed(&engine, owner);

        assert_conjunction(
            &engine,
            owner,
            FilterRequest {
                status: Some("Pending".to_string()),
                priority: Some("High".to_string()),
                ..Default::default()
            },
        );
        assert_conjunction(
            &engine,
            owner,
            FilterRequest {
                category: Some("Home".to_string()),
                search_term: Some("report".to_string()),
                ..Default::default()
            },
        );
        assert_conjunction(
            &engine,
            owner,
            FilterRequest {
                status: Some("Pending".to_string()),
                from_date: Some(day(2)),
                to_date: Some(day(5)),
                ..Default::default()
            },
        );
    }

    #[test]
    fn status_and_priority_narrow_together() {
        let engine = setup();
        let owner = user(&engine, "erin");
        seed(&engine, owner);

        let result = engine
            .queries
            .filter(
                owner,
                &FilterRequest {
                    status: Some("Pending".to_string()),
                    priority: Some("High".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        let titles: HashSet<_> = result.tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, HashSet::from(["Write report", "Report bug"]));
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_description() {
        let engine = setup();
        let owner = user(&engine, "erin");
        engine
            .lifecycle
            .create(
                owner,
                TaskInput {
                    description: Some("Quarterly REPORT draft".to_string()),
                    ..input("Untitled", day(1))
                },
            )
            .unwrap();
        engine.lifecycle.create(owner, input("Other", day(1))).unwrap();

        let result = engine
            .queries
            .filter(
                owner,
                &FilterRequest {
                    search_term: Some("report".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(result.total_count, 1);
        assert_eq!(result.tasks[0].title, "Untitled");
    }

    #[test]
    fn search_folds_case_beyond_ascii() {
        let engine = setup();
        let owner = user(&engine, "erin");
        engine
            .lifecycle
            .create(
                owner,
                TaskInput {
                    description: Some("Notes pour l'ÉTÉ".to_string()),
                    ..input("Résumé", day(1))
                },
            )
            .unwrap();
        engine
            .lifecycle
            .create(owner, full_input("Straße fegen", day(2), "Pending", "Low", "Home"))
            .unwrap();
        engine.lifecycle.create(owner, input("Plain ascii", day(3))).unwrap();

        for term in ["été", "ÉTÉ", "résumé", "RÉSUMÉ"] {
            let result = engine
                .queries
                .filter(
                    owner,
                    &FilterRequest {
                        search_term: Some(term.to_string()),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert_eq!(result.total_count, 1, "search {term}");
            assert_eq!(result.tasks[0].title, "Résumé");
        }

        for term in ["ÉtÉ", "STRASSE", "straße", "ASCII"] {
            assert_conjunction(
                &engine,
                owner,
                FilterRequest {
                    search_term: Some(term.to_string()),
                    ..Default::default()
                },
            );
        }
    }

    #[test]
    fn search_wildcards_match_literally() {
        let engine = setup();
        let owner = user(&engine, "erin");
        engine.lifecycle.create(owner, input("50% done", day(1))).unwrap();
        engine.lifecycle.create(owner, input("500 items", day(1))).unwrap();

        let result = engine
            .queries
            .filter(
                owner,
                &FilterRequest {
                    search_term: Some("50%".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(result.total_count, 1);
        assert_eq!(result.tasks[0].title, "50% done");
    }

    #[test]
    fn date_range_is_inclusive() {
        let engine = setup();
        let owner = user(&engine, "erin");
        seed(&engine, owner);

        let result = engine
            .queries
            .filter(
                owner,
                &FilterRequest {
                    from_date: Some(day(2)),
                    to_date: Some(day(4)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(result.total_count, 3);
    }

    #[test]
    fn priority_sort_uses_urgency_not_alphabet() {
        let engine = setup();
        let owner = user(&engine, "erin");
        seed(&engine, owner);

        let result = engine
            .queries
            .filter(
                owner,
                &FilterRequest {
                    sort_by: Some("Priority".to_string()),
                    sort_order: Some("DESC".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        let priorities: Vec<_> = result.tasks.iter().map(|t| t.priority.as_str()).collect();
        assert_eq!(
            priorities,
            vec!["Critical", "High", "High", "High", "Medium", "Low"]
        );
    }

    #[test]
    fn pending_by_due_date_ascending() {
        let engine = setup();
        let owner = user(&engine, "frank");
        for d in [3, 1, 2] {
            engine
                .lifecycle
                .create(owner, full_input(&format!("due {d}"), day(d), "Pending", "Medium", "General"))
                .unwrap();
        }

        let result = engine
            .queries
            .filter(
                owner,
                &FilterRequest {
                    status: Some("Pending".to_string()),
                    sort_by: Some("DueDate".to_string()),
                    sort_order: Some("ASC".to_string()),
                    page: Some(1),
                    page_size: Some(10),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(result.total_count, 3);
        let due: Vec<_> = result.tasks.iter().map(|t| t.due_date).collect();
        assert_eq!(due, vec![day(1), day(2), day(3)]);
    }

    #[test]
    fn unknown_sort_key_still_lists() {
        let engine = setup();
        let owner = user(&engine, "frank");
        seed(&engine, owner);

        let result = engine
            .queries
            .filter(
                owner,
                &FilterRequest {
                    sort_by: Some("title DESC; --".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(result.total_count, 6);
    }
}

mod lifecycle_tests {
    use super::*;

    #[test]
    fn create_applies_defaults_and_stamps_created_at() {
        let engine = setup();
        let owner = user(&engine, "gina");
        let before = Utc::now() - Duration::seconds(1);

        let task = engine.lifecycle.create(owner, input("defaults", day(1))).unwrap();

        assert_eq!(task.owner_id, owner);
        assert_eq!(task.status, "Pending");
        assert_eq!(task.priority, "Medium");
        assert_eq!(task.category, "General");
        assert!(task.created_at >= before);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn completion_timestamp_follows_status() {
        let engine = setup();
        let owner = user(&engine, "gina");
        let task = engine.lifecycle.create(owner, input("finish me", day(1))).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 9, 30, 0).unwrap();

        let done = engine
            .lifecycle
            .update_at(owner, task.id, full_input("finish me", day(1), "Completed", "Low", "General"), now)
            .unwrap();
        assert_eq!(done.completed_at, Some(now));

        let reopened = engine
            .lifecycle
            .update(owner, task.id, full_input("finish me", day(1), "In Progress", "Low", "General"))
            .unwrap();
        assert!(reopened.completed_at.is_none());
        assert_eq!(reopened.status, "In Progress");
    }

    #[test]
    fn update_replaces_every_mutable_field() {
        let engine = setup();
        let owner = user(&engine, "gina");
        let task = engine
            .lifecycle
            .create(owner, full_input("before", day(1), "Pending", "Low", "Home"))
            .unwrap();

        let updated = engine
            .lifecycle
            .update(owner, task.id, input("after", day(9)))
            .unwrap();

        assert_eq!(updated.title, "after");
        assert_eq!(updated.description, "");
        assert_eq!(updated.priority, "Medium");
        assert_eq!(updated.category, "General");
        assert_eq!(updated.due_date, day(9));
        assert_eq!(updated.created_at, task.created_at);
    }

    #[test]
    fn invalid_input_never_reaches_the_store() {
        let engine = setup();
        let owner = user(&engine, "gina");
        let err = engine
            .lifecycle
            .create(
                owner,
                TaskInput {
                    title: Some("no due date".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingRequiredField);
        assert!(engine.queries.list_all(owner).unwrap().is_empty());
    }
}

mod stats_tests {
    use super::*;

    #[test]
    fn overdue_and_high_priority_scenario() {
        let engine = setup();
        let owner = user(&engine, "hana");
        let now = Utc::now();

        engine
            .lifecycle
            .create(owner, full_input("A", now - Duration::days(1), "Pending", "High", "General"))
            .unwrap();
        engine
            .lifecycle
            .create(owner, full_input("B", now + Duration::days(1), "Completed", "Low", "General"))
            .unwrap();

        let stats = engine.stats.stats_at(owner, now).unwrap();
        assert_eq!(stats.total_tasks, 2);
        assert_eq!(stats.pending_tasks, 1);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.in_progress_tasks, 0);
        assert_eq!(stats.overdue_tasks, 1);
        assert_eq!(stats.high_priority_tasks, 1);
    }

    #[test]
    fn completed_past_due_is_not_overdue() {
        let engine = setup();
        let owner = user(&engine, "hana");
        let now = Utc::now();
        engine
            .lifecycle
            .create(owner, full_input("late but done", now - Duration::days(3), "Completed", "Critical", "General"))
            .unwrap();

        let stats = engine.stats.stats_at(owner, now).unwrap();
        assert_eq!(stats.overdue_tasks, 0);
        assert_eq!(stats.high_priority_tasks, 1);
    }

    #[test]
    fn unknown_status_counts_toward_total_only() {
        let engine = setup();
        let owner = user(&engine, "ivan");
        engine.lifecycle.create(owner, input("known", day(1))).unwrap();

        engine
            .db
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO tasks (owner_id, title, status, priority, category, due_date, created_at)
                     VALUES (?1, 'legacy', 'Blocked', 'Medium', 'General', 0, 0)",
                    [owner],
                )?;
                Ok(())
            })
            .unwrap();

        let stats = engine.stats.stats(owner).unwrap();
        assert_eq!(stats.total_tasks, 2);
        let buckets = stats.pending_tasks + stats.in_progress_tasks + stats.completed_tasks;
        assert_eq!(buckets, 1);
        assert!(buckets <= stats.total_tasks);
    }

    #[test]
    fn buckets_partition_total_for_known_statuses() {
        let engine = setup();
        let owner = user(&engine, "ivan");
        for (i, status) in ["Pending", "In Progress", "Completed", "Pending"].iter().enumerate() {
            engine
                .lifecycle
                .create(owner, full_input(&format!("t{i}"), day(1), status, "Low", "General"))
                .unwrap();
        }

        let stats = engine.stats.stats(owner).unwrap();
        assert_eq!(
            stats.pending_tasks + stats.in_progress_tasks + stats.completed_tasks,
            stats.total_tasks
        );
        assert_eq!(stats.pending_tasks, 2);
    }
}
