//! Task selection: filter specifications, predicates, and the query builder.

pub mod builder;
pub mod filter;
pub mod predicate;

pub use builder::QueryBuilder;
pub use filter::{FilterRequest, FilterSpec, SortDirection, SortKey};
pub use predicate::{OrderBy, Predicate, PredicateSet, SqlParams};
