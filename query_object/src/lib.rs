//! Query Object - query description and evaluation engine for DocQuery
//!
//! A [`Query`] accumulates filter, sort, projection and pagination criteria
//! into one description. The same description is either serialized for a
//! remote document store or evaluated locally against records already in
//! memory, and both paths read the identical filter tree.
//!
//! ```rust
//! use query_object::Query;
//! use serde_json::json;
//!
//! let query = Query::new();
//! query.greater_than("age", 30)?.ascending("name");
//!
//! let records = vec![
//!     json!({ "name": "Bo", "age": 41 }),
//!     json!({ "name": "Al", "age": 22 }),
//! ];
//! let adults = query.process(&records)?;
//! assert_eq!(adults, vec![json!({ "name": "Bo", "age": 41 })]);
//! assert_eq!(query.to_query_string()["query"], r#"{"age":{"$gt":30}}"#);
//! # Ok::<(), query_object::QueryError>(())
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod errors;
pub mod prelude;
pub mod query_builder;

pub use config::ProcessorConfig;
pub use errors::{ErrorKind, QueryError, QueryResult};
pub use query_builder::{
    Combinator, FilterCondition, FilterTree, Literal, MatchOptions, Pattern, PlainQuery, Query,
    QueryOperator, SortKeys, SortOrder, SubQuery,
};
