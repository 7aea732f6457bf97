//! # DocQuery
//!
//! Fluent query descriptions for document stores. A query built here can be
//! handed to a remote backend as query-string parameters or evaluated
//! locally against records already in memory, with the same results.
//!
//! ## Quick Start
//!
//! ```rust
//! use docquery::prelude::*;
//!
//! let engine = QueryEngine::new(AppConfig::default())?;
//!
//! let query = engine.query();
//! query.greater_than("age", 18)?.or().equal_to("role", "admin");
//! query.descending("age").set_fields(["name"]);
//!
//! let records = vec![
//!     json!({ "_id": 1, "name": "Ann", "age": 34, "role": "user" }),
//!     json!({ "_id": 2, "name": "Bob", "age": 12, "role": "admin" }),
//!     json!({ "_id": 3, "name": "Cid", "age": 9, "role": "user" }),
//! ];
//!
//! let result = engine.process(&query, &records)?;
//! assert_eq!(
//!     result,
//!     vec![json!({ "_id": 1, "name": "Ann" }), json!({ "_id": 2, "name": "Bob" })]
//! );
//!
//! let params = engine.query_string(&query);
//! assert_eq!(params["fields"], "name");
//! assert_eq!(params["sort"], r#"{"age":-1}"#);
//! # Ok::<(), DocQueryError>(())
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

pub mod core;
pub mod errors;
pub mod prelude;

// Re-export the main public types for convenience
pub use crate::core::QueryEngine;
pub use crate::errors::DocQueryError;

// Re-export centralized config
pub use config::{AppConfig, ProcessorConfig};

// Re-export the query crate and its JSON value type
pub use query_object;
pub use serde_json;
