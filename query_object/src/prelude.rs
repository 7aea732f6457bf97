//! Convenience re-exports for common query-object usage

// Query building and evaluation
pub use crate::query_builder::{MatchOptions, Pattern, PlainQuery, Query, SortOrder, SubQuery};

// Filter tree
pub use crate::query_builder::{Combinator, FilterCondition, FilterTree, Literal, QueryOperator};

// Error types
pub use crate::errors::{ErrorKind, QueryError, QueryResult};

// Processor settings
pub use config::ProcessorConfig;

// Records and operands are plain JSON values
pub use serde_json::{json, Value};
