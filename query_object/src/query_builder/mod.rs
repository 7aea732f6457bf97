//! Query builder utilities
//!
//! This module builds query descriptions, joins them, serializes them for a
//! remote store and evaluates them against in-memory records.

pub mod builder;
pub mod conditions;
pub mod filter;
pub mod join;
pub mod ordering;
pub mod pagination;
pub mod pattern;
pub mod processor;
pub mod serialization;

#[cfg(test)]
mod tests;


pub use builder::Query;
pub use filter::{
    Combinator, FilterCondition, FilterEntry, FilterTree, Literal, OperatorMap, QueryOperator,
    SharedFilter,
};
pub use join::SubQuery;
pub use ordering::{SortKeys, SortOrder};
pub use pagination::Pagination;
pub use pattern::{MatchOptions, Pattern};
pub use processor::{lookup, values_equal};
pub use serialization::{PlainQuery, QuerySerializer};
