//! Query serialization
//!
//! Renders the root query state either as a plain object or as the
//! string-keyed map a transport merges into its request parameters.

use crate::query_builder::builder::Query;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Canonical `{fields, filter, sort, skip, limit}` form of a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlainQuery {
    pub fields: Vec<String>,
    pub filter: Value,
    pub sort: Map<String, Value>,
    pub skip: u64,
    pub limit: Option<u64>,
}

pub struct QuerySerializer;

impl QuerySerializer {
    /// Plain object read from the root of the query graph
    pub fn plain_object(query: &Query) -> PlainQuery {
        let root = query.root();
        let pagination = root.pagination();
        PlainQuery {
            fields: root.fields(),
            filter: root.filter_value(),
            sort: root.sort().to_map(),
            skip: pagination.skip,
            limit: pagination.limit,
        }
    }

    /// Query-string parameters; only non-empty, non-default entries appear
    ///
    /// `limit` and `skip` are rendered as decimal strings.
    pub fn query_string(query: &Query) -> BTreeMap<String, String> {
        let plain = Self::plain_object(query);
        let mut params = BTreeMap::new();

        if plain.filter.as_object().is_some_and(|filter| !filter.is_empty()) {
            params.insert("query".to_string(), plain.filter.to_string());
        }
        if !plain.fields.is_empty() {
            params.insert("fields".to_string(), plain.fields.join(","));
        }
        if let Some(limit) = plain.limit {
            params.insert("limit".to_string(), limit.to_string());
        }
        if plain.skip > 0 {
            params.insert("skip".to_string(), plain.skip.to_string());
        }
        if !plain.sort.is_empty() {
            params.insert("sort".to_string(), Value::Object(plain.sort).to_string());
        }

        params
    }
}

impl Query {
    pub fn to_plain_object(&self) -> PlainQuery {
        QuerySerializer::plain_object(self)
    }

    pub fn to_query_string(&self) -> BTreeMap<String, String> {
        QuerySerializer::query_string(self)
    }
}

/// JSON encoding of [`Query::to_query_string`]
impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Map<String, Value> = self
            .to_query_string()
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();
        write!(f, "{}", Value::Object(params))
    }
}
