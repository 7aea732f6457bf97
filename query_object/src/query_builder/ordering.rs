//! Sort keys
//!
//! Sort keys keep insertion order; the first key decides and later keys only
//! break ties.

use crate::errors::{QueryError, QueryResult};
use serde_json::{Map, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Wire direction: 1 ascending, -1 descending
    pub fn direction(&self) -> i64 {
        match self {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        }
    }

    pub fn from_direction(value: &Value) -> QueryResult<Self> {
        match value.as_f64() {
            Some(direction) if direction > 0.0 => Ok(SortOrder::Asc),
            Some(direction) if direction < 0.0 => Ok(SortOrder::Desc),
            _ => Err(QueryError::invalid_type(
                "sort direction must be 1 or -1",
                value.to_string(),
            )),
        }
    }

    pub fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Ordered field to direction map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortKeys {
    keys: Vec<(String, SortOrder)>,
}

impl SortKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a key, or overwrite its direction in place if already present
    pub fn set(&mut self, field: &str, order: SortOrder) {
        match self.keys.iter_mut().find(|(name, _)| name == field) {
            Some((_, existing)) => *existing = order,
            None => self.keys.push((field.to_string(), order)),
        }
    }

    pub fn get(&self, field: &str) -> Option<SortOrder> {
        self.keys
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, order)| *order)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, SortOrder)> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn to_map(&self) -> Map<String, Value> {
        self.keys
            .iter()
            .map(|(field, order)| (field.clone(), Value::from(order.direction())))
            .collect()
    }

    /// Parse a plain `{field: 1 | -1}` mapping; `null` yields no keys
    pub fn from_value(value: &Value) -> QueryResult<Self> {
        let map = match value {
            Value::Null => return Ok(Self::new()),
            Value::Object(map) => map,
            other => {
                return Err(QueryError::invalid_type(
                    "sort must be an object",
                    other.to_string(),
                ))
            }
        };

        let mut keys = Self::new();
        for (field, direction) in map {
            keys.set(field, SortOrder::from_direction(direction)?);
        }
        Ok(keys)
    }
}

impl<S: Into<String>> FromIterator<(S, SortOrder)> for SortKeys {
    fn from_iter<I: IntoIterator<Item = (S, SortOrder)>>(iter: I) -> Self {
        let mut keys = SortKeys::new();
        for (field, order) in iter {
            keys.set(&field.into(), order);
        }
        keys
    }
}
