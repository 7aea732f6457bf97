//! Filter tree
//!
//! A filter maps field names to conditions and combinator keys to ordered
//! operand lists. Operands are shared handles so that a sub-query created by
//! a join keeps writing into the exact node its parent serializes.

use crate::errors::{QueryError, QueryResult};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// Handle to a filter node that may be referenced from a parent tree
pub type SharedFilter = Rc<RefCell<FilterTree>>;

/// Field condition operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryOperator {
    Eq,          // $eq
    Ne,          // $ne
    Gt,          // $gt
    Gte,         // $gte
    Lt,          // $lt
    Lte,         // $lte
    In,          // $in
    All,         // $all
    Nin,         // $nin
    Exists,      // $exists
    Mod,         // $mod
    Regex,       // $regex
    Options,     // $options (companion of $regex)
    NearSphere,  // $nearSphere
    MaxDistance, // $maxDistance (companion of $nearSphere)
    Within,      // $within
    Size,        // $size
}

impl QueryOperator {
    const ALL: [QueryOperator; 17] = [
        QueryOperator::Eq,
        QueryOperator::Ne,
        QueryOperator::Gt,
        QueryOperator::Gte,
        QueryOperator::Lt,
        QueryOperator::Lte,
        QueryOperator::In,
        QueryOperator::All,
        QueryOperator::Nin,
        QueryOperator::Exists,
        QueryOperator::Mod,
        QueryOperator::Regex,
        QueryOperator::Options,
        QueryOperator::NearSphere,
        QueryOperator::MaxDistance,
        QueryOperator::Within,
        QueryOperator::Size,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryOperator::Eq => "$eq",
            QueryOperator::Ne => "$ne",
            QueryOperator::Gt => "$gt",
            QueryOperator::Gte => "$gte",
            QueryOperator::Lt => "$lt",
            QueryOperator::Lte => "$lte",
            QueryOperator::In => "$in",
            QueryOperator::All => "$all",
            QueryOperator::Nin => "$nin",
            QueryOperator::Exists => "$exists",
            QueryOperator::Mod => "$mod",
            QueryOperator::Regex => "$regex",
            QueryOperator::Options => "$options",
            QueryOperator::NearSphere => "$nearSphere",
            QueryOperator::MaxDistance => "$maxDistance",
            QueryOperator::Within => "$within",
            QueryOperator::Size => "$size",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == key)
    }

    /// Operators restricted to number or string operands
    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            QueryOperator::Gt | QueryOperator::Gte | QueryOperator::Lt | QueryOperator::Lte
        )
    }
}

/// Boolean combinators joining sub-filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    And,
    Or,
    Nor,
}

impl Combinator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Combinator::And => "$and",
            Combinator::Or => "$or",
            Combinator::Nor => "$nor",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "$and" => Some(Combinator::And),
            "$or" => Some(Combinator::Or),
            "$nor" => Some(Combinator::Nor),
            _ => None,
        }
    }
}

/// Insertion-ordered operator/operand pairs for one field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperatorMap {
    entries: Vec<(QueryOperator, Value)>,
}

impl OperatorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an operand, overwriting a previous one for the same operator
    pub fn insert(&mut self, operator: QueryOperator, operand: Value) {
        match self.entries.iter_mut().find(|(op, _)| *op == operator) {
            Some((_, existing)) => *existing = operand,
            None => self.entries.push((operator, operand)),
        }
    }

    pub fn remove(&mut self, operator: QueryOperator) -> Option<Value> {
        let index = self.entries.iter().position(|(op, _)| *op == operator)?;
        Some(self.entries.remove(index).1)
    }

    pub fn get(&self, operator: QueryOperator) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(op, _)| *op == operator)
            .map(|(_, operand)| operand)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(QueryOperator, Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(op, operand)| (op.as_str().to_string(), operand.clone()))
            .collect();
        Value::Object(map)
    }
}

/// Builder operand that may carry a float JSON cannot represent
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Value(Value),
    NotANumber,
}

impl Literal {
    pub fn is_nan(&self) -> bool {
        matches!(self, Literal::NotANumber)
    }

    /// JSON form; NaN becomes `null`
    pub fn into_value(self) -> Value {
        match self {
            Literal::Value(value) => value,
            Literal::NotANumber => Value::Null,
        }
    }
}

impl From<Value> for Literal {
    fn from(value: Value) -> Self {
        Literal::Value(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Value(Value::from(value))
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Value(Value::from(value))
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Value(Value::from(value))
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        if value.is_nan() {
            Literal::NotANumber
        } else {
            Literal::Value(Value::from(value))
        }
    }
}

impl From<f32> for Literal {
    fn from(value: f32) -> Self {
        Literal::from(f64::from(value))
    }
}

macro_rules! literal_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Literal {
                fn from(value: $ty) -> Self {
                    Literal::Value(Value::from(value))
                }
            }
        )*
    };
}

literal_from_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Condition attached to a single field
#[derive(Debug, Clone, PartialEq)]
pub enum FilterCondition {
    Literal(Value),
    /// Equality with NaN; serialized as `null`, never satisfied by a record
    NotANumber,
    Operators(OperatorMap),
}

impl FilterCondition {
    pub fn to_value(&self) -> Value {
        match self {
            FilterCondition::Literal(value) => value.clone(),
            FilterCondition::NotANumber => Value::Null,
            FilterCondition::Operators(operators) => operators.to_value(),
        }
    }
}

/// One top-level key of a filter node
#[derive(Debug, Clone, PartialEq)]
pub enum FilterEntry {
    Field {
        name: String,
        condition: FilterCondition,
    },
    Group {
        combinator: Combinator,
        operands: Vec<SharedFilter>,
    },
}

/// Filter node; all entries must hold for a record to match
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterTree {
    entries: Vec<FilterEntry>,
}

impl FilterTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<FilterEntry>) -> Self {
        Self { entries }
    }

    pub fn shared(self) -> SharedFilter {
        Rc::new(RefCell::new(self))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FilterEntry] {
        &self.entries
    }

    pub fn condition(&self, field: &str) -> Option<&FilterCondition> {
        self.entries.iter().find_map(|entry| match entry {
            FilterEntry::Field { name, condition } if name == field => Some(condition),
            _ => None,
        })
    }

    pub fn has_group(&self, combinator: Combinator) -> bool {
        self.entries.iter().any(|entry| {
            matches!(entry, FilterEntry::Group { combinator: c, .. } if *c == combinator)
        })
    }

    fn field_slot(&mut self, field: &str) -> Option<&mut FilterCondition> {
        self.entries.iter_mut().find_map(|entry| match entry {
            FilterEntry::Field { name, condition } if name == field => Some(condition),
            _ => None,
        })
    }

    /// Replace whatever condition the field had with a literal
    pub fn set_literal(&mut self, field: &str, value: Value) {
        self.set_condition(field, FilterCondition::Literal(value));
    }

    pub fn set_condition(&mut self, field: &str, replacement: FilterCondition) {
        match self.field_slot(field) {
            Some(condition) => *condition = replacement,
            None => self.entries.push(FilterEntry::Field {
                name: field.to_string(),
                condition: replacement,
            }),
        }
    }

    /// Merge an operator into the field's operator map; a literal is discarded
    pub fn merge_operator(&mut self, field: &str, operator: QueryOperator, operand: Value) {
        if let Some(condition) = self.field_slot(field) {
            match condition {
                FilterCondition::Operators(operators) => operators.insert(operator, operand),
                FilterCondition::Literal(_) | FilterCondition::NotANumber => {
                    let mut operators = OperatorMap::new();
                    operators.insert(operator, operand);
                    *condition = FilterCondition::Operators(operators);
                }
            }
            return;
        }

        let mut operators = OperatorMap::new();
        operators.insert(operator, operand);
        self.entries.push(FilterEntry::Field {
            name: field.to_string(),
            condition: FilterCondition::Operators(operators),
        });
    }

    /// Drop an operator from a field's operator map if present
    pub fn remove_operator(&mut self, field: &str, operator: QueryOperator) {
        if let Some(FilterCondition::Operators(operators)) = self.field_slot(field) {
            operators.remove(operator);
        }
    }

    /// Install a combinator group, replacing an existing group of the same kind
    pub fn set_group(&mut self, combinator: Combinator, operands: Vec<SharedFilter>) {
        let existing = self.entries.iter_mut().find_map(|entry| match entry {
            FilterEntry::Group {
                combinator: c,
                operands,
            } if *c == combinator => Some(operands),
            _ => None,
        });

        match existing {
            Some(slot) => *slot = operands,
            None => self.entries.push(FilterEntry::Group {
                combinator,
                operands,
            }),
        }
    }

    /// Copy that shares no nodes with the original
    pub fn deep_clone(&self) -> FilterTree {
        let entries = self
            .entries
            .iter()
            .map(|entry| match entry {
                FilterEntry::Field { name, condition } => FilterEntry::Field {
                    name: name.clone(),
                    condition: condition.clone(),
                },
                FilterEntry::Group {
                    combinator,
                    operands,
                } => FilterEntry::Group {
                    combinator: *combinator,
                    operands: operands
                        .iter()
                        .map(|operand| operand.borrow().deep_clone().shared())
                        .collect(),
                },
            })
            .collect();

        FilterTree { entries }
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for entry in &self.entries {
            match entry {
                FilterEntry::Field { name, condition } => {
                    map.insert(name.clone(), condition.to_value());
                }
                FilterEntry::Group {
                    combinator,
                    operands,
                } => {
                    let operands = operands
                        .iter()
                        .map(|operand| operand.borrow().to_value())
                        .collect();
                    map.insert(combinator.as_str().to_string(), Value::Array(operands));
                }
            }
        }
        Value::Object(map)
    }

    /// Parse a plain filter object into a tree
    ///
    /// This is the only place where literal, operator map and combinator are
    /// told apart by shape.
    pub fn from_value(value: &Value) -> QueryResult<FilterTree> {
        let object = value.as_object().ok_or_else(|| {
            QueryError::invalid_argument("filter must be an object", value.to_string())
        })?;

        let mut tree = FilterTree::new();
        for (key, condition) in object {
            if let Some(combinator) = Combinator::parse(key) {
                let operands = condition.as_array().ok_or_else(|| {
                    QueryError::invalid_argument(
                        format!("{} requires an array of filters", key),
                        condition.to_string(),
                    )
                })?;
                let operands = operands
                    .iter()
                    .map(|operand| FilterTree::from_value(operand).map(FilterTree::shared))
                    .collect::<QueryResult<Vec<_>>>()?;
                tree.set_group(combinator, operands);
            } else if key.starts_with('$') {
                return Err(QueryError::invalid_argument(
                    format!("unsupported top-level operator {}", key),
                    key.clone(),
                ));
            } else {
                tree.entries.push(FilterEntry::Field {
                    name: key.clone(),
                    condition: parse_condition(condition)?,
                });
            }
        }

        Ok(tree)
    }
}

fn parse_condition(value: &Value) -> QueryResult<FilterCondition> {
    let operators = match value {
        Value::Object(map) if !map.is_empty() && map.keys().all(|key| key.starts_with('$')) => map,
        _ => return Ok(FilterCondition::Literal(value.clone())),
    };

    let mut parsed = OperatorMap::new();
    for (key, operand) in operators {
        let operator = QueryOperator::parse(key).ok_or_else(|| {
            QueryError::invalid_argument(format!("unsupported operator {}", key), key.clone())
        })?;
        parsed.insert(operator, operand.clone());
    }
    Ok(FilterCondition::Operators(parsed))
}

impl Serialize for FilterTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}
