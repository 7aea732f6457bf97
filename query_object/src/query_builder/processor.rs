//! Local query evaluation
//!
//! Applies a query's filter, sort, pagination and projection to records that
//! are already in memory, with the same semantics a remote document store
//! gives the serialized form. The filter tree is compiled once per call, so
//! operand errors surface before any record is touched.

use crate::errors::{QueryError, QueryResult};
use crate::query_builder::builder::Query;
use crate::query_builder::filter::{
    Combinator, FilterCondition, FilterEntry, FilterTree, OperatorMap, QueryOperator,
};
use crate::query_builder::ordering::SortKeys;
use config::ProcessorConfig;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::cmp::Ordering;

impl Query {
    /// Evaluate against `records` with the default processor settings
    pub fn process(&self, records: &[Value]) -> QueryResult<Vec<Value>> {
        self.process_with(records, &ProcessorConfig::default())
    }

    /// Evaluate a dynamically typed input, which must be an array of objects
    pub fn process_value(&self, records: &Value) -> QueryResult<Vec<Value>> {
        let records = records.as_array().ok_or_else(|| {
            QueryError::missing_required("records must be an array", records.to_string())
        })?;
        self.process(records)
    }

    pub fn process_with(
        &self,
        records: &[Value],
        config: &ProcessorConfig,
    ) -> QueryResult<Vec<Value>> {
        if let Some(record) = records.iter().find(|record| !record.is_object()) {
            return Err(QueryError::missing_required(
                "records must be objects",
                record.to_string(),
            ));
        }

        let root = self.root();
        let predicate = root.compile_predicate(config)?;

        let mut matched = Vec::new();
        for record in records {
            if predicate.matches(record) {
                matched.push(record.clone());
            }
        }
        debug_log!("filter kept {} of {} records", matched.len(), records.len());

        let sort = root.sort();
        if !sort.is_empty() {
            matched.sort_by(|a, b| compare_records(a, b, &sort));
        }

        let mut page = root.pagination().apply(matched);

        let fields = root.fields();
        if !fields.is_empty() {
            for record in page.iter_mut() {
                if let Value::Object(map) = record {
                    map.retain(|key, _| fields.contains(key) || config.is_protected(key));
                }
            }
        }

        debug_log!("process returned {} records", page.len());
        Ok(page)
    }

    /// Whether a single record satisfies this query's filter
    pub fn matches_record(&self, record: &Value) -> QueryResult<bool> {
        let predicate = self.root().compile_predicate(&ProcessorConfig::default())?;
        Ok(predicate.matches(record))
    }

    fn compile_predicate(&self, config: &ProcessorConfig) -> QueryResult<Predicate> {
        let filter = self.shared_filter();
        let tree = filter.borrow();
        let predicate = Predicate::compile(&tree, 0, config.max_filter_depth);
        predicate
    }
}

/// Resolve a dot-separated path; `None` when any segment is missing
pub fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = record;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Structural equality with numbers compared by value
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => left == right,
    }
}

/// Ordering for two present, non-null sort values; mixed types tie
fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

/// Null and missing values sort first ascending and last descending
fn compare_records(a: &Value, b: &Value, sort: &SortKeys) -> Ordering {
    for (field, order) in sort.iter() {
        let left = lookup(a, field).filter(|value| !value.is_null());
        let right = lookup(b, field).filter(|value| !value.is_null());

        let ordering = match (left, right) {
            (None, None) => continue,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(left), Some(right)) => compare_values(left, right),
        };

        let ordering = order.apply(ordering);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn literal_matches(field: Option<&Value>, expected: &Value) -> bool {
    match field {
        None => expected.is_null(),
        Some(value) => {
            values_equal(value, expected)
                || value
                    .as_array()
                    .is_some_and(|items| items.iter().any(|item| values_equal(item, expected)))
        }
    }
}

/// The value itself, or its elements when it is an array
fn candidates(field: Option<&Value>) -> Vec<&Value> {
    match field {
        None => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(value) => vec![value],
    }
}

fn invalid_operand(operator: QueryOperator, message: &str, operand: &Value) -> QueryError {
    QueryError::invalid_argument(
        format!("{} {}", operator.as_str(), message),
        operand.to_string(),
    )
}

#[derive(Debug, Clone)]
enum Bound {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone)]
enum Shape {
    Box { min: [f64; 2], max: [f64; 2] },
    Polygon(Vec<[f64; 2]>),
}

impl Shape {
    fn contains(&self, [x, y]: [f64; 2]) -> bool {
        match self {
            Shape::Box { min, max } => x >= min[0] && x <= max[0] && y >= min[1] && y <= max[1],
            Shape::Polygon(points) => {
                let mut inside = false;
                let mut j = points.len().wrapping_sub(1);
                for i in 0..points.len() {
                    let [xi, yi] = points[i];
                    let [xj, yj] = points[j];
                    if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                        inside = !inside;
                    }
                    j = i;
                }
                inside
            }
        }
    }
}

#[derive(Debug, Clone)]
enum FieldTest {
    Never,
    Equals(Value),
    NotEquals(Value),
    Compare(QueryOperator, Bound),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    All(Vec<Value>),
    Exists(bool),
    Mod { divisor: f64, remainder: f64 },
    Regex(Regex),
    Size(usize),
    Near { center: [f64; 2], max_distance: Option<f64> },
    Within(Shape),
}

impl FieldTest {
    fn matches(&self, field: Option<&Value>) -> bool {
        match self {
            FieldTest::Never => false,
            FieldTest::Equals(expected) => literal_matches(field, expected),
            FieldTest::NotEquals(expected) => !literal_matches(field, expected),
            FieldTest::Compare(operator, bound) => {
                candidates(field).into_iter().any(|value| {
                    let ordering = match (value, bound) {
                        (Value::Number(n), Bound::Number(b)) => {
                            n.as_f64().and_then(|n| n.partial_cmp(b))
                        }
                        (Value::String(s), Bound::Text(b)) => Some(s.as_str().cmp(b.as_str())),
                        _ => None,
                    };
                    ordering.is_some_and(|ordering| match operator {
                        QueryOperator::Gt => ordering == Ordering::Greater,
                        QueryOperator::Gte => ordering != Ordering::Less,
                        QueryOperator::Lt => ordering == Ordering::Less,
                        QueryOperator::Lte => ordering != Ordering::Greater,
                        _ => false,
                    })
                })
            }
            FieldTest::In(values) => values.iter().any(|value| literal_matches(field, value)),
            FieldTest::NotIn(values) => !values.iter().any(|value| literal_matches(field, value)),
            FieldTest::All(values) => {
                !values.is_empty() && values.iter().all(|value| literal_matches(field, value))
            }
            FieldTest::Exists(flag) => field.is_some() == *flag,
            FieldTest::Mod { divisor, remainder } => candidates(field)
                .into_iter()
                .filter_map(Value::as_f64)
                .any(|n| n.trunc() % divisor == *remainder),
            FieldTest::Regex(regex) => candidates(field)
                .into_iter()
                .filter_map(Value::as_str)
                .any(|text| regex.is_match(text)),
            FieldTest::Size(size) => field
                .and_then(Value::as_array)
                .is_some_and(|items| items.len() == *size),
            FieldTest::Near {
                center,
                max_distance,
            } => field.and_then(as_point).is_some_and(|point| {
                max_distance.map_or(true, |max| angular_distance(*center, point) <= max)
            }),
            FieldTest::Within(shape) => field.and_then(as_point).is_some_and(|point| shape.contains(point)),
        }
    }

    fn compile(operators: &OperatorMap) -> QueryResult<Vec<FieldTest>> {
        let mut tests = Vec::with_capacity(operators.len());
        for (operator, operand) in operators.iter() {
            let test = match operator {
                QueryOperator::Eq => FieldTest::Equals(operand.clone()),
                QueryOperator::Ne => FieldTest::NotEquals(operand.clone()),
                QueryOperator::Gt | QueryOperator::Gte | QueryOperator::Lt | QueryOperator::Lte => {
                    let bound = match operand {
                        Value::Number(n) => n.as_f64().map(Bound::Number),
                        Value::String(s) => Some(Bound::Text(s.clone())),
                        _ => None,
                    }
                    .ok_or_else(|| {
                        invalid_operand(*operator, "requires a number or string", operand)
                    })?;
                    FieldTest::Compare(*operator, bound)
                }
                QueryOperator::In | QueryOperator::Nin | QueryOperator::All => {
                    let values = operand
                        .as_array()
                        .ok_or_else(|| invalid_operand(*operator, "requires an array", operand))?
                        .clone();
                    match operator {
                        QueryOperator::In => FieldTest::In(values),
                        QueryOperator::Nin => FieldTest::NotIn(values),
                        _ => FieldTest::All(values),
                    }
                }
                QueryOperator::Exists => FieldTest::Exists(
                    operand
                        .as_bool()
                        .ok_or_else(|| invalid_operand(*operator, "requires a boolean", operand))?,
                ),
                QueryOperator::Mod => compile_mod(operand)?,
                QueryOperator::Regex => compile_regex(operand, operators.get(QueryOperator::Options))?,
                QueryOperator::Size => {
                    let size = operand
                        .as_u64()
                        .and_then(|size| usize::try_from(size).ok())
                        .ok_or_else(|| {
                            invalid_operand(*operator, "requires a non-negative integer", operand)
                        })?;
                    FieldTest::Size(size)
                }
                QueryOperator::NearSphere => {
                    let center = as_point(operand).ok_or_else(|| {
                        invalid_operand(*operator, "requires a [number, number]", operand)
                    })?;
                    let max_distance = match operators.get(QueryOperator::MaxDistance) {
                        None => None,
                        Some(distance) => Some(distance.as_f64().ok_or_else(|| {
                            invalid_operand(QueryOperator::MaxDistance, "requires a number", distance)
                        })?),
                    };
                    FieldTest::Near {
                        center,
                        max_distance,
                    }
                }
                QueryOperator::Within => FieldTest::Within(compile_shape(operand)?),
                // Companions are read by the operator they modify.
                QueryOperator::Options | QueryOperator::MaxDistance => continue,
            };
            tests.push(test);
        }
        Ok(tests)
    }
}

fn compile_mod(operand: &Value) -> QueryResult<FieldTest> {
    let pair = operand.as_array().map(Vec::as_slice);
    match pair {
        Some([divisor, remainder]) => match (divisor.as_f64(), remainder.as_f64()) {
            (Some(divisor), Some(remainder)) if divisor.trunc() != 0.0 => Ok(FieldTest::Mod {
                divisor: divisor.trunc(),
                remainder: remainder.trunc(),
            }),
            _ => Err(invalid_operand(
                QueryOperator::Mod,
                "requires a non-zero divisor and a numeric remainder",
                operand,
            )),
        },
        _ => Err(invalid_operand(
            QueryOperator::Mod,
            "requires [divisor, remainder]",
            operand,
        )),
    }
}

fn compile_regex(operand: &Value, options: Option<&Value>) -> QueryResult<FieldTest> {
    let source = operand
        .as_str()
        .ok_or_else(|| invalid_operand(QueryOperator::Regex, "requires a string", operand))?;

    let mut builder = RegexBuilder::new(source);
    if let Some(options) = options {
        let letters = options.as_str().ok_or_else(|| {
            invalid_operand(QueryOperator::Options, "requires a string", options)
        })?;
        for letter in letters.chars() {
            match letter {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                'x' => builder.ignore_whitespace(true),
                's' => builder.dot_matches_new_line(true),
                _ => {
                    return Err(invalid_operand(
                        QueryOperator::Options,
                        "contains an unsupported flag",
                        options,
                    ))
                }
            };
        }
    }

    let regex = builder.build().map_err(|err| {
        QueryError::invalid_argument(format!("invalid $regex pattern: {}", err), source)
    })?;
    Ok(FieldTest::Regex(regex))
}

fn compile_shape(operand: &Value) -> QueryResult<Shape> {
    let invalid = || {
        invalid_operand(
            QueryOperator::Within,
            "requires {$box: [[x, y], [x, y]]} or {$polygon: [[x, y], ...]}",
            operand,
        )
    };
    let points = |value: &Value| -> QueryResult<Vec<[f64; 2]>> {
        value
            .as_array()
            .ok_or_else(invalid)?
            .iter()
            .map(|point| as_point(point).ok_or_else(invalid))
            .collect()
    };

    let shape = operand.as_object().ok_or_else(invalid)?;
    if let Some(corners) = shape.get("$box") {
        match points(corners)?.as_slice() {
            [a, b] => Ok(Shape::Box {
                min: [a[0].min(b[0]), a[1].min(b[1])],
                max: [a[0].max(b[0]), a[1].max(b[1])],
            }),
            _ => Err(invalid()),
        }
    } else if let Some(vertices) = shape.get("$polygon") {
        Ok(Shape::Polygon(points(vertices)?))
    } else {
        Err(invalid())
    }
}

fn as_point(value: &Value) -> Option<[f64; 2]> {
    match value.as_array()?.as_slice() {
        [lng, lat] => Some([lng.as_f64()?, lat.as_f64()?]),
        _ => None,
    }
}

/// Great-circle distance in radians between two `[lng, lat]` degree pairs
fn angular_distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    let (lng1, lat1) = (a[0].to_radians(), a[1].to_radians());
    let (lng2, lat2) = (b[0].to_radians(), b[1].to_radians());
    let h = ((lat2 - lat1) / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * ((lng2 - lng1) / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

/// Compiled filter tree
#[derive(Debug, Clone)]
enum Predicate {
    AllOf(Vec<Predicate>),
    AnyOf(Vec<Predicate>),
    NoneOf(Vec<Predicate>),
    Field { path: String, test: FieldTest },
}

impl Predicate {
    fn compile(tree: &FilterTree, depth: usize, max_depth: usize) -> QueryResult<Predicate> {
        if depth > max_depth {
            return Err(QueryError::invalid_argument(
                format!("filter nesting exceeds the maximum depth of {}", max_depth),
                depth.to_string(),
            ));
        }

        let mut predicates = Vec::new();
        for entry in tree.entries() {
            match entry {
                FilterEntry::Field { name, condition } => match condition {
                    FilterCondition::Literal(value) => predicates.push(Predicate::Field {
                        path: name.clone(),
                        test: FieldTest::Equals(value.clone()),
                    }),
                    FilterCondition::NotANumber => predicates.push(Predicate::Field {
                        path: name.clone(),
                        test: FieldTest::Never,
                    }),
                    FilterCondition::Operators(operators) => {
                        for test in FieldTest::compile(operators)? {
                            predicates.push(Predicate::Field {
                                path: name.clone(),
                                test,
                            });
                        }
                    }
                },
                FilterEntry::Group {
                    combinator,
                    operands,
                } => {
                    let operands = operands
                        .iter()
                        .map(|operand| Predicate::compile(&operand.borrow(), depth + 1, max_depth))
                        .collect::<QueryResult<Vec<_>>>()?;
                    predicates.push(match combinator {
                        Combinator::And => Predicate::AllOf(operands),
                        Combinator::Or => Predicate::AnyOf(operands),
                        Combinator::Nor => Predicate::NoneOf(operands),
                    });
                }
            }
        }
        Ok(Predicate::AllOf(predicates))
    }

    fn matches(&self, record: &Value) -> bool {
        match self {
            Predicate::AllOf(predicates) => predicates.iter().all(|p| p.matches(record)),
            Predicate::AnyOf(predicates) => predicates.iter().any(|p| p.matches(record)),
            Predicate::NoneOf(predicates) => !predicates.iter().any(|p| p.matches(record)),
            Predicate::Field { path, test } => test.matches(lookup(record, path)),
        }
    }
}
