//! Field conditions
//!
//! Literal setters replace whatever the field had; operator setters merge into
//! the field's operator map.

use crate::errors::{QueryError, QueryResult};
use crate::query_builder::builder::Query;
use crate::query_builder::filter::{FilterCondition, Literal, QueryOperator};
use crate::query_builder::pattern::{self, MatchOptions, Pattern};
use serde_json::{json, Value};

impl Query {
    /// Equality; `0`, `""`, `false`, `null` and NaN are stored as given
    ///
    /// NaN serializes as `null` but matches no record locally.
    pub fn equal_to(&self, field: &str, value: impl Into<Literal>) -> Query {
        let condition = match value.into() {
            Literal::Value(value) => FilterCondition::Literal(value),
            Literal::NotANumber => FilterCondition::NotANumber,
        };
        self.update_filter(|filter| filter.set_condition(field, condition))
    }

    /// Inequality; every record differs from NaN, so a NaN operand adds no condition
    pub fn not_equal_to(&self, field: &str, value: impl Into<Literal>) -> Query {
        match value.into() {
            Literal::Value(value) => self.add_operator(field, QueryOperator::Ne, value),
            Literal::NotANumber => self.clone(),
        }
    }

    pub fn greater_than(&self, field: &str, value: impl Into<Literal>) -> QueryResult<Query> {
        self.relational(field, QueryOperator::Gt, value.into())
    }

    pub fn greater_than_or_equal_to(
        &self,
        field: &str,
        value: impl Into<Literal>,
    ) -> QueryResult<Query> {
        self.relational(field, QueryOperator::Gte, value.into())
    }

    pub fn less_than(&self, field: &str, value: impl Into<Literal>) -> QueryResult<Query> {
        self.relational(field, QueryOperator::Lt, value.into())
    }

    pub fn less_than_or_equal_to(&self, field: &str, value: impl Into<Literal>) -> QueryResult<Query> {
        self.relational(field, QueryOperator::Lte, value.into())
    }

    /// Field equals any of `values`; a scalar is treated as a one-element list
    pub fn contains(&self, field: &str, values: impl Into<Value>) -> Query {
        self.add_operator(field, QueryOperator::In, as_sequence(values.into()))
    }

    /// Field holds every one of `values`
    pub fn contains_all(&self, field: &str, values: impl Into<Value>) -> Query {
        self.add_operator(field, QueryOperator::All, as_sequence(values.into()))
    }

    pub fn not_contained_in(&self, field: &str, values: impl Into<Value>) -> Query {
        self.add_operator(field, QueryOperator::Nin, as_sequence(values.into()))
    }

    pub fn exists(&self, field: &str) -> Query {
        self.exists_with(field, true)
    }

    pub fn exists_with(&self, field: &str, flag: bool) -> Query {
        self.add_operator(field, QueryOperator::Exists, Value::Bool(flag))
    }

    /// `field % divisor == remainder`; numeric strings are coerced
    pub fn modulo(
        &self,
        field: &str,
        divisor: impl Into<Value>,
        remainder: impl Into<Value>,
    ) -> QueryResult<Query> {
        let divisor = coerce_numeric(divisor.into(), "divisor")?;
        let remainder = coerce_numeric(remainder.into(), "remainder")?;
        Ok(self.add_operator(field, QueryOperator::Mod, json!([divisor, remainder])))
    }

    /// `field % divisor == 0`
    pub fn modulo_by(&self, field: &str, divisor: impl Into<Value>) -> QueryResult<Query> {
        self.modulo(field, divisor, 0)
    }

    /// Anchored regular expression match
    ///
    /// Case-insensitive matching is rejected. Multiline, extended and
    /// dot-matches-all flags come from the pattern or `options` and are
    /// written to `$options` in `m`, `x`, `s` order.
    pub fn matches(
        &self,
        field: &str,
        pattern: impl Into<Pattern>,
        options: MatchOptions,
    ) -> QueryResult<Query> {
        let resolved = pattern::resolve(&pattern.into(), &options)?;
        Ok(self.update_filter(|filter| {
            filter.merge_operator(field, QueryOperator::Regex, Value::String(resolved.source));
            if resolved.options.is_empty() {
                filter.remove_operator(field, QueryOperator::Options);
            } else {
                filter.merge_operator(
                    field,
                    QueryOperator::Options,
                    Value::String(resolved.options),
                );
            }
        }))
    }

    /// Points near `[lng, lat]`, optionally within `max_distance` radians
    pub fn near(
        &self,
        field: &str,
        coord: impl Into<Value>,
        max_distance: Option<f64>,
    ) -> QueryResult<Query> {
        let coord = coord.into();
        let (lng, lat) = coordinate_pair(&coord, "coord")?;
        if let Some(distance) = max_distance {
            if !distance.is_finite() {
                return Err(QueryError::invalid_argument(
                    "maxDistance must be a number",
                    distance.to_string(),
                ));
            }
        }

        Ok(self.update_filter(|filter| {
            filter.merge_operator(field, QueryOperator::NearSphere, json!([lng, lat]));
            if let Some(distance) = max_distance {
                filter.merge_operator(field, QueryOperator::MaxDistance, json!(distance));
            }
        }))
    }

    pub fn within_box(
        &self,
        field: &str,
        bottom_left: impl Into<Value>,
        upper_right: impl Into<Value>,
    ) -> QueryResult<Query> {
        let bottom_left = float_pair(&bottom_left.into(), "bottomLeftCoord")?;
        let upper_right = float_pair(&upper_right.into(), "upperRightCoord")?;
        Ok(self.add_operator(
            field,
            QueryOperator::Within,
            json!({ "$box": [bottom_left, upper_right] }),
        ))
    }

    pub fn within_polygon(&self, field: &str, coords: impl Into<Value>) -> QueryResult<Query> {
        let coords = coords.into();
        let points = match coords.as_array() {
            Some(points) if (1..=3).contains(&points.len()) => points,
            _ => {
                return Err(QueryError::invalid_argument(
                    "coords must be [[number, number]] with one to three points",
                    coords.to_string(),
                ))
            }
        };
        let polygon = points
            .iter()
            .map(|point| float_pair(point, "coords"))
            .collect::<QueryResult<Vec<_>>>()?;

        Ok(self.add_operator(
            field,
            QueryOperator::Within,
            json!({ "$polygon": polygon }),
        ))
    }

    /// Array field with exactly `size` elements
    pub fn size(&self, field: &str, size: impl Into<Value>) -> QueryResult<Query> {
        let size = size.into();
        if !size.is_number() {
            return Err(QueryError::invalid_argument(
                "size must be a number",
                size.to_string(),
            ));
        }
        Ok(self.add_operator(field, QueryOperator::Size, size))
    }

    fn add_operator(&self, field: &str, operator: QueryOperator, operand: Value) -> Query {
        self.update_filter(|filter| filter.merge_operator(field, operator, operand))
    }

    fn relational(&self, field: &str, operator: QueryOperator, value: Literal) -> QueryResult<Query> {
        let value = match value {
            Literal::Value(value) => value,
            Literal::NotANumber => {
                return Err(QueryError::invalid_argument(
                    format!("{} cannot compare against NaN", operator.as_str()),
                    "NaN",
                ))
            }
        };
        if !(value.is_number() || value.is_string()) {
            return Err(QueryError::invalid_argument(
                format!("{} requires a number or string", operator.as_str()),
                value.to_string(),
            ));
        }
        Ok(self.add_operator(field, operator, value))
    }
}

fn as_sequence(value: Value) -> Value {
    match value {
        Value::Array(_) => value,
        scalar => Value::Array(vec![scalar]),
    }
}

fn coerce_numeric(value: Value, name: &str) -> QueryResult<Value> {
    match value {
        Value::Number(_) => Ok(value),
        Value::String(ref text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|number| number.is_finite())
            .map(Value::from)
            .ok_or_else(|| {
                QueryError::invalid_argument(format!("{} must be a number", name), text.clone())
            }),
        other => Err(QueryError::invalid_argument(
            format!("{} must be a number", name),
            other.to_string(),
        )),
    }
}

fn coordinate_pair(value: &Value, name: &str) -> QueryResult<(Value, Value)> {
    match value.as_array().map(Vec::as_slice) {
        Some([lng, lat]) if lng.is_number() && lat.is_number() => Ok((lng.clone(), lat.clone())),
        _ => Err(QueryError::invalid_argument(
            format!("{} must be a [number, number]", name),
            value.to_string(),
        )),
    }
}

fn float_pair(value: &Value, name: &str) -> QueryResult<[f64; 2]> {
    let (lng, lat) = coordinate_pair(value, name)?;
    match (lng.as_f64(), lat.as_f64()) {
        (Some(lng), Some(lat)) => Ok([lng, lat]),
        _ => Err(QueryError::invalid_argument(
            format!("{} must be a [number, number]", name),
            value.to_string(),
        )),
    }
}
