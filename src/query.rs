//! Backend-neutral query state built up by the list and action pipelines.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// One stored row, always a JSON object.
pub type Record = Value;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Lenient parse: anything that is not `desc` (any case) sorts ascending.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A predicate over one record. All conditions on a [`Query`] are combined with AND.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Eq { column: String, value: Value },
    /// Empty `values` matches nothing.
    In { column: String, values: Vec<Value> },
    Contains { column: String, needle: String, case_sensitive: bool },
    /// OR group.
    Any(Vec<Condition>),
}

impl Condition {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Condition::Eq { column, value } => loose_eq(field(record, column), value),
            Condition::In { column, values } => {
                let v = field(record, column);
                values.iter().any(|candidate| loose_eq(v, candidate))
            }
            Condition::Contains { column, needle, case_sensitive } => {
                let Some(haystack) = text_of(field(record, column)) else {
                    return false;
                };
                if *case_sensitive {
                    haystack.contains(needle.as_str())
                } else {
                    haystack.to_lowercase().contains(&needle.to_lowercase())
                }
            }
            Condition::Any(group) => group.iter().any(|c| c.matches(record)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

/// Offset/limit slice requested from storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub limit: u64,
}

/// Request-scoped query state. Mutated in place by each pipeline stage, then handed to a
/// [`crate::storage::Collection`] for execution.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    pub conditions: Vec<Condition>,
    pub includes: Vec<String>,
    pub order: Vec<OrderBy>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(&mut self, column: impl Into<String>, value: Value) -> &mut Self {
        self.conditions.push(Condition::Eq {
            column: column.into(),
            value,
        });
        self
    }

    pub fn where_in(&mut self, column: impl Into<String>, values: Vec<Value>) -> &mut Self {
        self.conditions.push(Condition::In {
            column: column.into(),
            values,
        });
        self
    }

    pub fn where_contains(&mut self, column: impl Into<String>, needle: impl Into<String>, case_sensitive: bool) -> &mut Self {
        self.conditions.push(Condition::Contains {
            column: column.into(),
            needle: needle.into(),
            case_sensitive,
        });
        self
    }

    pub fn where_any(&mut self, group: Vec<Condition>) -> &mut Self {
        self.conditions.push(Condition::Any(group));
        self
    }

    /// Eager-load relations; repeated names are kept once.
    pub fn with<I, S>(&mut self, includes: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in includes {
            let name = name.into();
            if !self.includes.contains(&name) {
                self.includes.push(name);
            }
        }
        self
    }

    pub fn order_by(&mut self, column: impl Into<String>, direction: SortDirection) -> &mut Self {
        self.order.push(OrderBy {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }
}

/// Field lookup; missing fields and non-object records read as null.
pub fn field<'a>(record: &'a Record, column: &str) -> &'a Value {
    record.get(column).unwrap_or(&Value::Null)
}

fn text_of(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn as_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s == "true" || s == "1" => Some(true),
        Value::String(s) if s == "false" || s == "0" => Some(false),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        _ => None,
    }
}

/// Equality with the coercions a SQL backend applies to text parameters:
/// numeric strings equal numbers and `"true"`/`"false"` equal booleans.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(s), Value::String(t)) => s == t,
        (Value::Number(_), _) | (_, Value::Number(_)) if !a.is_boolean() && !b.is_boolean() => {
            match (as_number(a), as_number(b)) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        (Value::Bool(_), _) | (_, Value::Bool(_)) => match (as_bool(a), as_bool(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
        _ => a == b,
    }
}

fn rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order used for in-memory sorting: null < bool < number < string < array < object.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
