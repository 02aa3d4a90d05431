//! Search configuration of a list request and the normalisation of its loose parts.

use crate::case::to_snake_case;
use crate::query::SortDirection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One generic filter: `name = value` when active.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub active: bool,
}

/// Per-request search state. `filters` and `include` keep the raw caller shape until the
/// pipeline normalises them.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchConfiguration {
    pub per_page: u32,
    pub page: u32,
    pub sort_field: Option<String>,
    pub sort_direction: SortDirection,
    pub keyword: Option<String>,
    pub filters: Value,
    pub include: Value,
    pub belongs_to: Option<String>,
    pub relation_id: Option<Value>,
}

impl Default for SearchConfiguration {
    fn default() -> Self {
        SearchConfiguration {
            per_page: 10,
            page: 1,
            sort_field: None,
            sort_direction: SortDirection::Asc,
            keyword: None,
            filters: Value::Array(Vec::new()),
            include: Value::Array(Vec::new()),
            belongs_to: None,
            relation_id: None,
        }
    }
}

/// Partial configuration as received from a caller. `None` never overwrites a current value.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default, alias = "per_page")]
    pub per_page: Option<Value>,
    #[serde(default)]
    pub page: Option<Value>,
    #[serde(default, alias = "sort_field")]
    pub sort_field: Option<String>,
    #[serde(default, alias = "sort_direction")]
    pub sort_direction: Option<String>,
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub filters: Option<Value>,
    #[serde(default)]
    pub include: Option<Value>,
    #[serde(default, alias = "belongs_to")]
    pub belongs_to: Option<String>,
    #[serde(default, alias = "relation_id")]
    pub relation_id: Option<Value>,
}

impl SearchRequest {
    /// Key/value pairs in declaration order, dropping absent ones.
    pub fn into_pairs(self) -> Vec<(&'static str, Value)> {
        let mut out = Vec::new();
        let mut push = |k: &'static str, v: Option<Value>| {
            if let Some(v) = v {
                out.push((k, v));
            }
        };
        push("per_page", self.per_page);
        push("page", self.page);
        push("sort_field", self.sort_field.map(Value::String));
        push("sort_direction", self.sort_direction.map(Value::String));
        push("keyword", self.keyword.map(Value::String));
        push("filters", self.filters);
        push("include", self.include);
        push("belongs_to", self.belongs_to.map(Value::String));
        push("relation_id", self.relation_id);
        out
    }
}

fn positive_int(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn non_empty_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl SearchConfiguration {
    /// Set one key. Keys accept camelCase or snake_case. Null values and unknown keys are
    /// ignored; values of the wrong shape leave the current value in place.
    pub fn set(&mut self, key: &str, value: Value) {
        if value.is_null() {
            return;
        }
        match to_snake_case(key).as_str() {
            "per_page" => match positive_int(&value) {
                Some(n) => self.per_page = n,
                None => tracing::debug!(?value, "ignoring non-integer perPage"),
            },
            "page" => match positive_int(&value) {
                Some(n) if n > 0 => self.page = n,
                _ => tracing::debug!(?value, "ignoring invalid page"),
            },
            "sort_field" => self.sort_field = non_empty_text(&value),
            "sort_direction" => {
                if let Some(s) = value.as_str() {
                    self.sort_direction = SortDirection::parse(s);
                }
            }
            "keyword" => self.keyword = non_empty_text(&value),
            "filters" => self.filters = value,
            "include" => self.include = value,
            "belongs_to" => self.belongs_to = non_empty_text(&value),
            "relation_id" => self.relation_id = Some(value),
            other => tracing::debug!(key = %other, "unknown search configuration key ignored"),
        }
    }

    pub fn merge(&mut self, request: SearchRequest) {
        for (k, v) in request.into_pairs() {
            self.set(k, v);
        }
    }
}

/// Normalise raw filters. Accepts an array of filter maps or a JSON string encoding one.
/// `"true"`/`"false"` string fields become booleans. Anything malformed yields no filters.
pub fn normalize_filters(raw: &Value) -> Vec<Filter> {
    let decoded;
    let raw = match raw {
        Value::String(s) if s.trim().is_empty() => return Vec::new(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(v) => {
                decoded = v;
                &decoded
            }
            Err(_) => {
                tracing::debug!("filters string is not valid JSON; ignoring filters");
                return Vec::new();
            }
        },
        other => other,
    };
    let Value::Array(items) = raw else {
        if !raw.is_null() {
            tracing::debug!("filters are not an array; ignoring filters");
        }
        return Vec::new();
    };
    items.iter().filter_map(normalize_filter).collect()
}

fn normalize_filter(item: &Value) -> Option<Filter> {
    let Value::Object(map) = item else {
        tracing::debug!(?item, "dropping filter that is not an object");
        return None;
    };
    let coerced: Map<String, Value> = map
        .iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) if s == "true" => Value::Bool(true),
                Value::String(s) if s == "false" => Value::Bool(false),
                other => other.clone(),
            };
            (k.clone(), v)
        })
        .collect();
    let name = match coerced.get("name") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => {
            tracing::debug!(?item, "dropping filter without a name");
            return None;
        }
    };
    Some(Filter {
        name,
        value: coerced.get("value").cloned().unwrap_or(Value::Null),
        active: coerced.get("active").map_or(false, is_truthy),
    })
}

/// Loose truthiness of `active`: booleans, non-zero numbers and non-empty strings other than `"0"`.
fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |n| n != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        _ => false,
    }
}

/// A search configuration with its filters normalised: what custom filters read.
#[derive(Clone, Debug)]
pub struct NormalizedSearch<'a> {
    pub config: &'a SearchConfiguration,
    pub filters: Vec<Filter>,
}

impl<'a> NormalizedSearch<'a> {
    pub fn new(config: &'a SearchConfiguration) -> Self {
        NormalizedSearch {
            config,
            filters: normalize_filters(&config.filters),
        }
    }

    /// First entry named `name`, active or not.
    pub fn filter(&self, name: &str) -> Option<&Filter> {
        self.filters.iter().find(|f| f.name == name)
    }

    pub fn keyword(&self) -> Option<&str> {
        self.config.keyword.as_deref()
    }
}

/// Normalise raw includes: comma-separated string or array of strings; trimmed, de-duplicated
/// (first occurrence wins), empties and non-strings dropped. Anything else yields no includes.
pub fn normalize_includes(raw: &Value) -> Vec<String> {
    let names: Vec<String> = match raw {
        Value::String(s) => s.split(',').map(|p| p.trim().to_string()).collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.trim().to_string()))
            .collect(),
        Value::Null => Vec::new(),
        _ => {
            tracing::debug!("include is neither a string nor an array; ignoring includes");
            Vec::new()
        }
    };
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for n in names {
        if !n.is_empty() && !out.contains(&n) {
            out.push(n);
        }
    }
    out
}
