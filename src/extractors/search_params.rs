//! Query-string search parameters, including the bracket form
//! (`filters[0][name]=published`, `include[]=comments`).

use crate::case::to_snake_case;
use crate::error::AppError;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use serde_json::{Map, Value};

/// Query parameters as a JSON object with snake_case top-level keys. Bracketed keys nest;
/// objects whose keys are all indexes become arrays ordered by index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchParams(pub Map<String, Value>);

impl SearchParams {
    pub fn parse(query: &str) -> Result<Self, AppError> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
            .map_err(|e| AppError::BadRequest(format!("invalid query string: {}", e)))?;
        let mut root = Map::new();
        for (key, value) in pairs {
            let mut path = key_path(&key);
            path[0] = to_snake_case(&path[0]);
            insert(&mut root, &path, value);
        }
        Ok(SearchParams(
            root.into_iter().map(|(k, v)| (k, into_lists(v))).collect(),
        ))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SearchParams
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        SearchParams::parse(parts.uri.query().unwrap_or_default())
    }
}

/// `a[0][name]` splits into `a`, `0`, `name`. An empty segment (`a[]`) appends.
/// Keys that are not well-formed bracket paths stay whole.
fn key_path(key: &str) -> Vec<String> {
    match key.find('[') {
        Some(open) if open > 0 && key.ends_with(']') => {
            let mut path = vec![key[..open].to_string()];
            path.extend(key[open + 1..key.len() - 1].split("][").map(str::to_string));
            path
        }
        _ => vec![key.to_string()],
    }
}

fn insert(map: &mut Map<String, Value>, path: &[String], value: String) {
    let Some((head, rest)) = path.split_first() else { return };
    let key = if head.is_empty() { map.len().to_string() } else { head.clone() };
    if rest.is_empty() {
        map.insert(key, Value::String(value));
        return;
    }
    let slot = map.entry(key).or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(child) = slot {
        insert(child, rest, value);
    }
}

fn into_lists(value: Value) -> Value {
    let Value::Object(map) = value else { return value };
    let map: Map<String, Value> = map.into_iter().map(|(k, v)| (k, into_lists(v))).collect();
    let indexed: Option<Vec<(usize, Value)>> = map
        .iter()
        .map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, v.clone())))
        .collect();
    match indexed {
        Some(mut items) if !items.is_empty() => {
            items.sort_by_key(|(i, _)| *i);
            Value::Array(items.into_iter().map(|(_, v)| v).collect())
        }
        _ => Value::Object(map),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(query: &str) -> Value {
        Value::Object(SearchParams::parse(query).unwrap().0)
    }

    #[test]
    fn flat_keys_are_snake_cased_strings() {
        assert_eq!(
            parse("perPage=5&sort_field=title&keyword=learn%20rust"),
            json!({"per_page": "5", "sort_field": "title", "keyword": "learn rust"})
        );
        assert_eq!(parse(""), json!({}));
    }

    #[test]
    fn bracket_keys_nest_into_arrays_of_objects() {
        let query = "filters%5B0%5D%5Bname%5D=published&filters%5B0%5D%5Bvalue%5D=true\
                     &filters%5B1%5D%5Bname%5D=user_id&filters%5B1%5D%5Bvalue%5D=2";
        assert_eq!(
            parse(query),
            json!({"filters": [
                {"name": "published", "value": "true"},
                {"name": "user_id", "value": "2"}
            ]})
        );
    }

    #[test]
    fn empty_brackets_append_in_order() {
        assert_eq!(
            parse("include[]=comments&include[]=author"),
            json!({"include": ["comments", "author"]})
        );
    }

    #[test]
    fn indexes_order_numerically() {
        let query = (0..12).map(|i| format!("ids[{i}]={i}")).collect::<Vec<_>>().join("&");
        let ids = parse(&query)["ids"].clone();
        assert_eq!(ids[10], json!("10"));
        assert_eq!(ids[2], json!("2"));
    }

    #[test]
    fn named_brackets_stay_objects_and_malformed_keys_stay_whole() {
        assert_eq!(parse("meta[kind]=x"), json!({"meta": {"kind": "x"}}));
        assert_eq!(parse("a[b=1&[c]=2"), json!({"a[b": "1", "[c]": "2"}));
    }

    #[test]
    fn nested_key_replaces_an_earlier_scalar() {
        assert_eq!(parse("filters=x&filters[0][name]=id"), json!({"filters": [{"name": "id"}]}));
    }
}
