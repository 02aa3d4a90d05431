//! Pluggable named filters and the keyword-search hook.

use crate::error::ConfigError;
use crate::query::{Condition, Query};
use crate::search::NormalizedSearch;
use serde_json::Value;

/// A named predicate that owns one entry of the request's filter list.
///
/// When the entry whose `name` equals [`CustomFilter::filter_name`] is active, the list pipeline
/// calls [`CustomFilter::apply`] with the whole normalised search, so a filter may read its own
/// value through [`CustomFilter::filter_value`] and any sibling entry or the keyword as well.
/// Generic filtering skips entries owned by a custom filter.
pub trait CustomFilter: Send + Sync {
    fn filter_name(&self) -> &str;

    fn apply(&self, query: &mut Query, search: &NormalizedSearch<'_>);

    /// Value of this filter's own entry.
    fn filter_value<'s>(&self, search: &'s NormalizedSearch<'_>) -> Option<&'s Value> {
        search.filter(self.filter_name()).map(|f| &f.value)
    }

    fn is_active(&self, search: &NormalizedSearch<'_>) -> bool {
        search.filter(self.filter_name()).map_or(false, |f| f.active)
    }

    /// Concrete type name, used in configuration errors.
    fn variant(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Checks the filter is named, then applies it if its entry is present and active.
pub fn apply_custom_filter(
    filter: &dyn CustomFilter,
    query: &mut Query,
    search: &NormalizedSearch<'_>,
) -> Result<(), ConfigError> {
    ensure_named(filter)?;
    if filter.is_active(search) {
        tracing::debug!(filter = %filter.filter_name(), "applying custom filter");
        filter.apply(query, search);
    }
    Ok(())
}

pub fn ensure_named(filter: &dyn CustomFilter) -> Result<(), ConfigError> {
    if filter.filter_name().trim().is_empty() {
        return Err(ConfigError::CustomFilterNameNotDefined(filter.variant().to_string()));
    }
    Ok(())
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Substring match of the filter value on one column (e.g. `title_contains` on `title`).
#[derive(Clone, Debug)]
pub struct ContainsFilter {
    name: String,
    column: String,
    case_sensitive: bool,
}

impl ContainsFilter {
    pub fn new(name: impl Into<String>, column: impl Into<String>) -> Self {
        ContainsFilter {
            name: name.into(),
            column: column.into(),
            case_sensitive: true,
        }
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }
}

impl CustomFilter for ContainsFilter {
    fn filter_name(&self) -> &str {
        &self.name
    }

    fn apply(&self, query: &mut Query, search: &NormalizedSearch<'_>) {
        match self.filter_value(search).and_then(value_text) {
            Some(needle) if !needle.is_empty() => {
                query.where_contains(self.column.clone(), needle, self.case_sensitive);
            }
            _ => {}
        }
    }
}

/// Keyword-search hook. The list pipeline calls it with the request keyword; with no hook
/// registered keywords do nothing.
pub trait KeywordFilter: Send + Sync {
    fn apply(&self, query: &mut Query, keyword: &str);
}

impl<F> KeywordFilter for F
where
    F: Fn(&mut Query, &str) + Send + Sync,
{
    fn apply(&self, query: &mut Query, keyword: &str) {
        self(query, keyword)
    }
}

/// Case-insensitive keyword match on any of several columns.
#[derive(Clone, Debug)]
pub struct KeywordColumns {
    columns: Vec<String>,
}

impl KeywordColumns {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeywordColumns {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

impl KeywordFilter for KeywordColumns {
    fn apply(&self, query: &mut Query, keyword: &str) {
        let keyword = keyword.trim();
        if keyword.is_empty() || self.columns.is_empty() {
            return;
        }
        query.where_any(
            self.columns
                .iter()
                .map(|c| Condition::Contains {
                    column: c.clone(),
                    needle: keyword.to_string(),
                    case_sensitive: false,
                })
                .collect(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchConfiguration;
    use serde_json::json;

    struct Unnamed;

    impl CustomFilter for Unnamed {
        fn filter_name(&self) -> &str {
            "  "
        }

        fn apply(&self, _query: &mut Query, _search: &NormalizedSearch<'_>) {}
    }

    fn config(filters: Value) -> SearchConfiguration {
        let mut c = SearchConfiguration::default();
        c.set("filters", filters);
        c
    }

    fn apply(filter: &dyn CustomFilter, query: &mut Query, filters: Value) {
        let c = config(filters);
        apply_custom_filter(filter, query, &NormalizedSearch::new(&c)).unwrap();
    }

    #[test]
    fn unnamed_filter_is_a_config_error_naming_the_variant() {
        let c = SearchConfiguration::default();
        let err = apply_custom_filter(&Unnamed, &mut Query::new(), &NormalizedSearch::new(&c)).unwrap_err();
        match err {
            ConfigError::CustomFilterNameNotDefined(variant) => assert!(variant.ends_with("Unnamed")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn applies_only_when_entry_is_active() {
        let f = ContainsFilter::new("title_contains", "title");
        let mut q = Query::new();
        apply(&f, &mut q, json!([{"name": "title_contains", "value": "PHP", "active": false}]));
        assert!(q.conditions.is_empty());
        apply(&f, &mut q, json!([{"name": "other", "value": "PHP", "active": true}]));
        assert!(q.conditions.is_empty());
        apply(&f, &mut q, json!([{"name": "title_contains", "value": "PHP", "active": true}]));
        assert_eq!(
            q.conditions,
            vec![Condition::Contains { column: "title".into(), needle: "PHP".into(), case_sensitive: true }]
        );
    }

    #[test]
    fn empty_contains_value_adds_no_condition() {
        let f = ContainsFilter::new("title_contains", "title");
        let mut q = Query::new();
        apply(&f, &mut q, json!([{"name": "title_contains", "value": "", "active": true}]));
        assert!(q.conditions.is_empty());
        assert!(q.matches(&json!({"title": null})));
    }

    struct ModeAware;

    impl CustomFilter for ModeAware {
        fn filter_name(&self) -> &str {
            "title_match"
        }

        fn apply(&self, query: &mut Query, search: &NormalizedSearch<'_>) {
            let Some(value) = self.filter_value(search).cloned() else { return };
            match search.filter("match_mode").map(|f| &f.value) {
                Some(Value::String(mode)) if mode == "exact" => {
                    query.where_eq("title", value);
                }
                _ => {
                    if let Some(needle) = value_text(&value) {
                        query.where_contains("title", needle, false);
                    }
                }
            }
        }
    }

    #[test]
    fn custom_filter_reads_sibling_entries() {
        let mut q = Query::new();
        apply(
            &ModeAware,
            &mut q,
            json!([
                {"name": "title_match", "value": "Rust", "active": true},
                {"name": "match_mode", "value": "exact"}
            ]),
        );
        assert_eq!(q.conditions, vec![Condition::Eq { column: "title".into(), value: json!("Rust") }]);

        let mut q = Query::new();
        apply(&ModeAware, &mut q, json!([{"name": "title_match", "value": "Rust", "active": true}]));
        assert!(matches!(q.conditions.as_slice(), [Condition::Contains { .. }]));
    }

    #[test]
    fn keyword_columns_build_an_or_group() {
        let mut q = Query::new();
        KeywordColumns::new(["title", "body"]).apply(&mut q, " learn ");
        assert!(q.matches(&json!({"title": "Why LEARN PHP", "body": ""})));
        assert!(!q.matches(&json!({"title": "JavaScript", "body": "basics"})));

        let mut q = Query::new();
        KeywordColumns::new(["title"]).apply(&mut q, "   ");
        assert!(q.conditions.is_empty());
    }
}
