//! ListService: builds and runs a bounded, filtered, sorted, paginated list query.

use crate::config::ListSettings;
use crate::error::{AppError, ConfigError};
use crate::filter::{apply_custom_filter, CustomFilter, KeywordFilter};
use crate::query::{field, Query, Record, Window};
use crate::search::{normalize_includes, Filter, NormalizedSearch, SearchConfiguration, SearchRequest};
use crate::storage::Collection;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// One page of a simple (count-free) pagination.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub current_page: u32,
    pub per_page: u32,
    pub has_more_pages: bool,
    pub data: Vec<Record>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResults {
    /// Total matches before pagination.
    pub count_items: u64,
    pub result: Page,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ListResults {
    Paginated(PaginatedResults),
    All(Vec<Record>),
}

impl ListResults {
    /// `countItems` when paginated, otherwise the number of records.
    pub fn count_items(&self) -> u64 {
        match self {
            ListResults::Paginated(p) => p.count_items,
            ListResults::All(rows) => rows.len() as u64,
        }
    }

    /// Records actually returned.
    pub fn records(&self) -> &[Record] {
        match self {
            ListResults::Paginated(p) => &p.result.data,
            ListResults::All(rows) => rows,
        }
    }

    pub fn into_records(self) -> Vec<Record> {
        match self {
            ListResults::Paginated(p) => p.result.data,
            ListResults::All(rows) => rows,
        }
    }
}

/// Single-use list pipeline: construct, configure with the fluent setters, then run exactly one
/// of [`ListService::get_results`], [`ListService::find_including`] or [`ListService::get_all_ids`].
pub struct ListService {
    collection: Option<Arc<dyn Collection>>,
    identifier_field: String,
    paginated: bool,
    default_per_page: u32,
    available_filter_columns: Option<Vec<String>>,
    available_scopes: Option<Vec<String>>,
    available_includes: Option<Vec<String>>,
    max_per_page: Option<u32>,
    max_filters: Option<usize>,
    custom_filters: Vec<Arc<dyn CustomFilter>>,
    keyword_filter: Option<Arc<dyn KeywordFilter>>,
    search: SearchConfiguration,
}

impl Default for ListService {
    fn default() -> Self {
        Self::new()
    }
}

fn owned<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

/// Absent allow-list permits everything.
fn allowed(list: &Option<Vec<String>>, name: &str) -> bool {
    list.as_ref().map_or(true, |l| l.iter().any(|n| n == name))
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

impl ListService {
    pub fn new() -> Self {
        ListService {
            collection: None,
            identifier_field: "id".into(),
            paginated: true,
            default_per_page: 10,
            available_filter_columns: None,
            available_scopes: None,
            available_includes: None,
            max_per_page: None,
            max_filters: None,
            custom_filters: Vec::new(),
            keyword_filter: None,
            search: SearchConfiguration::default(),
        }
    }

    pub fn from_settings(settings: &ListSettings) -> Self {
        let mut s = Self::new()
            .set_identifier_field(settings.identifier_field.clone())
            .set_paginated(settings.paginated)
            .set_default_per_page(settings.per_page)
            .set_max_per_page(settings.max_per_page)
            .set_max_filters(settings.max_filters);
        s.available_filter_columns = settings.available_filter_columns.clone();
        s.available_scopes = settings.available_scopes.clone();
        s.available_includes = settings.available_includes.clone();
        s
    }

    pub fn set_list_model(mut self, collection: Arc<dyn Collection>) -> Self {
        self.collection = Some(collection);
        self
    }

    pub fn set_identifier_field(mut self, field: impl Into<String>) -> Self {
        self.identifier_field = field.into();
        self
    }

    pub fn set_paginated(mut self, paginated: bool) -> Self {
        self.paginated = paginated;
        self
    }

    /// Page size used when the request does not set one (or sets 0).
    pub fn set_default_per_page(mut self, per_page: u32) -> Self {
        if per_page > 0 {
            self.default_per_page = per_page;
            self.search.per_page = per_page;
        }
        self
    }

    pub fn set_available_filter_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.available_filter_columns = Some(owned(columns));
        self
    }

    pub fn set_available_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.available_scopes = Some(owned(scopes));
        self
    }

    pub fn set_available_includes<I, S>(mut self, includes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.available_includes = Some(owned(includes));
        self
    }

    /// `None` keeps the current value.
    pub fn set_max_per_page(mut self, max: impl Into<Option<u32>>) -> Self {
        if let Some(max) = max.into() {
            self.max_per_page = Some(max);
        }
        self
    }

    /// `None` keeps the current value.
    pub fn set_max_filters(mut self, max: impl Into<Option<usize>>) -> Self {
        if let Some(max) = max.into() {
            self.max_filters = Some(max);
        }
        self
    }

    pub fn add_custom_filter(mut self, filter: Arc<dyn CustomFilter>) -> Self {
        self.custom_filters.push(filter);
        self
    }

    pub fn with_custom_filter(self, filter: impl CustomFilter + 'static) -> Self {
        self.add_custom_filter(Arc::new(filter))
    }

    pub fn set_keyword_filter(mut self, filter: Arc<dyn KeywordFilter>) -> Self {
        self.keyword_filter = Some(filter);
        self
    }

    pub fn with_keyword_filter(self, filter: impl KeywordFilter + 'static) -> Self {
        self.set_keyword_filter(Arc::new(filter))
    }

    /// Merge a partial configuration; absent values keep defaults or earlier values.
    pub fn set_search_configuration(mut self, request: SearchRequest) -> Self {
        self.search.merge(request);
        self
    }

    /// Set one configuration key (camelCase or snake_case); null is ignored.
    pub fn set_search_configuration_value(mut self, key: &str, value: Value) -> Self {
        self.search.set(key, value);
        self
    }

    pub fn search_configuration(&self) -> &SearchConfiguration {
        &self.search
    }

    fn collection(&self) -> Result<Arc<dyn Collection>, ConfigError> {
        self.collection
            .clone()
            .ok_or_else(|| ConfigError::ListModelNotDefined(std::any::type_name::<Self>().to_string()))
    }

    fn custom_filter_names(&self) -> Vec<&str> {
        self.custom_filters.iter().map(|f| f.filter_name()).collect()
    }

    /// Generic filters that survive the allow-list, custom-filter ownership and the count cap.
    fn generic_filters<'a>(&self, filters: &'a [Filter]) -> Vec<&'a Filter> {
        let custom = self.custom_filter_names();
        let mut kept: Vec<&Filter> = filters
            .iter()
            .filter(|f| {
                let ok = allowed(&self.available_filter_columns, &f.name);
                if !ok {
                    tracing::debug!(filter = %f.name, "filter column not available; dropped");
                }
                ok
            })
            .filter(|f| !custom.contains(&f.name.as_str()))
            .collect();
        if let Some(max) = self.max_filters {
            if kept.len() > max {
                tracing::debug!(submitted = kept.len(), max, "filter count capped");
                kept.truncate(max);
            }
        }
        kept
    }

    fn apply_belongs_to(&self, collection: &dyn Collection, query: &mut Query) {
        let (Some(scope_name), Some(relation_id)) = (&self.search.belongs_to, &self.search.relation_id) else {
            return;
        };
        if scope_name.is_empty() || is_blank(relation_id) {
            return;
        }
        if !allowed(&self.available_scopes, scope_name) {
            tracing::debug!(scope = %scope_name, "scope not available; skipped");
            return;
        }
        match collection.scope(scope_name) {
            Some(scope) => scope.apply(query, relation_id),
            None => tracing::warn!(collection = %collection.name(), scope = %scope_name, "scope not defined; skipped"),
        }
    }

    fn allowed_includes(&self, includes: Vec<String>) -> Vec<String> {
        match &self.available_includes {
            None => includes,
            Some(list) => includes.into_iter().filter(|i| list.contains(i)).collect(),
        }
    }

    /// Runs every stage up to (not including) pagination.
    fn build_query(&self) -> Result<(Arc<dyn Collection>, Query), AppError> {
        let collection = self.collection()?;
        let mut query = Query::new();

        if let (Some(keyword), Some(hook)) = (&self.search.keyword, &self.keyword_filter) {
            hook.apply(&mut query, keyword);
        }

        let search = NormalizedSearch::new(&self.search);
        let includes = normalize_includes(&self.search.include);

        for filter in &self.custom_filters {
            apply_custom_filter(filter.as_ref(), &mut query, &search)?;
        }

        for f in self.generic_filters(&search.filters) {
            if f.active {
                query.where_eq(f.name.clone(), f.value.clone());
            }
        }

        self.apply_belongs_to(collection.as_ref(), &mut query);

        let includes = self.allowed_includes(includes);
        if !includes.is_empty() {
            query.with(includes);
        }

        if let Some(sort_field) = &self.search.sort_field {
            query.order_by(sort_field.clone(), self.search.sort_direction);
        }

        Ok((collection, query))
    }

    fn per_page(&self) -> u32 {
        let requested = if self.search.per_page == 0 {
            self.default_per_page
        } else {
            self.search.per_page
        };
        match self.max_per_page {
            Some(max) if requested > max => max,
            _ => requested,
        }
    }

    pub async fn get_results(self) -> Result<ListResults, AppError> {
        let (collection, query) = self.build_query()?;
        if !self.paginated {
            let rows = collection.fetch(&query, None).await?;
            return Ok(ListResults::All(rows));
        }

        let per_page = self.per_page();
        let page = self.search.page.max(1);
        let count_items = collection.count(&query).await?;
        let window = Window {
            offset: u64::from(page - 1) * u64::from(per_page),
            limit: u64::from(per_page) + 1,
        };
        let mut data = collection.fetch(&query, Some(window)).await?;
        let has_more_pages = data.len() > per_page as usize;
        data.truncate(per_page as usize);
        tracing::debug!(collection = %collection.name(), count_items, page, per_page, "list results");
        Ok(ListResults::Paginated(PaginatedResults {
            count_items,
            result: Page {
                current_page: page,
                per_page,
                has_more_pages,
                data,
            },
        }))
    }

    /// Record whose identifier equals `identifier`, with allowed includes loaded. Filters,
    /// sorting and pagination are not applied.
    pub async fn find_including(self, identifier: Value) -> Result<Option<Record>, AppError> {
        let collection = self.collection()?;
        let mut query = Query::new();
        let includes = self.allowed_includes(normalize_includes(&self.search.include));
        if !includes.is_empty() {
            query.with(includes);
        }
        query.where_eq(self.identifier_field.clone(), identifier);
        let rows = collection.fetch(&query, Some(Window { offset: 0, limit: 1 })).await?;
        Ok(rows.into_iter().next())
    }

    /// Identifiers of every match, in result order, ignoring pagination.
    pub async fn get_all_ids(mut self) -> Result<Vec<Value>, AppError> {
        self.paginated = false;
        let (collection, mut query) = self.build_query()?;
        query.includes.clear();
        let rows = collection.fetch(&query, None).await?;
        Ok(rows.iter().map(|r| field(r, &self.identifier_field).clone()).collect())
    }
}
