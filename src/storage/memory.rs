//! In-memory collection of JSON records. Insertion order is the storage default order.

use super::{BelongsToScope, Collection, IncludeDirection, Scope};
use crate::error::AppError;
use crate::query::{compare_values, field, loose_eq, Query, Record, SortDirection, Window};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Related collection loaded under an include name.
#[derive(Clone)]
pub struct Relation {
    pub direction: IncludeDirection,
    pub related: Arc<MemoryCollection>,
    /// Our column used in the join (our FK for to_one; our key for to_many).
    pub our_key: String,
    /// Their column used in the join (their key for to_one; their FK for to_many).
    pub their_key: String,
}

pub struct MemoryCollection {
    name: String,
    records: RwLock<Vec<Record>>,
    scopes: HashMap<String, Arc<dyn Scope>>,
    relations: HashMap<String, Relation>,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        MemoryCollection {
            name: name.into(),
            records: RwLock::new(Vec::new()),
            scopes: HashMap::new(),
            relations: HashMap::new(),
        }
    }

    pub fn with_records(self, records: Vec<Record>) -> Self {
        *self.write() = records;
        self
    }

    pub fn with_scope(mut self, name: impl Into<String>, scope: impl Scope + 'static) -> Self {
        self.scopes.insert(name.into(), Arc::new(scope));
        self
    }

    /// Shorthand for a [`BelongsToScope`] on `column`.
    pub fn with_belongs_to(self, name: impl Into<String>, column: impl Into<String>) -> Self {
        self.with_scope(name, BelongsToScope::new(column))
    }

    pub fn with_relation(
        mut self,
        name: impl Into<String>,
        direction: IncludeDirection,
        related: Arc<MemoryCollection>,
        our_key: impl Into<String>,
        their_key: impl Into<String>,
    ) -> Self {
        self.relations.insert(
            name.into(),
            Relation {
                direction,
                related,
                our_key: our_key.into(),
                their_key: their_key.into(),
            },
        );
        self
    }

    pub fn insert(&self, record: Record) {
        self.write().push(record);
    }

    pub fn all(&self) -> Vec<Record> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn find(&self, column: &str, value: &Value) -> Option<Record> {
        self.read().iter().find(|r| loose_eq(field(r, column), value)).cloned()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Record>> {
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Record>> {
        self.records.write().unwrap_or_else(|e| e.into_inner())
    }

    fn matching(&self, query: &Query) -> Vec<Record> {
        let mut rows: Vec<Record> = self.read().iter().filter(|r| query.matches(r)).cloned().collect();
        if !query.order.is_empty() {
            rows.sort_by(|a, b| {
                for o in &query.order {
                    let ord = compare_values(field(a, &o.column), field(b, &o.column));
                    let ord = match o.direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }
        rows
    }

    fn attach_includes(&self, rows: &mut [Record], includes: &[String]) {
        for name in includes {
            let Some(rel) = self.relations.get(name) else {
                tracing::debug!(collection = %self.name, include = %name, "unknown relation ignored");
                continue;
            };
            let related = rel.related.all();
            for row in rows.iter_mut() {
                let key = field(row, &rel.our_key).clone();
                let mut hits = related
                    .iter()
                    .filter(|r| !key.is_null() && loose_eq(field(r, &rel.their_key), &key))
                    .cloned();
                let loaded = match rel.direction {
                    IncludeDirection::ToOne => hits.next().unwrap_or(Value::Null),
                    IncludeDirection::ToMany => Value::Array(hits.collect()),
                };
                if let Value::Object(map) = row {
                    map.insert(name.clone(), loaded);
                }
            }
        }
    }
}

#[async_trait]
impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self, name: &str) -> Option<Arc<dyn Scope>> {
        self.scopes.get(name).cloned()
    }

    async fn count(&self, query: &Query) -> Result<u64, AppError> {
        Ok(self.read().iter().filter(|r| query.matches(r)).count() as u64)
    }

    async fn fetch(&self, query: &Query, window: Option<Window>) -> Result<Vec<Record>, AppError> {
        let rows = self.matching(query);
        let mut rows: Vec<Record> = match window {
            Some(w) => rows
                .into_iter()
                .skip(w.offset as usize)
                .take(w.limit as usize)
                .collect(),
            None => rows,
        };
        self.attach_includes(&mut rows, &query.includes);
        Ok(rows)
    }

    async fn delete(&self, identifier_field: &str, id: &Value) -> Result<bool, AppError> {
        let mut records = self.write();
        match records.iter().position(|r| loose_eq(field(r, identifier_field), id)) {
            Some(pos) => {
                records.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn posts() -> MemoryCollection {
        MemoryCollection::new("posts").with_records(vec![
            json!({"id": 1, "title": "B", "status": "draft"}),
            json!({"id": 2, "title": "A", "status": "published"}),
            json!({"id": 3, "title": "C", "status": "published"}),
        ])
    }

    #[tokio::test]
    async fn fetch_filters_sorts_and_windows() {
        let c = posts();
        let mut q = Query::new();
        q.where_eq("status", json!("published")).order_by("title", SortDirection::Desc);
        let rows = c.fetch(&q, Some(Window { offset: 0, limit: 1 })).await.unwrap();
        assert_eq!(rows, vec![json!({"id": 3, "title": "C", "status": "published"})]);
        assert_eq!(c.count(&q).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn includes_load_to_many_and_to_one() {
        let comments = Arc::new(MemoryCollection::new("comments").with_records(vec![
            json!({"id": 10, "post_id": 1}),
            json!({"id": 11, "post_id": 1}),
            json!({"id": 12, "post_id": 2}),
        ]));
        let c = posts().with_relation("comments", IncludeDirection::ToMany, comments.clone(), "id", "post_id");
        let mut q = Query::new();
        q.where_eq("id", json!(1)).with(["comments", "unknown"]);
        let rows = c.fetch(&q, None).await.unwrap();
        assert_eq!(rows[0]["comments"].as_array().map(Vec::len), Some(2));
        assert!(rows[0].get("unknown").is_none());

        let back = MemoryCollection::new("comments")
            .with_records(comments.all())
            .with_relation("post", IncludeDirection::ToOne, Arc::new(posts()), "post_id", "id");
        let mut q = Query::new();
        q.where_eq("id", json!(12)).with(["post"]);
        let rows = back.fetch(&q, None).await.unwrap();
        assert_eq!(rows[0]["post"]["title"], json!("A"));
    }

    #[tokio::test]
    async fn delete_removes_one_record() {
        let c = posts();
        assert!(c.delete("id", &json!("2")).await.unwrap());
        assert!(!c.delete("id", &json!(2)).await.unwrap());
        assert_eq!(c.len(), 2);
        assert!(c.find("id", &json!(2)).is_none());
    }

    #[test]
    fn missing_scope_is_none() {
        let c = posts().with_belongs_to("post", "post_id");
        assert!(c.scope("post").is_some());
        assert!(c.scope("author").is_none());
    }
}
