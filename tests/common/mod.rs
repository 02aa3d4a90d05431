#![allow(dead_code)]

use resource_kit::storage::IncludeDirection;
use resource_kit::{MemoryCollection, Principal, Record};
use serde_json::{json, Value};
use std::sync::Arc;

/// `count` posts with ids 1..=count. Even ids are published; `user_id` cycles 1, 2, 3.
pub fn post_records(count: i64) -> Vec<Record> {
    (1..=count)
        .map(|i| {
            json!({
                "id": i,
                "title": format!("Post {}", i),
                "user_id": 1 + i % 3,
                "published": i % 2 == 0,
            })
        })
        .collect()
}

pub fn comments() -> Arc<MemoryCollection> {
    Arc::new(
        MemoryCollection::new("comments")
            .with_belongs_to("post", "post_id")
            .with_records(vec![
                json!({"id": 1, "post_id": 1, "body": "first"}),
                json!({"id": 2, "post_id": 1, "body": "second"}),
                json!({"id": 3, "post_id": 2, "body": "third"}),
            ]),
    )
}

pub fn posts(count: i64) -> Arc<MemoryCollection> {
    Arc::new(
        MemoryCollection::new("posts")
            .with_records(post_records(count))
            .with_relation("comments", IncludeDirection::ToMany, comments(), "id", "post_id"),
    )
}

pub fn ids(records: &[Record]) -> Vec<i64> {
    records.iter().filter_map(|r| r.get("id").and_then(Value::as_i64)).collect()
}

/// Allows every ability except on the listed record ids.
pub struct DenyIds(pub Vec<i64>);

impl Principal for DenyIds {
    fn can(&self, _ability: &str, record: &Record) -> bool {
        let id = record.get("id").and_then(Value::as_i64);
        !id.map_or(false, |id| self.0.contains(&id))
    }
}

pub fn user() -> Arc<dyn Principal> {
    denying(Vec::new())
}

pub fn denying(ids: Vec<i64>) -> Arc<dyn Principal> {
    Arc::new(DenyIds(ids))
}
