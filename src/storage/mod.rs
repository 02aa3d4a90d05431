//! Storage collaborator: the contract services use to count, fetch and delete records.

mod memory;
mod postgres;

pub use memory::{MemoryCollection, Relation};
pub use postgres::PgCollection;

use crate::error::AppError;
use crate::query::{Query, Record, Window};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Direction of an eager-loaded relation: to_one (we hold the key to them) or to_many
/// (they hold a key to us).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludeDirection {
    ToOne,
    ToMany,
}

/// Named narrowing predicate defined on a collection and invoked by name with one argument.
pub trait Scope: Send + Sync {
    fn apply(&self, query: &mut Query, argument: &Value);
}

impl<F> Scope for F
where
    F: Fn(&mut Query, &Value) + Send + Sync,
{
    fn apply(&self, query: &mut Query, argument: &Value) {
        self(query, argument)
    }
}

/// `column = argument`. The usual shape of a belongs-to scope (e.g. comments of one post).
#[derive(Clone, Debug)]
pub struct BelongsToScope {
    pub column: String,
}

impl BelongsToScope {
    pub fn new(column: impl Into<String>) -> Self {
        BelongsToScope { column: column.into() }
    }
}

impl Scope for BelongsToScope {
    fn apply(&self, query: &mut Query, argument: &Value) {
        query.where_eq(self.column.clone(), argument.clone());
    }
}

/// A named data set the services operate over.
///
/// Every call is a single atomic request to the backend; retries, pooling and transactions
/// belong to the implementation.
#[async_trait]
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    /// Named scope, or `None` when the collection does not define it.
    fn scope(&self, name: &str) -> Option<Arc<dyn Scope>>;

    async fn count(&self, query: &Query) -> Result<u64, AppError>;

    /// Matching records in query order, with requested includes attached.
    async fn fetch(&self, query: &Query, window: Option<Window>) -> Result<Vec<Record>, AppError>;

    /// Delete the record whose `identifier_field` equals `id`. Returns whether a row was removed.
    async fn delete(&self, identifier_field: &str, id: &Value) -> Result<bool, AppError>;
}
