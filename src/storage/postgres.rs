//! Collection backed by a PostgreSQL table described by a resolved entity.

use super::{BelongsToScope, Collection, Scope};
use crate::config::{ResolvedEntity, ResolvedModel};
use crate::error::{AppError, ConfigError};
use crate::query::{Query, Record, Window};
use crate::sql::{count, delete_by, select, to_text_param, IncludeSelect, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;

pub struct PgCollection {
    pool: PgPool,
    entity: ResolvedEntity,
    /// Related entities by include name.
    related: HashMap<String, ResolvedEntity>,
    scopes: HashMap<String, Arc<dyn Scope>>,
}

impl PgCollection {
    /// Collection for entity `name`; belongs-to scopes from config are registered.
    pub fn from_model(pool: PgPool, model: &ResolvedModel, name: &str) -> Result<Self, ConfigError> {
        let entity = model.entity(name).cloned().ok_or_else(|| ConfigError::MissingReference {
            kind: "entity",
            id: name.to_string(),
        })?;
        let mut related = HashMap::new();
        for inc in &entity.includes {
            let rel = model.entity(&inc.related_entity).cloned().ok_or_else(|| ConfigError::MissingReference {
                kind: "entity",
                id: inc.related_entity.clone(),
            })?;
            related.insert(inc.name.clone(), rel);
        }
        let mut scopes: HashMap<String, Arc<dyn Scope>> = HashMap::new();
        for s in &entity.scopes {
            scopes.insert(s.name.clone(), Arc::new(BelongsToScope::new(s.column.clone())));
        }
        Ok(PgCollection {
            pool,
            entity,
            related,
            scopes,
        })
    }

    pub fn with_scope(mut self, name: impl Into<String>, scope: impl Scope + 'static) -> Self {
        self.scopes.insert(name.into(), Arc::new(scope));
        self
    }

    pub fn entity(&self) -> &ResolvedEntity {
        &self.entity
    }

    fn include_selects(&self, names: &[String]) -> Vec<IncludeSelect<'_>> {
        names
            .iter()
            .filter_map(|name| {
                let spec = self.entity.include(name);
                let related = self.related.get(name);
                match (spec, related) {
                    (Some(spec), Some(related)) => Some(IncludeSelect {
                        name: &spec.name,
                        direction: spec.direction,
                        related,
                        our_key: &spec.our_key_column,
                        their_key: &spec.their_key_column,
                    }),
                    _ => {
                        tracing::debug!(entity = %self.entity.name, include = %name, "unknown relation ignored");
                        None
                    }
                }
            })
            .collect()
    }

    fn bind_all<'q>(
        mut query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
        params: &[Value],
    ) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
        for p in params {
            query = query.bind(to_text_param(p));
        }
        query
    }
}

#[async_trait]
impl Collection for PgCollection {
    fn name(&self) -> &str {
        &self.entity.name
    }

    fn scope(&self, name: &str) -> Option<Arc<dyn Scope>> {
        self.scopes.get(name).cloned()
    }

    async fn count(&self, query: &Query) -> Result<u64, AppError> {
        let q = count(&self.entity, query);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = Self::bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_one(&self.pool)
            .await?;
        let n: i64 = sqlx::Row::try_get(&row, 0)?;
        Ok(n.max(0) as u64)
    }

    async fn fetch(&self, query: &Query, window: Option<Window>) -> Result<Vec<Record>, AppError> {
        let includes = self.include_selects(&query.includes);
        let q: QueryBuf = select(&self.entity, query, &includes, window);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = Self::bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn delete(&self, identifier_field: &str, id: &Value) -> Result<bool, AppError> {
        if self.entity.column(identifier_field).is_none() {
            return Err(ConfigError::MissingReference {
                kind: "column",
                id: format!("{}.{}", self.entity.name, identifier_field),
            }
            .into());
        }
        let q = delete_by(&self.entity, identifier_field, id);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let done = Self::bind_all(sqlx::query(&q.sql), &q.params)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}

fn row_to_json(row: &sqlx::postgres::PgRow) -> Value {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        let v = cell_to_value(row, name);
        map.insert(name.to_string(), v);
    }
    Value::Object(map)
}

fn cell_to_value(row: &sqlx::postgres::PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<serde_json::Value>, _>(name) {
        return j;
    }
    Value::Null
}
