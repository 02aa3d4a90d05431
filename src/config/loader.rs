//! Load entity definitions from JSON and resolve them into a runtime model.

use crate::config::resolved::{ColumnInfo, IncludeSpec, ResolvedEntity, ResolvedModel, ScopeSpec};
use crate::config::{validate, EntityConfig};
use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::Path;

/// Default PostgreSQL schema for entities that omit one. From env `RESOURCE_KIT_SCHEMA`, default `public`.
pub fn default_schema() -> String {
    std::env::var("RESOURCE_KIT_SCHEMA").unwrap_or_else(|_| "public".into())
}

/// Read `entities.json` (a JSON array of [`EntityConfig`]) from `dir`.
pub async fn load_from_path(dir: impl AsRef<Path>) -> Result<Vec<EntityConfig>, ConfigError> {
    let path = dir.as_ref().join("entities.json");
    let raw = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse_entities(&raw)
}

pub fn parse_entities(raw: &str) -> Result<Vec<EntityConfig>, ConfigError> {
    serde_json::from_str(raw).map_err(|e| ConfigError::Load(e.to_string()))
}

/// Build resolved model from entity configs (validates first).
pub fn resolve(entities: &[EntityConfig]) -> Result<ResolvedModel, ConfigError> {
    validate(entities)?;
    let default_schema = default_schema();

    let mut resolved = Vec::with_capacity(entities.len());
    let mut entity_by_name = HashMap::new();
    for e in entities {
        let entity = ResolvedEntity {
            name: e.name.clone(),
            schema_name: e.schema.clone().unwrap_or_else(|| default_schema.clone()),
            table_name: e.table.clone(),
            pk_column: e.primary_key.clone(),
            columns: e
                .columns
                .iter()
                .map(|c| ColumnInfo {
                    name: c.name.clone(),
                    pg_type: c.type_.clone(),
                })
                .collect(),
            includes: e
                .includes
                .iter()
                .map(|i| IncludeSpec {
                    name: i.name.clone(),
                    direction: i.direction,
                    related_entity: i.entity.clone(),
                    our_key_column: i.our_key.clone(),
                    their_key_column: i.their_key.clone(),
                })
                .collect(),
            scopes: e
                .scopes
                .iter()
                .map(|s| ScopeSpec {
                    name: s.name.clone(),
                    column: s.column.clone(),
                })
                .collect(),
            list: e.list.clone(),
            actions: e.actions.clone(),
        };
        entity_by_name.insert(entity.name.clone(), entity.clone());
        resolved.push(entity);
    }
    tracing::debug!(entities = resolved.len(), "resolved entity model");
    Ok(ResolvedModel {
        entities: resolved,
        entity_by_name,
    })
}
