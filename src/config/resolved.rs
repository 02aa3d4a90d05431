//! Resolved entity model: config validated and flattened for runtime use.

use crate::config::{ActionSettings, ListSettings};
use crate::storage::IncludeDirection;
use std::collections::HashMap;

/// Spec for including a related entity in list/find responses.
#[derive(Clone, Debug)]
pub struct IncludeSpec {
    /// API name for the include.
    pub name: String,
    pub direction: IncludeDirection,
    /// Name of the related entity (for lookup in model).
    pub related_entity: String,
    /// Our column used in the join (our FK for to_one; our key for to_many).
    pub our_key_column: String,
    /// Their column used in the join (their key for to_one; their FK for to_many).
    pub their_key_column: String,
}

#[derive(Clone, Debug)]
pub struct ScopeSpec {
    pub name: String,
    pub column: String,
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    /// PostgreSQL type name for SQL casts when binding text parameters.
    pub pg_type: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub name: String,
    pub schema_name: String,
    pub table_name: String,
    pub pk_column: String,
    pub columns: Vec<ColumnInfo>,
    pub includes: Vec<IncludeSpec>,
    pub scopes: Vec<ScopeSpec>,
    pub list: ListSettings,
    pub actions: ActionSettings,
}

impl ResolvedEntity {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn include(&self, name: &str) -> Option<&IncludeSpec> {
        self.includes.iter().find(|i| i.name == name)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub entities: Vec<ResolvedEntity>,
    pub entity_by_name: HashMap<String, ResolvedEntity>,
}

impl ResolvedModel {
    pub fn entity(&self, name: &str) -> Option<&ResolvedEntity> {
        self.entity_by_name.get(name)
    }
}
