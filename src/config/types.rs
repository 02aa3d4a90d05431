//! Raw config types: service settings and PostgreSQL entity definitions, as read from JSON.

use crate::storage::IncludeDirection;
use serde::{Deserialize, Serialize};

fn default_identifier_field() -> String {
    "id".into()
}

fn default_true() -> bool {
    true
}

fn default_per_page() -> u32 {
    10
}

fn default_max_models_per_action() -> usize {
    100
}

/// Knobs of a [`crate::service::ListService`]. Absent allow-lists mean "everything permitted".
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSettings {
    #[serde(default = "default_identifier_field", alias = "identifier_field")]
    pub identifier_field: String,
    #[serde(default = "default_true")]
    pub paginated: bool,
    #[serde(default = "default_per_page", alias = "per_page")]
    pub per_page: u32,
    #[serde(default, alias = "available_filter_columns")]
    pub available_filter_columns: Option<Vec<String>>,
    #[serde(default, alias = "available_scopes")]
    pub available_scopes: Option<Vec<String>>,
    #[serde(default, alias = "available_includes")]
    pub available_includes: Option<Vec<String>>,
    #[serde(default, alias = "max_per_page")]
    pub max_per_page: Option<u32>,
    #[serde(default, alias = "max_filters")]
    pub max_filters: Option<usize>,
}

impl Default for ListSettings {
    fn default() -> Self {
        ListSettings {
            identifier_field: default_identifier_field(),
            paginated: true,
            per_page: default_per_page(),
            available_filter_columns: None,
            available_scopes: None,
            available_includes: None,
            max_per_page: None,
            max_filters: None,
        }
    }
}

/// Knobs of a [`crate::service::ActionService`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSettings {
    #[serde(default = "default_identifier_field", alias = "identifier_field")]
    pub identifier_field: String,
    #[serde(default = "default_max_models_per_action", alias = "max_models_per_action")]
    pub max_models_per_action: usize,
}

impl Default for ActionSettings {
    fn default() -> Self {
        ActionSettings {
            identifier_field: default_identifier_field(),
            max_models_per_action: default_max_models_per_action(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    /// PostgreSQL type used to cast bound text parameters (e.g. "int8", "timestamptz").
    #[serde(default, rename = "type")]
    pub type_: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IncludeConfig {
    pub name: String,
    /// Name of the related entity.
    pub entity: String,
    pub direction: IncludeDirection,
    pub our_key: String,
    pub their_key: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScopeConfig {
    pub name: String,
    /// Column compared with the scope argument.
    pub column: String,
}

/// One table exposed as a collection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityConfig {
    pub name: String,
    #[serde(default)]
    pub schema: Option<String>,
    pub table: String,
    #[serde(default = "default_identifier_field")]
    pub primary_key: String,
    pub columns: Vec<ColumnConfig>,
    #[serde(default)]
    pub includes: Vec<IncludeConfig>,
    #[serde(default)]
    pub scopes: Vec<ScopeConfig>,
    #[serde(default)]
    pub list: ListSettings,
    #[serde(default)]
    pub actions: ActionSettings,
}
