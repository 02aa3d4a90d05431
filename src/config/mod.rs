//! Service settings and PostgreSQL entity definitions: raw types, loading, validation, resolution.

pub mod loader;
pub mod resolved;
pub mod types;
pub mod validator;

pub use loader::{default_schema, load_from_path, parse_entities, resolve};
pub use resolved::{ColumnInfo, IncludeSpec, ResolvedEntity, ResolvedModel, ScopeSpec};
pub use types::{ActionSettings, ColumnConfig, EntityConfig, IncludeConfig, ListSettings, ScopeConfig};
pub use validator::validate;
