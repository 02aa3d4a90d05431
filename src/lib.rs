//! Resource kit: declarative listing (filters, sorting, pagination, eager loading, scopes) and
//! bounded bulk actions over a storage collection.

pub mod action;
pub mod case;
pub mod config;
pub mod error;
pub mod extractors;
pub mod filter;
pub mod handlers;
pub mod query;
pub mod response;
pub mod result;
pub mod routes;
pub mod search;
pub mod service;
pub mod sql;
pub mod state;
pub mod storage;
pub mod validation;

pub use action::{ActionUnit, CrudAction, DeleteAction, Principal};
pub use config::{load_from_path, resolve, ActionSettings, EntityConfig, ListSettings, ResolvedEntity, ResolvedModel};
pub use error::{AppError, ConfigError};
pub use extractors::CurrentUser;
pub use filter::{ContainsFilter, CustomFilter, KeywordColumns, KeywordFilter};
pub use query::{Query, Record, SortDirection};
pub use result::ActionResult;
pub use routes::{common_routes, resource_routes};
pub use search::{Filter, NormalizedSearch, SearchConfiguration, SearchRequest};
pub use service::{ActionRequest, ActionService, ListResults, ListService};
pub use state::{AppState, Resource, ResourceRegistry};
pub use storage::{Collection, MemoryCollection, PgCollection};
