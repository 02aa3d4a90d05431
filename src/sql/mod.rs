//! PostgreSQL statements for a [`crate::query::Query`]. Identifiers come from resolved config;
//! every value is a bound text parameter.

mod builder;
mod params;
pub use builder::{count, delete_by, select, IncludeSelect, QueryBuf};
pub use params::to_text_param;
