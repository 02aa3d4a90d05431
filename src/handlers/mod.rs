//! HTTP handlers for resource listing and bulk actions.

pub mod resource;
pub use resource::*;
