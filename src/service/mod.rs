//! List and bulk-action services.

mod action;
mod list;
pub use action::{ActionRequest, ActionService};
pub use list::{ListResults, ListService, Page, PaginatedResults};
