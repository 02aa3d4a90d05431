//! Request extractors.

mod current_user;
mod search_params;
pub use current_user::{CurrentUser, MaybeUser};
pub use search_params::SearchParams;
