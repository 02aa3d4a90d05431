//! Resource routes. One parameterized set serves every registered resource; handlers resolve
//! the resource by path segment.

use crate::handlers::resource::{all_ids, find_including, handle_action, list};
use crate::state::AppState;
use axum::{routing::get, routing::post, Router};

pub fn resource_routes(state: AppState) -> Router {
    Router::new()
        .route("/:resource", get(list))
        .route("/:resource/ids", get(all_ids))
        .route("/:resource/actions", post(handle_action))
        .route("/:resource/:id", get(find_including))
        .with_state(state)
}
