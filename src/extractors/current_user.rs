//! Acting user, as inserted into request extensions by authentication middleware.

use crate::action::Principal;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

/// Request extension carrying the authenticated principal. Authentication layers insert it;
/// this crate only reads it.
#[derive(Clone)]
pub struct CurrentUser(pub Arc<dyn Principal>);

/// Extractor for the optional acting user. Never rejects: anonymous requests yield `None`.
#[derive(Clone)]
pub struct MaybeUser(pub Option<Arc<dyn Principal>>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<CurrentUser>().map(|u| u.0.clone())))
    }
}
