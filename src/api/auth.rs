//! Request identity
//!
//! Sessions are resolved upstream; by the time a request reaches this
//! server the authenticated user id travels in the `X-User-Id` header.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::responses::ApiError;
use crate::state::UserId;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("missing user identity".to_string()))?;

        raw.to_str()
            .ok()
            .and_then(|value| value.trim().parse::<UserId>().ok())
            .map(CurrentUser)
            .ok_or_else(|| ApiError::Unauthorized("invalid user identity".to_string()))
    }
}
