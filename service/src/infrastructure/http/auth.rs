use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::domain::AppState;
use crate::domain::identity::{Caller, identify};
use crate::domain::ids::UserId;
use crate::infrastructure::http::api::ApiError;

/// The signed-in user, resolved from the identity header set by the auth gateway.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Caller);

impl<S: AppState> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(state.identity_header())
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<UserId>().ok())
            .ok_or(ApiError::Unauthorized)?;

        let caller = identify(state.users(), user_id).await?;
        Ok(CurrentUser(caller))
    }
}
