use std::ops::Deref;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use serde_querystring::ParseMode;

use crate::infrastructure::http::api::ApiError;

/// Query string extractor tolerant of repeated keys (`?a=1&a=2`).
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryString<T>(pub T);

impl<T, S> FromRequestParts<S> for QueryString<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = parts.uri.query().unwrap_or_default();
        serde_querystring::from_str(query, ParseMode::Duplicate)
            .map(QueryString)
            .map_err(|e| {
                tracing::debug!(query, error = %e, "rejected query string");
                ApiError::BadRequest("Failed to deserialize query string".to_string())
            })
    }
}

impl<T> Deref for QueryString<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
