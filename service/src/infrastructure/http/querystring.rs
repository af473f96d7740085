use std::ops::Deref;

use axum::extract::FromRequestParts;
use axum::http::{StatusCode, request::Parts};
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde_querystring::ParseMode;

/// Query-string extractor on top of `serde_querystring`, tolerant of
/// duplicate keys the way the rest of the stack expects.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryString<T>(pub T);

impl<T, S> FromRequestParts<S> for QueryString<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = parts.uri.query().unwrap_or_default();
        let value = serde_querystring::from_str(query, ParseMode::Duplicate).map_err(|_| {
            (
                StatusCode::BAD_REQUEST,
                String::from("Failed to deserialize query string"),
            )
                .into_response()
        })?;
        Ok(QueryString(value))
    }
}

impl<T> Deref for QueryString<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
