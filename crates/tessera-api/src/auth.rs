//! Request authentication.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};

use tessera_core::User;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying a personal access token as an alternative to `Authorization`.
pub const PRIVATE_TOKEN_HEADER: &str = "private-token";

/// Token sent with the request, from `Authorization: Bearer` or `PRIVATE-TOKEN`.
pub fn request_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let private = headers
        .get(PRIVATE_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty());

    bearer.or(private).map(str::to_string)
}

/// Extractor that requires a signed-in user.
///
/// Rejects with `401` when no token is sent or the token does not resolve.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = request_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

        match state.users.find_by_token(&token).await? {
            Some(user) => Ok(CurrentUser(user)),
            None => {
                tracing::debug!(subsystem = "api", component = "auth", "Token rejected");
                Err(ApiError::Unauthorized("Invalid token".to_string()))
            }
        }
    }
}
