// handlers/api/token.rs - GET /api/token handler

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
};

use crate::auth::{resolve_grants, AuthProvider, Credentials, Subject};
use crate::error::ApiError;
use crate::server::AppState;

fn header_value(headers: &HeaderMap, name: &str) -> Result<String, ApiError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| ApiError::unauthorized(format!("Missing '{}' header", name)))
}

/**
 * GET /api/token - exchange credentials for a bearer token
 *
 * Credentials come in the `login` and `password` headers. The three page
 * capabilities are resolved concurrently and frozen into the token claims.
 *
 * Output: the signed JWT as `text/plain`.
 */
pub async fn token(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, ApiError> {
    let login = header_value(&headers, "login")?;
    let password = header_value(&headers, "password")?;

    let subject = state
        .realm
        .authenticate(&Credentials::password(login, password))
        .await
        .map_err(|e| {
            tracing::warn!("Token request rejected: {}", e);
            ApiError::unauthorized("Invalid username or password")
        })?;

    let grants = resolve_grants(&*state.realm, &subject).await;
    let token = state.tokens.issue(&Subject::new(subject.username, grants))?;

    Ok(([(header::CONTENT_TYPE, "text/plain")], token))
}
