use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::SessionStore;
use crate::server::AppState;

/// 302 to `location`
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Session middleware for the browser routes.
///
/// Resolves the session cookie to a username, then re-reads that user's
/// capabilities from the realm so grants are never cached in the session.
/// Anything short of a live session for a known user goes to `/login`.
pub async fn require_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let session_id = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(SessionStore::id_from_cookie_header);

    let Some(session_id) = session_id else {
        return found("/login");
    };
    let Some(username) = state.sessions.username(&session_id).await else {
        return found("/login");
    };

    match state.realm.subject_for(&username) {
        Ok(subject) => {
            request.extensions_mut().insert(subject);
            request.extensions_mut().insert(session_id);
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!("Session for '{}' no longer resolves: {}", username, e);
            state.sessions.remove(&session_id).await;
            found("/login")
        }
    }
}
