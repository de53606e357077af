// handlers/web/login.rs - GET /login, POST /login-auth, GET /logout handlers

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{AuthProvider, Credentials, SessionStore};
use crate::error::PageError;
use crate::middleware::found;
use crate::render::LOGIN;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn render_login(state: &AppState, error: Option<&str>) -> Result<String, PageError> {
    Ok(state
        .templates
        .render(LOGIN, &json!({ "title": "Login", "error": error }))?)
}

/// GET /login - login form
pub async fn login_form(State(state): State<AppState>) -> Result<Html<String>, PageError> {
    Ok(Html(render_login(&state, None)?))
}

/// POST /login-auth - check the credentials and open a session
pub async fn login_auth(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, PageError> {
    let credentials = Credentials::password(form.username.trim(), form.password);

    match state.realm.authenticate(&credentials).await {
        Ok(subject) => {
            let session_id = state.sessions.create(&subject.username).await;
            tracing::info!("'{}' signed in", subject.username);
            let mut response = found("/");
            if let Ok(cookie) = SessionStore::cookie(&session_id).parse::<HeaderValue>() {
                response.headers_mut().insert(header::SET_COOKIE, cookie);
            }
            Ok(response)
        }
        Err(e) => {
            tracing::warn!("Login failed for '{}': {}", form.username, e);
            let html = render_login(&state, Some("Invalid username or password"))?;
            Ok((StatusCode::UNAUTHORIZED, Html(html)).into_response())
        }
    }
}

/// GET /logout - drop the session (if any) and go home
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session_id = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(SessionStore::id_from_cookie_header);
    if let Some(id) = session_id {
        state.sessions.remove(&id).await;
    }

    let mut response = found("/");
    if let Ok(cookie) = SessionStore::expired_cookie().parse::<HeaderValue>() {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}
