// handlers/web/index.rs - GET / handler

use axum::{extract::State, response::Html, Extension};
use serde_json::json;

use crate::auth::{pipeline, Capability, Subject};
use crate::error::PageError;
use crate::render::INDEX;
use crate::server::AppState;

/// GET / - list every page; the create form is shown only with the create grant
pub async fn index(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
) -> Result<Html<String>, PageError> {
    render_index(&state, &subject, None).await
}

/// Shared with the backup route, which re-renders the index with the backup URL
pub(super) async fn render_index(
    state: &AppState,
    subject: &Subject,
    backup_gist_url: Option<String>,
) -> Result<Html<String>, PageError> {
    let can_create = pipeline::check(&*state.realm, subject, Capability::Create).await;
    let pages = state.pages.list_page_names().await?;

    let html = state.templates.render(
        INDEX,
        &json!({
            "title": "Wiki home",
            "pages": pages,
            "canCreatePage": can_create,
            "username": subject.username,
            "backup_gist_url": backup_gist_url,
        }),
    )?;
    Ok(Html(html))
}
