// handlers/web/backup.rs - GET /action/backup handler

use axum::{extract::State, response::Html, Extension};

use super::index::render_index;
use crate::auth::Subject;
use crate::error::PageError;
use crate::server::AppState;

/// GET /action/backup - snapshot every page to the backup endpoint and show
/// the index with the resulting URL. Any upstream failure is one 502.
pub async fn backup(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
) -> Result<Html<String>, PageError> {
    let pages = state.pages.list_all_page_data().await?;
    let url = state.backup.backup(&pages).await?;
    render_index(&state, &subject, Some(url)).await
}
