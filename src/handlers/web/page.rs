// handlers/web/page.rs - GET /wiki/:page handler

use axum::{
    extract::{Path, State},
    response::Html,
    Extension,
};
use serde_json::json;

use crate::auth::{pipeline, Capability, Subject};
use crate::error::PageError;
use crate::render::{markdown::NEW_PAGE_MARKDOWN, markdown_to_html, PAGE};
use crate::server::AppState;

/// GET /wiki/:page - render a page, or the new-page placeholder when absent
///
/// The update and delete checks run side by side before the page is fetched.
pub async fn page_view(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Path(page): Path<String>,
) -> Result<Html<String>, PageError> {
    let realm = &*state.realm;
    let (can_save, can_delete) = futures::join!(
        pipeline::check(realm, &subject, Capability::Update),
        pipeline::check(realm, &subject, Capability::Delete),
    );

    let lookup = state.pages.fetch_page(&page).await?;
    let found = lookup.found;
    let raw_content = lookup
        .raw_content
        .unwrap_or_else(|| NEW_PAGE_MARKDOWN.to_string());

    let html = state.templates.render(
        PAGE,
        &json!({
            "title": page,
            "id": lookup.id.unwrap_or(-1),
            "newPage": if found { "no" } else { "yes" },
            "content": markdown_to_html(&raw_content),
            "rawContent": raw_content,
            "timestamp": chrono::Utc::now().to_rfc2822(),
            "username": subject.username,
            "canSavePage": can_save,
            "canDeletePage": can_delete,
        }),
    )?;
    Ok(Html(html))
}
