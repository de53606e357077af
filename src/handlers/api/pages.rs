// handlers/api/pages.rs - /api/pages CRUD handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::{require, Capability, Subject};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::render::markdown_to_html;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePageRequest {
    pub name: String,
    pub markdown: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePageRequest {
    pub markdown: String,
}

#[derive(Debug, Serialize)]
pub struct PageSummary {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct PageList {
    pub pages: Vec<PageSummary>,
}

#[derive(Debug, Serialize)]
pub struct PageDetail {
    pub id: i64,
    pub name: String,
    pub markdown: String,
    pub html: String,
}

#[derive(Debug, Serialize)]
pub struct PageEnvelope {
    pub page: PageDetail,
}

fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::validation(format!("Invalid page id '{}'", raw)))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        tracing::debug!("Rejected API payload: {}", rejection);
        ApiError::validation("Bad request payload")
    })
}

/// GET /api/pages - `{success, pages: [{id, name}]}`
pub async fn list(State(state): State<AppState>) -> ApiResult<PageList> {
    let mut pages: Vec<PageSummary> = state
        .pages
        .list_all_page_data()
        .await?
        .into_iter()
        .map(|page| PageSummary {
            id: page.id,
            name: page.name,
        })
        .collect();
    pages.sort_by_key(|page| page.id);

    Ok(ApiResponse::success(PageList { pages }))
}

/// GET /api/pages/:id - `{success, page: {id, name, markdown, html}}`
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<PageEnvelope> {
    let id = parse_id(&id)?;

    let record = state
        .pages
        .fetch_page_by_id(id)
        .await?
        .into_record()
        .ok_or_else(|| ApiError::not_found(format!("There is no page with ID {}", id)))?;

    Ok(ApiResponse::success(PageEnvelope {
        page: PageDetail {
            id: record.id,
            html: markdown_to_html(&record.content),
            name: record.name,
            markdown: record.content,
        },
    }))
}

/// POST /api/pages - body `{name, markdown}`; 201 on success
pub async fn create(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    payload: Result<Json<CreatePageRequest>, JsonRejection>,
) -> ApiResult<()> {
    let request = body(payload)?;
    if request.name.trim().is_empty() {
        return Err(ApiError::validation("Page name must not be empty"));
    }

    require(&*state.tokens, &subject, Capability::Create).await?;
    state.pages.create_page(&request.name, &request.markdown).await?;

    Ok(ApiResponse::created(()))
}

/// PUT /api/pages/:id - body `{markdown}`; 404 when the page does not exist
pub async fn update(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePageRequest>, JsonRejection>,
) -> ApiResult<()> {
    let id = parse_id(&id)?;
    let request = body(payload)?;

    require(&*state.tokens, &subject, Capability::Update).await?;
    state.pages.save_page(id, &request.markdown).await?;

    Ok(ApiResponse::ok())
}

/// DELETE /api/pages/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id)?;

    require(&*state.tokens, &subject, Capability::Delete).await?;
    state.pages.delete_page(id).await?;

    Ok(ApiResponse::ok())
}
