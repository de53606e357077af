// handlers/web/actions.rs - POST /action/{save,create,delete} handlers

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use serde::Deserialize;

use super::page_location;
use crate::auth::{require, Capability, Subject};
use crate::error::{ApiError, PageError};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct SaveForm {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub markdown: String,
    #[serde(rename = "newPage", default)]
    pub new_page: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateForm {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    #[serde(default)]
    pub id: String,
}

fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::validation(format!("Invalid page id '{}'", raw)))
}

fn required_title(raw: &str) -> Result<&str, ApiError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ApiError::validation("Page title is required"));
    }
    Ok(title)
}

/// POST /action/save - create (newPage=yes) or update a page, then 303 to it
pub async fn save(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Form(form): Form<SaveForm>,
) -> Result<Response, PageError> {
    let realm = &*state.realm;
    let title = required_title(&form.title)?;

    if form.new_page == "yes" {
        require(realm, &subject, Capability::Create).await?;
        state.pages.create_page(title, &form.markdown).await?;
    } else {
        let id = parse_id(&form.id)?;
        require(realm, &subject, Capability::Update).await?;
        state.pages.save_page(id, &form.markdown).await?;
    }

    Ok(Redirect::to(&page_location(title)).into_response())
}

/// POST /action/create - nothing is stored yet; 303 to the (new) page
pub async fn create(Form(form): Form<CreateForm>) -> Redirect {
    let name = form.name.trim();
    if name.is_empty() {
        Redirect::to("/")
    } else {
        Redirect::to(&page_location(name))
    }
}

/// POST /action/delete - remove a page, then 303 to the index
pub async fn delete(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Form(form): Form<DeleteForm>,
) -> Result<Redirect, PageError> {
    let id = parse_id(&form.id)?;
    require(&*state.realm, &subject, Capability::Delete).await?;
    state.pages.delete_page(id).await?;
    Ok(Redirect::to("/"))
}
