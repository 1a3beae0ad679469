//! Report sections. A section optionally belongs to a category and groups items.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};

use super::categories::MAX_NAME_LEN;
use super::error::{ApiError, ResultExt, require_max_len, require_non_blank};
use super::extract::{Json, Path};
use super::items::ItemResponse;
use crate::auth::Auth;
use crate::db::{Database, DeleteOutcome, Section, SectionInput};

#[derive(Clone)]
pub struct SectionsState {
    pub db: Database,
}

pub fn router(state: SectionsState) -> Router {
    Router::new()
        .route("/", get(list_sections).post(create_section))
        .route("/category/{category_id}", get(list_by_category))
        .route(
            "/{id}",
            get(get_section).put(update_section).delete(delete_section),
        )
        .route("/{id}/items", get(get_section_with_items))
        .with_state(state)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SectionRequest {
    #[serde(default)]
    name: String,
    icon: Option<String>,
    description: Option<String>,
    category_id: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SectionResponse {
    id: i64,
    name: String,
    icon: Option<String>,
    description: Option<String>,
    category_id: Option<i64>,
    category_name: Option<String>,
}

impl From<Section> for SectionResponse {
    fn from(s: Section) -> Self {
        Self {
            id: s.id,
            name: s.name,
            icon: s.icon,
            description: s.description,
            category_id: s.category_id,
            category_name: s.category_name,
        }
    }
}

#[derive(Serialize)]
struct SectionWithItemsResponse {
    #[serde(flatten)]
    section: SectionResponse,
    items: Vec<ItemResponse>,
}

/// Validate the request and make sure the referenced category exists.
async fn to_input(db: &Database, req: SectionRequest) -> Result<SectionInput, ApiError> {
    require_non_blank(&req.name, "Section name")?;
    require_max_len(&req.name, "Section name", MAX_NAME_LEN)?;

    if let Some(category_id) = req.category_id {
        db.categories()
            .get(category_id)
            .await
            .db_err("Failed to get category")?
            .ok_or_else(|| ApiError::not_found("Category not found"))?;
    }

    Ok(SectionInput {
        name: req.name.trim().to_string(),
        icon: req.icon,
        description: req.description,
        category_id: req.category_id,
    })
}

async fn load(db: &Database, id: i64) -> Result<Section, ApiError> {
    db.sections()
        .get(id)
        .await
        .db_err("Failed to get section")?
        .ok_or_else(|| ApiError::not_found("Section not found"))
}

fn to_json(sections: Vec<Section>) -> Json<Vec<SectionResponse>> {
    Json(sections.into_iter().map(SectionResponse::from).collect())
}

async fn list_sections(
    State(state): State<SectionsState>,
    Auth(_caller): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let sections = state
        .db
        .sections()
        .list()
        .await
        .db_err("Failed to list sections")?;
    Ok(to_json(sections))
}

async fn list_by_category(
    State(state): State<SectionsState>,
    Auth(_caller): Auth,
    Path(category_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let sections = state
        .db
        .sections()
        .list_by_category(category_id)
        .await
        .db_err("Failed to list sections")?;
    Ok(to_json(sections))
}

async fn get_section(
    State(state): State<SectionsState>,
    Auth(_caller): Auth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(SectionResponse::from(load(&state.db, id).await?)))
}

async fn get_section_with_items(
    State(state): State<SectionsState>,
    Auth(_caller): Auth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let section = load(&state.db, id).await?;
    let items = state
        .db
        .items()
        .list_by_section(id)
        .await
        .db_err("Failed to list items")?;

    Ok(Json(SectionWithItemsResponse {
        section: section.into(),
        items: items.into_iter().map(ItemResponse::from).collect(),
    }))
}

async fn create_section(
    State(state): State<SectionsState>,
    Auth(_caller): Auth,
    Json(req): Json<SectionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = to_input(&state.db, req).await?;
    let id = state
        .db
        .sections()
        .create(&input)
        .await
        .db_err("Failed to create section")?;

    let section = load(&state.db, id).await?;
    Ok((StatusCode::CREATED, Json(SectionResponse::from(section))))
}

/// Replace a section. An omitted category detaches it from its category.
async fn update_section(
    State(state): State<SectionsState>,
    Auth(_caller): Auth,
    Path(id): Path<i64>,
    Json(req): Json<SectionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    load(&state.db, id).await?;
    let input = to_input(&state.db, req).await?;
    state
        .db
        .sections()
        .update(id, &input)
        .await
        .db_err("Failed to update section")?;

    Ok(Json(SectionResponse::from(load(&state.db, id).await?)))
}

async fn delete_section(
    State(state): State<SectionsState>,
    Auth(_caller): Auth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    match state
        .db
        .sections()
        .delete(id)
        .await
        .db_err("Failed to delete section")?
    {
        DeleteOutcome::Deleted => Ok(StatusCode::NO_CONTENT),
        DeleteOutcome::NotFound => Err(ApiError::not_found("Section not found")),
        DeleteOutcome::HasChildren => Err(ApiError::conflict(
            "Section still has items; delete them first",
        )),
    }
}
