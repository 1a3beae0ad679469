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
use crate::auth::Auth;
use crate::db::{Database, DeleteOutcome, Item, ItemInput};

#[derive(Clone)]
pub struct ItemsState {
    pub db: Database,
}

pub fn router(state: ItemsState) -> Router {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/section/{section_id}", get(list_by_section))
        .route(
            "/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .with_state(state)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemRequest {
    #[serde(default)]
    name: String,
    description: Option<String>,
    icon: Option<String>,
    section_id: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ItemResponse {
    id: i64,
    name: String,
    description: Option<String>,
    icon: Option<String>,
    section_id: Option<i64>,
    section_name: Option<String>,
}

impl From<Item> for ItemResponse {
    fn from(i: Item) -> Self {
        Self {
            id: i.id,
            name: i.name,
            description: i.description,
            icon: i.icon,
            section_id: i.section_id,
            section_name: i.section_name,
        }
    }
}

async fn to_input(db: &Database, req: ItemRequest) -> Result<ItemInput, ApiError> {
    require_non_blank(&req.name, "Item name")?;
    require_max_len(&req.name, "Item name", MAX_NAME_LEN)?;

    if let Some(section_id) = req.section_id {
        db.sections()
            .get(section_id)
            .await
            .db_err("Failed to get section")?
            .ok_or_else(|| ApiError::not_found("Section not found"))?;
    }

    Ok(ItemInput {
        name: req.name.trim().to_string(),
        description: req.description,
        icon: req.icon,
        section_id: req.section_id,
    })
}

async fn load(db: &Database, id: i64) -> Result<Item, ApiError> {
    db.items()
        .get(id)
        .await
        .db_err("Failed to get item")?
        .ok_or_else(|| ApiError::not_found("Report item not found"))
}

async fn list_items(
    State(state): State<ItemsState>,
    Auth(_caller): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let items = state.db.items().list().await.db_err("Failed to list items")?;
    Ok(Json(
        items.into_iter().map(ItemResponse::from).collect::<Vec<_>>(),
    ))
}

async fn list_by_section(
    State(state): State<ItemsState>,
    Auth(_caller): Auth,
    Path(section_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state
        .db
        .items()
        .list_by_section(section_id)
        .await
        .db_err("Failed to list items")?;
    Ok(Json(
        items.into_iter().map(ItemResponse::from).collect::<Vec<_>>(),
    ))
}

async fn get_item(
    State(state): State<ItemsState>,
    Auth(_caller): Auth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ItemResponse::from(load(&state.db, id).await?)))
}

async fn create_item(
    State(state): State<ItemsState>,
    Auth(_caller): Auth,
    Json(req): Json<ItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = to_input(&state.db, req).await?;
    let id = state
        .db
        .items()
        .create(&input)
        .await
        .db_err("Failed to create item")?;

    let item = load(&state.db, id).await?;
    Ok((StatusCode::CREATED, Json(ItemResponse::from(item))))
}

// Omitting sectionId detaches the item.
async fn update_item(
    State(state): State<ItemsState>,
    Auth(_caller): Auth,
    Path(id): Path<i64>,
    Json(req): Json<ItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    load(&state.db, id).await?;
    let input = to_input(&state.db, req).await?;
    state
        .db
        .items()
        .update(id, &input)
        .await
        .db_err("Failed to update item")?;

    Ok(Json(ItemResponse::from(load(&state.db, id).await?)))
}

async fn delete_item(
    State(state): State<ItemsState>,
    Auth(_caller): Auth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    match state
        .db
        .items()
        .delete(id)
        .await
        .db_err("Failed to delete item")?
    {
        DeleteOutcome::Deleted => Ok(StatusCode::NO_CONTENT),
        DeleteOutcome::NotFound => Err(ApiError::not_found("Report item not found")),
        DeleteOutcome::HasChildren => Err(ApiError::conflict(
            "Report item still has recorded values",
        )),
    }
}
