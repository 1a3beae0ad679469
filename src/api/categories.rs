//! Report categories, the top level of the report catalog.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ResultExt, require_max_len, require_non_blank};
use super::extract::{Json, Path};
use super::sections::SectionResponse;
use crate::auth::Auth;
use crate::db::{Category, CategoryInput, Database, DeleteOutcome};

pub const MAX_NAME_LEN: usize = 200;

#[derive(Clone)]
pub struct CategoriesState {
    pub db: Database,
}

pub fn router(state: CategoriesState) -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/{id}",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
        .route("/{id}/sections", get(get_category_with_sections))
        .with_state(state)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategoryRequest {
    #[serde(default)]
    name: String,
    icon: Option<String>,
}

impl CategoryRequest {
    fn into_input(self) -> Result<CategoryInput, ApiError> {
        require_non_blank(&self.name, "Category name")?;
        require_max_len(&self.name, "Category name", MAX_NAME_LEN)?;
        Ok(CategoryInput {
            name: self.name.trim().to_string(),
            icon: self.icon,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CategoryResponse {
    id: i64,
    name: String,
    icon: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<Category> for CategoryResponse {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            name: c.name,
            icon: c.icon,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CategoryWithSectionsResponse {
    #[serde(flatten)]
    category: CategoryResponse,
    sections: Vec<SectionResponse>,
}

async fn load(db: &Database, id: i64) -> Result<Category, ApiError> {
    db.categories()
        .get(id)
        .await
        .db_err("Failed to get category")?
        .ok_or_else(|| ApiError::not_found("Category not found"))
}

async fn list_categories(
    State(state): State<CategoriesState>,
    Auth(_caller): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .db
        .categories()
        .list()
        .await
        .db_err("Failed to list categories")?;

    Ok(Json(
        categories
            .into_iter()
            .map(CategoryResponse::from)
            .collect::<Vec<_>>(),
    ))
}

async fn get_category(
    State(state): State<CategoriesState>,
    Auth(_caller): Auth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let category = load(&state.db, id).await?;
    Ok(Json(CategoryResponse::from(category)))
}

async fn get_category_with_sections(
    State(state): State<CategoriesState>,
    Auth(_caller): Auth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let category = load(&state.db, id).await?;
    let sections = state
        .db
        .sections()
        .list_by_category(id)
        .await
        .db_err("Failed to list sections")?;

    Ok(Json(CategoryWithSectionsResponse {
        category: category.into(),
        sections: sections.into_iter().map(SectionResponse::from).collect(),
    }))
}

async fn create_category(
    State(state): State<CategoriesState>,
    Auth(_caller): Auth,
    Json(req): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = req.into_input()?;
    let id = state
        .db
        .categories()
        .create(&input)
        .await
        .db_err("Failed to create category")?;

    let category = load(&state.db, id).await?;
    Ok((StatusCode::CREATED, Json(CategoryResponse::from(category))))
}

async fn update_category(
    State(state): State<CategoriesState>,
    Auth(_caller): Auth,
    Path(id): Path<i64>,
    Json(req): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = req.into_input()?;
    let updated = state
        .db
        .categories()
        .update(id, &input)
        .await
        .db_err("Failed to update category")?;
    if !updated {
        return Err(ApiError::not_found("Category not found"));
    }

    let category = load(&state.db, id).await?;
    Ok(Json(CategoryResponse::from(category)))
}

async fn delete_category(
    State(state): State<CategoriesState>,
    Auth(_caller): Auth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    match state
        .db
        .categories()
        .delete(id)
        .await
        .db_err("Failed to delete category")?
    {
        DeleteOutcome::Deleted => Ok(StatusCode::NO_CONTENT),
        DeleteOutcome::NotFound => Err(ApiError::not_found("Category not found")),
        DeleteOutcome::HasChildren => Err(ApiError::conflict(
            "Category still has sections with items; delete the items first",
        )),
    }
}
