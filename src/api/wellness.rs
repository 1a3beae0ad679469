use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};

use super::PageQuery;
use super::error::{ApiError, ResultExt, require_non_blank};
use super::extract::{Json, Path, Query};
use crate::auth::Auth;
use crate::db::{Database, WellnessInput, WellnessRecommendation};

#[derive(Clone)]
pub struct WellnessState {
    pub db: Database,
}

pub fn router(state: WellnessState) -> Router {
    Router::new()
        .route("/", get(list_recommendations).post(create_recommendation))
        .route("/risk-level/{risk_level}", get(list_by_risk_level))
        .route(
            "/{id}",
            get(get_recommendation)
                .put(update_recommendation)
                .delete(delete_recommendation),
        )
        .with_state(state)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendationRequest {
    #[serde(default)]
    title: String,
    description: Option<String>,
    category: Option<String>,
    #[serde(default)]
    risk_level: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    priority: Option<i32>,
    is_active: Option<bool>,
}

impl RecommendationRequest {
    fn into_input(self) -> Result<WellnessInput, ApiError> {
        require_non_blank(&self.title, "Title")?;
        require_non_blank(&self.risk_level, "Risk level")?;
        Ok(WellnessInput {
            title: self.title.trim().to_string(),
            description: self.description,
            category: self.category,
            risk_level: self.risk_level.trim().to_string(),
            kind: self.kind,
            priority: self.priority,
            is_active: self.is_active,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecommendationResponse {
    id: i64,
    title: String,
    description: Option<String>,
    category: Option<String>,
    risk_level: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    priority: i32,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl From<WellnessRecommendation> for RecommendationResponse {
    fn from(w: WellnessRecommendation) -> Self {
        Self {
            id: w.id,
            title: w.title,
            description: w.description,
            category: w.category,
            risk_level: w.risk_level,
            kind: w.kind,
            priority: w.priority,
            is_active: w.is_active,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

async fn load(db: &Database, id: i64) -> Result<WellnessRecommendation, ApiError> {
    db.wellness()
        .get(id)
        .await
        .db_err("Failed to get recommendation")?
        .ok_or_else(|| ApiError::not_found("Recommendation not found"))
}

async fn list_recommendations(
    State(state): State<WellnessState>,
    Auth(_caller): Auth,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .db
        .wellness()
        .list(query.to_request())
        .await
        .db_err("Failed to list recommendations")?;
    Ok(Json(page.map(RecommendationResponse::from)))
}

/// Active recommendations for a risk level, highest priority first.
async fn list_by_risk_level(
    State(state): State<WellnessState>,
    Auth(_caller): Auth,
    Path(risk_level): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let recommendations = state
        .db
        .wellness()
        .list_active_by_risk_level(risk_level.trim())
        .await
        .db_err("Failed to list recommendations")?;
    Ok(Json(
        recommendations
            .into_iter()
            .map(RecommendationResponse::from)
            .collect::<Vec<_>>(),
    ))
}

async fn get_recommendation(
    State(state): State<WellnessState>,
    Auth(_caller): Auth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(RecommendationResponse::from(load(&state.db, id).await?)))
}

async fn create_recommendation(
    State(state): State<WellnessState>,
    Auth(_caller): Auth,
    Json(req): Json<RecommendationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = req.into_input()?;
    let id = state
        .db
        .wellness()
        .create(&input)
        .await
        .db_err("Failed to create recommendation")?;

    let created = load(&state.db, id).await?;
    Ok((
        StatusCode::CREATED,
        Json(RecommendationResponse::from(created)),
    ))
}

/// Text fields are replaced; priority and active flag change only when given.
async fn update_recommendation(
    State(state): State<WellnessState>,
    Auth(_caller): Auth,
    Path(id): Path<i64>,
    Json(req): Json<RecommendationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = req.into_input()?;
    let updated = state
        .db
        .wellness()
        .update(id, &input)
        .await
        .db_err("Failed to update recommendation")?;
    if !updated {
        return Err(ApiError::not_found("Recommendation not found"));
    }

    Ok(Json(RecommendationResponse::from(load(&state.db, id).await?)))
}

async fn delete_recommendation(
    State(state): State<WellnessState>,
    Auth(_caller): Auth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .wellness()
        .delete(id)
        .await
        .db_err("Failed to delete recommendation")?;
    if !deleted {
        return Err(ApiError::not_found("Recommendation not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
