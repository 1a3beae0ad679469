//! Report values recorded by users, and the files attached to them.
//!
//! Values are user-scoped: every read, change and attachment operation loads
//! the value first and checks that the caller owns it.

use std::collections::HashMap;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ResultExt};
use super::extract::{Json, Path};
use super::transfer::{MAX_UPLOAD_BYTES, download, read_upload_form};
use crate::attachments::Attachments;
use crate::auth::{Auth, AuthenticatedIdentity, ensure_owner, ensure_self};
use crate::db::{Database, ReportValue, ValueAttachment, ValueInput};

const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Clone)]
pub struct ValuesState {
    pub db: Database,
    pub attachments: Attachments,
}

pub fn router(state: ValuesState) -> Router {
    Router::new()
        .route("/", get(list_own_values).post(create_value))
        .route("/user/{user_id}", get(list_user_values))
        .route("/item/{item_id}", get(list_own_item_values))
        .route("/user/{user_id}/item/{item_id}", get(list_user_item_values))
        .route(
            "/{id}",
            get(get_value).put(update_value).delete(delete_value),
        )
        .route("/{id}/attachments", post(add_attachment))
        .route("/attachments/{attachment_id}", delete(delete_attachment))
        .route(
            "/attachments/{attachment_id}/download",
            get(download_attachment),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

// --- Request/Response types ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRequest {
    report_item_id: Option<i64>,
    value_number: Option<Decimal>,
    value_text: Option<String>,
    value_date: Option<NaiveDate>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AttachmentResponse {
    id: i64,
    file_name: String,
    content_type: Option<String>,
    file_size: i64,
    uploaded_at: String,
    download_url: String,
}

impl From<ValueAttachment> for AttachmentResponse {
    fn from(a: ValueAttachment) -> Self {
        Self {
            download_url: format!("/api/report-values/attachments/{}/download", a.id),
            id: a.id,
            file_name: a.original_name,
            content_type: a.content_type,
            file_size: a.file_size,
            uploaded_at: a.uploaded_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueResponse {
    id: i64,
    user_id: i64,
    report_item_id: i64,
    report_item_name: String,
    value_number: Option<Decimal>,
    value_text: Option<String>,
    value_date: Option<NaiveDate>,
    created_at: String,
    updated_at: String,
    attachments: Vec<AttachmentResponse>,
}

impl ValueResponse {
    fn new(v: ReportValue, attachments: Vec<ValueAttachment>) -> Self {
        Self {
            id: v.id,
            user_id: v.user_id,
            report_item_id: v.report_item_id,
            report_item_name: v.report_item_name,
            value_number: v.value_number,
            value_text: v.value_text,
            value_date: v.value_date,
            created_at: v.created_at,
            updated_at: v.updated_at,
            attachments: attachments.into_iter().map(AttachmentResponse::from).collect(),
        }
    }
}

// --- Helpers ---

/// Load a value and check the caller owns it.
async fn load_owned(
    db: &Database,
    caller: &AuthenticatedIdentity,
    id: i64,
) -> Result<ReportValue, ApiError> {
    let value = db
        .values()
        .get(id)
        .await
        .db_err("Failed to get report value")?
        .ok_or_else(|| ApiError::not_found("Report value not found"))?;
    ensure_owner(caller, value.user_id)?;
    Ok(value)
}

async fn load_owned_attachment(
    db: &Database,
    caller: &AuthenticatedIdentity,
    id: i64,
) -> Result<ValueAttachment, ApiError> {
    let attachment = db
        .value_attachments()
        .get(id)
        .await
        .db_err("Failed to get attachment")?
        .ok_or_else(|| ApiError::not_found("Attachment not found"))?;
    ensure_owner(caller, attachment.owner_id)?;
    Ok(attachment)
}

/// Build the stored fields for `report_item_id`, which must exist.
async fn to_input(
    db: &Database,
    report_item_id: i64,
    req: ValueRequest,
) -> Result<ValueInput, ApiError> {
    db.items()
        .get(report_item_id)
        .await
        .db_err("Failed to get report item")?
        .ok_or_else(|| ApiError::not_found("Report item not found"))?;

    Ok(ValueInput {
        report_item_id,
        value_number: req.value_number,
        value_text: req.value_text,
        value_date: req.value_date,
    })
}

async fn with_attachments(db: &Database, value: ReportValue) -> Result<ValueResponse, ApiError> {
    let attachments = db
        .value_attachments()
        .list_by_value(value.id)
        .await
        .db_err("Failed to list attachments")?;
    Ok(ValueResponse::new(value, attachments))
}

/// Attach each user's attachments to their values with one query.
async fn with_owner_attachments(
    db: &Database,
    user_id: i64,
    values: Vec<ReportValue>,
) -> Result<Vec<ValueResponse>, ApiError> {
    let mut by_value: HashMap<i64, Vec<ValueAttachment>> = HashMap::new();
    for attachment in db
        .value_attachments()
        .list_by_owner(user_id)
        .await
        .db_err("Failed to list attachments")?
    {
        by_value.entry(attachment.value_id).or_default().push(attachment);
    }

    Ok(values
        .into_iter()
        .map(|v| {
            let attachments = by_value.remove(&v.id).unwrap_or_default();
            ValueResponse::new(v, attachments)
        })
        .collect())
}

async fn values_of(
    db: &Database,
    user_id: i64,
    item_id: Option<i64>,
) -> Result<Vec<ValueResponse>, ApiError> {
    let values = match item_id {
        Some(item_id) => db.values().list_by_user_and_item(user_id, item_id).await,
        None => db.values().list_by_user(user_id).await,
    }
    .db_err("Failed to list report values")?;
    with_owner_attachments(db, user_id, values).await
}

// --- Handlers ---

async fn list_own_values(
    State(state): State<ValuesState>,
    Auth(caller): Auth,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(values_of(&state.db, caller.user_id, None).await?))
}

async fn list_user_values(
    State(state): State<ValuesState>,
    Auth(caller): Auth,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_self(&caller, user_id)?;
    Ok(Json(values_of(&state.db, user_id, None).await?))
}

async fn list_own_item_values(
    State(state): State<ValuesState>,
    Auth(caller): Auth,
    Path(item_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(values_of(&state.db, caller.user_id, Some(item_id)).await?))
}

async fn list_user_item_values(
    State(state): State<ValuesState>,
    Auth(caller): Auth,
    Path((user_id, item_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_self(&caller, user_id)?;
    Ok(Json(values_of(&state.db, user_id, Some(item_id)).await?))
}

async fn get_value(
    State(state): State<ValuesState>,
    Auth(caller): Auth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let value = load_owned(&state.db, &caller, id).await?;
    Ok(Json(with_attachments(&state.db, value).await?))
}

async fn create_value(
    State(state): State<ValuesState>,
    Auth(caller): Auth,
    Json(req): Json<ValueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let report_item_id = req
        .report_item_id
        .ok_or_else(|| ApiError::bad_request("Report item ID is required"))?;
    let input = to_input(&state.db, report_item_id, req).await?;
    let id = state
        .db
        .values()
        .create(caller.user_id, &input)
        .await
        .db_err("Failed to create report value")?;

    let value = load_owned(&state.db, &caller, id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ValueResponse::new(value, Vec::new())),
    ))
}

async fn update_value(
    State(state): State<ValuesState>,
    Auth(caller): Auth,
    Path(id): Path<i64>,
    Json(req): Json<ValueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current = load_owned(&state.db, &caller, id).await?;
    // Without an item ID the value stays linked to its current item
    let report_item_id = req.report_item_id.unwrap_or(current.report_item_id);
    let input = to_input(&state.db, report_item_id, req).await?;

    let updated = state
        .db
        .values()
        .update(id, &input)
        .await
        .db_err("Failed to update report value")?;
    if !updated {
        return Err(ApiError::not_found("Report value not found"));
    }

    let value = load_owned(&state.db, &caller, id).await?;
    Ok(Json(with_attachments(&state.db, value).await?))
}

/// Delete a value together with all of its attachments.
async fn delete_value(
    State(state): State<ValuesState>,
    Auth(caller): Auth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let value = load_owned(&state.db, &caller, id).await?;
    if !state.attachments.delete_value(value.id).await? {
        return Err(ApiError::not_found("Report value not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Upload a file for a value. Expects the multipart field `file`.
/// Responds with the value and its full attachment list.
async fn add_attachment(
    State(state): State<ValuesState>,
    Auth(caller): Auth,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let value = load_owned(&state.db, &caller, id).await?;
    let (upload, _) = read_upload_form(multipart).await?.require_file()?;

    state.attachments.attach_to_value(&value, &upload).await?;
    Ok((
        StatusCode::CREATED,
        Json(with_attachments(&state.db, value).await?),
    ))
}

async fn delete_attachment(
    State(state): State<ValuesState>,
    Auth(caller): Auth,
    Path(attachment_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let attachment = load_owned_attachment(&state.db, &caller, attachment_id).await?;
    state.attachments.delete_value_attachment(&attachment).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn download_attachment(
    State(state): State<ValuesState>,
    Auth(caller): Auth,
    Path(attachment_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let attachment = load_owned_attachment(&state.db, &caller, attachment_id).await?;
    let bytes = state.attachments.open_value_attachment(&attachment).await?;
    Ok(download(bytes, OCTET_STREAM, &attachment.original_name))
}
