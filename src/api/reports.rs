//! Jendo report PDFs uploaded by users.

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;

use super::error::{ApiError, ResultExt};
use super::extract::{Json, Path};
use super::transfer::{MAX_UPLOAD_BYTES, download, read_upload_form};
use crate::attachments::{Attachments, PDF_CONTENT_TYPE};
use crate::auth::{Auth, AuthenticatedIdentity, ensure_owner, ensure_self};
use crate::db::{Database, JendoReport};

#[derive(Clone)]
pub struct ReportsState {
    pub db: Database,
    pub attachments: Attachments,
}

pub fn router(state: ReportsState) -> Router {
    Router::new()
        .route("/upload", post(upload_report))
        .route("/user/{user_id}", get(list_user_reports))
        .route("/{id}", get(get_report).delete(delete_report))
        .route("/{id}/download", get(download_report))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportResponse {
    id: i64,
    user_id: i64,
    file_name: String,
    original_file_name: String,
    file_size: i64,
    content_type: String,
    description: Option<String>,
    uploaded_at: String,
    download_url: String,
}

impl From<JendoReport> for ReportResponse {
    fn from(r: JendoReport) -> Self {
        Self {
            download_url: format!("/api/jendo-reports/{}/download", r.id),
            id: r.id,
            user_id: r.user_id,
            file_name: r.file_name,
            original_file_name: r.original_name,
            file_size: r.file_size,
            content_type: r.content_type,
            description: r.description,
            uploaded_at: r.uploaded_at,
        }
    }
}

async fn load_owned(
    db: &Database,
    caller: &AuthenticatedIdentity,
    id: i64,
) -> Result<JendoReport, ApiError> {
    let report = db
        .jendo_reports()
        .get(id)
        .await
        .db_err("Failed to get Jendo report")?
        .ok_or_else(|| ApiError::not_found("Jendo report not found"))?;
    ensure_owner(caller, report.user_id)?;
    Ok(report)
}

/// Upload a PDF report.
///
/// Multipart fields:
/// - `file`: the PDF, required and non-empty
/// - `description`: optional free text
/// - `userId`: optional, must name the caller when given
async fn upload_report(
    State(state): State<ReportsState>,
    Auth(caller): Auth,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_upload_form(multipart).await?;

    if let Some(user_id) = form.text("userId") {
        let user_id: i64 = user_id
            .parse()
            .map_err(|_| ApiError::bad_request("Invalid userId"))?;
        ensure_self(&caller, user_id)?;
    }
    let description = form.text("description").map(str::to_string);

    let (upload, _) = form.require_file()?;
    let is_pdf = upload
        .content_type
        .as_deref()
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|ct| ct.trim().eq_ignore_ascii_case(PDF_CONTENT_TYPE));
    if !is_pdf {
        return Err(ApiError::bad_request("Only PDF files are allowed"));
    }

    let report = state
        .attachments
        .store_report(caller.user_id, &upload, description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(ReportResponse::from(report))))
}

/// Reports of a user, newest first.
async fn list_user_reports(
    State(state): State<ReportsState>,
    Auth(caller): Auth,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_self(&caller, user_id)?;
    let reports = state
        .db
        .jendo_reports()
        .list_by_user(user_id)
        .await
        .db_err("Failed to list Jendo reports")?;

    Ok(Json(
        reports
            .into_iter()
            .map(ReportResponse::from)
            .collect::<Vec<_>>(),
    ))
}

async fn get_report(
    State(state): State<ReportsState>,
    Auth(caller): Auth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let report = load_owned(&state.db, &caller, id).await?;
    Ok(Json(ReportResponse::from(report)))
}

async fn download_report(
    State(state): State<ReportsState>,
    Auth(caller): Auth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let report = load_owned(&state.db, &caller, id).await?;
    let bytes = state.attachments.open_report(&report).await?;
    Ok(download(bytes, PDF_CONTENT_TYPE, &report.original_name))
}

async fn delete_report(
    State(state): State<ReportsState>,
    Auth(caller): Auth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let report = load_owned(&state.db, &caller, id).await?;
    state.attachments.delete_report(&report).await?;
    Ok(StatusCode::NO_CONTENT)
}
