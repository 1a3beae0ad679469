//! Doctor profiles and their appointment slots.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::PageQuery;
use super::error::{ApiError, ResultExt, require_non_blank};
use super::extract::{Json, Path, Query};
use crate::auth::Auth;
use crate::db::{
    Database, Doctor, DoctorInput, DoctorPatch, NewSlot, Slot, SlotBookOutcome,
};

const DEFAULT_SLOT_MINUTES: i32 = 30;

#[derive(Clone)]
pub struct DoctorsState {
    pub db: Database,
}

pub fn router(state: DoctorsState) -> Router {
    Router::new()
        .route("/", get(list_doctors).post(create_doctor))
        .route("/search", get(search_doctors))
        .route("/available", get(list_available_doctors))
        .route(
            "/{id}",
            get(get_doctor).put(update_doctor).delete(delete_doctor),
        )
        .route("/{id}/slots", get(list_slots).post(create_slot))
        .route("/{id}/available-dates", get(list_available_dates))
        .route("/slots/{slot_id}/book", post(book_slot))
        .with_state(state)
}

// --- Request/Response types ---

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    specialty: String,
    page: Option<u32>,
    size: Option<u32>,
}

#[derive(Deserialize)]
struct DateQuery {
    date: NaiveDate,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateDoctorRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    specialty: String,
    hospital: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    qualifications: Option<String>,
    image_url: Option<String>,
    address: Option<String>,
    is_available: Option<bool>,
    available_days: Option<String>,
}

/// Partial update: only the fields present are changed.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateDoctorRequest {
    name: Option<String>,
    specialty: Option<String>,
    hospital: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    qualifications: Option<String>,
    image_url: Option<String>,
    address: Option<String>,
    is_available: Option<bool>,
    available_days: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSlotRequest {
    slot_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    slot_duration_minutes: Option<i32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DoctorResponse {
    id: i64,
    name: String,
    specialty: String,
    hospital: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    qualifications: Option<String>,
    image_url: Option<String>,
    address: Option<String>,
    is_available: bool,
    available_days: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<Doctor> for DoctorResponse {
    fn from(d: Doctor) -> Self {
        Self {
            id: d.id,
            name: d.name,
            specialty: d.specialty,
            hospital: d.hospital,
            email: d.email,
            phone: d.phone,
            qualifications: d.qualifications,
            image_url: d.image_url,
            address: d.address,
            is_available: d.is_available,
            available_days: d.available_days,
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SlotResponse {
    id: i64,
    doctor_id: i64,
    slot_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    is_booked: bool,
    slot_duration_minutes: i32,
}

impl From<Slot> for SlotResponse {
    fn from(s: Slot) -> Self {
        Self {
            id: s.id,
            doctor_id: s.doctor_id,
            slot_date: s.slot_date,
            start_time: s.start_time,
            end_time: s.end_time,
            is_booked: s.is_booked,
            slot_duration_minutes: s.slot_duration_minutes,
        }
    }
}

// --- Helpers ---

async fn load(db: &Database, id: i64) -> Result<Doctor, ApiError> {
    db.doctors()
        .get(id)
        .await
        .db_err("Failed to get doctor")?
        .ok_or_else(|| ApiError::not_found("Doctor not found"))
}

fn non_blank(value: Option<String>, field: &str) -> Result<Option<String>, ApiError> {
    match value {
        Some(v) => {
            require_non_blank(&v, field)?;
            Ok(Some(v.trim().to_string()))
        }
        None => Ok(None),
    }
}

// --- Doctor handlers ---

async fn list_doctors(
    State(state): State<DoctorsState>,
    Auth(_caller): Auth,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .db
        .doctors()
        .list(query.to_request())
        .await
        .db_err("Failed to list doctors")?;
    Ok(Json(page.map(DoctorResponse::from)))
}

async fn search_doctors(
    State(state): State<DoctorsState>,
    Auth(_caller): Auth,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let req = PageQuery {
        page: query.page,
        size: query.size,
    }
    .to_request();
    let page = state
        .db
        .doctors()
        .search_by_specialty(query.specialty.trim(), req)
        .await
        .db_err("Failed to search doctors")?;
    Ok(Json(page.map(DoctorResponse::from)))
}

async fn list_available_doctors(
    State(state): State<DoctorsState>,
    Auth(_caller): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let doctors = state
        .db
        .doctors()
        .list_available()
        .await
        .db_err("Failed to list available doctors")?;
    Ok(Json(
        doctors
            .into_iter()
            .map(DoctorResponse::from)
            .collect::<Vec<_>>(),
    ))
}

async fn get_doctor(
    State(state): State<DoctorsState>,
    Auth(_caller): Auth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(DoctorResponse::from(load(&state.db, id).await?)))
}

async fn create_doctor(
    State(state): State<DoctorsState>,
    Auth(_caller): Auth,
    Json(req): Json<CreateDoctorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_non_blank(&req.name, "Doctor name")?;
    require_non_blank(&req.specialty, "Specialty")?;

    let input = DoctorInput {
        name: req.name.trim().to_string(),
        specialty: req.specialty.trim().to_string(),
        hospital: req.hospital,
        email: req.email,
        phone: req.phone,
        qualifications: req.qualifications,
        image_url: req.image_url,
        address: req.address,
        is_available: req.is_available,
        available_days: req.available_days,
    };

    let id = state
        .db
        .doctors()
        .create(&input)
        .await
        .db_err("Failed to create doctor")?;
    let doctor = load(&state.db, id).await?;
    Ok((StatusCode::CREATED, Json(DoctorResponse::from(doctor))))
}

async fn update_doctor(
    State(state): State<DoctorsState>,
    Auth(_caller): Auth,
    Path(id): Path<i64>,
    Json(req): Json<UpdateDoctorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let patch = DoctorPatch {
        name: non_blank(req.name, "Doctor name")?,
        specialty: non_blank(req.specialty, "Specialty")?,
        hospital: req.hospital,
        email: req.email,
        phone: req.phone,
        qualifications: req.qualifications,
        image_url: req.image_url,
        address: req.address,
        is_available: req.is_available,
        available_days: req.available_days,
    };

    let updated = state
        .db
        .doctors()
        .update(id, &patch)
        .await
        .db_err("Failed to update doctor")?;
    if !updated {
        return Err(ApiError::not_found("Doctor not found"));
    }

    Ok(Json(DoctorResponse::from(load(&state.db, id).await?)))
}

/// Delete a doctor and all of their slots.
async fn delete_doctor(
    State(state): State<DoctorsState>,
    Auth(_caller): Auth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .doctors()
        .delete(id)
        .await
        .db_err("Failed to delete doctor")?;
    if !deleted {
        return Err(ApiError::not_found("Doctor not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// --- Slot handlers ---

/// Unbooked slots of a doctor on `?date=YYYY-MM-DD`.
async fn list_slots(
    State(state): State<DoctorsState>,
    Auth(_caller): Auth,
    Path(id): Path<i64>,
    Query(query): Query<DateQuery>,
) -> Result<impl IntoResponse, ApiError> {
    load(&state.db, id).await?;
    let slots = state
        .db
        .slots()
        .list_unbooked(id, query.date)
        .await
        .db_err("Failed to list slots")?;
    Ok(Json(
        slots.into_iter().map(SlotResponse::from).collect::<Vec<_>>(),
    ))
}

/// Dates from today on that still have an unbooked slot.
async fn list_available_dates(
    State(state): State<DoctorsState>,
    Auth(_caller): Auth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    load(&state.db, id).await?;
    let today = Local::now().date_naive();
    let dates = state
        .db
        .slots()
        .available_dates(id, today)
        .await
        .db_err("Failed to list available dates")?;
    Ok(Json(dates))
}

async fn create_slot(
    State(state): State<DoctorsState>,
    Auth(_caller): Auth,
    Path(id): Path<i64>,
    Json(req): Json<CreateSlotRequest>,
) -> Result<impl IntoResponse, ApiError> {
    load(&state.db, id).await?;

    if req.end_time <= req.start_time {
        return Err(ApiError::bad_request("Slot must end after it starts"));
    }
    let duration = req.slot_duration_minutes.unwrap_or(DEFAULT_SLOT_MINUTES);
    if duration <= 0 {
        return Err(ApiError::bad_request("Slot duration must be positive"));
    }

    let slot_id = state
        .db
        .slots()
        .create(&NewSlot {
            doctor_id: id,
            slot_date: req.slot_date,
            start_time: req.start_time,
            end_time: req.end_time,
            slot_duration_minutes: duration,
        })
        .await
        .db_err("Failed to create slot")?;

    let slot = state
        .db
        .slots()
        .get(slot_id)
        .await
        .db_err("Failed to get slot")?
        .ok_or_else(|| ApiError::internal("Slot vanished after insert"))?;
    Ok((StatusCode::CREATED, Json(SlotResponse::from(slot))))
}

async fn book_slot(
    State(state): State<DoctorsState>,
    Auth(_caller): Auth,
    Path(slot_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    match state
        .db
        .slots()
        .book(slot_id)
        .await
        .db_err("Failed to book slot")?
    {
        SlotBookOutcome::Booked => {}
        SlotBookOutcome::NotFound => return Err(ApiError::not_found("Slot not found")),
        SlotBookOutcome::AlreadyBooked => {
            return Err(ApiError::conflict("Slot is already booked"));
        }
    }

    let slot = state
        .db
        .slots()
        .get(slot_id)
        .await
        .db_err("Failed to get slot")?
        .ok_or_else(|| ApiError::not_found("Slot not found"))?;
    Ok(Json(SlotResponse::from(slot)))
}
