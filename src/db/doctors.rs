//! Doctor profiles and their bookable time slots.

use chrono::{NaiveDate, NaiveTime};
use sqlx::sqlite::SqlitePool;

use super::{Page, PageRequest};

#[derive(Debug, Clone)]
pub struct Doctor {
    pub id: i64,
    pub name: String,
    pub specialty: String,
    pub hospital: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub qualifications: Option<String>,
    pub image_url: Option<String>,
    pub address: Option<String>,
    pub is_available: bool,
    pub available_days: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct DoctorRow {
    id: i64,
    name: String,
    specialty: String,
    hospital: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    qualifications: Option<String>,
    image_url: Option<String>,
    address: Option<String>,
    is_available: i32,
    available_days: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<DoctorRow> for Doctor {
    fn from(row: DoctorRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            specialty: row.specialty,
            hospital: row.hospital,
            email: row.email,
            phone: row.phone,
            qualifications: row.qualifications,
            image_url: row.image_url,
            address: row.address,
            is_available: row.is_available != 0,
            available_days: row.available_days,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Fields for a new doctor.
#[derive(Debug, Clone, Default)]
pub struct DoctorInput {
    pub name: String,
    pub specialty: String,
    pub hospital: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub qualifications: Option<String>,
    pub image_url: Option<String>,
    pub address: Option<String>,
    pub is_available: Option<bool>,
    pub available_days: Option<String>,
}

/// Partial update. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct DoctorPatch {
    pub name: Option<String>,
    pub specialty: Option<String>,
    pub hospital: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub qualifications: Option<String>,
    pub image_url: Option<String>,
    pub address: Option<String>,
    pub is_available: Option<bool>,
    pub available_days: Option<String>,
}

#[derive(Clone)]
pub struct DoctorStore {
    pool: SqlitePool,
}

impl DoctorStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: &DoctorInput) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO doctors (name, specialty, hospital, email, phone, qualifications,
                                  image_url, address, is_available, available_days)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.name)
        .bind(&input.specialty)
        .bind(&input.hospital)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.qualifications)
        .bind(&input.image_url)
        .bind(&input.address)
        .bind(input.is_available.unwrap_or(true))
        .bind(&input.available_days)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Doctor>, sqlx::Error> {
        let row: Option<DoctorRow> = sqlx::query_as(
            "SELECT id, name, specialty, hospital, email, phone, qualifications, image_url,
                    address, is_available, available_days, created_at, updated_at
             FROM doctors WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Doctor::from))
    }

    /// One page of doctors sorted by name.
    pub async fn list(&self, req: PageRequest) -> Result<Page<Doctor>, sqlx::Error> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM doctors")
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<DoctorRow> = sqlx::query_as(
            "SELECT id, name, specialty, hospital, email, phone, qualifications, image_url,
                    address, is_available, available_days, created_at, updated_at
             FROM doctors ORDER BY name, id LIMIT ? OFFSET ?",
        )
        .bind(req.limit())
        .bind(req.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(
            rows.into_iter().map(Doctor::from).collect(),
            req.page,
            req.size,
            total,
        ))
    }

    /// One page of doctors whose specialty contains `specialty`, ignoring case.
    pub async fn search_by_specialty(
        &self,
        specialty: &str,
        req: PageRequest,
    ) -> Result<Page<Doctor>, sqlx::Error> {
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM doctors WHERE instr(lower(specialty), lower(?)) > 0",
        )
        .bind(specialty)
        .fetch_one(&self.pool)
        .await?;

        let rows: Vec<DoctorRow> = sqlx::query_as(
            "SELECT id, name, specialty, hospital, email, phone, qualifications, image_url,
                    address, is_available, available_days, created_at, updated_at
             FROM doctors WHERE instr(lower(specialty), lower(?)) > 0
             ORDER BY name, id LIMIT ? OFFSET ?",
        )
        .bind(specialty)
        .bind(req.limit())
        .bind(req.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(
            rows.into_iter().map(Doctor::from).collect(),
            req.page,
            req.size,
            total,
        ))
    }

    pub async fn list_available(&self) -> Result<Vec<Doctor>, sqlx::Error> {
        let rows: Vec<DoctorRow> = sqlx::query_as(
            "SELECT id, name, specialty, hospital, email, phone, qualifications, image_url,
                    address, is_available, available_days, created_at, updated_at
             FROM doctors WHERE is_available = 1 ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Doctor::from).collect())
    }

    /// Apply a partial update. Returns false if the doctor does not exist.
    pub async fn update(&self, id: i64, patch: &DoctorPatch) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE doctors SET
                name = COALESCE(?, name),
                specialty = COALESCE(?, specialty),
                hospital = COALESCE(?, hospital),
                email = COALESCE(?, email),
                phone = COALESCE(?, phone),
                qualifications = COALESCE(?, qualifications),
                image_url = COALESCE(?, image_url),
                address = COALESCE(?, address),
                is_available = COALESCE(?, is_available),
                available_days = COALESCE(?, available_days),
                updated_at = datetime('now')
             WHERE id = ?",
        )
        .bind(&patch.name)
        .bind(&patch.specialty)
        .bind(&patch.hospital)
        .bind(&patch.email)
        .bind(&patch.phone)
        .bind(&patch.qualifications)
        .bind(&patch.image_url)
        .bind(&patch.address)
        .bind(patch.is_available)
        .bind(&patch.available_days)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a doctor together with its slots.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM doctor_slots WHERE doctor_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM doctors WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }
}

#[derive(Debug, Clone)]
pub struct Slot {
    pub id: i64,
    pub doctor_id: i64,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_booked: bool,
    pub slot_duration_minutes: i32,
}

#[derive(sqlx::FromRow)]
struct SlotRow {
    id: i64,
    doctor_id: i64,
    slot_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    is_booked: i32,
    slot_duration_minutes: i32,
}

impl From<SlotRow> for Slot {
    fn from(row: SlotRow) -> Self {
        Self {
            id: row.id,
            doctor_id: row.doctor_id,
            slot_date: row.slot_date,
            start_time: row.start_time,
            end_time: row.end_time,
            is_booked: row.is_booked != 0,
            slot_duration_minutes: row.slot_duration_minutes,
        }
    }
}

pub struct NewSlot {
    pub doctor_id: i64,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration_minutes: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotBookOutcome {
    Booked,
    NotFound,
    AlreadyBooked,
}

#[derive(Clone)]
pub struct SlotStore {
    pool: SqlitePool,
}

impl SlotStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, slot: &NewSlot) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO doctor_slots (doctor_id, slot_date, start_time, end_time, slot_duration_minutes)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(slot.doctor_id)
        .bind(slot.slot_date)
        .bind(slot.start_time)
        .bind(slot.end_time)
        .bind(slot.slot_duration_minutes)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Slot>, sqlx::Error> {
        let row: Option<SlotRow> = sqlx::query_as(
            "SELECT id, doctor_id, slot_date, start_time, end_time, is_booked, slot_duration_minutes
             FROM doctor_slots WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Slot::from))
    }

    /// Unbooked slots of a doctor on one date, by start time.
    pub async fn list_unbooked(
        &self,
        doctor_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, sqlx::Error> {
        let rows: Vec<SlotRow> = sqlx::query_as(
            "SELECT id, doctor_id, slot_date, start_time, end_time, is_booked, slot_duration_minutes
             FROM doctor_slots
             WHERE doctor_id = ? AND slot_date = ? AND is_booked = 0
             ORDER BY start_time, id",
        )
        .bind(doctor_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Slot::from).collect())
    }

    /// Distinct dates on or after `from` that still have an unbooked slot.
    pub async fn available_dates(
        &self,
        doctor_id: i64,
        from: NaiveDate,
    ) -> Result<Vec<NaiveDate>, sqlx::Error> {
        let rows: Vec<(NaiveDate,)> = sqlx::query_as(
            "SELECT DISTINCT slot_date FROM doctor_slots
             WHERE doctor_id = ? AND is_booked = 0 AND slot_date >= ?
             ORDER BY slot_date",
        )
        .bind(doctor_id)
        .bind(from)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    pub async fn book(&self, id: i64) -> Result<SlotBookOutcome, sqlx::Error> {
        let result = sqlx::query("UPDATE doctor_slots SET is_booked = 1 WHERE id = ? AND is_booked = 0")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() > 0 {
            return Ok(SlotBookOutcome::Booked);
        }

        match self.get(id).await? {
            Some(_) => Ok(SlotBookOutcome::AlreadyBooked),
            None => Ok(SlotBookOutcome::NotFound),
        }
    }
}
