mod attachments;
mod catalog;
mod doctors;
mod reports;
mod user;
mod values;
mod wellness;

use serde::Serialize;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub use attachments::{NewValueAttachment, ValueAttachment, ValueAttachmentStore};
pub use catalog::{
    Category, CategoryInput, CategoryStore, DeleteOutcome, Item, ItemInput, ItemStore, Section,
    SectionInput, SectionStore,
};
pub use doctors::{
    Doctor, DoctorInput, DoctorPatch, DoctorStore, NewSlot, Slot, SlotBookOutcome, SlotStore,
};
pub use reports::{JendoReport, JendoReportStore, NewJendoReport};
pub use user::{User, UserStore};
pub use values::{ReportValue, ValueInput, ValueStore};
pub use wellness::{WellnessInput, WellnessRecommendation, WellnessStore};

/// One page of a paginated listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: i64,
    pub total_pages: i64,
    pub first: bool,
    pub last: bool,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, page: u32, size: u32, total_elements: i64) -> Self {
        let size_i = i64::from(size.max(1));
        let total_pages = (total_elements + size_i - 1) / size_i;
        Self {
            content,
            page,
            size,
            total_elements,
            total_pages,
            first: page == 0,
            last: i64::from(page) + 1 >= total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            first: self.first,
            last: self.last,
        }
    }
}

/// Page request with LIMIT/OFFSET helpers.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub const MAX_SIZE: u32 = 100;

    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size: size.clamp(1, Self::MAX_SIZE),
        }
    }

    pub(crate) fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    pub(crate) fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create a database at the given path.
    /// Use ":memory:" for an in-memory database.
    pub async fn open(path: &str) -> Result<Self, sqlx::Error> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", path)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get the current schema version.
    async fn get_version(&self) -> Result<i32, sqlx::Error> {
        let result: Option<(i32,)> = sqlx::query_as("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(result.map(|r| r.0).unwrap_or(0))
    }

    /// Set the schema version within a transaction.
    async fn set_version(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        version: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM schema_version")
            .execute(&mut **tx)
            .await?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(version)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Run database migrations.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
            .execute(&self.pool)
            .await?;

        let version = self.get_version().await?;

        if version < 1 {
            self.migrate_v1().await?;
        }

        Ok(())
    }

    /// Execute a list of queries in a transaction, then set the version.
    async fn run_migration(
        &self,
        version: i32,
        queries: &[&'static str],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for query in queries {
            sqlx::query(*query).execute(&mut *tx).await?;
        }
        Self::set_version(&mut tx, version).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn migrate_v1(&self) -> Result<(), sqlx::Error> {
        self.run_migration(
            1,
            &[
                "CREATE TABLE users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    email TEXT UNIQUE NOT NULL COLLATE NOCASE,
                    full_name TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                // Report catalog: categories > sections > items
                "CREATE TABLE report_categories (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    icon TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE TABLE report_sections (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    icon TEXT,
                    description TEXT,
                    category_id INTEGER REFERENCES report_categories(id),
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_report_sections_category ON report_sections(category_id)",
                "CREATE TABLE report_items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    description TEXT,
                    icon TEXT,
                    section_id INTEGER REFERENCES report_sections(id),
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_report_items_section ON report_items(section_id)",
                // User-owned measurements
                "CREATE TABLE report_item_values (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL REFERENCES users(id),
                    report_item_id INTEGER NOT NULL REFERENCES report_items(id),
                    value_number TEXT,
                    value_text TEXT,
                    value_date TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_report_item_values_user ON report_item_values(user_id)",
                "CREATE INDEX idx_report_item_values_item ON report_item_values(report_item_id)",
                "CREATE TABLE value_attachments (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    value_id INTEGER NOT NULL REFERENCES report_item_values(id),
                    file_path TEXT UNIQUE NOT NULL,
                    original_name TEXT NOT NULL,
                    content_type TEXT,
                    file_size INTEGER NOT NULL,
                    uploaded_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_value_attachments_value ON value_attachments(value_id)",
                "CREATE TABLE jendo_reports (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL REFERENCES users(id),
                    file_path TEXT UNIQUE NOT NULL,
                    file_name TEXT NOT NULL,
                    original_name TEXT NOT NULL,
                    file_size INTEGER NOT NULL,
                    content_type TEXT NOT NULL,
                    description TEXT,
                    uploaded_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
                )",
                "CREATE INDEX idx_jendo_reports_user ON jendo_reports(user_id)",
                // Doctors and their bookable slots
                "CREATE TABLE doctors (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    specialty TEXT NOT NULL,
                    hospital TEXT,
                    email TEXT,
                    phone TEXT,
                    qualifications TEXT,
                    image_url TEXT,
                    address TEXT,
                    is_available INTEGER NOT NULL DEFAULT 1,
                    available_days TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_doctors_name ON doctors(name)",
                "CREATE TABLE doctor_slots (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    doctor_id INTEGER NOT NULL REFERENCES doctors(id),
                    slot_date TEXT NOT NULL,
                    start_time TEXT NOT NULL,
                    end_time TEXT NOT NULL,
                    is_booked INTEGER NOT NULL DEFAULT 0,
                    slot_duration_minutes INTEGER NOT NULL DEFAULT 30,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_doctor_slots_doctor_date ON doctor_slots(doctor_id, slot_date)",
                "CREATE TABLE wellness_recommendations (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    description TEXT,
                    category TEXT,
                    risk_level TEXT NOT NULL,
                    type TEXT,
                    priority INTEGER NOT NULL DEFAULT 0,
                    is_active INTEGER NOT NULL DEFAULT 1,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_wellness_risk_level ON wellness_recommendations(risk_level)",
            ],
        )
        .await
    }

    /// Get the user store.
    pub fn users(&self) -> UserStore {
        UserStore::new(self.pool.clone())
    }

    pub fn categories(&self) -> CategoryStore {
        CategoryStore::new(self.pool.clone())
    }

    pub fn sections(&self) -> SectionStore {
        SectionStore::new(self.pool.clone())
    }

    pub fn items(&self) -> ItemStore {
        ItemStore::new(self.pool.clone())
    }

    /// Get the report value store.
    pub fn values(&self) -> ValueStore {
        ValueStore::new(self.pool.clone())
    }

    /// Get the value attachment metadata store.
    pub fn value_attachments(&self) -> ValueAttachmentStore {
        ValueAttachmentStore::new(self.pool.clone())
    }

    /// Get the Jendo report store.
    pub fn jendo_reports(&self) -> JendoReportStore {
        JendoReportStore::new(self.pool.clone())
    }

    pub fn doctors(&self) -> DoctorStore {
        DoctorStore::new(self.pool.clone())
    }

    pub fn slots(&self) -> SlotStore {
        SlotStore::new(self.pool.clone())
    }

    pub fn wellness(&self) -> WellnessStore {
        WellnessStore::new(self.pool.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get_user() {
        let db = Database::open(":memory:").await.unwrap();

        let id = db.users().create("alice@example.com", Some("Alice")).await.unwrap();

        let user = db
            .users()
            .get_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.full_name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_email_lookup_ignores_case() {
        let db = Database::open(":memory:").await.unwrap();

        let id = db.users().create("Alice@Example.com", None).await.unwrap();
        let user = db
            .users()
            .get_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, id);
    }

    #[tokio::test]
    async fn test_duplicate_email_fails() {
        let db = Database::open(":memory:").await.unwrap();

        db.users().create("alice@example.com", None).await.unwrap();
        let result = db.users().create("ALICE@example.com", None).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let db = Database::open(":memory:").await.unwrap();

        let first = db.users().get_or_create("bob@example.com").await.unwrap();
        let second = db.users().get_or_create("bob@example.com").await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn test_page_total_pages() {
        let page: Page<i32> = Page::new(vec![1, 2], 0, 2, 5);
        assert_eq!(page.total_pages, 3);
        assert!(page.first);
        assert!(!page.last);

        let tail: Page<i32> = Page::new(vec![5], 2, 2, 5);
        assert!(!tail.first);
        assert!(tail.last);

        let empty: Page<i32> = Page::new(vec![], 0, 10, 0);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn test_page_request_clamps_size() {
        let req = PageRequest::new(2, 0);
        assert_eq!(req.size, 1);
        let req = PageRequest::new(3, 500);
        assert_eq!(req.size, PageRequest::MAX_SIZE);
        assert_eq!(req.offset(), 300);
    }
}
