use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct JendoReportStore {
    pool: SqlitePool,
}

/// An uploaded Jendo test report (PDF).
#[derive(Debug, Clone)]
pub struct JendoReport {
    pub id: i64,
    pub user_id: i64,
    pub file_path: String,
    pub file_name: String,
    pub original_name: String,
    pub file_size: i64,
    pub content_type: String,
    pub description: Option<String>,
    pub uploaded_at: String,
}

#[derive(sqlx::FromRow)]
struct JendoReportRow {
    id: i64,
    user_id: i64,
    file_path: String,
    file_name: String,
    original_name: String,
    file_size: i64,
    content_type: String,
    description: Option<String>,
    uploaded_at: String,
}

impl From<JendoReportRow> for JendoReport {
    fn from(row: JendoReportRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            file_path: row.file_path,
            file_name: row.file_name,
            original_name: row.original_name,
            file_size: row.file_size,
            content_type: row.content_type,
            description: row.description,
            uploaded_at: row.uploaded_at,
        }
    }
}

pub struct NewJendoReport<'a> {
    pub user_id: i64,
    pub file_path: &'a str,
    pub file_name: &'a str,
    pub original_name: &'a str,
    pub file_size: i64,
    pub content_type: &'a str,
    pub description: Option<&'a str>,
}

impl JendoReportStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: &NewJendoReport<'_>) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO jendo_reports
             (user_id, file_path, file_name, original_name, file_size, content_type, description)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(input.user_id)
        .bind(input.file_path)
        .bind(input.file_name)
        .bind(input.original_name)
        .bind(input.file_size)
        .bind(input.content_type)
        .bind(input.description)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get(&self, id: i64) -> Result<Option<JendoReport>, sqlx::Error> {
        let row: Option<JendoReportRow> = sqlx::query_as(
            "SELECT id, user_id, file_path, file_name, original_name, file_size, content_type,
                    description, uploaded_at
             FROM jendo_reports WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(JendoReport::from))
    }

    /// Reports of a user, newest first.
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<JendoReport>, sqlx::Error> {
        let rows: Vec<JendoReportRow> = sqlx::query_as(
            "SELECT id, user_id, file_path, file_name, original_name, file_size, content_type,
                    description, uploaded_at
             FROM jendo_reports WHERE user_id = ?
             ORDER BY uploaded_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(JendoReport::from).collect())
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM jendo_reports WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
