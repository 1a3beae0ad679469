use sqlx::sqlite::SqlitePool;

use super::{Page, PageRequest};

#[derive(Clone)]
pub struct WellnessStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone)]
pub struct WellnessRecommendation {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub risk_level: String,
    pub kind: Option<String>,
    pub priority: i32,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct WellnessRow {
    id: i64,
    title: String,
    description: Option<String>,
    category: Option<String>,
    risk_level: String,
    kind: Option<String>,
    priority: i32,
    is_active: i32,
    created_at: String,
    updated_at: String,
}

impl From<WellnessRow> for WellnessRecommendation {
    fn from(row: WellnessRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            category: row.category,
            risk_level: row.risk_level,
            kind: row.kind,
            priority: row.priority,
            is_active: row.is_active != 0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Fields for create and update. On update the text fields are replaced,
/// while `priority` and `is_active` only change when provided.
#[derive(Debug, Clone, Default)]
pub struct WellnessInput {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub risk_level: String,
    pub kind: Option<String>,
    pub priority: Option<i32>,
    pub is_active: Option<bool>,
}

impl WellnessStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: &WellnessInput) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO wellness_recommendations
             (title, description, category, risk_level, type, priority, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.category)
        .bind(&input.risk_level)
        .bind(&input.kind)
        .bind(input.priority.unwrap_or(0))
        .bind(input.is_active.unwrap_or(true))
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get(&self, id: i64) -> Result<Option<WellnessRecommendation>, sqlx::Error> {
        let row: Option<WellnessRow> = sqlx::query_as(
            "SELECT id, title, description, category, risk_level, type AS kind, priority,
                    is_active, created_at, updated_at
             FROM wellness_recommendations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(WellnessRecommendation::from))
    }

    /// One page ordered by priority ascending, newest first within a priority.
    pub async fn list(&self, req: PageRequest) -> Result<Page<WellnessRecommendation>, sqlx::Error> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM wellness_recommendations")
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<WellnessRow> = sqlx::query_as(
            "SELECT id, title, description, category, risk_level, type AS kind, priority,
                    is_active, created_at, updated_at
             FROM wellness_recommendations
             ORDER BY priority ASC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(req.limit())
        .bind(req.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(
            rows.into_iter().map(WellnessRecommendation::from).collect(),
            req.page,
            req.size,
            total,
        ))
    }

    /// Active recommendations for a risk level (case-insensitive), by priority.
    pub async fn list_active_by_risk_level(
        &self,
        risk_level: &str,
    ) -> Result<Vec<WellnessRecommendation>, sqlx::Error> {
        let rows: Vec<WellnessRow> = sqlx::query_as(
            "SELECT id, title, description, category, risk_level, type AS kind, priority,
                    is_active, created_at, updated_at
             FROM wellness_recommendations
             WHERE lower(risk_level) = lower(?) AND is_active = 1
             ORDER BY priority ASC, id",
        )
        .bind(risk_level)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(WellnessRecommendation::from).collect())
    }

    pub async fn update(&self, id: i64, input: &WellnessInput) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE wellness_recommendations SET
                title = ?, description = ?, category = ?, risk_level = ?, type = ?,
                priority = COALESCE(?, priority),
                is_active = COALESCE(?, is_active),
                updated_at = datetime('now')
             WHERE id = ?",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.category)
        .bind(&input.risk_level)
        .bind(&input.kind)
        .bind(input.priority)
        .bind(input.is_active)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM wellness_recommendations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
