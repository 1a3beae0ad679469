//! User-owned report item values.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::sqlite::SqlitePool;
use tracing::warn;

#[derive(Clone)]
pub struct ValueStore {
    pool: SqlitePool,
}

/// A stored value, joined with the name of its report item.
#[derive(Debug, Clone)]
pub struct ReportValue {
    pub id: i64,
    pub user_id: i64,
    pub report_item_id: i64,
    pub report_item_name: String,
    pub value_number: Option<Decimal>,
    pub value_text: Option<String>,
    pub value_date: Option<NaiveDate>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct ValueRow {
    id: i64,
    user_id: i64,
    report_item_id: i64,
    report_item_name: String,
    /// Decimal text, kept exact
    value_number: Option<String>,
    value_text: Option<String>,
    value_date: Option<NaiveDate>,
    created_at: String,
    updated_at: String,
}

impl From<ValueRow> for ReportValue {
    fn from(row: ValueRow) -> Self {
        let value_number = row.value_number.and_then(|text| match Decimal::from_str(&text) {
            Ok(number) => Some(number),
            Err(e) => {
                warn!(value_id = row.id, error = %e, "Unreadable stored number");
                None
            }
        });
        Self {
            id: row.id,
            user_id: row.user_id,
            report_item_id: row.report_item_id,
            report_item_name: row.report_item_name,
            value_number,
            value_text: row.value_text,
            value_date: row.value_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Fields supplied on create and update.
#[derive(Debug, Clone)]
pub struct ValueInput {
    pub report_item_id: i64,
    pub value_number: Option<Decimal>,
    pub value_text: Option<String>,
    pub value_date: Option<NaiveDate>,
}

impl ValueStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a value owned by `user_id`. Returns the new ID.
    pub async fn create(&self, user_id: i64, input: &ValueInput) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO report_item_values (user_id, report_item_id, value_number, value_text, value_date)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(input.report_item_id)
        .bind(input.value_number.map(|n| n.to_string()))
        .bind(&input.value_text)
        .bind(input.value_date)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get(&self, id: i64) -> Result<Option<ReportValue>, sqlx::Error> {
        let row: Option<ValueRow> = sqlx::query_as(
            "SELECT v.id, v.user_id, v.report_item_id, i.name AS report_item_name,
                    v.value_number, v.value_text, v.value_date, v.created_at, v.updated_at
             FROM report_item_values v JOIN report_items i ON i.id = v.report_item_id
             WHERE v.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ReportValue::from))
    }

    /// All values owned by a user, oldest first.
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<ReportValue>, sqlx::Error> {
        let rows: Vec<ValueRow> = sqlx::query_as(
            "SELECT v.id, v.user_id, v.report_item_id, i.name AS report_item_name,
                    v.value_number, v.value_text, v.value_date, v.created_at, v.updated_at
             FROM report_item_values v JOIN report_items i ON i.id = v.report_item_id
             WHERE v.user_id = ? ORDER BY v.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ReportValue::from).collect())
    }

    pub async fn list_by_user_and_item(
        &self,
        user_id: i64,
        report_item_id: i64,
    ) -> Result<Vec<ReportValue>, sqlx::Error> {
        let rows: Vec<ValueRow> = sqlx::query_as(
            "SELECT v.id, v.user_id, v.report_item_id, i.name AS report_item_name,
                    v.value_number, v.value_text, v.value_date, v.created_at, v.updated_at
             FROM report_item_values v JOIN report_items i ON i.id = v.report_item_id
             WHERE v.user_id = ? AND v.report_item_id = ? ORDER BY v.id",
        )
        .bind(user_id)
        .bind(report_item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ReportValue::from).collect())
    }

    /// Replace the value's fields. Ownership is not changed.
    pub async fn update(&self, id: i64, input: &ValueInput) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE report_item_values
             SET report_item_id = ?, value_number = ?, value_text = ?, value_date = ?,
                 updated_at = datetime('now')
             WHERE id = ?",
        )
        .bind(input.report_item_id)
        .bind(input.value_number.map(|n| n.to_string()))
        .bind(&input.value_text)
        .bind(input.value_date)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a value and all of its attachment rows in one transaction.
    /// Returns false if the value did not exist.
    pub async fn delete_with_attachments(&self, id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM value_attachments WHERE value_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM report_item_values WHERE id = ?")
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
