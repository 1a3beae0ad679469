//! Metadata for files attached to report values.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct ValueAttachmentStore {
    pool: SqlitePool,
}

/// Attachment metadata, including the owner of the parent value.
#[derive(Debug, Clone)]
pub struct ValueAttachment {
    pub id: i64,
    pub value_id: i64,
    pub owner_id: i64,
    pub file_path: String,
    pub original_name: String,
    pub content_type: Option<String>,
    pub file_size: i64,
    pub uploaded_at: String,
}

#[derive(sqlx::FromRow)]
struct ValueAttachmentRow {
    id: i64,
    value_id: i64,
    owner_id: i64,
    file_path: String,
    original_name: String,
    content_type: Option<String>,
    file_size: i64,
    uploaded_at: String,
}

impl From<ValueAttachmentRow> for ValueAttachment {
    fn from(row: ValueAttachmentRow) -> Self {
        Self {
            id: row.id,
            value_id: row.value_id,
            owner_id: row.owner_id,
            file_path: row.file_path,
            original_name: row.original_name,
            content_type: row.content_type,
            file_size: row.file_size,
            uploaded_at: row.uploaded_at,
        }
    }
}

pub struct NewValueAttachment<'a> {
    pub value_id: i64,
    pub file_path: &'a str,
    pub original_name: &'a str,
    pub content_type: Option<&'a str>,
    pub file_size: i64,
}

impl ValueAttachmentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record an attachment. Returns the new ID.
    pub async fn create(&self, input: &NewValueAttachment<'_>) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO value_attachments (value_id, file_path, original_name, content_type, file_size)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(input.value_id)
        .bind(input.file_path)
        .bind(input.original_name)
        .bind(input.content_type)
        .bind(input.file_size)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get(&self, id: i64) -> Result<Option<ValueAttachment>, sqlx::Error> {
        let row: Option<ValueAttachmentRow> = sqlx::query_as(
            "SELECT a.id, a.value_id, v.user_id AS owner_id, a.file_path, a.original_name,
                    a.content_type, a.file_size, a.uploaded_at
             FROM value_attachments a JOIN report_item_values v ON v.id = a.value_id
             WHERE a.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ValueAttachment::from))
    }

    pub async fn list_by_value(&self, value_id: i64) -> Result<Vec<ValueAttachment>, sqlx::Error> {
        let rows: Vec<ValueAttachmentRow> = sqlx::query_as(
            "SELECT a.id, a.value_id, v.user_id AS owner_id, a.file_path, a.original_name,
                    a.content_type, a.file_size, a.uploaded_at
             FROM value_attachments a JOIN report_item_values v ON v.id = a.value_id
             WHERE a.value_id = ? ORDER BY a.id",
        )
        .bind(value_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ValueAttachment::from).collect())
    }

    /// Every attachment on every value owned by a user.
    pub async fn list_by_owner(&self, user_id: i64) -> Result<Vec<ValueAttachment>, sqlx::Error> {
        let rows: Vec<ValueAttachmentRow> = sqlx::query_as(
            "SELECT a.id, a.value_id, v.user_id AS owner_id, a.file_path, a.original_name,
                    a.content_type, a.file_size, a.uploaded_at
             FROM value_attachments a JOIN report_item_values v ON v.id = a.value_id
             WHERE v.user_id = ? ORDER BY a.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ValueAttachment::from).collect())
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM value_attachments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
