//! Attachment lifecycle: file bytes in the [`FileStore`], metadata in the database.
//!
//! Callers resolve the owning record and check ownership first; everything
//! here assumes the caller is allowed to touch the record it passes in.
//!
//! Writes go file first, then metadata. If the metadata insert fails the file
//! is removed again. A crash between the two still leaves an orphaned file.
//! Deletes go the other way round: files first (best-effort), then rows.

use tracing::{info, warn};

use crate::db::{
    Database, JendoReport, NewJendoReport, NewValueAttachment, ReportValue, ValueAttachment,
};
use crate::files::{self, FileStore, StorageError};

/// Content type every Jendo report must have.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// An uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub enum AttachmentError {
    Storage(StorageError),
    Database(sqlx::Error),
}

impl std::fmt::Display for AttachmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttachmentError::Storage(e) => write!(f, "Storage error: {}", e),
            AttachmentError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for AttachmentError {}

impl From<StorageError> for AttachmentError {
    fn from(e: StorageError) -> Self {
        AttachmentError::Storage(e)
    }
}

impl From<sqlx::Error> for AttachmentError {
    fn from(e: sqlx::Error) -> Self {
        AttachmentError::Database(e)
    }
}

#[derive(Clone)]
pub struct Attachments {
    db: Database,
    files: FileStore,
}

impl Attachments {
    pub fn new(db: Database, files: FileStore) -> Self {
        Self { db, files }
    }

    /// Store an upload and record it against a value.
    pub async fn attach_to_value(
        &self,
        value: &ReportValue,
        upload: &Upload,
    ) -> Result<ValueAttachment, AttachmentError> {
        let stored = self
            .files
            .store(files::VALUE_ATTACHMENTS, &upload.file_name, &upload.bytes, false)
            .await?;

        let created = self
            .db
            .value_attachments()
            .create(&NewValueAttachment {
                value_id: value.id,
                file_path: &stored.path,
                original_name: &stored.original_name,
                content_type: upload.content_type.as_deref(),
                file_size: stored.size as i64,
            })
            .await;

        let id = match created {
            Ok(id) => id,
            Err(e) => {
                self.files.remove(&stored.path).await;
                return Err(e.into());
            }
        };

        info!(value_id = value.id, attachment_id = id, path = %stored.path, "Attachment stored");

        self.db
            .value_attachments()
            .get(id)
            .await?
            .ok_or(AttachmentError::Database(sqlx::Error::RowNotFound))
    }

    /// Read the bytes of a value attachment.
    pub async fn open_value_attachment(
        &self,
        attachment: &ValueAttachment,
    ) -> Result<Vec<u8>, AttachmentError> {
        Ok(self.files.read(&attachment.file_path).await?)
    }

    /// Remove an attachment's file, then its row.
    pub async fn delete_value_attachment(
        &self,
        attachment: &ValueAttachment,
    ) -> Result<(), AttachmentError> {
        self.files.remove(&attachment.file_path).await;
        self.db.value_attachments().delete(attachment.id).await?;
        info!(attachment_id = attachment.id, "Attachment deleted");
        Ok(())
    }

    /// Delete a value with all of its attachments.
    /// Files are removed first; rows go in a single transaction afterwards.
    pub async fn delete_value(&self, value_id: i64) -> Result<bool, AttachmentError> {
        let attachments = self.db.value_attachments().list_by_value(value_id).await?;
        for attachment in &attachments {
            self.files.remove(&attachment.file_path).await;
        }

        let deleted = self.db.values().delete_with_attachments(value_id).await?;
        if deleted {
            info!(value_id, attachments = attachments.len(), "Value deleted");
        } else if !attachments.is_empty() {
            warn!(value_id, "Value vanished while deleting its attachments");
        }
        Ok(deleted)
    }

    /// Store a Jendo report PDF for a user.
    pub async fn store_report(
        &self,
        user_id: i64,
        upload: &Upload,
        description: Option<&str>,
    ) -> Result<JendoReport, AttachmentError> {
        let stored = self
            .files
            .store(files::JENDO_REPORTS, &upload.file_name, &upload.bytes, false)
            .await?;

        let created = self
            .db
            .jendo_reports()
            .create(&NewJendoReport {
                user_id,
                file_path: &stored.path,
                file_name: &stored.file_name,
                original_name: &stored.original_name,
                file_size: stored.size as i64,
                content_type: PDF_CONTENT_TYPE,
                description,
            })
            .await;

        let id = match created {
            Ok(id) => id,
            Err(e) => {
                self.files.remove(&stored.path).await;
                return Err(e.into());
            }
        };

        info!(user_id, report_id = id, path = %stored.path, "Jendo report stored");

        self.db
            .jendo_reports()
            .get(id)
            .await?
            .ok_or(AttachmentError::Database(sqlx::Error::RowNotFound))
    }

    pub async fn open_report(&self, report: &JendoReport) -> Result<Vec<u8>, AttachmentError> {
        Ok(self.files.read(&report.file_path).await?)
    }

    /// Remove a report's file, then its row.
    pub async fn delete_report(&self, report: &JendoReport) -> Result<(), AttachmentError> {
        self.files.remove(&report.file_path).await;
        self.db.jendo_reports().delete(report.id).await?;
        info!(report_id = report.id, "Jendo report deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{ItemInput, ValueInput};

    use super::*;

    async fn setup() -> (Attachments, Database, tempfile::TempDir, ReportValue) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(":memory:").await.unwrap();
        let user_id = db.users().create("alice@example.com", None).await.unwrap();
        let item_id = db
            .items()
            .create(&ItemInput {
                name: "ECG".into(),
                description: None,
                icon: None,
                section_id: None,
            })
            .await
            .unwrap();
        let value_id = db
            .values()
            .create(
                user_id,
                &ValueInput {
                    report_item_id: item_id,
                    value_number: None,
                    value_text: None,
                    value_date: None,
                },
            )
            .await
            .unwrap();
        let value = db.values().get(value_id).await.unwrap().unwrap();
        let attachments = Attachments::new(db.clone(), FileStore::new(dir.path()).unwrap());
        (attachments, db, dir, value)
    }

    fn upload(name: &str, bytes: &[u8]) -> Upload {
        Upload {
            file_name: name.into(),
            content_type: Some("text/plain".into()),
            bytes: bytes.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_attach_open_and_delete() {
        let (attachments, db, dir, value) = setup().await;

        let a = attachments
            .attach_to_value(&value, &upload("notes.txt", b"hello"))
            .await
            .unwrap();
        assert_eq!(a.value_id, value.id);
        assert_eq!(a.owner_id, value.user_id);
        assert_eq!(a.original_name, "notes.txt");
        assert_eq!(a.file_size, 5);
        assert_eq!(attachments.open_value_attachment(&a).await.unwrap(), b"hello");

        attachments.delete_value_attachment(&a).await.unwrap();
        assert!(!dir.path().join(&a.file_path).exists());
        assert!(db.value_attachments().get(a.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_value_cascades_files_and_rows() {
        let (attachments, db, dir, value) = setup().await;

        let a = attachments
            .attach_to_value(&value, &upload("same.txt", b"one"))
            .await
            .unwrap();
        let b = attachments
            .attach_to_value(&value, &upload("same.txt", b"two"))
            .await
            .unwrap();
        assert_ne!(a.file_path, b.file_path);

        assert!(attachments.delete_value(value.id).await.unwrap());

        for att in [&a, &b] {
            assert!(!dir.path().join(&att.file_path).exists());
            assert!(db.value_attachments().get(att.id).await.unwrap().is_none());
        }
        assert!(db.values().get(value.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let (attachments, _db, dir, value) = setup().await;

        let a = attachments
            .attach_to_value(&value, &upload("gone.txt", b"x"))
            .await
            .unwrap();
        std::fs::remove_file(dir.path().join(&a.file_path)).unwrap();

        assert!(matches!(
            attachments.open_value_attachment(&a).await,
            Err(AttachmentError::Storage(StorageError::NotFound))
        ));
    }

    #[tokio::test]
    async fn test_failed_insert_removes_file() {
        let (attachments, _db, dir, value) = setup().await;

        // Parent row no longer exists, so the foreign key rejects the insert
        let orphan = ReportValue {
            id: value.id + 100,
            ..value
        };
        let result = attachments
            .attach_to_value(&orphan, &upload("x.txt", b"x"))
            .await;
        assert!(matches!(result, Err(AttachmentError::Database(_))));

        let category_dir = dir.path().join(files::VALUE_ATTACHMENTS);
        let leftover = std::fs::read_dir(&category_dir).unwrap().count();
        assert_eq!(leftover, 0);
    }

    #[tokio::test]
    async fn test_store_and_delete_report() {
        let (attachments, db, dir, value) = setup().await;

        let report = attachments
            .store_report(value.user_id, &upload("result.pdf", b"%PDF-1.4"), Some("first"))
            .await
            .unwrap();
        assert_eq!(report.content_type, PDF_CONTENT_TYPE);
        assert_eq!(report.original_name, "result.pdf");
        assert!(report.file_name.ends_with("_result.pdf"));
        assert_eq!(report.description.as_deref(), Some("first"));
        assert_eq!(attachments.open_report(&report).await.unwrap(), b"%PDF-1.4");

        attachments.delete_report(&report).await.unwrap();
        assert!(!dir.path().join(&report.file_path).exists());
        assert!(db.jendo_reports().get(report.id).await.unwrap().is_none());
    }
}
