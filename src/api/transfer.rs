//! Multipart upload parsing and file download responses.

use std::collections::HashMap;

use axum::{
    body::Body,
    extract::Multipart,
    http::{HeaderMap, HeaderValue, header},
    response::IntoResponse,
};

use super::error::ApiError;
use crate::attachments::Upload;

/// Maximum request body for upload endpoints.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// A parsed multipart form: the `file` part plus any text fields.
pub struct UploadForm {
    pub file: Option<Upload>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    /// A text field with surrounding whitespace removed; blank counts as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// The uploaded file, rejecting a missing or empty one.
    pub fn require_file(self) -> Result<(Upload, HashMap<String, String>), ApiError> {
        match self.file {
            Some(file) if !file.bytes.is_empty() => Ok((file, self.fields)),
            _ => Err(ApiError::bad_request("Please select a file to upload")),
        }
    }
}

/// Read every part of a multipart body. The part named `file` becomes the upload.
pub async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut file = None;
    let mut fields = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("Invalid multipart data"))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or("").to_string();
            let content_type = field.content_type().map(|ct| ct.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|_| ApiError::bad_request("Failed to read file data"))?;
            file = Some(Upload {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
        } else {
            let text = field
                .text()
                .await
                .map_err(|_| ApiError::bad_request(format!("Failed to read {}", name)))?;
            fields.insert(name, text);
        }
    }

    Ok(UploadForm { file, fields })
}

/// Raw bytes served as a download under the original file name.
pub fn download(bytes: Vec<u8>, content_type: &'static str, file_name: &str) -> impl IntoResponse + use<> {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_DISPOSITION, content_disposition(file_name));
    (headers, Body::from(bytes))
}

fn content_disposition(file_name: &str) -> HeaderValue {
    let quoted: String = file_name
        .chars()
        .map(|c| if c == '"' || c == '\\' { '_' } else { c })
        .collect();
    HeaderValue::from_bytes(format!("attachment; filename=\"{}\"", quoted).as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_quotes_name() {
        assert_eq!(
            content_disposition("report.pdf"),
            "attachment; filename=\"report.pdf\""
        );
        assert_eq!(
            content_disposition("a\"b.pdf"),
            "attachment; filename=\"a_b.pdf\""
        );
    }

    #[test]
    fn test_content_disposition_falls_back_on_control_chars() {
        assert_eq!(content_disposition("bad\nname"), "attachment");
    }

    #[test]
    fn test_form_text_ignores_blank() {
        let form = UploadForm {
            file: None,
            fields: HashMap::from([
                ("description".to_string(), "  notes ".to_string()),
                ("userId".to_string(), "   ".to_string()),
            ]),
        };
        assert_eq!(form.text("description"), Some("notes"));
        assert_eq!(form.text("userId"), None);
        assert!(form.require_file().is_err());
    }
}
