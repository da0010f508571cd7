//! services/api/src/web/upload.rs
//!
//! Reads `multipart/form-data` uploads: one `file` part plus optional text fields.

use axum::extract::Multipart;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

use crate::web::error::HttpError;

pub const FILE_FIELD: &str = "file";

pub struct UploadedFile {
    pub file_name: String,
    pub data: Bytes,
}

#[derive(Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub fn require_file(&mut self) -> Result<UploadedFile, HttpError> {
        self.file
            .take()
            .ok_or_else(|| HttpError::bad_request("No file uploaded"))
    }

    /// A text field, if present and non-blank.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

pub async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, HttpError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::bad_request(format!("Failed to read multipart data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == FILE_FIELD {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let data = field.bytes().await.map_err(|e| {
                HttpError::bad_request(format!("Failed to read file bytes: {}", e))
            })?;
            form.file = Some(UploadedFile { file_name, data });
        } else {
            let value = field.text().await.map_err(|e| {
                HttpError::bad_request(format!("Failed to read field {}: {}", name, e))
            })?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

/// A collision-free storage name `<uuid><ext>` that keeps the original extension.
pub fn unique_file_name(original: &str) -> (Uuid, String) {
    let id = Uuid::new_v4();
    let name = match Path::new(original).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    };
    (id, name)
}
