//! services/api/src/adapters/storage.rs
//!
//! Cloudinary adapter implementing the `ObjectStorageService` port through the
//! signed upload REST endpoint.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::path::Path;
use study_assistant_core::{
    domain::StoredObject,
    ports::{ObjectStorageService, PortError, PortResult},
};
use tracing::{error, info};

use crate::config::CloudinaryConfig;

#[derive(Clone)]
pub struct CloudinaryAdapter {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

impl CloudinaryAdapter {
    pub fn new(config: CloudinaryConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, config })
    }

    fn upload_url(&self) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/raw/upload",
            self.config.cloud_name
        )
    }
}

/// Cloudinary request signature: parameters sorted by name, joined as a query
/// string, suffixed with the API secret, then SHA-1 hex encoded.
pub(crate) fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let to_sign = sorted
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl ObjectStorageService for CloudinaryAdapter {
    async fn upload(&self, file_name: &str, data: Bytes) -> PortResult<StoredObject> {
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);
        let public_id = format!("{}/{}", self.config.folder, stem);
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[
                ("overwrite", "true"),
                ("public_id", &public_id),
                ("timestamp", &timestamp),
            ],
            &self.config.api_secret,
        );

        let form = Form::new()
            .part("file", Part::bytes(data.to_vec()).file_name(file_name.to_string()))
            .text("api_key", self.config.api_key.clone())
            .text("public_id", public_id.clone())
            .text("overwrite", "true")
            .text("timestamp", timestamp)
            .text("signature", signature);

        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Cloudinary upload failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!("Cloudinary rejected upload of {}: {} {}", public_id, status, detail);
            return Err(PortError::Unexpected(format!(
                "Cloudinary answered {} for {}",
                status, public_id
            )));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| PortError::InvalidUpstream(e.to_string()))?;
        info!("Stored {} at {}", uploaded.public_id, uploaded.secure_url);

        Ok(StoredObject {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_ignores_parameter_order() {
        let a = sign_params(&[("timestamp", "1"), ("public_id", "x/y")], "secret");
        let b = sign_params(&[("public_id", "x/y"), ("timestamp", "1")], "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn signature_depends_on_secret() {
        let params = [("public_id", "x/y"), ("timestamp", "1")];
        assert_ne!(sign_params(&params, "one"), sign_params(&params, "two"));
    }
}
