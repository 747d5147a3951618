use async_trait::async_trait;
use chrono::Utc;
use reqwest::{multipart::Form, Client};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::{ImageHost, ImageUpload, MediaError};

const UPLOAD_FOLDER: &str = "uploads";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Signed uploads to the Cloudinary image API.
pub struct CloudinaryClient {
    client: Client,
    upload_url: String,
    api_key: String,
    api_secret: String,
    configured: bool,
}

impl CloudinaryClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            upload_url: config.cloudinary_upload_url(),
            api_key: config.cloudinary_api_key.clone(),
            api_secret: config.cloudinary_secret_key.clone(),
            configured: config.is_image_host_configured(),
        }
    }

    /// SHA-256 over the sorted signed parameters followed by the API secret.
    pub fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut sorted: Vec<_> = params.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let to_sign = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let digest = Sha256::digest(format!("{}{}", to_sign, self.api_secret).as_bytes());
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[async_trait]
impl ImageHost for CloudinaryClient {
    async fn upload(&self, image: &ImageUpload) -> Result<String, MediaError> {
        if !self.configured {
            return Err(MediaError::NotConfigured);
        }

        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&[("folder", UPLOAD_FOLDER), ("timestamp", &timestamp)]);

        let form = Form::new()
            .text("file", image.data_uri())
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", UPLOAD_FOLDER)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        debug!("Uploading '{}' to {}", image.file_name, self.upload_url);

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| MediaError::Upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Image host rejected upload ({}): {}", status, body);
            return Err(MediaError::Upload(format!("image host returned {}", status)));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Upload(e.to_string()))?;

        info!("Image uploaded to {}", uploaded.secure_url);
        Ok(uploaded.secure_url)
    }
}
