use std::collections::HashMap;

use axum::extract::Multipart;
use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::debug;

use crate::MediaError;

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Request body limit for routes taking an image, leaving room for the
/// multipart framing and text fields.
pub const MAX_UPLOAD_BODY_BYTES: usize = MAX_IMAGE_BYTES + 1024 * 1024;

/// Multipart field that carries the image file.
pub const IMAGE_FIELD: &str = "image";

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: String, content_type: String, bytes: Vec<u8>) -> Result<Self, MediaError> {
        if !content_type.starts_with("image/") {
            return Err(MediaError::NotAnImage);
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(MediaError::TooLarge {
                size: bytes.len(),
                limit: MAX_IMAGE_BYTES,
            });
        }
        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.content_type, STANDARD.encode(&self.bytes))
    }
}

/// A multipart body read into text fields plus at most one image.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    pub image: Option<ImageUpload>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, MediaError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| MediaError::Multipart(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == IMAGE_FIELD && field.file_name().is_some() {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| MediaError::Multipart(e.body_text()))?;

                // Browsers send an empty part when no file was chosen.
                if bytes.is_empty() {
                    continue;
                }

                debug!("Received image '{}' ({} bytes)", file_name, bytes.len());
                form.image = Some(ImageUpload::new(file_name, content_type, bytes.to_vec())?);
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| MediaError::Multipart(e.body_text()))?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// Trimmed value of a text field, `None` when missing or blank.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn take_image(&mut self) -> Option<ImageUpload> {
        self.image.take()
    }
}
