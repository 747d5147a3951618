pub mod cloudinary;
pub mod upload;

use async_trait::async_trait;
use thiserror::Error;

use shared_models::error::AppError;

pub use cloudinary::CloudinaryClient;
pub use upload::{ImageUpload, MultipartForm, MAX_IMAGE_BYTES, MAX_UPLOAD_BODY_BYTES};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Not an image! Please upload only images.")]
    NotAnImage,

    #[error("Image is too large ({size} bytes, limit {limit})")]
    TooLarge { size: usize, limit: usize },

    #[error("Malformed multipart body: {0}")]
    Multipart(String),

    #[error("Image host is not configured")]
    NotConfigured,

    #[error("Image upload failed: {0}")]
    Upload(String),
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::NotAnImage | MediaError::TooLarge { .. } => {
                AppError::ValidationError(err.to_string())
            }
            MediaError::Multipart(msg) => AppError::BadRequest(msg),
            MediaError::NotConfigured | MediaError::Upload(_) => {
                AppError::ExternalService(err.to_string())
            }
        }
    }
}

/// Durable storage for uploaded images.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Stores the image and returns its public URL.
    async fn upload(&self, image: &ImageUpload) -> Result<String, MediaError>;
}
