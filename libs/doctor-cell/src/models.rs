use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use shared_database::{DoctorPatch, StoreError};
use shared_media::MultipartForm;
use shared_models::error::AppError;
use shared_models::user::Address;

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorLoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Body of the admin availability toggle.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    pub doc_id: Uuid,
}

/// Practice fields of a doctor, read from multipart text parts.
#[derive(Debug, Clone, PartialEq)]
pub struct PracticeDetails {
    pub name: String,
    pub speciality: String,
    pub degree: String,
    pub experience: String,
    pub fees: f64,
    pub about: String,
    pub address: Address,
}

impl PracticeDetails {
    /// Every field is required; `fees` must be a positive number and
    /// `address` a JSON object.
    pub fn from_form(form: &MultipartForm) -> Result<Self, DoctorError> {
        let (
            Some(name),
            Some(speciality),
            Some(degree),
            Some(experience),
            Some(fees),
            Some(about),
            Some(address),
        ) = (
            form.text("name"),
            form.text("speciality"),
            form.text("degree"),
            form.text("experience"),
            form.text("fees"),
            form.text("about"),
            form.text("address"),
        )
        else {
            return Err(DoctorError::MissingFields);
        };

        let fees = fees
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && *f > 0.0)
            .ok_or(DoctorError::InvalidFees)?;
        let address = serde_json::from_str::<Address>(address).map_err(|_| DoctorError::InvalidAddress)?;

        Ok(Self {
            name: name.to_string(),
            speciality: speciality.to_string(),
            degree: degree.to_string(),
            experience: experience.to_string(),
            fees,
            about: about.to_string(),
            address,
        })
    }

    pub fn into_patch(self, image: Option<String>) -> DoctorPatch {
        DoctorPatch {
            name: Some(self.name),
            speciality: Some(self.speciality),
            degree: Some(self.degree),
            experience: Some(self.experience),
            fees: Some(self.fees),
            about: Some(self.about),
            address: Some(self.address),
            image,
            available: None,
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Please provide all required fields")]
    MissingFields,

    #[error("Fees must be a positive number")]
    InvalidFees,

    #[error("Address must be a JSON object with line1 and line2")]
    InvalidAddress,

    #[error("Doctor image is required")]
    MissingImage,

    #[error("A doctor with this email already exists")]
    EmailTaken,

    #[error("Doctor has active appointments")]
    HasActiveAppointments,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Rejected(#[from] AppError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound => AppError::NotFound(err.to_string()),
            DoctorError::InvalidCredentials => AppError::Auth(err.to_string()),
            DoctorError::MissingFields
            | DoctorError::InvalidFees
            | DoctorError::InvalidAddress
            | DoctorError::MissingImage => AppError::ValidationError(err.to_string()),
            DoctorError::EmailTaken | DoctorError::HasActiveAppointments => {
                AppError::Conflict(err.to_string())
            }
            DoctorError::Hashing(msg) => AppError::Internal(msg),
            DoctorError::Rejected(inner) => inner,
            DoctorError::Store(StoreError::Duplicate(_)) => {
                AppError::Conflict(DoctorError::EmailTaken.to_string())
            }
            DoctorError::Store(e) => AppError::Database(e.to_string()),
        }
    }
}
