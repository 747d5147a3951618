use serde::Deserialize;
use thiserror::Error;

use shared_database::{StoreError, UserPatch};
use shared_media::MultipartForm;
use shared_models::error::AppError;
use shared_models::user::Address;

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Profile fields sent as multipart text parts next to an optional image.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileUpdate {
    pub name: String,
    pub phone: String,
    pub address: Option<Address>,
    pub dob: String,
    pub gender: String,
}

impl ProfileUpdate {
    pub fn from_form(form: &MultipartForm) -> Result<Self, AccountError> {
        let (Some(name), Some(phone), Some(dob), Some(gender)) = (
            form.text("name"),
            form.text("phone"),
            form.text("dob"),
            form.text("gender"),
        ) else {
            return Err(AccountError::MissingProfileFields);
        };

        // Clients send the address as a JSON string.
        let address = form
            .text("address")
            .map(serde_json::from_str::<Address>)
            .transpose()
            .map_err(|_| AccountError::InvalidAddress)?;

        Ok(Self {
            name: name.to_string(),
            phone: phone.to_string(),
            address,
            dob: dob.to_string(),
            gender: gender.to_string(),
        })
    }

    pub fn into_patch(self, image: Option<String>) -> UserPatch {
        UserPatch {
            name: Some(self.name),
            phone: Some(self.phone),
            address: self.address,
            dob: Some(self.dob),
            gender: Some(self.gender),
            image,
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("User already exists")]
    EmailTaken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("Data Missing")]
    MissingProfileFields,

    #[error("Address must be a JSON object with line1 and line2")]
    InvalidAddress,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Rejected(#[from] AppError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::EmailTaken => AppError::Conflict(err.to_string()),
            AccountError::InvalidCredentials => AppError::Auth(err.to_string()),
            AccountError::UserNotFound => AppError::NotFound(err.to_string()),
            AccountError::MissingProfileFields | AccountError::InvalidAddress => {
                AppError::ValidationError(err.to_string())
            }
            AccountError::Hashing(msg) => AppError::Internal(msg),
            AccountError::Rejected(inner) => inner,
            AccountError::Store(StoreError::Duplicate(_)) => {
                AppError::Conflict(AccountError::EmailTaken.to_string())
            }
            AccountError::Store(e) => AppError::Database(e.to_string()),
        }
    }
}
