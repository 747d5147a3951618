use serde::Deserialize;

use doctor_cell::{DoctorError, PracticeDetails};
use shared_media::{ImageUpload, MultipartForm};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminLoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// The add-doctor form: credentials, practice details and a required photo.
#[derive(Debug, Clone)]
pub struct NewDoctorForm {
    pub email: String,
    pub password: String,
    pub details: PracticeDetails,
    pub image: ImageUpload,
}

impl NewDoctorForm {
    pub fn from_form(mut form: MultipartForm) -> Result<Self, DoctorError> {
        let details = PracticeDetails::from_form(&form)?;
        let (Some(email), Some(password)) = (form.text("email"), form.text("password")) else {
            return Err(DoctorError::MissingFields);
        };
        let (email, password) = (email.to_string(), password.to_string());
        let image = form.take_image().ok_or(DoctorError::MissingImage)?;

        Ok(Self {
            email,
            password,
            details,
            image,
        })
    }
}
