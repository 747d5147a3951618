use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{AppointmentFilter, ClinicStore, DoctorPatch, StoreError};
use shared_models::appointment::DisplayStatus;
use shared_models::auth::Role;
use shared_models::doctor::{Doctor, SlotBook};
use shared_utils::jwt::issue_session_token;
use shared_utils::password::{hash_password, verify_password};
use shared_utils::validation::{normalize_email, validate_new_account};

use crate::models::{DoctorError, DoctorLoginRequest, PracticeDetails};

/// Doctor accounts: login, profile upkeep, availability, onboarding and
/// removal.
pub struct DoctorProfileService {
    store: Arc<dyn ClinicStore>,
    config: Arc<AppConfig>,
}

impl DoctorProfileService {
    pub fn new(store: Arc<dyn ClinicStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    pub async fn login(&self, request: DoctorLoginRequest) -> Result<String, DoctorError> {
        let email = normalize_email(&request.email);
        if email.is_empty() || request.password.is_empty() {
            return Err(DoctorError::InvalidCredentials);
        }

        let Some(doctor) = self.store.find_doctor_by_email(&email).await? else {
            debug!("Doctor login for unknown email {}", email);
            return Err(DoctorError::InvalidCredentials);
        };

        let matches = verify_password(&request.password, &doctor.password_hash).unwrap_or_else(|e| {
            warn!("Stored password hash of doctor {} is unreadable: {}", doctor.id, e);
            false
        });
        if !matches {
            return Err(DoctorError::InvalidCredentials);
        }

        Ok(issue_session_token(&self.config, &doctor.id.to_string(), Role::Doctor)?)
    }

    pub async fn get(&self, doc_id: Uuid) -> Result<Doctor, DoctorError> {
        self.store
            .find_doctor(doc_id)
            .await?
            .ok_or(DoctorError::NotFound)
    }

    pub async fn update_profile(
        &self,
        doc_id: Uuid,
        details: PracticeDetails,
        image: Option<String>,
    ) -> Result<Doctor, DoctorError> {
        let doctor = self
            .store
            .update_doctor(doc_id, &details.into_patch(image))
            .await?
            .ok_or(DoctorError::NotFound)?;

        info!("Profile of doctor {} updated", doc_id);
        Ok(doctor)
    }

    /// Flips the availability flag and returns the doctor as updated.
    pub async fn toggle_availability(&self, doc_id: Uuid) -> Result<Doctor, DoctorError> {
        let current = self.get(doc_id).await?;
        let doctor = self
            .store
            .update_doctor(doc_id, &DoctorPatch::availability(!current.available))
            .await?
            .ok_or(DoctorError::NotFound)?;

        info!("Doctor {} availability set to {}", doc_id, doctor.available);
        Ok(doctor)
    }

    /// Fails when `email` already belongs to a doctor.
    pub async fn ensure_email_free(&self, email: &str) -> Result<(), DoctorError> {
        match self.store.find_doctor_by_email(&normalize_email(email)).await? {
            Some(_) => Err(DoctorError::EmailTaken),
            None => Ok(()),
        }
    }

    /// Onboards a doctor with a hashed password and an empty slot book.
    pub async fn create(
        &self,
        email: &str,
        password: &str,
        details: PracticeDetails,
        image: String,
    ) -> Result<Doctor, DoctorError> {
        validate_new_account(&details.name, email, password)?;
        self.ensure_email_free(email).await?;
        let email = normalize_email(email);

        let password_hash = hash_password(password).map_err(|e| {
            error!("Failed to hash doctor password: {}", e);
            DoctorError::Hashing(e.to_string())
        })?;

        let doctor = Doctor {
            id: Uuid::new_v4(),
            name: details.name,
            email,
            password_hash,
            image,
            speciality: details.speciality,
            degree: details.degree,
            experience: details.experience,
            about: details.about,
            available: true,
            fees: details.fees,
            address: details.address,
            created_at: Utc::now(),
            slots_booked: SlotBook::default(),
            slots_version: 0,
        };

        match self.store.insert_doctor(&doctor).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => return Err(DoctorError::EmailTaken),
            Err(e) => return Err(e.into()),
        }

        info!("Doctor {} added", doctor.id);
        Ok(doctor)
    }

    /// Deletes a doctor with no pending or confirmed appointments.
    ///
    /// Bookings reserve a slot, bumping `slots_version`, before their
    /// appointment row exists, so the delete only goes through if the version
    /// read before counting is still current. A booking that slips in between
    /// is reported as an active appointment.
    pub async fn delete(&self, doc_id: Uuid) -> Result<(), DoctorError> {
        let doctor = self
            .store
            .find_doctor(doc_id)
            .await?
            .ok_or(DoctorError::NotFound)?;

        let active = AppointmentFilter::new()
            .for_doctor(doc_id)
            .with_statuses(&[DisplayStatus::Pending, DisplayStatus::Confirmed]);
        let count = self.store.count_appointments(&active).await?;
        if count > 0 {
            debug!("Refusing to delete doctor {} with {} active appointments", doc_id, count);
            return Err(DoctorError::HasActiveAppointments);
        }

        if !self.store.delete_doctor(doc_id, doctor.slots_version).await? {
            return match self.store.find_doctor(doc_id).await? {
                Some(_) => {
                    debug!("Doctor {} was booked while being deleted", doc_id);
                    Err(DoctorError::HasActiveAppointments)
                }
                None => Err(DoctorError::NotFound),
            };
        }

        info!("Doctor {} deleted", doc_id);
        Ok(())
    }
}
