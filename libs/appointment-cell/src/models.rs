// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::{AppointmentFilter, StoreError};
use shared_models::appointment::{
    Appointment, AppointmentView, DisplayStatus, LegacyFlags, PaymentMethod,
};
use shared_models::auth::{AuthUser, Role};
use shared_models::error::AppError;
use shared_models::user::User;

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub doc_id: Uuid,
    pub slot_date: String,
    pub slot_time: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentIdRequest {
    pub appointment_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteAppointmentRequest {
    pub appointment_id: Uuid,
    #[serde(default)]
    pub patient_visited: bool,
}

// ==============================================================================
// ACTORS AND ACTIONS
// ==============================================================================

/// Who is acting on an appointment. Patients and doctors only reach their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Patient(Uuid),
    Doctor(Uuid),
    Admin,
}

impl Actor {
    pub fn from_auth(user: &AuthUser) -> Result<Self, AppError> {
        match user.role {
            Role::Patient => Ok(Actor::Patient(user.record_id()?)),
            Role::Doctor => Ok(Actor::Doctor(user.record_id()?)),
            Role::Admin => Ok(Actor::Admin),
        }
    }

    /// Filter selecting `appointment_id` only if this actor may touch it.
    pub fn scope(&self, appointment_id: Uuid) -> AppointmentFilter {
        let filter = AppointmentFilter::by_id(appointment_id);
        match *self {
            Actor::Patient(user_id) => filter.for_user(user_id),
            Actor::Doctor(doc_id) => filter.for_doctor(doc_id),
            Actor::Admin => filter,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Confirm,
    Complete { patient_visited: bool },
    Cancel,
    Hide,
    PayCash,
    PayOnline,
}

impl Action {
    pub fn verb(&self) -> &'static str {
        match self {
            Action::Confirm => "confirm",
            Action::Complete { .. } => "complete",
            Action::Cancel => "cancel",
            Action::Hide => "remove",
            Action::PayCash | Action::PayOnline => "pay for",
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Doctor not available")]
    DoctorNotAvailable,

    #[error("Slot not available")]
    SlotNotAvailable,

    #[error("Cannot {} an appointment that is {current}", .action.verb())]
    InvalidStatusTransition {
        action: Action,
        current: DisplayStatus,
    },

    #[error("Appointment is already paid")]
    AlreadyPaid,

    #[error("The doctor's schedule is busy, please try again")]
    SlotContention,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    Store(#[from] StoreError),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound
            | AppointmentError::DoctorNotFound
            | AppointmentError::UserNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::DoctorNotAvailable
            | AppointmentError::SlotNotAvailable
            | AppointmentError::SlotContention => AppError::Conflict(err.to_string()),
            AppointmentError::InvalidStatusTransition { .. } | AppointmentError::AlreadyPaid => {
                AppError::PreconditionFailed(err.to_string())
            }
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::Store(StoreError::Duplicate(msg)) => AppError::Conflict(msg),
            AppointmentError::Store(e) => AppError::Database(e.to_string()),
        }
    }
}

// ==============================================================================
// RESULTS
// ==============================================================================

/// Result of a payment write. Replays of an already recorded payment succeed
/// without touching the stored document.
#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    Recorded(Appointment),
    AlreadyPaid(Appointment),
}

impl PaymentOutcome {
    pub fn appointment(&self) -> &Appointment {
        match self {
            PaymentOutcome::Recorded(a) | PaymentOutcome::AlreadyPaid(a) => a,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, PaymentOutcome::AlreadyPaid(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub scanned: usize,
    pub released: usize,
    pub already_free: usize,
    pub failed: usize,
}

// ==============================================================================
// VIEWS
// ==============================================================================

/// Patient fields joined onto a doctor's appointment rows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PatientSummary {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub image: Option<String>,
    pub age: Option<u32>,
}

impl PatientSummary {
    pub fn from_user(user: Option<&User>, today: chrono::NaiveDate) -> Self {
        match user {
            Some(user) => Self {
                name: Some(user.name.clone()),
                email: Some(user.email.clone()),
                phone: Some(user.phone.clone()),
                image: Some(user.image.clone()),
                age: user.age_on(today),
            },
            None => Self::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorAppointmentView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub patient_name: String,
    pub age: Option<u32>,
    pub date: String,
    pub time: String,
    pub fees: f64,
    pub payment_mode: String,
    pub payment: bool,
    pub payment_method: Option<PaymentMethod>,
    pub status: DisplayStatus,
    #[serde(flatten)]
    pub flags: LegacyFlags,
    pub user_data: PatientSummary,
}

impl DoctorAppointmentView {
    pub fn new(appointment: &Appointment, patient: PatientSummary) -> Self {
        Self {
            id: appointment.id,
            patient_name: patient.name.clone().unwrap_or_else(|| "Unknown".to_string()),
            age: patient.age,
            date: appointment.slot_date.clone(),
            time: appointment.slot_time.clone(),
            fees: appointment.amount,
            payment_mode: appointment.payment_mode(),
            payment: appointment.payment,
            payment_method: appointment.payment_method,
            status: appointment.status.display(),
            flags: appointment.status.flags(),
            user_data: patient,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorDashboardStats {
    pub total_appointments: u64,
    pub completed_appointments: u64,
    pub confirmed_appointments: u64,
    pub cancelled_appointments: u64,
    pub pending_appointments: u64,
    pub today_appointments: Vec<DoctorAppointmentView>,
    pub recent_appointments: Vec<DoctorAppointmentView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboardStats {
    pub doctors: u64,
    pub patients: u64,
    pub appointments: u64,
    pub pending_appointments: u64,
    pub confirmed_appointments: u64,
    pub completed_appointments: u64,
    pub cancelled_appointments: u64,
    pub latest_appointments: Vec<AppointmentView>,
}
