use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::doctor::DoctorSnapshot;

// ==============================================================================
// STATUS
// ==============================================================================

/// Lifecycle state of an appointment.
///
/// Stored and transmitted as its [`DisplayStatus`] label, so a completed visit
/// is `"completed"` and a completed no-show is `"missed"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DisplayStatus", into = "DisplayStatus")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed { patient_visited: bool },
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Pending,
    Confirmed,
    Completed,
    Missed,
    Cancelled,
}

impl DisplayStatus {
    pub const ALL: [DisplayStatus; 5] = [
        DisplayStatus::Pending,
        DisplayStatus::Confirmed,
        DisplayStatus::Completed,
        DisplayStatus::Missed,
        DisplayStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayStatus::Pending => "pending",
            DisplayStatus::Confirmed => "confirmed",
            DisplayStatus::Completed => "completed",
            DisplayStatus::Missed => "missed",
            DisplayStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<AppointmentStatus> for DisplayStatus {
    fn from(status: AppointmentStatus) -> Self {
        status.display()
    }
}

impl From<DisplayStatus> for AppointmentStatus {
    fn from(label: DisplayStatus) -> Self {
        match label {
            DisplayStatus::Pending => AppointmentStatus::Pending,
            DisplayStatus::Confirmed => AppointmentStatus::Confirmed,
            DisplayStatus::Completed => AppointmentStatus::Completed { patient_visited: true },
            DisplayStatus::Missed => AppointmentStatus::Completed { patient_visited: false },
            DisplayStatus::Cancelled => AppointmentStatus::Cancelled,
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display().as_str())
    }
}

/// The independent boolean flags older clients read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyFlags {
    pub cancelled: bool,
    pub is_confirmed: bool,
    pub is_completed: bool,
    pub patient_visited: bool,
}

impl AppointmentStatus {
    pub fn display(&self) -> DisplayStatus {
        match self {
            AppointmentStatus::Pending => DisplayStatus::Pending,
            AppointmentStatus::Confirmed => DisplayStatus::Confirmed,
            AppointmentStatus::Completed { patient_visited: true } => DisplayStatus::Completed,
            AppointmentStatus::Completed { patient_visited: false } => DisplayStatus::Missed,
            AppointmentStatus::Cancelled => DisplayStatus::Cancelled,
        }
    }

    /// Reads a status out of a legacy flag combination. Cancellation wins,
    /// then completion, then confirmation.
    pub fn from_flags(flags: LegacyFlags) -> Self {
        if flags.cancelled {
            AppointmentStatus::Cancelled
        } else if flags.is_completed {
            AppointmentStatus::Completed {
                patient_visited: flags.patient_visited,
            }
        } else if flags.is_confirmed {
            AppointmentStatus::Confirmed
        } else {
            AppointmentStatus::Pending
        }
    }

    pub fn flags(&self) -> LegacyFlags {
        match *self {
            AppointmentStatus::Pending => LegacyFlags::default(),
            AppointmentStatus::Confirmed => LegacyFlags {
                is_confirmed: true,
                ..LegacyFlags::default()
            },
            AppointmentStatus::Completed { patient_visited } => LegacyFlags {
                is_confirmed: true,
                is_completed: true,
                patient_visited,
                ..LegacyFlags::default()
            },
            AppointmentStatus::Cancelled => LegacyFlags {
                cancelled: true,
                ..LegacyFlags::default()
            },
        }
    }

    /// Pending or confirmed: the slot is held and the visit has not happened.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }
}

// ==============================================================================
// PAYMENT
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Online => "online",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tran_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_tran_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
}

// ==============================================================================
// APPOINTMENT DOCUMENT
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub doc_id: Uuid,
    pub slot_date: String,
    pub slot_time: String,
    pub doc_data: DoctorSnapshot,
    pub amount: f64,
    pub status: AppointmentStatus,
    pub payment: bool,
    pub payment_method: Option<PaymentMethod>,
    pub payment_info: Option<PaymentInfo>,
    pub transaction_id: Option<String>,
    pub show_to_user: bool,
    pub show_to_doctor: bool,
    /// Set once the doctor slot of a cancelled appointment has been given back.
    pub slot_released: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn new(user_id: Uuid, doctor: DoctorSnapshot, slot_date: String, slot_time: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            doc_id: doctor.id,
            slot_date,
            slot_time,
            amount: doctor.fees,
            doc_data: doctor,
            status: AppointmentStatus::Pending,
            payment: false,
            payment_method: None,
            payment_info: None,
            transaction_id: None,
            show_to_user: true,
            show_to_doctor: true,
            slot_released: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.payment_info.as_ref().and_then(|info| info.paid_at)
    }

    /// Human label of the payment state, as shown on the doctor's lists.
    pub fn payment_mode(&self) -> String {
        match (self.payment, self.payment_method) {
            (false, _) => "Unpaid".to_string(),
            (true, Some(PaymentMethod::Cash)) => "Cash Payment".to_string(),
            (true, Some(method)) => format!("Paid via {}", method.as_str()),
            (true, None) => "Online".to_string(),
        }
    }
}

/// Wire representation kept compatible with the existing web clients. The
/// gateway transaction id stays server side: it is the only secret in the
/// success callback URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub doc_id: Uuid,
    pub slot_date: String,
    pub slot_time: String,
    pub doc_data: DoctorSnapshot,
    pub amount: f64,
    pub date: i64,
    pub status: DisplayStatus,
    #[serde(flatten)]
    pub flags: LegacyFlags,
    pub payment: bool,
    pub payment_method: Option<PaymentMethod>,
    pub payment_info: Option<PaymentInfo>,
    pub show_to_user: bool,
    pub show_to_doctor: bool,
}

impl From<&Appointment> for AppointmentView {
    fn from(appointment: &Appointment) -> Self {
        Self {
            id: appointment.id,
            user_id: appointment.user_id,
            doc_id: appointment.doc_id,
            slot_date: appointment.slot_date.clone(),
            slot_time: appointment.slot_time.clone(),
            doc_data: appointment.doc_data.clone(),
            amount: appointment.amount,
            date: appointment.created_at.timestamp_millis(),
            status: appointment.status.display(),
            flags: appointment.status.flags(),
            payment: appointment.payment,
            payment_method: appointment.payment_method,
            payment_info: appointment.payment_info.clone().map(|info| PaymentInfo {
                tran_id: None,
                ..info
            }),
            show_to_user: appointment.show_to_user,
            show_to_doctor: appointment.show_to_doctor,
        }
    }
}

// ==============================================================================
// SLOT DATES
// ==============================================================================

/// Parses a `day_month_year` slot date; zero padding is optional.
pub fn parse_slot_date(raw: &str) -> Option<NaiveDate> {
    let mut parts = raw.trim().split('_');
    let day = parts.next()?.parse().ok()?;
    let month = parts.next()?.parse().ok()?;
    let year = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// The single spelling new bookings are stored under: zero padded.
pub fn format_slot_date(date: NaiveDate) -> String {
    format!("{:02}_{:02}_{}", date.day(), date.month(), date.year())
}

/// Every key spelling clients use for `date`: unpadded first, then zero padded.
pub fn slot_date_keys(date: NaiveDate) -> Vec<String> {
    let unpadded = format!("{}_{}_{}", date.day(), date.month(), date.year());
    let padded = format_slot_date(date);
    if unpadded == padded {
        vec![unpadded]
    } else {
        vec![unpadded, padded]
    }
}
