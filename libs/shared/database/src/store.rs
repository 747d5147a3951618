use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use shared_models::appointment::{
    Appointment, AppointmentStatus, DisplayStatus, PaymentInfo, PaymentMethod,
};
use shared_models::doctor::{Doctor, SlotBook};
use shared_models::payment::PaymentException;
use shared_models::user::{Address, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

// ==============================================================================
// APPOINTMENT QUERIES
// ==============================================================================

/// Conjunction of optional predicates over appointment documents.
/// Used both for reads and as the guard of conditional updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentFilter {
    pub id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub doc_id: Option<Uuid>,
    pub statuses: Option<Vec<DisplayStatus>>,
    pub payment: Option<bool>,
    pub transaction_id: Option<String>,
    pub show_to_user: Option<bool>,
    pub show_to_doctor: Option<bool>,
    pub slot_dates: Option<Vec<String>>,
    pub slot_time: Option<String>,
    pub slot_released: Option<bool>,
}

impl AppointmentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn for_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn for_doctor(mut self, doc_id: Uuid) -> Self {
        self.doc_id = Some(doc_id);
        self
    }

    pub fn with_statuses(mut self, statuses: &[DisplayStatus]) -> Self {
        self.statuses = Some(statuses.to_vec());
        self
    }

    pub fn paid(mut self, payment: bool) -> Self {
        self.payment = Some(payment);
        self
    }

    pub fn with_transaction(mut self, tran_id: &str) -> Self {
        self.transaction_id = Some(tran_id.to_string());
        self
    }

    pub fn visible_to_user(mut self) -> Self {
        self.show_to_user = Some(true);
        self
    }

    pub fn visible_to_doctor(mut self) -> Self {
        self.show_to_doctor = Some(true);
        self
    }

    pub fn on_dates(mut self, dates: Vec<String>) -> Self {
        self.slot_dates = Some(dates);
        self
    }

    pub fn at_time(mut self, time: &str) -> Self {
        self.slot_time = Some(time.to_string());
        self
    }

    pub fn slot_released(mut self, released: bool) -> Self {
        self.slot_released = Some(released);
        self
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.id.map_or(true, |id| appointment.id == id)
            && self.user_id.map_or(true, |id| appointment.user_id == id)
            && self.doc_id.map_or(true, |id| appointment.doc_id == id)
            && self
                .statuses
                .as_ref()
                .map_or(true, |s| s.contains(&appointment.status.display()))
            && self.payment.map_or(true, |p| appointment.payment == p)
            && self
                .transaction_id
                .as_ref()
                .map_or(true, |t| appointment.transaction_id.as_ref() == Some(t))
            && self.show_to_user.map_or(true, |v| appointment.show_to_user == v)
            && self.show_to_doctor.map_or(true, |v| appointment.show_to_doctor == v)
            && self
                .slot_dates
                .as_ref()
                .map_or(true, |d| d.contains(&appointment.slot_date))
            && self.slot_time.as_ref().map_or(true, |t| &appointment.slot_time == t)
            && self.slot_released.map_or(true, |r| appointment.slot_released == r)
    }

    /// PostgREST horizontal filters, one `column=op.value` pair per predicate.
    pub fn to_query(&self) -> Vec<String> {
        let mut parts = Vec::new();

        if let Some(id) = self.id {
            parts.push(format!("id=eq.{}", id));
        }
        if let Some(id) = self.user_id {
            parts.push(format!("user_id=eq.{}", id));
        }
        if let Some(id) = self.doc_id {
            parts.push(format!("doc_id=eq.{}", id));
        }
        if let Some(statuses) = &self.statuses {
            let list: Vec<&str> = statuses.iter().map(DisplayStatus::as_str).collect();
            parts.push(format!("status=in.({})", list.join(",")));
        }
        if let Some(payment) = self.payment {
            parts.push(format!("payment=eq.{}", payment));
        }
        if let Some(tran_id) = &self.transaction_id {
            parts.push(format!("transaction_id=eq.{}", urlencoding::encode(tran_id)));
        }
        if let Some(visible) = self.show_to_user {
            parts.push(format!("show_to_user=eq.{}", visible));
        }
        if let Some(visible) = self.show_to_doctor {
            parts.push(format!("show_to_doctor=eq.{}", visible));
        }
        if let Some(dates) = &self.slot_dates {
            let list: Vec<String> = dates
                .iter()
                .map(|d| format!("\"{}\"", urlencoding::encode(d)))
                .collect();
            parts.push(format!("slot_date=in.({})", list.join(",")));
        }
        if let Some(time) = &self.slot_time {
            parts.push(format!("slot_time=eq.{}", urlencoding::encode(time)));
        }
        if let Some(released) = self.slot_released {
            parts.push(format!("slot_released=eq.{}", released));
        }

        parts
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AppointmentOrder {
    #[default]
    NewestFirst,
    SlotTimeAscending,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    pub order: AppointmentOrder,
    pub limit: Option<usize>,
}

impl ListOptions {
    pub fn newest_first() -> Self {
        Self::default()
    }

    pub fn by_slot_time() -> Self {
        Self {
            order: AppointmentOrder::SlotTimeAscending,
            limit: None,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort(&self, appointments: &mut Vec<Appointment>) {
        match self.order {
            AppointmentOrder::NewestFirst => {
                appointments.sort_by(|a, b| b.created_at.cmp(&a.created_at))
            }
            AppointmentOrder::SlotTimeAscending => {
                appointments.sort_by(|a, b| a.slot_time.cmp(&b.slot_time))
            }
        }
        if let Some(limit) = self.limit {
            appointments.truncate(limit);
        }
    }

    pub fn to_query(&self) -> Vec<String> {
        let mut parts = vec![match self.order {
            AppointmentOrder::NewestFirst => "order=created_at.desc".to_string(),
            AppointmentOrder::SlotTimeAscending => "order=slot_time.asc".to_string(),
        }];
        if let Some(limit) = self.limit {
            parts.push(format!("limit={}", limit));
        }
        parts
    }
}

// ==============================================================================
// PATCHES
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize)]
pub struct AppointmentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_info: Option<PaymentInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_to_user: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_to_doctor: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_released: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentPatch {
    pub fn new() -> Self {
        Self {
            updated_at: Utc::now(),
            ..Self::default()
        }
    }

    pub fn status(mut self, status: AppointmentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn apply(&self, appointment: &mut Appointment) {
        if let Some(status) = self.status {
            appointment.status = status;
        }
        if let Some(payment) = self.payment {
            appointment.payment = payment;
        }
        if let Some(method) = self.payment_method {
            appointment.payment_method = Some(method);
        }
        if let Some(info) = &self.payment_info {
            appointment.payment_info = Some(info.clone());
        }
        if let Some(tran_id) = &self.transaction_id {
            appointment.transaction_id = Some(tran_id.clone());
        }
        if let Some(visible) = self.show_to_user {
            appointment.show_to_user = visible;
        }
        if let Some(visible) = self.show_to_doctor {
            appointment.show_to_doctor = visible;
        }
        if let Some(released) = self.slot_released {
            appointment.slot_released = released;
        }
        appointment.updated_at = self.updated_at;
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl UserPatch {
    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(phone) = &self.phone {
            user.phone = phone.clone();
        }
        if let Some(address) = &self.address {
            user.address = address.clone();
        }
        if let Some(dob) = &self.dob {
            user.dob = dob.clone();
        }
        if let Some(gender) = &self.gender {
            user.gender = gender.clone();
        }
        if let Some(image) = &self.image {
            user.image = image.clone();
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DoctorPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speciality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fees: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
}

impl DoctorPatch {
    pub fn availability(available: bool) -> Self {
        Self {
            available: Some(available),
            ..Self::default()
        }
    }

    pub fn apply(&self, doctor: &mut Doctor) {
        if let Some(name) = &self.name {
            doctor.name = name.clone();
        }
        if let Some(speciality) = &self.speciality {
            doctor.speciality = speciality.clone();
        }
        if let Some(degree) = &self.degree {
            doctor.degree = degree.clone();
        }
        if let Some(experience) = &self.experience {
            doctor.experience = experience.clone();
        }
        if let Some(fees) = self.fees {
            doctor.fees = fees;
        }
        if let Some(about) = &self.about {
            doctor.about = about.clone();
        }
        if let Some(address) = &self.address {
            doctor.address = address.clone();
        }
        if let Some(image) = &self.image {
            doctor.image = image.clone();
        }
        if let Some(available) = self.available {
            doctor.available = available;
        }
    }
}

// ==============================================================================
// STORE
// ==============================================================================

/// Document persistence for users, doctors, appointments and payment exceptions.
///
/// Single-document writes are atomic. Nothing spans documents; callers order
/// multi-document work so that every intermediate state is recoverable.
#[async_trait]
pub trait ClinicStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError>;
    async fn update_user(&self, id: Uuid, patch: &UserPatch) -> Result<Option<User>, StoreError>;
    async fn count_users(&self) -> Result<u64, StoreError>;

    async fn insert_doctor(&self, doctor: &Doctor) -> Result<(), StoreError>;
    async fn find_doctor(&self, id: Uuid) -> Result<Option<Doctor>, StoreError>;
    async fn find_doctor_by_email(&self, email: &str) -> Result<Option<Doctor>, StoreError>;
    async fn list_doctors(&self) -> Result<Vec<Doctor>, StoreError>;
    async fn update_doctor(&self, id: Uuid, patch: &DoctorPatch) -> Result<Option<Doctor>, StoreError>;
    /// Deletes the doctor if `slots_version` still equals `expected_version`.
    /// Returns `false` when a booking moved the slot book since it was read or
    /// the doctor no longer exists.
    async fn delete_doctor(&self, id: Uuid, expected_version: i64) -> Result<bool, StoreError>;

    /// Replaces the doctor's slot book if `slots_version` still equals
    /// `expected_version`, bumping the version. Returns `false` when another
    /// writer got there first or the doctor no longer exists.
    async fn swap_doctor_slots(
        &self,
        id: Uuid,
        expected_version: i64,
        slots: &SlotBook,
    ) -> Result<bool, StoreError>;

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError>;
    async fn find_appointments(
        &self,
        filter: &AppointmentFilter,
        options: ListOptions,
    ) -> Result<Vec<Appointment>, StoreError>;
    async fn count_appointments(&self, filter: &AppointmentFilter) -> Result<u64, StoreError>;

    /// Number of matching appointments per doctor.
    async fn count_appointments_by_doctor(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<HashMap<Uuid, u64>, StoreError>;

    /// Applies `patch` to every appointment matching `filter` in one write and
    /// returns the updated documents. An empty result means the guard matched
    /// nothing.
    async fn update_appointments(
        &self,
        filter: &AppointmentFilter,
        patch: &AppointmentPatch,
    ) -> Result<Vec<Appointment>, StoreError>;

    async fn insert_payment_exception(&self, exception: &PaymentException) -> Result<(), StoreError>;

    async fn find_appointment(&self, filter: &AppointmentFilter) -> Result<Option<Appointment>, StoreError> {
        let mut found = self
            .find_appointments(filter, ListOptions::newest_first().limit(1))
            .await?;
        Ok(found.pop())
    }
}
