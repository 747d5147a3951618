use std::sync::Arc;

use tracing::debug;

use shared_database::{AppointmentFilter, ClinicStore};
use shared_models::appointment::DisplayStatus;
use shared_models::doctor::{Doctor, DoctorProfile};

use crate::models::DoctorError;

/// Statuses that count towards a doctor's popularity.
const COUNTED: &[DisplayStatus] = &[
    DisplayStatus::Pending,
    DisplayStatus::Confirmed,
    DisplayStatus::Completed,
    DisplayStatus::Missed,
];

/// Public doctor listings ranked by booking volume.
pub struct DoctorDirectoryService {
    store: Arc<dyn ClinicStore>,
}

impl DoctorDirectoryService {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }

    /// Every doctor with their count of non-cancelled appointments, most
    /// booked first. Ties keep the store's creation order.
    async fn ranked(&self) -> Result<Vec<(Doctor, u64)>, DoctorError> {
        let doctors = self.store.list_doctors().await?;
        let counts = self
            .store
            .count_appointments_by_doctor(&AppointmentFilter::new().with_statuses(COUNTED))
            .await?;

        let mut ranked: Vec<(Doctor, u64)> = doctors
            .into_iter()
            .map(|doctor| {
                let count = counts.get(&doctor.id).copied().unwrap_or(0);
                (doctor, count)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        debug!("Ranked {} doctors", ranked.len());
        Ok(ranked)
    }

    pub async fn list(&self) -> Result<Vec<DoctorProfile>, DoctorError> {
        Ok(self
            .ranked()
            .await?
            .iter()
            .map(|(doctor, _)| DoctorProfile::public(doctor))
            .collect())
    }

    /// Doctors with at least one booking, each carrying its count.
    pub async fn top(&self) -> Result<Vec<DoctorProfile>, DoctorError> {
        Ok(self
            .ranked()
            .await?
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(doctor, count)| DoctorProfile::public(doctor).with_appointment_count(*count))
            .collect())
    }
}
