// libs/appointment-cell/src/services/slots.rs
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_database::{AppointmentFilter, AppointmentPatch, ClinicStore, ListOptions};
use shared_models::appointment::{parse_slot_date, slot_date_keys, Appointment, DisplayStatus};
use shared_models::doctor::Doctor;

use crate::models::{AppointmentError, ReconcileReport};

/// Attempts at a compare-and-swap on a doctor's slot book before giving up.
pub const MAX_SLOT_ATTEMPTS: usize = 3;

/// Reserves and releases doctor slots with optimistic concurrency on
/// `slots_version`.
pub struct SlotService {
    store: Arc<dyn ClinicStore>,
}

impl SlotService {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }

    /// Adds `time` under `date` on the doctor's slot book. Fails if the slot is
    /// taken or the doctor is not accepting bookings. Returns the doctor as
    /// written.
    pub async fn reserve(&self, doc_id: Uuid, date: &str, time: &str) -> Result<Doctor, AppointmentError> {
        for attempt in 1..=MAX_SLOT_ATTEMPTS {
            let mut doctor = self
                .store
                .find_doctor(doc_id)
                .await?
                .ok_or(AppointmentError::DoctorNotFound)?;

            if !doctor.available {
                return Err(AppointmentError::DoctorNotAvailable);
            }

            // Older bookings may sit under another spelling of the same day.
            if same_day_keys(date).iter().any(|key| doctor.slots_booked.is_booked(key, time)) {
                return Err(AppointmentError::SlotNotAvailable);
            }

            let mut slots = doctor.slots_booked.clone();
            slots
                .reserve(date, time)
                .map_err(|_| AppointmentError::SlotNotAvailable)?;

            if self
                .store
                .swap_doctor_slots(doc_id, doctor.slots_version, &slots)
                .await?
            {
                debug!("Reserved {} {} for doctor {} (attempt {})", date, time, doc_id, attempt);
                doctor.slots_booked = slots;
                doctor.slots_version += 1;
                return Ok(doctor);
            }

            debug!("Slot book of doctor {} changed concurrently, retrying", doc_id);
        }

        warn!("Gave up reserving {} {} for doctor {}", date, time, doc_id);
        Err(AppointmentError::SlotContention)
    }

    /// Removes `time` under `date`. Releasing a slot that is not booked, or on
    /// a doctor that no longer exists, is a no-op returning `false`.
    pub async fn release(&self, doc_id: Uuid, date: &str, time: &str) -> Result<bool, AppointmentError> {
        for _ in 0..MAX_SLOT_ATTEMPTS {
            let Some(doctor) = self.store.find_doctor(doc_id).await? else {
                return Ok(false);
            };

            let mut slots = doctor.slots_booked.clone();
            if !slots.release(date, time) {
                return Ok(false);
            }

            if self
                .store
                .swap_doctor_slots(doc_id, doctor.slots_version, &slots)
                .await?
            {
                debug!("Released {} {} for doctor {}", date, time, doc_id);
                return Ok(true);
            }
        }

        warn!("Gave up releasing {} {} for doctor {}", date, time, doc_id);
        Err(AppointmentError::SlotContention)
    }

    /// Releases the slot of a cancelled appointment and records that it was
    /// released. Safe to repeat.
    pub async fn release_for(&self, appointment: &Appointment) -> Result<bool, AppointmentError> {
        // Another active booking on the same slot means ours was already given back.
        let holder = AppointmentFilter::new()
            .for_doctor(appointment.doc_id)
            .on_dates(same_day_keys(&appointment.slot_date))
            .at_time(&appointment.slot_time)
            .with_statuses(&[DisplayStatus::Pending, DisplayStatus::Confirmed]);

        let released = if self.store.count_appointments(&holder).await? > 0 {
            false
        } else {
            self.release(appointment.doc_id, &appointment.slot_date, &appointment.slot_time)
                .await?
        };

        let mut patch = AppointmentPatch::new();
        patch.slot_released = Some(true);
        let guard = AppointmentFilter::by_id(appointment.id)
            .with_statuses(&[DisplayStatus::Cancelled])
            .slot_released(false);
        self.store.update_appointments(&guard, &patch).await?;

        Ok(released)
    }

    /// Finds cancelled appointments whose slot release never completed and
    /// finishes it.
    pub async fn reconcile(&self) -> Result<ReconcileReport, AppointmentError> {
        let pending = AppointmentFilter::new()
            .with_statuses(&[DisplayStatus::Cancelled])
            .slot_released(false);
        let appointments = self
            .store
            .find_appointments(&pending, ListOptions::newest_first())
            .await?;

        let mut report = ReconcileReport {
            scanned: appointments.len(),
            ..ReconcileReport::default()
        };

        for appointment in &appointments {
            match self.release_for(appointment).await {
                Ok(true) => report.released += 1,
                Ok(false) => report.already_free += 1,
                Err(e) => {
                    error!("Failed to release slot of appointment {}: {}", appointment.id, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Slot reconciliation: {} scanned, {} released, {} already free, {} failed",
            report.scanned, report.released, report.already_free, report.failed
        );
        Ok(report)
    }
}

/// `date` plus every other spelling of the same day.
fn same_day_keys(date: &str) -> Vec<String> {
    let mut keys = parse_slot_date(date).map(slot_date_keys).unwrap_or_default();
    if !keys.iter().any(|key| key == date) {
        keys.push(date.to_string());
    }
    keys
}
