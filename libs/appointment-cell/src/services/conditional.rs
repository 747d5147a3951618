// libs/appointment-cell/src/services/conditional.rs
use tracing::debug;

use shared_database::{AppointmentFilter, AppointmentPatch, ClinicStore, StoreError};
use shared_models::appointment::Appointment;

/// Outcome of a guarded single-appointment write.
#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    Updated(Appointment),
    NotFound,
    /// The appointment exists but the guard did not hold. Carries the state
    /// it was found in.
    PreconditionFailed(Appointment),
}

/// Applies `patch` to the appointment selected by `scope` only if `guard`
/// (which must include `scope`) matches it, in one store write.
///
/// When nothing is written, `scope` is read back to tell a missing or
/// foreign appointment apart from one in the wrong state.
pub async fn conditional_update(
    store: &dyn ClinicStore,
    scope: &AppointmentFilter,
    guard: &AppointmentFilter,
    patch: &AppointmentPatch,
) -> Result<UpdateOutcome, StoreError> {
    let mut updated = store.update_appointments(guard, patch).await?;
    if let Some(appointment) = updated.pop() {
        return Ok(UpdateOutcome::Updated(appointment));
    }

    match store.find_appointment(scope).await? {
        Some(current) => {
            debug!(
                "Guarded update on appointment {} skipped, current status {}",
                current.id, current.status
            );
            Ok(UpdateOutcome::PreconditionFailed(current))
        }
        None => Ok(UpdateOutcome::NotFound),
    }
}
