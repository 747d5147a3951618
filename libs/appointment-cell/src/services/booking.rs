// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use shared_database::{AppointmentFilter, AppointmentPatch, ClinicStore, ListOptions};
use shared_models::appointment::{
    format_slot_date, parse_slot_date, Appointment, PaymentInfo, PaymentMethod,
};

use crate::models::{
    Action, Actor, AppointmentError, BookAppointmentRequest, PaymentOutcome,
};
use crate::services::conditional::{conditional_update, UpdateOutcome};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::slots::SlotService;

pub struct AppointmentBookingService {
    store: Arc<dyn ClinicStore>,
    slots: SlotService,
    lifecycle: AppointmentLifecycleService,
}

impl AppointmentBookingService {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self {
            slots: SlotService::new(store.clone()),
            store,
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    /// Reserves the doctor slot, then inserts the appointment. A failed insert
    /// gives the slot back.
    pub async fn book(
        &self,
        user_id: Uuid,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let slot_time = request.slot_time.trim();

        // Padded and unpadded spellings name the same day; store one of them.
        let date_key = match parse_slot_date(&request.slot_date) {
            Some(date) => format_slot_date(date),
            None => {
                return Err(AppointmentError::ValidationError(format!(
                    "Invalid slot date '{}', expected day_month_year",
                    request.slot_date.trim()
                )));
            }
        };
        let slot_date = date_key.as_str();

        if slot_time.is_empty() {
            return Err(AppointmentError::ValidationError("Slot time is required".to_string()));
        }

        self.store
            .find_user(user_id)
            .await?
            .ok_or(AppointmentError::UserNotFound)?;

        let doctor = self.slots.reserve(request.doc_id, slot_date, slot_time).await?;

        let appointment = Appointment::new(
            user_id,
            doctor.snapshot(),
            slot_date.to_string(),
            slot_time.to_string(),
        );

        if let Err(insert_err) = self.store.insert_appointment(&appointment).await {
            error!("Failed to insert appointment {}: {}", appointment.id, insert_err);
            if let Err(release_err) = self.slots.release(doctor.id, slot_date, slot_time).await {
                error!(
                    "Could not release slot {} {} of doctor {} after failed booking: {}",
                    slot_date, slot_time, doctor.id, release_err
                );
            }
            return Err(insert_err.into());
        }

        info!(
            "Appointment {} booked with doctor {} on {} at {}",
            appointment.id, doctor.id, slot_date, slot_time
        );
        Ok(appointment)
    }

    /// Applies a status transition guarded on the current status.
    async fn transition(
        &self,
        actor: Actor,
        appointment_id: Uuid,
        action: Action,
    ) -> Result<Appointment, AppointmentError> {
        let scope = actor.scope(appointment_id);
        let guard = scope
            .clone()
            .with_statuses(self.lifecycle.allowed_from(action));
        let patch = self.lifecycle.transition_patch(action);

        match conditional_update(self.store.as_ref(), &scope, &guard, &patch).await? {
            UpdateOutcome::Updated(appointment) => Ok(appointment),
            UpdateOutcome::NotFound => Err(AppointmentError::NotFound),
            UpdateOutcome::PreconditionFailed(current) => Err(AppointmentError::InvalidStatusTransition {
                action,
                current: current.status.display(),
            }),
        }
    }

    pub async fn confirm(&self, doc_id: Uuid, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = self
            .transition(Actor::Doctor(doc_id), appointment_id, Action::Confirm)
            .await?;
        info!("Appointment {} confirmed", appointment_id);
        Ok(appointment)
    }

    pub async fn complete(
        &self,
        doc_id: Uuid,
        appointment_id: Uuid,
        patient_visited: bool,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self
            .transition(
                Actor::Doctor(doc_id),
                appointment_id,
                Action::Complete { patient_visited },
            )
            .await?;
        info!("Appointment {} completed (visited: {})", appointment_id, patient_visited);
        Ok(appointment)
    }

    /// Cancels the appointment, then gives its slot back. The status write
    /// comes first; a failed release is retried by the reconciliation sweep.
    pub async fn cancel(&self, actor: Actor, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = self.transition(actor, appointment_id, Action::Cancel).await?;
        info!("Appointment {} cancelled by {:?}", appointment_id, actor);

        if let Err(e) = self.slots.release_for(&appointment).await {
            warn!(
                "Slot of cancelled appointment {} not released yet: {}",
                appointment_id, e
            );
        }

        Ok(appointment)
    }

    /// Hides a finished appointment from the acting party, or from both
    /// parties when an admin acts.
    pub async fn hide(&self, actor: Actor, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let (from_user, from_doctor) = match actor {
            Actor::Patient(_) => (true, false),
            Actor::Doctor(_) => (false, true),
            Actor::Admin => (true, true),
        };

        let scope = actor.scope(appointment_id);
        let guard = scope
            .clone()
            .with_statuses(self.lifecycle.allowed_from(Action::Hide));
        let patch = self.lifecycle.hide_patch(from_user, from_doctor);

        match conditional_update(self.store.as_ref(), &scope, &guard, &patch).await? {
            UpdateOutcome::Updated(appointment) => Ok(appointment),
            UpdateOutcome::NotFound => Err(AppointmentError::NotFound),
            UpdateOutcome::PreconditionFailed(current) => Err(AppointmentError::InvalidStatusTransition {
                action: Action::Hide,
                current: current.status.display(),
            }),
        }
    }

    /// Marks an unpaid appointment paid, at most once. `extra` narrows the
    /// guard further (for example to a transaction id).
    pub async fn record_payment(
        &self,
        scope: AppointmentFilter,
        extra: impl FnOnce(AppointmentFilter) -> AppointmentFilter,
        method: PaymentMethod,
        info: PaymentInfo,
    ) -> Result<PaymentOutcome, AppointmentError> {
        let action = match method {
            PaymentMethod::Cash => Action::PayCash,
            PaymentMethod::Online => Action::PayOnline,
        };
        let guard = extra(
            scope
                .clone()
                .with_statuses(self.lifecycle.allowed_from(action))
                .paid(false),
        );
        let patch = self.lifecycle.payment_patch(method, info);

        match conditional_update(self.store.as_ref(), &scope, &guard, &patch).await? {
            UpdateOutcome::Updated(appointment) => {
                info!("Payment recorded for appointment {} ({})", appointment.id, method.as_str());
                Ok(PaymentOutcome::Recorded(appointment))
            }
            UpdateOutcome::NotFound => Err(AppointmentError::NotFound),
            UpdateOutcome::PreconditionFailed(current) if current.payment => {
                info!("Payment for appointment {} already recorded", current.id);
                Ok(PaymentOutcome::AlreadyPaid(current))
            }
            UpdateOutcome::PreconditionFailed(current) => Err(AppointmentError::InvalidStatusTransition {
                action,
                current: current.status.display(),
            }),
        }
    }

    pub async fn pay_cash(&self, user_id: Uuid, appointment_id: Uuid) -> Result<PaymentOutcome, AppointmentError> {
        let scope = Actor::Patient(user_id).scope(appointment_id);
        let current = self
            .store
            .find_appointment(&scope)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        let info = PaymentInfo {
            amount: Some(current.amount.to_string()),
            ..current.payment_info.clone().unwrap_or_default()
        };

        self.record_payment(scope, |guard| guard, PaymentMethod::Cash, info)
            .await
    }

    /// Appointments the patient has not hidden, newest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = AppointmentFilter::new().for_user(user_id).visible_to_user();
        Ok(self
            .store
            .find_appointments(&filter, ListOptions::newest_first())
            .await?)
    }

    /// Every appointment, newest first.
    pub async fn list_all(&self) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self
            .store
            .find_appointments(&AppointmentFilter::new(), ListOptions::newest_first())
            .await?)
    }

    /// Persists a freshly minted gateway transaction on an unpaid, payable
    /// appointment owned by `user_id`.
    pub async fn attach_transaction(
        &self,
        user_id: Uuid,
        appointment_id: Uuid,
        tran_id: &str,
        info: PaymentInfo,
    ) -> Result<Appointment, AppointmentError> {
        let scope = Actor::Patient(user_id).scope(appointment_id);
        let guard = scope
            .clone()
            .with_statuses(self.lifecycle.allowed_from(Action::PayOnline))
            .paid(false);

        let mut patch = AppointmentPatch::new();
        patch.transaction_id = Some(tran_id.to_string());
        patch.payment_info = Some(info);

        match conditional_update(self.store.as_ref(), &scope, &guard, &patch).await? {
            UpdateOutcome::Updated(appointment) => Ok(appointment),
            UpdateOutcome::NotFound => Err(AppointmentError::NotFound),
            UpdateOutcome::PreconditionFailed(current) if current.payment => {
                Err(AppointmentError::AlreadyPaid)
            }
            UpdateOutcome::PreconditionFailed(current) => Err(AppointmentError::InvalidStatusTransition {
                action: Action::PayOnline,
                current: current.status.display(),
            }),
        }
    }

    pub fn slots(&self) -> &SlotService {
        &self.slots
    }
}
