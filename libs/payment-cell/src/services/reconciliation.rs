use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use appointment_cell::{AppointmentBookingService, AppointmentError, PaymentOutcome};
use shared_database::{AppointmentFilter, ClinicStore};
use shared_models::appointment::{Appointment, PaymentInfo, PaymentMethod};
use shared_models::payment::PaymentException;

use crate::gateway::PaymentGateway;
use crate::models::{GatewayCallback, PaymentError, Reconciliation, Validation};

/// Links gateway callbacks to appointments and marks them paid once.
pub struct ReconciliationService {
    store: Arc<dyn ClinicStore>,
    gateway: Arc<dyn PaymentGateway>,
    bookings: AppointmentBookingService,
}

impl ReconciliationService {
    pub fn new(store: Arc<dyn ClinicStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            bookings: AppointmentBookingService::new(store.clone()),
            store,
            gateway,
        }
    }

    /// Handles the browser success callback. Nothing is written until the
    /// gateway confirms the callback's `val_id` for this transaction.
    pub async fn settle(
        &self,
        tran_id: &str,
        appointment_id: Option<Uuid>,
        callback: &GatewayCallback,
    ) -> Result<Reconciliation, PaymentError> {
        let Some(val_id) = callback.val_id.as_deref().filter(|v| !v.is_empty()) else {
            return self
                .unmatched(tran_id, appointment_id, "callback without a validation id", callback)
                .await;
        };

        let validation = self.gateway.validate(val_id).await?;
        if !validation.is_valid() {
            let reason = format!("gateway reported {}", validation.status);
            return self.unmatched(tran_id, appointment_id, reason, callback).await;
        }
        if validation.tran_id != tran_id {
            let reason = format!("validation belongs to '{}'", validation.tran_id);
            return self.unmatched(tran_id, appointment_id, reason, callback).await;
        }

        let Some(appointment) = self.locate(tran_id, appointment_id).await? else {
            return self
                .unmatched(tran_id, appointment_id, "no appointment carries this transaction", callback)
                .await;
        };

        let info = payment_details(&appointment, tran_id, callback, &validation);
        let outcome = self
            .bookings
            .record_payment(
                AppointmentFilter::by_id(appointment.id),
                |guard| guard.with_transaction(tran_id),
                PaymentMethod::Online,
                info,
            )
            .await;

        match outcome {
            Ok(PaymentOutcome::Recorded(appointment)) => {
                info!("Transaction {} settled appointment {}", tran_id, appointment.id);
                Ok(Reconciliation::Paid(appointment))
            }
            Ok(PaymentOutcome::AlreadyPaid(appointment))
                if appointment.payment_method == Some(PaymentMethod::Online)
                    && appointment.transaction_id.as_deref() == Some(tran_id) =>
            {
                debug!("Replayed callback for transaction {}", tran_id);
                Ok(Reconciliation::AlreadyPaid(appointment))
            }
            Ok(PaymentOutcome::AlreadyPaid(appointment)) => {
                let reason = format!(
                    "appointment already paid ({})",
                    appointment.payment_mode()
                );
                self.unmatched(tran_id, Some(appointment.id), reason, callback).await
            }
            Err(AppointmentError::Store(e)) => Err(e.into()),
            Err(e) => {
                self.unmatched(tran_id, Some(appointment.id), e.to_string(), callback)
                    .await
            }
        }
    }

    /// Handles a server-to-server notification. Only notifications that
    /// report success are passed on to `settle`.
    pub async fn handle_ipn(&self, callback: &GatewayCallback) -> Result<Option<Reconciliation>, PaymentError> {
        let Some(tran_id) = callback.tran_id.as_deref().filter(|t| !t.is_empty()) else {
            warn!("IPN without a transaction id ignored");
            return Ok(None);
        };

        if !callback.reports_success() {
            info!(
                "IPN for {} reported {}",
                tran_id,
                callback.status.as_deref().unwrap_or("no status")
            );
            return Ok(None);
        }

        self.settle(tran_id, None, callback).await.map(Some)
    }

    /// Looks up by the appointment id in the callback URL first, accepted only
    /// when it carries this transaction, then by the transaction id itself.
    async fn locate(&self, tran_id: &str, appointment_id: Option<Uuid>) -> Result<Option<Appointment>, PaymentError> {
        if let Some(id) = appointment_id {
            match self.store.find_appointment(&AppointmentFilter::by_id(id)).await? {
                Some(appointment) if appointment.transaction_id.as_deref() == Some(tran_id) => {
                    return Ok(Some(appointment));
                }
                Some(_) => warn!("Appointment {} does not carry transaction {}", id, tran_id),
                None => warn!("Callback for {} names unknown appointment {}", tran_id, id),
            }
        }

        Ok(self
            .store
            .find_appointment(&AppointmentFilter::new().with_transaction(tran_id))
            .await?)
    }

    async fn unmatched(
        &self,
        tran_id: &str,
        appointment_id: Option<Uuid>,
        reason: impl Into<String>,
        callback: &GatewayCallback,
    ) -> Result<Reconciliation, PaymentError> {
        let reason = reason.into();
        error!(
            "Unreconciled payment {} (appointment {:?}): {}",
            tran_id, appointment_id, reason
        );

        let payload = serde_json::to_value(callback).unwrap_or_default();
        let exception = PaymentException::new(tran_id, appointment_id, reason.clone(), payload);
        self.store.insert_payment_exception(&exception).await.map_err(|e| {
            error!("Failed to record payment exception for {}: {}", tran_id, e);
            PaymentError::Store(e)
        })?;

        Ok(Reconciliation::Unmatched { reason })
    }
}

/// Stored initiation details plus what the gateway confirmed.
fn payment_details(
    appointment: &Appointment,
    tran_id: &str,
    callback: &GatewayCallback,
    validation: &Validation,
) -> PaymentInfo {
    let stored = appointment.payment_info.clone().unwrap_or_default();
    let info = PaymentInfo {
        tran_id: Some(tran_id.to_string()),
        bank_tran_id: callback.bank_tran_id.clone().or(stored.bank_tran_id.clone()),
        card_type: callback.card_type.clone().or(stored.card_type.clone()),
        amount: callback
            .amount
            .clone()
            .or(stored.amount.clone())
            .or_else(|| Some(appointment.amount.to_string())),
        ..stored
    };

    validation.merge_into(info)
}
