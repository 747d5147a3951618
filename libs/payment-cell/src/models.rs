use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use appointment_cell::AppointmentError;
use shared_database::StoreError;
use shared_models::appointment::{Appointment, PaymentInfo};
use shared_models::error::AppError;

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitPaymentRequest {
    pub appointment_id: Uuid,
}

/// Fields the gateway sends to the browser callbacks and the IPN, either as
/// query parameters or as a urlencoded form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayCallback {
    #[serde(default)]
    pub tran_id: Option<String>,
    #[serde(default)]
    pub val_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub bank_tran_id: Option<String>,
    #[serde(default)]
    pub card_type: Option<String>,
}

impl GatewayCallback {
    /// Statuses SSLCommerz uses for a settled payment.
    pub fn reports_success(&self) -> bool {
        matches!(self.status.as_deref(), Some("VALID") | Some("VALIDATED"))
    }
}

// ==============================================================================
// GATEWAY TYPES
// ==============================================================================

#[derive(Debug, Clone)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

/// Everything needed to open a hosted checkout session.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub tran_id: String,
    pub total_amount: f64,
    pub currency: String,
    pub success_url: String,
    pub fail_url: String,
    pub cancel_url: String,
    pub ipn_url: String,
    pub customer: Customer,
}

/// Outcome of asking the gateway about a `val_id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Validation {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tran_id: String,
    #[serde(default)]
    pub val_id: String,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub bank_tran_id: Option<String>,
    #[serde(default)]
    pub card_type: Option<String>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.status == "VALID" || self.status == "VALIDATED"
    }

    /// Payment details worth keeping on the appointment.
    pub fn merge_into(&self, info: PaymentInfo) -> PaymentInfo {
        PaymentInfo {
            val_id: Some(self.val_id.clone()),
            bank_tran_id: self.bank_tran_id.clone().or(info.bank_tran_id),
            card_type: self.card_type.clone().or(info.card_type),
            amount: self.amount.clone().or(info.amount),
            ..info
        }
    }
}

// ==============================================================================
// RESULTS
// ==============================================================================

/// What a success callback or IPN did to the books.
#[derive(Debug, Clone)]
pub enum Reconciliation {
    Paid(Appointment),
    AlreadyPaid(Appointment),
    /// Nothing was marked paid; an exception record explains why.
    Unmatched { reason: String },
}

impl Reconciliation {
    pub fn is_settled(&self) -> bool {
        !matches!(self, Reconciliation::Unmatched { .. })
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Online payments are not configured")]
    NotConfigured,

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Payment gateway did not return a checkout URL: {0}")]
    SessionRejected(String),

    #[error(transparent)]
    Appointment(#[from] AppointmentError),

    #[error("Database error: {0}")]
    Store(#[from] StoreError),
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::NotConfigured
            | PaymentError::Gateway(_)
            | PaymentError::SessionRejected(_) => AppError::ExternalService(err.to_string()),
            PaymentError::Appointment(e) => e.into(),
            PaymentError::Store(e) => AppError::Database(e.to_string()),
        }
    }
}
