use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A gateway callback that could not be linked to an appointment.
/// Kept for manual reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentException {
    pub id: Uuid,
    pub tran_id: String,
    pub appointment_id: Option<Uuid>,
    pub reason: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

impl PaymentException {
    pub fn new(tran_id: &str, appointment_id: Option<Uuid>, reason: impl Into<String>, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            tran_id: tran_id.to_string(),
            appointment_id,
            reason: reason.into(),
            payload,
            created_at: Utc::now(),
        }
    }
}
