use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use appointment_cell::AppointmentBookingService;
use shared_config::AppConfig;
use shared_database::ClinicStore;
use shared_models::appointment::PaymentInfo;

use crate::gateway::PaymentGateway;
use crate::models::{Customer, PaymentError, SessionRequest};

const GUEST_NAME: &str = "Guest";
const DEFAULT_CITY: &str = "Dhaka";

/// Starts online payments for a patient's appointment.
pub struct CheckoutService {
    store: Arc<dyn ClinicStore>,
    gateway: Arc<dyn PaymentGateway>,
    config: Arc<AppConfig>,
}

impl CheckoutService {
    pub fn new(
        store: Arc<dyn ClinicStore>,
        gateway: Arc<dyn PaymentGateway>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self { store, gateway, config }
    }

    pub fn mint_transaction_id() -> String {
        format!("txn_{}", Uuid::new_v4().simple())
    }

    /// Persists a new transaction id on the appointment, then opens a gateway
    /// session for it. No URL is handed out unless the id was stored.
    pub async fn start(&self, user_id: Uuid, appointment_id: Uuid) -> Result<String, PaymentError> {
        let tran_id = Self::mint_transaction_id();
        let info = PaymentInfo {
            tran_id: Some(tran_id.clone()),
            initiated_at: Some(Utc::now()),
            ..PaymentInfo::default()
        };

        let appointment = AppointmentBookingService::new(self.store.clone())
            .attach_transaction(user_id, appointment_id, &tran_id, info)
            .await?;

        let customer = match self.store.find_user(user_id).await? {
            Some(user) => Customer {
                name: user.name,
                email: user.email,
                phone: user.phone,
                address: if user.address.line1.is_empty() {
                    DEFAULT_CITY.to_string()
                } else {
                    user.address.line1
                },
            },
            None => {
                warn!("Patient {} paying for {} has no user record", user_id, appointment_id);
                Customer {
                    name: GUEST_NAME.to_string(),
                    email: String::new(),
                    phone: String::new(),
                    address: DEFAULT_CITY.to_string(),
                }
            }
        };

        let backend = &self.config.backend_url;
        let request = SessionRequest {
            tran_id: tran_id.clone(),
            total_amount: appointment.amount,
            currency: self.config.payment_currency.clone(),
            success_url: format!("{}/api/payment/success/{}/{}", backend, tran_id, appointment_id),
            fail_url: format!("{}/api/payment/fail", backend),
            cancel_url: format!("{}/api/payment/cancel", backend),
            ipn_url: format!("{}/api/payment/ipn", backend),
            customer,
        };

        let url = self.gateway.init_session(&request).await?;
        info!("Payment {} started for appointment {}", tran_id, appointment_id);
        Ok(url)
    }
}
