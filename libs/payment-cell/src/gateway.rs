use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use shared_config::AppConfig;

use crate::models::{PaymentError, SessionRequest, Validation};

const SESSION_PATH: &str = "/gwprocess/v4/api.php";
const VALIDATION_PATH: &str = "/validator/api/validationserverAPI.php";

/// Hosted checkout provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a checkout session and returns the URL the payer is sent to.
    async fn init_session(&self, request: &SessionRequest) -> Result<String, PaymentError>;

    /// Looks up the settlement state of a validation id issued by the gateway.
    async fn validate(&self, val_id: &str) -> Result<Validation, PaymentError>;
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(default)]
    status: String,
    #[serde(default, rename = "GatewayPageURL")]
    gateway_page_url: Option<String>,
    #[serde(default)]
    failedreason: Option<String>,
}

/// SSLCommerz session and validation APIs.
pub struct SslCommerzClient {
    client: Client,
    base_url: String,
    store_id: String,
    store_password: String,
    configured: bool,
}

impl SslCommerzClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.sslcommerz_base_url.trim_end_matches('/').to_string(),
            store_id: config.sslcommerz_store_id.clone(),
            store_password: config.sslcommerz_store_password.clone(),
            configured: config.is_payment_gateway_configured(),
        }
    }

    fn session_form(&self, request: &SessionRequest) -> Vec<(&'static str, String)> {
        let customer = &request.customer;
        vec![
            ("store_id", self.store_id.clone()),
            ("store_passwd", self.store_password.clone()),
            ("total_amount", format!("{:.2}", request.total_amount)),
            ("currency", request.currency.clone()),
            ("tran_id", request.tran_id.clone()),
            ("success_url", request.success_url.clone()),
            ("fail_url", request.fail_url.clone()),
            ("cancel_url", request.cancel_url.clone()),
            ("ipn_url", request.ipn_url.clone()),
            ("shipping_method", "NO".to_string()),
            ("product_name", "Doctor Appointment".to_string()),
            ("product_category", "Healthcare".to_string()),
            ("product_profile", "general".to_string()),
            ("cus_name", customer.name.clone()),
            ("cus_email", customer.email.clone()),
            ("cus_add1", customer.address.clone()),
            ("cus_city", "Dhaka".to_string()),
            ("cus_postcode", "1000".to_string()),
            ("cus_country", "Bangladesh".to_string()),
            ("cus_phone", customer.phone.clone()),
        ]
    }
}

#[async_trait]
impl PaymentGateway for SslCommerzClient {
    async fn init_session(&self, request: &SessionRequest) -> Result<String, PaymentError> {
        if !self.configured {
            return Err(PaymentError::NotConfigured);
        }

        let url = format!("{}{}", self.base_url, SESSION_PATH);
        debug!("Opening checkout session {} at {}", request.tran_id, url);

        let response = self
            .client
            .post(&url)
            .form(&self.session_form(request))
            .send()
            .await
            .map_err(|e| PaymentError::Gateway(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Gateway rejected session {} ({}): {}", request.tran_id, status, body);
            return Err(PaymentError::Gateway(format!("gateway returned {}", status)));
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Gateway(e.to_string()))?;

        match session.gateway_page_url.filter(|u| !u.is_empty()) {
            Some(page) => {
                info!("Checkout session {} opened", request.tran_id);
                Ok(page)
            }
            None => {
                let reason = session.failedreason.unwrap_or(session.status);
                warn!("Gateway refused session {}: {}", request.tran_id, reason);
                Err(PaymentError::SessionRejected(reason))
            }
        }
    }

    async fn validate(&self, val_id: &str) -> Result<Validation, PaymentError> {
        if !self.configured {
            return Err(PaymentError::NotConfigured);
        }

        let url = format!("{}{}", self.base_url, VALIDATION_PATH);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("val_id", val_id),
                ("store_id", self.store_id.as_str()),
                ("store_passwd", self.store_password.as_str()),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| PaymentError::Gateway(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            error!("Validation of {} failed with {}", val_id, status);
            return Err(PaymentError::Gateway(format!("gateway returned {}", status)));
        }

        let validation: Validation = response
            .json()
            .await
            .map_err(|e| PaymentError::Gateway(e.to_string()))?;

        debug!("Validation {} reported {}", val_id, validation.status);
        Ok(validation)
    }
}
