use std::sync::Arc;

use axum::{
    extract::{Extension, Form, Path, State},
    response::Redirect,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{GatewayCallback, InitPaymentRequest, Reconciliation};
use crate::router::PaymentState;
use crate::services::{CheckoutService, ReconciliationService};

#[derive(Debug, Deserialize)]
pub struct SuccessPath {
    pub tran_id: String,
    #[serde(default)]
    pub appointment_id: Option<Uuid>,
}

fn reconciler(state: &PaymentState) -> ReconciliationService {
    ReconciliationService::new(state.app.store.clone(), state.gateway.clone())
}

fn frontend(state: &PaymentState, page: &str) -> String {
    format!("{}/{}", state.app.config.frontend_url, page)
}

#[axum::debug_handler]
pub async fn init_payment(
    State(state): State<Arc<PaymentState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<InitPaymentRequest>,
) -> Result<Json<Value>, AppError> {
    let checkout = CheckoutService::new(
        state.app.store.clone(),
        state.gateway.clone(),
        state.app.config.clone(),
    );
    let url = checkout.start(user.record_id()?, request.appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "url": url,
    })))
}

/// Browser return after checkout. `Form` reads the query string on GET and
/// the urlencoded body on POST.
#[axum::debug_handler]
pub async fn payment_success(
    State(state): State<Arc<PaymentState>>,
    Path(path): Path<SuccessPath>,
    Form(callback): Form<GatewayCallback>,
) -> Redirect {
    match reconciler(&state)
        .settle(&path.tran_id, path.appointment_id, &callback)
        .await
    {
        Ok(reconciliation) if reconciliation.is_settled() => {
            Redirect::to(&frontend(&state, "payment-success"))
        }
        Ok(_) => Redirect::to(&frontend(&state, "payment-fail?reason=unreconciled")),
        Err(e) => {
            error!("Failed to reconcile payment {}: {}", path.tran_id, e);
            Redirect::to(&frontend(&state, "payment-fail?reason=error"))
        }
    }
}

#[axum::debug_handler]
pub async fn payment_fail(
    State(state): State<Arc<PaymentState>>,
    Form(callback): Form<GatewayCallback>,
) -> Redirect {
    info!("Payment failed for {}", callback.tran_id.as_deref().unwrap_or("unknown transaction"));
    Redirect::to(&frontend(&state, "payment-fail"))
}

#[axum::debug_handler]
pub async fn payment_cancel(
    State(state): State<Arc<PaymentState>>,
    Form(callback): Form<GatewayCallback>,
) -> Redirect {
    info!("Payment cancelled for {}", callback.tran_id.as_deref().unwrap_or("unknown transaction"));
    Redirect::to(&frontend(&state, "payment-cancel"))
}

#[axum::debug_handler]
pub async fn payment_ipn(
    State(state): State<Arc<PaymentState>>,
    Form(callback): Form<GatewayCallback>,
) -> Result<Json<Value>, AppError> {
    let reconciled = reconciler(&state)
        .handle_ipn(&callback)
        .await?
        .as_ref()
        .is_some_and(Reconciliation::is_settled);

    Ok(Json(json!({
        "status": "received",
        "reconciled": reconciled,
    })))
}
