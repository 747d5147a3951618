use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::user_auth;
use shared_utils::AppState;

use crate::gateway::{PaymentGateway, SslCommerzClient};
use crate::handlers;

/// Application state plus the checkout provider.
pub struct PaymentState {
    pub app: Arc<AppState>,
    pub gateway: Arc<dyn PaymentGateway>,
}

pub fn payment_routes(state: Arc<AppState>) -> Router {
    let gateway = Arc::new(SslCommerzClient::new(&state.config));
    payment_routes_with_gateway(state, gateway)
}

pub fn payment_routes_with_gateway(state: Arc<AppState>, gateway: Arc<dyn PaymentGateway>) -> Router {
    let payment_state = Arc::new(PaymentState {
        app: state.clone(),
        gateway,
    });

    let public_routes = Router::new()
        .route(
            "/success/{tran_id}",
            get(handlers::payment_success).post(handlers::payment_success),
        )
        .route(
            "/success/{tran_id}/{appointment_id}",
            get(handlers::payment_success).post(handlers::payment_success),
        )
        .route("/fail", get(handlers::payment_fail).post(handlers::payment_fail))
        .route("/cancel", get(handlers::payment_cancel).post(handlers::payment_cancel))
        .route("/ipn", post(handlers::payment_ipn));

    let protected_routes = Router::new()
        .route("/init", post(handlers::init_payment))
        .layer(middleware::from_fn_with_state(state, user_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(payment_state)
}
