use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use admin_cell::admin_routes;
use doctor_cell::doctor_routes;
use payment_cell::payment_routes;
use shared_utils::AppState;
use user_cell::user_routes;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "MediBook API is running" }))
        .nest("/api/user", user_routes(state.clone()))
        .nest("/api/doctor", doctor_routes(state.clone()))
        .nest("/api/admin", admin_routes(state.clone()))
        .nest("/api/payment", payment_routes(state))
}
