use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_media::MAX_UPLOAD_BODY_BYTES;
use shared_utils::extractor::doctor_auth;
use shared_utils::AppState;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppState>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/login", post(handlers::login))
        .route("/list", get(handlers::list_doctors))
        .route("/top-doctors", get(handlers::top_doctors));

    let protected_routes = Router::new()
        // Profile
        .route("/profile", get(handlers::get_profile))
        .route(
            "/update-profile",
            put(handlers::update_profile).layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES)),
        )
        .route("/change-availability", put(handlers::change_availability))
        // Appointments
        .route("/appointments", get(handlers::list_appointments))
        .route("/dashboard-stats", get(handlers::dashboard_stats))
        .route("/confirm-appointment", put(handlers::confirm_appointment))
        .route("/complete-appointment", put(handlers::complete_appointment))
        .route("/cancel-appointment", put(handlers::cancel_appointment))
        .route("/delete-appointment/{id}", delete(handlers::delete_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), doctor_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
