use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};

use shared_media::MAX_UPLOAD_BODY_BYTES;
use shared_utils::extractor::admin_auth;
use shared_utils::AppState;

use crate::handlers;

pub fn admin_routes(state: Arc<AppState>) -> Router {
    let public_routes = Router::new().route("/login", post(handlers::login));

    let protected_routes = Router::new()
        .route(
            "/add-doctor",
            post(handlers::add_doctor).layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES)),
        )
        .route("/all-doctors", post(handlers::all_doctors))
        .route("/change-availability", post(handlers::change_availability))
        .route("/doctors/{id}", delete(handlers::delete_doctor))
        .route("/appointments", get(handlers::list_appointments))
        .route("/cancel-appointment", post(handlers::cancel_appointment))
        .route("/delete-appointment", delete(handlers::delete_appointment))
        .route("/dashboard-stats", get(handlers::dashboard_stats))
        .route("/reconcile-slots", post(handlers::reconcile_slots))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
