use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};

use shared_media::MAX_UPLOAD_BODY_BYTES;
use shared_utils::extractor::user_auth;
use shared_utils::AppState;

use crate::handlers;

pub fn user_routes(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/doctor/{doctor_id}", get(handlers::get_doctor));

    let protected_routes = Router::new()
        .route("/get-profile", get(handlers::get_profile))
        .route(
            "/update-profile",
            post(handlers::update_profile).layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES)),
        )
        .route("/book-appointment", post(handlers::book_appointment))
        .route("/appointments", get(handlers::list_appointments))
        .route("/cancel-appointment", post(handlers::cancel_appointment))
        .route("/delete-appointment/{id}", delete(handlers::delete_appointment))
        .route("/pay-cash", post(handlers::pay_cash))
        .layer(middleware::from_fn_with_state(state.clone(), user_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
