use std::sync::Arc;

use axum::{
    extract::{Extension, Multipart, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use appointment_cell::models::{AppointmentIdRequest, BookAppointmentRequest};
use appointment_cell::{Actor, AppointmentBookingService};
use shared_media::MultipartForm;
use shared_models::appointment::AppointmentView;
use shared_models::auth::{AuthUser, TokenResponse};
use shared_models::doctor::DoctorProfile;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{LoginRequest, ProfileUpdate, RegisterRequest};
use crate::services::AccountService;

fn accounts(state: &AppState) -> AccountService {
    AccountService::new(state.store.clone(), state.config.clone())
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let token = accounts(&state).register(request).await?;
    Ok(Json(TokenResponse::new(token)))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let token = accounts(&state).login(request).await?;
    Ok(Json(TokenResponse::new(token)))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor = state
        .store
        .find_doctor(doctor_id)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Doctor not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "doctor": DoctorProfile::public(&doctor),
    })))
}

// ==============================================================================
// PROFILE
// ==============================================================================

#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let profile = accounts(&state).profile(user.record_id()?).await?;

    Ok(Json(json!({
        "success": true,
        "userData": profile,
    })))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let user_id = user.record_id()?;
    let mut form = MultipartForm::read(multipart).await?;
    let update = ProfileUpdate::from_form(&form)?;

    let image = match form.take_image() {
        Some(image) => Some(state.images.upload(&image).await?),
        None => None,
    };

    let profile = accounts(&state)
        .update_profile(user_id, update, image)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Profile Updated",
        "userData": profile,
    })))
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(state.store.clone());
    let appointment = service.book(user.record_id()?, request).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment Booked",
        "appointment": AppointmentView::from(&appointment),
    })))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(state.store.clone());
    let appointments = service.list_for_user(user.record_id()?).await?;
    let views: Vec<AppointmentView> = appointments.iter().map(AppointmentView::from).collect();

    Ok(Json(json!({
        "success": true,
        "appointments": views,
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<AppointmentIdRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(state.store.clone());
    service
        .cancel(Actor::Patient(user.record_id()?), request.appointment_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment Cancelled",
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(state.store.clone());
    service
        .hide(Actor::Patient(user.record_id()?), appointment_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment removed from history",
    })))
}

#[axum::debug_handler]
pub async fn pay_cash(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<AppointmentIdRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(state.store.clone());
    let outcome = service
        .pay_cash(user.record_id()?, request.appointment_id)
        .await?;

    let message = if outcome.is_replay() {
        "Appointment is already paid"
    } else {
        "Cash payment recorded"
    };

    Ok(Json(json!({
        "success": true,
        "message": message,
        "appointment": AppointmentView::from(outcome.appointment()),
    })))
}
