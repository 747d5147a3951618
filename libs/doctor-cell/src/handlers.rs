use std::sync::Arc;

use axum::{
    extract::{Extension, Multipart, Path, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use appointment_cell::models::{AppointmentIdRequest, CompleteAppointmentRequest};
use appointment_cell::{Actor, AppointmentBookingService, DashboardService};
use shared_media::MultipartForm;
use shared_models::auth::{AuthUser, TokenResponse};
use shared_models::doctor::DoctorProfile;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{DoctorLoginRequest, PracticeDetails};
use crate::services::{DoctorDirectoryService, DoctorProfileService};

fn profiles(state: &AppState) -> DoctorProfileService {
    DoctorProfileService::new(state.store.clone(), state.config.clone())
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DoctorLoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let token = profiles(&state).login(request).await?;
    Ok(Json(TokenResponse::new(token)))
}

#[axum::debug_handler]
pub async fn list_doctors(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let doctors = DoctorDirectoryService::new(state.store.clone()).list().await?;

    Ok(Json(json!({
        "success": true,
        "doctors": doctors,
    })))
}

#[axum::debug_handler]
pub async fn top_doctors(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let doctors = DoctorDirectoryService::new(state.store.clone()).top().await?;

    Ok(Json(json!({
        "success": true,
        "doctors": doctors,
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
    let doctor = profiles(&state).get(user.record_id()?).await?;

    Ok(Json(json!({
        "success": true,
        "doctor": DoctorProfile::private(&doctor),
    })))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let doc_id = user.record_id()?;
    let mut form = MultipartForm::read(multipart).await?;
    let details = PracticeDetails::from_form(&form)?;

    let image = match form.take_image() {
        Some(image) => Some(state.images.upload(&image).await?),
        None => None,
    };

    let doctor = profiles(&state).update_profile(doc_id, details, image).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "doctor": DoctorProfile::private(&doctor),
    })))
}

#[axum::debug_handler]
pub async fn change_availability(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let doctor = profiles(&state).toggle_availability(user.record_id()?).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Availability updated successfully",
        "available": doctor.available,
    })))
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let dashboard = DashboardService::new(state.store.clone());
    let appointments = dashboard
        .doctor_appointments(user.record_id()?, Utc::now().date_naive())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments,
    })))
}

#[axum::debug_handler]
pub async fn dashboard_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let dashboard = DashboardService::new(state.store.clone());
    let stats = dashboard
        .doctor_stats(user.record_id()?, Utc::now().date_naive())
        .await?;

    Ok(Json(json!({
        "success": true,
        "stats": stats,
    })))
}

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<AppointmentIdRequest>,
) -> Result<Json<Value>, AppError> {
    AppointmentBookingService::new(state.store.clone())
        .confirm(user.record_id()?, request.appointment_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment confirmed successfully",
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CompleteAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    AppointmentBookingService::new(state.store.clone())
        .complete(user.record_id()?, request.appointment_id, request.patient_visited)
        .await?;

    let message = if request.patient_visited {
        "Appointment marked as completed with patient visit"
    } else {
        "Appointment marked as completed without patient visit"
    };

    Ok(Json(json!({
        "success": true,
        "message": message,
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<AppointmentIdRequest>,
) -> Result<Json<Value>, AppError> {
    AppointmentBookingService::new(state.store.clone())
        .cancel(Actor::Doctor(user.record_id()?), request.appointment_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment cancelled successfully",
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    AppointmentBookingService::new(state.store.clone())
        .hide(Actor::Doctor(user.record_id()?), appointment_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment removed from history successfully",
    })))
}
