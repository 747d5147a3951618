use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use appointment_cell::models::AppointmentIdRequest;
use appointment_cell::{Actor, AppointmentBookingService, DashboardService};
use doctor_cell::models::AvailabilityRequest;
use doctor_cell::DoctorProfileService;
use shared_media::MultipartForm;
use shared_models::appointment::AppointmentView;
use shared_models::auth::TokenResponse;
use shared_models::doctor::DoctorProfile;
use shared_models::error::AppError;
use shared_utils::validation::validate_new_account;
use shared_utils::AppState;

use crate::models::{AdminLoginRequest, NewDoctorForm};
use crate::services::AdminSessionService;

fn doctors(state: &AppState) -> DoctorProfileService {
    DoctorProfileService::new(state.store.clone(), state.config.clone())
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AdminLoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let token = AdminSessionService::new(state.config.clone()).login(&request)?;
    Ok(Json(TokenResponse::new(token)))
}

// ==============================================================================
// DOCTORS
// ==============================================================================

#[axum::debug_handler]
pub async fn add_doctor(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let form = NewDoctorForm::from_form(MultipartForm::read(multipart).await?)?;

    // Reject bad credentials before anything is uploaded.
    validate_new_account(&form.details.name, &form.email, &form.password)?;
    let service = doctors(&state);
    service.ensure_email_free(&form.email).await?;

    let image = state.images.upload(&form.image).await?;
    let doctor = service
        .create(&form.email, &form.password, form.details, image)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Doctor Added",
        "doctor": DoctorProfile::private(&doctor),
    })))
}

#[axum::debug_handler]
pub async fn all_doctors(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let doctors: Vec<DoctorProfile> = state
        .store
        .list_doctors()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .iter()
        .map(DoctorProfile::private)
        .collect();

    Ok(Json(json!({
        "success": true,
        "doctors": doctors,
    })))
}

#[axum::debug_handler]
pub async fn change_availability(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor = doctors(&state).toggle_availability(request.doc_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Availability updated successfully",
        "available": doctor.available,
    })))
}

#[axum::debug_handler]
pub async fn delete_doctor(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    doctors(&state).delete(doctor_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Doctor deleted successfully",
    })))
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let appointments = AppointmentBookingService::new(state.store.clone())
        .list_all()
        .await?;
    let views: Vec<AppointmentView> = appointments.iter().map(AppointmentView::from).collect();

    Ok(Json(json!({
        "success": true,
        "appointments": views,
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AppointmentIdRequest>,
) -> Result<Json<Value>, AppError> {
    AppointmentBookingService::new(state.store.clone())
        .cancel(Actor::Admin, request.appointment_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment Cancelled",
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AppointmentIdRequest>,
) -> Result<Json<Value>, AppError> {
    AppointmentBookingService::new(state.store.clone())
        .hide(Actor::Admin, request.appointment_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment deleted successfully",
    })))
}

#[axum::debug_handler]
pub async fn dashboard_stats(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let stats = DashboardService::new(state.store.clone()).admin_stats().await?;

    Ok(Json(json!({
        "success": true,
        "dashData": stats,
    })))
}

#[axum::debug_handler]
pub async fn reconcile_slots(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let report = AppointmentBookingService::new(state.store.clone())
        .slots()
        .reconcile()
        .await?;
    info!("Admin triggered slot reconciliation: {} released", report.released);

    Ok(Json(json!({
        "success": true,
        "report": report,
    })))
}
