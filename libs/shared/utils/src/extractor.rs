use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use shared_models::auth::{AuthUser, Role};
use shared_models::error::AppError;

use crate::jwt::validate_token;
use crate::state::AppState;

const NOT_AUTHORIZED: &str = "Not Authorized Login Again";

/// Reads the token from `Authorization: Bearer`, falling back to the
/// per-role header older clients send (`token`, `dtoken`, `atoken`).
fn extract_token(headers: &HeaderMap, legacy_header: &str) -> Result<String, AppError> {
    if let Some(auth_header) = headers.get(AUTHORIZATION) {
        let auth_value = auth_header
            .to_str()
            .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

        return auth_value
            .strip_prefix("Bearer ")
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()));
    }

    headers
        .get(legacy_header)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Auth(NOT_AUTHORIZED.to_string()))
}

async fn authorize(
    state: &AppState,
    mut request: Request<Body>,
    next: Next,
    role: Role,
    legacy_header: &str,
) -> Result<Response, AppError> {
    let token = extract_token(request.headers(), legacy_header)?;

    let user = validate_token(&token, &state.config.jwt_secret).map_err(|e| {
        debug!("Rejected {} token: {}", role, e);
        AppError::Auth(NOT_AUTHORIZED.to_string())
    })?;

    if user.role != role {
        return Err(AppError::Forbidden(format!("{} access required", role)));
    }

    // Admin tokens are bound to the configured admin identity.
    if role == Role::Admin && user.id != state.config.admin_email {
        return Err(AppError::Auth(NOT_AUTHORIZED.to_string()));
    }

    request.extensions_mut().insert::<AuthUser>(user);

    Ok(next.run(request).await)
}

pub async fn user_auth(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    authorize(&state, request, next, Role::Patient, "token").await
}

pub async fn doctor_auth(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    authorize(&state, request, next, Role::Doctor, "dtoken").await
}

pub async fn admin_auth(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    authorize(&state, request, next, Role::Admin, "atoken").await
}
