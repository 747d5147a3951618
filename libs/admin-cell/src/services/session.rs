use std::sync::Arc;

use tracing::{info, warn};

use shared_config::AppConfig;
use shared_models::auth::Role;
use shared_models::error::AppError;
use shared_utils::jwt::issue_session_token;
use shared_utils::password::secrets_match;

use crate::models::AdminLoginRequest;

/// Logs the single configured administrator in.
pub struct AdminSessionService {
    config: Arc<AppConfig>,
}

impl AdminSessionService {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }

    /// Issues an admin token whose subject is the configured admin email.
    pub fn login(&self, request: &AdminLoginRequest) -> Result<String, AppError> {
        if !self.config.is_admin_login_enabled() {
            warn!("Admin login attempted but no admin credentials are configured");
            return Err(AppError::Auth("Invalid credentials".to_string()));
        }

        // Both comparisons always run.
        let email_ok = secrets_match(&self.config.admin_email, request.email.trim());
        let password_ok = secrets_match(&self.config.admin_password, &request.password);
        if !(email_ok && password_ok) {
            warn!("Rejected admin login");
            return Err(AppError::Auth("Invalid credentials".to_string()));
        }

        info!("Admin logged in");
        issue_session_token(&self.config, &self.config.admin_email, Role::Admin)
    }
}
