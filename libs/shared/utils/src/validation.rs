use std::sync::OnceLock;

use regex::Regex;

use shared_models::error::AppError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

fn email_pattern() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| {
            Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$").ok()
        })
        .as_ref()
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().map_or(false, |re| re.is_match(email))
}

/// Normalizes an email for lookups and uniqueness checks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Checks a new account's name, email and password.
pub fn validate_new_account(name: &str, email: &str, password: &str) -> Result<(), AppError> {
    if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
        return Err(AppError::ValidationError("Missing Details".to_string()));
    }
    if !is_valid_email(email.trim()) {
        return Err(AppError::ValidationError("Please enter a valid email".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::ValidationError(format!(
            "Please enter a strong password (at least {} characters)",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}
