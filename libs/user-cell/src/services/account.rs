use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{ClinicStore, StoreError};
use shared_models::auth::Role;
use shared_models::user::{User, UserProfile};
use shared_utils::jwt::issue_session_token;
use shared_utils::password::{hash_password, verify_password};
use shared_utils::validation::{normalize_email, validate_new_account};

use crate::models::{AccountError, LoginRequest, ProfileUpdate, RegisterRequest};

pub struct AccountService {
    store: Arc<dyn ClinicStore>,
    config: Arc<AppConfig>,
}

impl AccountService {
    pub fn new(store: Arc<dyn ClinicStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    /// Creates a patient account and returns a login token for it.
    pub async fn register(&self, request: RegisterRequest) -> Result<String, AccountError> {
        validate_new_account(&request.name, &request.email, &request.password)?;
        let email = normalize_email(&request.email);

        if self.store.find_user_by_email(&email).await?.is_some() {
            debug!("Registration refused, {} already exists", email);
            return Err(AccountError::EmailTaken);
        }

        let password_hash = hash_password(&request.password).map_err(|e| {
            error!("Failed to hash password: {}", e);
            AccountError::Hashing(e.to_string())
        })?;

        let user = User::new(request.name.trim().to_string(), email, password_hash);
        match self.store.insert_user(&user).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => return Err(AccountError::EmailTaken),
            Err(e) => return Err(e.into()),
        }

        info!("Registered user {}", user.id);
        Ok(issue_session_token(&self.config, &user.id.to_string(), Role::Patient)?)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<String, AccountError> {
        let email = normalize_email(&request.email);
        if email.is_empty() || request.password.is_empty() {
            return Err(AccountError::InvalidCredentials);
        }

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            debug!("Login for unknown email {}", email);
            return Err(AccountError::InvalidCredentials);
        };

        let matches = verify_password(&request.password, &user.password_hash).unwrap_or_else(|e| {
            warn!("Stored password hash of user {} is unreadable: {}", user.id, e);
            false
        });
        if !matches {
            return Err(AccountError::InvalidCredentials);
        }

        Ok(issue_session_token(&self.config, &user.id.to_string(), Role::Patient)?)
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<UserProfile, AccountError> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(AccountError::UserNotFound)?;
        Ok(UserProfile::from(&user))
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
        image: Option<String>,
    ) -> Result<UserProfile, AccountError> {
        let patch = update.into_patch(image);
        let user = self
            .store
            .update_user(user_id, &patch)
            .await?
            .ok_or(AccountError::UserNotFound)?;

        info!("Profile of user {} updated", user_id);
        Ok(UserProfile::from(&user))
    }
}
