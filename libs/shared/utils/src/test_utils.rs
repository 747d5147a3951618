use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::{AppConfig, DatabaseBackend};
use shared_database::MemoryStore;
use shared_media::{ImageHost, ImageUpload, MediaError};
use shared_models::auth::Role;
use shared_models::doctor::{Doctor, SlotBook};
use shared_models::user::{Address, User};

use crate::state::AppState;

pub struct TestConfig {
    pub jwt_secret: String,
    pub admin_email: String,
    pub admin_password: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            admin_email: "admin@medibook.test".to_string(),
            admin_password: "admin-password".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            jwt_secret: self.jwt_secret.clone(),
            admin_email: self.admin_email.clone(),
            admin_password: self.admin_password.clone(),
            database_backend: DatabaseBackend::Memory,
            backend_url: "http://api.medibook.test".to_string(),
            frontend_url: "http://medibook.test".to_string(),
            ..AppConfig::default()
        }
    }
}

pub struct TestUser {
    pub id: String,
    pub role: Role,
}

impl TestUser {
    pub fn new(id: &str, role: Role) -> Self {
        Self {
            id: id.to_string(),
            role,
        }
    }

    pub fn patient(id: Uuid) -> Self {
        Self::new(&id.to_string(), Role::Patient)
    }

    pub fn doctor(id: Uuid) -> Self {
        Self::new(&id.to_string(), Role::Doctor)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, Role::Admin)
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Image host that keeps uploads in memory and hands back predictable URLs.
#[derive(Default)]
pub struct StubImageHost {
    uploads: Mutex<Vec<String>>,
}

impl StubImageHost {
    pub fn uploaded(&self) -> Vec<String> {
        self.uploads.lock().map(|u| u.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ImageHost for StubImageHost {
    async fn upload(&self, image: &ImageUpload) -> Result<String, MediaError> {
        let url = format!("https://images.medibook.test/uploads/{}", image.file_name);
        if let Ok(mut uploads) = self.uploads.lock() {
            uploads.push(url.clone());
        }
        Ok(url)
    }
}

/// Application state over a fresh memory store, with handles to the fakes.
pub struct TestApp {
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub images: Arc<StubImageHost>,
    pub config: TestConfig,
}

impl TestApp {
    pub fn new() -> Self {
        let config = TestConfig::default();
        let store = Arc::new(MemoryStore::new());
        let images = Arc::new(StubImageHost::default());
        let state = Arc::new(AppState::with_parts(
            config.to_app_config(),
            store.clone(),
            images.clone(),
        ));

        Self {
            state,
            store,
            images,
            config,
        }
    }

    pub fn token_for(&self, user: &TestUser) -> String {
        JwtTestUtils::create_test_token(user, &self.config.jwt_secret, Some(24))
    }

    pub fn admin_token(&self) -> String {
        self.token_for(&TestUser::admin(&self.config.admin_email))
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TestFixtures;

impl TestFixtures {
    pub fn user(name: &str, email: &str) -> User {
        User::new(name.to_string(), email.to_string(), "unused-hash".to_string())
    }

    pub fn doctor(name: &str, email: &str) -> Doctor {
        Doctor {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: "unused-hash".to_string(),
            image: "https://images.medibook.test/doctor.png".to_string(),
            speciality: "General physician".to_string(),
            degree: "MBBS".to_string(),
            experience: "4 Years".to_string(),
            about: "Focuses on preventive care.".to_string(),
            available: true,
            fees: 50.0,
            address: Address {
                line1: "17th Cross, Richmond".to_string(),
                line2: "Circle, Ring Road".to_string(),
            },
            created_at: Utc::now(),
            slots_booked: SlotBook::default(),
            slots_version: 0,
        }
    }
}
