use std::env;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Supabase,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub admin_email: String,
    pub admin_password: String,
    pub database_backend: DatabaseBackend,
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub cloudinary_name: String,
    pub cloudinary_api_key: String,
    pub cloudinary_secret_key: String,
    pub cloudinary_base_url: String,
    pub sslcommerz_store_id: String,
    pub sslcommerz_store_password: String,
    pub sslcommerz_is_live: bool,
    pub sslcommerz_base_url: String,
    pub payment_currency: String,
    /// Public base URL of this API, used to build gateway callback URLs.
    pub backend_url: String,
    /// Public base URL of the patient-facing site, used for payer redirects.
    pub frontend_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let sslcommerz_is_live = env::var("SSLCOMMERZ_IS_LIVE")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let config = Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or_else(|| {
                    warn!("PORT not set or invalid, using 4000");
                    4000
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            token_ttl_hours: env::var("TOKEN_TTL_HOURS")
                .ok()
                .and_then(|h| h.parse().ok())
                .unwrap_or(24 * 7),
            admin_email: env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| {
                    warn!("ADMIN_EMAIL not set, admin login disabled");
                    String::new()
                }),
            admin_password: env::var("ADMIN_PASSWORD")
                .unwrap_or_else(|_| {
                    warn!("ADMIN_PASSWORD not set, admin login disabled");
                    String::new()
                }),
            database_backend: match env::var("DATABASE_BACKEND").as_deref() {
                Ok("memory") => DatabaseBackend::Memory,
                Ok("supabase") | Err(_) => DatabaseBackend::Supabase,
                Ok(other) => {
                    warn!("Unknown DATABASE_BACKEND '{}', using supabase", other);
                    DatabaseBackend::Supabase
                }
            },
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_KEY not set, using empty value");
                    String::new()
                }),
            cloudinary_name: env::var("CLOUDINARY_NAME")
                .unwrap_or_else(|_| {
                    warn!("CLOUDINARY_NAME not set, image uploads will fail");
                    String::new()
                }),
            cloudinary_api_key: env::var("CLOUDINARY_API_KEY").unwrap_or_default(),
            cloudinary_secret_key: env::var("CLOUDINARY_SECRET_KEY").unwrap_or_default(),
            cloudinary_base_url: env::var("CLOUDINARY_BASE_URL")
                .unwrap_or_else(|_| "https://api.cloudinary.com/v1_1".to_string()),
            sslcommerz_store_id: env::var("SSLCOMMERZ_STORE_ID")
                .unwrap_or_else(|_| {
                    warn!("SSLCOMMERZ_STORE_ID not set, online payments disabled");
                    String::new()
                }),
            sslcommerz_store_password: env::var("SSLCOMMERZ_STORE_PASSWORD").unwrap_or_default(),
            sslcommerz_is_live,
            sslcommerz_base_url: env::var("SSLCOMMERZ_BASE_URL").unwrap_or_else(|_| {
                if sslcommerz_is_live {
                    "https://securepay.sslcommerz.com".to_string()
                } else {
                    "https://sandbox.sslcommerz.com".to_string()
                }
            }),
            payment_currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "BDT".to_string()),
            backend_url: env::var("BACKEND_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| {
                    warn!("BACKEND_URL not set, using http://localhost:4000");
                    "http://localhost:4000".to_string()
                }),
            frontend_url: env::var("FRONTEND_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| {
                    warn!("FRONTEND_URL not set, using http://localhost:5173");
                    "http://localhost:5173".to_string()
                }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    /// Base URL of the image host's upload API for this cloud.
    pub fn cloudinary_upload_url(&self) -> String {
        format!("{}/{}/image/upload", self.cloudinary_base_url, self.cloudinary_name)
    }

    pub fn is_configured(&self) -> bool {
        !self.jwt_secret.is_empty()
            && (self.database_backend == DatabaseBackend::Memory
                || (!self.supabase_url.is_empty() && !self.supabase_service_key.is_empty()))
    }

    pub fn is_admin_login_enabled(&self) -> bool {
        !self.admin_email.is_empty() && !self.admin_password.is_empty()
    }

    pub fn is_image_host_configured(&self) -> bool {
        !self.cloudinary_name.is_empty()
            && !self.cloudinary_api_key.is_empty()
            && !self.cloudinary_secret_key.is_empty()
    }

    pub fn is_payment_gateway_configured(&self) -> bool {
        !self.sslcommerz_store_id.is_empty() && !self.sslcommerz_store_password.is_empty()
    }
}

impl Default for AppConfig {
    /// Local defaults with every secret empty. `from_env` starts from the same values.
    fn default() -> Self {
        Self {
            port: 4000,
            jwt_secret: String::new(),
            token_ttl_hours: 24 * 7,
            admin_email: String::new(),
            admin_password: String::new(),
            database_backend: DatabaseBackend::Memory,
            supabase_url: String::new(),
            supabase_service_key: String::new(),
            cloudinary_name: String::new(),
            cloudinary_api_key: String::new(),
            cloudinary_secret_key: String::new(),
            cloudinary_base_url: "https://api.cloudinary.com/v1_1".to_string(),
            sslcommerz_store_id: String::new(),
            sslcommerz_store_password: String::new(),
            sslcommerz_is_live: false,
            sslcommerz_base_url: "https://sandbox.sslcommerz.com".to_string(),
            payment_currency: "BDT".to_string(),
            backend_url: "http://localhost:4000".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
        }
    }
}
