use std::sync::Arc;

use tracing::info;

use shared_config::{AppConfig, DatabaseBackend};
use shared_database::{ClinicStore, MemoryStore, SupabaseStore};
use shared_media::{CloudinaryClient, ImageHost};

/// Handles shared by every cell: configuration plus the external collaborators.
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ClinicStore>,
    pub images: Arc<dyn ImageHost>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let store: Arc<dyn ClinicStore> = match config.database_backend {
            DatabaseBackend::Supabase => {
                info!("Using Supabase store at {}", config.supabase_url);
                Arc::new(SupabaseStore::new(&config))
            }
            DatabaseBackend::Memory => {
                info!("Using in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };
        let images = Arc::new(CloudinaryClient::new(&config));

        Self::with_parts(config, store, images)
    }

    pub fn with_parts(
        config: AppConfig,
        store: Arc<dyn ClinicStore>,
        images: Arc<dyn ImageHost>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            images,
        }
    }
}
