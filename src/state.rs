use std::sync::Arc;

use tracing::info;

use crate::backend::{BackendClient, SupabaseClient};
use crate::config::{AppConfig, BackendConfig};
use crate::db::SqliteBackend;
use crate::error::AppError;
use crate::repository::Repository;
use crate::services::InFlight;

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn BackendClient>,
    pub config: Arc<AppConfig>,
    pub in_flight: InFlight,
    /// Set when files live on local disk and are served by this process.
    pub local_storage: Option<Arc<SqliteBackend>>,
}

impl AppState {
    pub async fn from_config(config: AppConfig) -> Result<Self, AppError> {
        match &config.backend {
            BackendConfig::Supabase(supabase) => {
                info!("using hosted backend at {}", supabase.url);
                let client = SupabaseClient::new(supabase.clone())?;
                Ok(Self::new(Arc::new(client), config))
            }
            BackendConfig::Sqlite {
                database_url,
                storage_dir,
            } => {
                info!("using embedded backend {}", database_url);
                let backend =
                    SqliteBackend::connect(database_url, storage_dir.clone(), &config.public_base_url)
                        .await?;
                Ok(Self::with_local_backend(Arc::new(backend), config))
            }
        }
    }

    pub fn new(backend: Arc<dyn BackendClient>, config: AppConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
            in_flight: InFlight::new(),
            local_storage: None,
        }
    }

    pub fn with_local_backend(backend: Arc<SqliteBackend>, config: AppConfig) -> Self {
        Self {
            backend: backend.clone(),
            config: Arc::new(config),
            in_flight: InFlight::new(),
            local_storage: Some(backend),
        }
    }

    pub fn visitor(&self) -> Repository {
        Repository::anonymous(self.backend.clone())
    }

    pub fn admin(&self, access_token: &str) -> Repository {
        Repository::authenticated(self.backend.clone(), access_token)
    }
}
