use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::backend::SupabaseConfig;
use crate::error::AppError;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://naas_campus.db";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_WHATSAPP_CONTACT: &str = "94751501603";
pub const DEFAULT_INSTITUTE_NAME: &str = "NAAS CAMPUS";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone, Debug)]
pub enum BackendConfig {
    Supabase(SupabaseConfig),
    Sqlite {
        database_url: String,
        storage_dir: PathBuf,
    },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub bind_addr: SocketAddr,
    /// Base of public URLs handed out for files stored by the embedded backend.
    pub public_base_url: String,
    pub whatsapp_contact: String,
    pub institute_name: String,
    pub max_upload_bytes: usize,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl AppConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let bind = var_or("BIND_ADDR", DEFAULT_BIND_ADDR);
        let bind_addr: SocketAddr = bind
            .parse()
            .map_err(|_| AppError::BadRequest(format!("BIND_ADDR is not a socket address: {}", bind)))?;

        let backend = match var_or("BACKEND", "sqlite").to_ascii_lowercase().as_str() {
            "supabase" => BackendConfig::Supabase(SupabaseConfig::new_from_env()?),
            "sqlite" => BackendConfig::Sqlite {
                database_url: var_or("DATABASE_URL", DEFAULT_DATABASE_URL),
                storage_dir: PathBuf::from(var_or("STORAGE_DIR", "./storage")),
            },
            other => {
                return Err(AppError::BadRequest(format!("Unknown BACKEND: {}", other)));
            }
        };

        let max_upload = var_or("MAX_UPLOAD_BYTES", &DEFAULT_MAX_UPLOAD_BYTES.to_string());
        let max_upload_bytes = max_upload
            .parse()
            .map_err(|_| AppError::BadRequest(format!("MAX_UPLOAD_BYTES is not a number: {}", max_upload)))?;

        Ok(Self {
            backend,
            public_base_url: var_or("PUBLIC_BASE_URL", &format!("http://{}", bind_addr)),
            bind_addr,
            whatsapp_contact: var_or("WHATSAPP_CONTACT", DEFAULT_WHATSAPP_CONTACT),
            institute_name: var_or("INSTITUTE_NAME", DEFAULT_INSTITUTE_NAME),
            max_upload_bytes,
        })
    }

    /// Embedded backend on the given database and storage directory, with
    /// every other setting at its default.
    pub fn local(database_url: &str, storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendConfig::Sqlite {
                database_url: database_url.to_string(),
                storage_dir: storage_dir.into(),
            },
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            public_base_url: "http://127.0.0.1:3000".to_string(),
            whatsapp_contact: DEFAULT_WHATSAPP_CONTACT.to_string(),
            institute_name: DEFAULT_INSTITUTE_NAME.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}
