pub mod dto;
pub mod supabase;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::BackendError;
use crate::models::{Session, User};

pub use supabase::{SupabaseClient, SupabaseConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Courses,
    Updates,
    Applications,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Courses => "courses",
            Table::Updates => "updates",
            Table::Applications => "applications",
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Courses => &[
                "id",
                "title",
                "description",
                "duration",
                "amount",
                "image_url",
                "syllabus",
                "created_at",
            ],
            Table::Updates => &["id", "title", "description", "image_url", "date", "created_at"],
            Table::Applications => &[
                "id",
                "full_name",
                "nic",
                "age",
                "gender",
                "email",
                "whatsapp",
                "course",
                "additional_info",
                "applied_date",
                "status",
                "created_at",
            ],
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns().contains(&column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Table-scoped query: equality filters, one ordering and an optional limit.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: Table,
    pub columns: Vec<String>,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn from(table: Table) -> Self {
        Self {
            table,
            columns: Vec::new(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<String>) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Comma separated projection, `*` when no columns were picked.
    pub fn projection(&self) -> String {
        if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(",")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOptions {
    pub cache_control_secs: u32,
    /// When false an existing object with the same name makes the upload fail.
    pub upsert: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            cache_control_secs: 3600,
            upsert: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadObject<'a> {
    pub bucket: &'a str,
    pub path: &'a str,
    pub content_type: &'a str,
    pub bytes: Vec<u8>,
}

/// Hosted database, storage and auth service.
///
/// `access_token` is the signed-in user's token; `None` acts as the anonymous
/// visitor and is subject to the public row policies.
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn select(&self, query: &Query, access_token: Option<&str>) -> Result<Vec<Value>, BackendError>;

    async fn insert(&self, table: Table, row: Value, access_token: Option<&str>) -> Result<Value, BackendError>;

    /// Applies `patch` to every row matching the query filters and returns the
    /// updated rows.
    async fn update(&self, query: &Query, patch: Value, access_token: Option<&str>) -> Result<Vec<Value>, BackendError>;

    /// Deletes the rows matching the query filters and returns how many went.
    async fn delete(&self, query: &Query, access_token: Option<&str>) -> Result<u64, BackendError>;

    async fn upload(
        &self,
        object: UploadObject<'_>,
        options: UploadOptions,
        access_token: Option<&str>,
    ) -> Result<(), BackendError>;

    fn public_url(&self, bucket: &str, path: &str) -> String;

    /// Resolves the user behind a session token; `Ok(None)` when the token is
    /// unknown or expired.
    async fn get_user(&self, access_token: &str) -> Result<Option<User>, BackendError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError>;

    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<User, BackendError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;
}
