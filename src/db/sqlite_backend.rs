use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::{BackendClient, Filter, Query, Table, UploadObject, UploadOptions};
use crate::db::policy::{self, Operation};
use crate::error::BackendError;
use crate::models::{Session, User};

const SESSION_TTL_SECS: i64 = 3600;
const INVALID_CREDENTIALS: &str = "Invalid login credentials";

/// Development stand-in for the hosted service: SQLite tables, files on disk
/// and password sessions, with the same row policies as production.
pub struct SqliteBackend {
    pool: SqlitePool,
    storage_dir: PathBuf,
    public_base_url: String,
    password_cost: u32,
}

impl SqliteBackend {
    pub async fn connect(
        database_url: &str,
        storage_dir: impl Into<PathBuf>,
        public_base_url: &str,
    ) -> Result<Self, BackendError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = database_url.contains(":memory:");
        let pool_options = if in_memory {
            // every connection would otherwise get its own empty database
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(options).await?;

        let backend = Self::new(pool, storage_dir, public_base_url);
        backend.migrate().await?;
        Ok(backend)
    }

    pub fn new(pool: SqlitePool, storage_dir: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            pool,
            storage_dir: storage_dir.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            password_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// bcrypt work factor for new passwords; existing hashes keep their own.
    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    pub async fn migrate(&self) -> Result<(), BackendError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Reads a stored object back, `None` when it does not exist.
    pub async fn read_object(&self, bucket: &str, path: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let file = self.object_path(bucket, path)?;
        match tokio::fs::read(&file).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BackendError::new(format!("storage read failed: {}", e))),
        }
    }

    fn object_path(&self, bucket: &str, path: &str) -> Result<PathBuf, BackendError> {
        for segment in [bucket, path] {
            if segment.is_empty()
                || segment == "."
                || segment.contains("..")
                || segment.contains('/')
                || segment.contains('\\')
            {
                return Err(BackendError::with_status(400, format!("Invalid object key: {}", segment)));
            }
        }
        Ok(self.storage_dir.join(bucket).join(path))
    }

    async fn is_authenticated(&self, access_token: Option<&str>) -> Result<bool, BackendError> {
        match access_token {
            Some(token) => Ok(self.get_user(token).await?.is_some()),
            None => Ok(false),
        }
    }

    /// Starts a session and drops every session that has already expired.
    async fn create_session(&self, user: User) -> Result<Session, BackendError> {
        let now = Utc::now().timestamp();
        let purged = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if purged > 0 {
            debug!("purged {} expired sessions", purged);
        }

        let token = Uuid::new_v4().simple().to_string();
        let expires_at = now + SESSION_TTL_SECS;
        sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(&token)
            .bind(&user.id)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

        Ok(Session {
            access_token: token,
            expires_in: SESSION_TTL_SECS,
            user,
        })
    }
}

async fn hash_password(password: &str, cost: u32) -> Result<String, BackendError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| BackendError::new(format!("password hashing failed: {}", e)))?
        .map_err(|e| BackendError::new(format!("password hashing failed: {}", e)))
}

async fn verify_password(password: &str, hash: &str) -> Result<bool, BackendError> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| BackendError::new(format!("password check failed: {}", e)))?
        .map_err(|e| BackendError::new(format!("password check failed: {}", e)))
}

fn check_column(table: Table, column: &str) -> Result<(), BackendError> {
    if table.has_column(column) {
        Ok(())
    } else {
        Err(BackendError::with_status(
            400,
            format!("column {}.{} does not exist", table.as_str(), column),
        ))
    }
}

/// `json_object('col', col, ...)` over the requested projection.
fn row_expression(table: Table, columns: &[String]) -> Result<String, BackendError> {
    let picked: Vec<&str> = if columns.is_empty() || columns.iter().any(|c| c == "*") {
        table.columns().to_vec()
    } else {
        for column in columns {
            check_column(table, column)?;
        }
        columns.iter().map(String::as_str).collect()
    };

    let pairs: Vec<String> = picked.iter().map(|c| format!("'{}', {}", c, c)).collect();
    Ok(format!("json_object({})", pairs.join(", ")))
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, table: Table, filters: &[Filter]) -> Result<(), BackendError> {
    for (i, filter) in filters.iter().enumerate() {
        check_column(table, &filter.column)?;
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        qb.push(filter.column.as_str());
        qb.push(" = ");
        qb.push_bind(filter.value.clone());
    }
    Ok(())
}

fn push_value(qb: &mut QueryBuilder<'_, Sqlite>, value: &Value) {
    match value {
        Value::Null => qb.push_bind(None::<String>),
        Value::Bool(b) => qb.push_bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => qb.push_bind(i),
            None => qb.push_bind(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => qb.push_bind(s.clone()),
        other => qb.push_bind(other.to_string()),
    };
}

fn into_object(table: Table, value: Value) -> Result<Map<String, Value>, BackendError> {
    let Value::Object(map) = value else {
        return Err(BackendError::with_status(400, "row must be a JSON object"));
    };
    for column in map.keys() {
        check_column(table, column)?;
    }
    Ok(map)
}

fn parse_rows(rows: Vec<String>) -> Result<Vec<Value>, BackendError> {
    rows.iter()
        .map(|row| {
            serde_json::from_str(row).map_err(|e| BackendError::new(format!("malformed row: {}", e)))
        })
        .collect()
}

#[async_trait]
impl BackendClient for SqliteBackend {
    async fn select(&self, query: &Query, access_token: Option<&str>) -> Result<Vec<Value>, BackendError> {
        let table = query.table;
        if !policy::allows(table, Operation::Select, self.is_authenticated(access_token).await?) {
            debug!("select on {} filtered by row policy", table.as_str());
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT ");
        qb.push(row_expression(table, &query.columns)?);
        qb.push(" FROM ");
        qb.push(table.as_str());
        push_filters(&mut qb, table, &query.filters)?;
        if let Some(order) = &query.order {
            check_column(table, &order.column)?;
            let direction = if order.ascending { " ASC" } else { " DESC" };
            qb.push(" ORDER BY ");
            qb.push(order.column.as_str());
            qb.push(direction);
            qb.push(", rowid");
            qb.push(direction);
        }
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit as i64);
        }

        let rows: Vec<String> = qb.build_query_scalar::<String>().fetch_all(&self.pool).await?;
        parse_rows(rows)
    }

    async fn insert(&self, table: Table, row: Value, access_token: Option<&str>) -> Result<Value, BackendError> {
        if !policy::allows(table, Operation::Insert, self.is_authenticated(access_token).await?) {
            return Err(BackendError::with_status(
                401,
                format!("new row violates row-level security policy for table \"{}\"", table.as_str()),
            ));
        }

        let mut row = into_object(table, row)?;
        if !row.contains_key("id") {
            row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }

        let columns: Vec<&str> = row.keys().map(String::as_str).collect();
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "INSERT INTO {} ({}) VALUES (",
            table.as_str(),
            columns.join(", ")
        ));
        for (i, value) in row.values().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            push_value(&mut qb, value);
        }
        qb.push(") RETURNING ");
        qb.push(row_expression(table, &[])?);

        let inserted: String = qb.build_query_scalar::<String>().fetch_one(&self.pool).await?;
        parse_rows(vec![inserted])?
            .pop()
            .ok_or_else(|| BackendError::new("insert returned no row"))
    }

    async fn update(&self, query: &Query, patch: Value, access_token: Option<&str>) -> Result<Vec<Value>, BackendError> {
        let table = query.table;
        if !policy::allows(table, Operation::Update, self.is_authenticated(access_token).await?) {
            debug!("update on {} filtered by row policy", table.as_str());
            return Ok(Vec::new());
        }

        let mut patch = into_object(table, patch)?;
        patch.remove("id");
        if patch.is_empty() {
            return Err(BackendError::with_status(400, "update has no columns"));
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", table.as_str()));
        for (i, (column, value)) in patch.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            qb.push(column.as_str());
            qb.push(" = ");
            push_value(&mut qb, value);
        }
        push_filters(&mut qb, table, &query.filters)?;
        qb.push(" RETURNING ");
        qb.push(row_expression(table, &[])?);

        let rows: Vec<String> = qb.build_query_scalar::<String>().fetch_all(&self.pool).await?;
        parse_rows(rows)
    }

    async fn delete(&self, query: &Query, access_token: Option<&str>) -> Result<u64, BackendError> {
        let table = query.table;
        if !policy::allows(table, Operation::Delete, self.is_authenticated(access_token).await?) {
            debug!("delete on {} filtered by row policy", table.as_str());
            return Ok(0);
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!("DELETE FROM {}", table.as_str()));
        push_filters(&mut qb, table, &query.filters)?;
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn upload(
        &self,
        object: UploadObject<'_>,
        options: UploadOptions,
        access_token: Option<&str>,
    ) -> Result<(), BackendError> {
        if !self.is_authenticated(access_token).await? {
            return Err(BackendError::with_status(
                403,
                "new row violates row-level security policy",
            ));
        }

        let path = self.object_path(object.bucket, object.path)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| BackendError::new(format!("Failed to create directory: {}", e)))?;
        }

        let mut open = tokio::fs::OpenOptions::new();
        open.write(true);
        if options.upsert {
            open.create(true).truncate(true);
        } else {
            open.create_new(true);
        }
        let mut file = open.open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                BackendError::with_status(409, "The resource already exists")
            } else {
                BackendError::new(format!("storage write failed: {}", e))
            }
        })?;
        file.write_all(&object.bytes)
            .await
            .map_err(|e| BackendError::new(format!("storage write failed: {}", e)))?;
        file.flush()
            .await
            .map_err(|e| BackendError::new(format!("storage write failed: {}", e)))?;

        info!("stored {}/{} ({} bytes)", object.bucket, object.path, object.bytes.len());
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/{}/{}", self.public_base_url, bucket, path)
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<User>, BackendError> {
        let now = Utc::now().timestamp();
        let row = sqlx::query_as::<_, (String, String, Option<String>)>(
            r#"
            SELECT users.id, users.email, users.full_name
            FROM sessions
            JOIN users ON users.id = sessions.user_id
            WHERE sessions.token = ? AND sessions.expires_at > ?
            "#,
        )
        .bind(access_token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, email, full_name)| User { id, email, full_name }))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let row = sqlx::query_as::<_, (String, String, String, Option<String>)>(
            "SELECT id, email, password_hash, full_name FROM users WHERE email = ?",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        let Some((id, email, password_hash, full_name)) = row else {
            return Err(BackendError::with_status(400, INVALID_CREDENTIALS));
        };
        if !verify_password(password, &password_hash).await? {
            return Err(BackendError::with_status(400, INVALID_CREDENTIALS));
        }

        self.create_session(User { id, email, full_name }).await
    }

    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<User, BackendError> {
        let email = email.trim();
        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_some() {
            return Err(BackendError::with_status(422, "User already registered"));
        }

        let id = Uuid::new_v4().to_string();
        let password_hash = hash_password(password, self.password_cost).await?;
        sqlx::query("INSERT INTO users (id, email, password_hash, full_name) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(email)
            .bind(&password_hash)
            .bind(full_name)
            .execute(&self.pool)
            .await?;

        Ok(User {
            id,
            email: email.to_string(),
            full_name: Some(full_name.to_string()),
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(access_token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
