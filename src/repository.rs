use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::backend::{BackendClient, Query, Table};
use crate::error::{AppError, BackendError};
use crate::models::{
    Application, ApplicationStatus, Course, CoursePayload, NewApplication, Update, UpdatePayload,
};

/// A record type stored in one backend table.
pub trait Entity: DeserializeOwned + Send {
    const TABLE: Table;
    /// Label used in notices ("Course", "Update").
    const LABEL: &'static str;
    type Payload: Serialize + Sync;

    fn id(&self) -> &str;
}

impl Entity for Course {
    const TABLE: Table = Table::Courses;
    const LABEL: &'static str = "Course";
    type Payload = CoursePayload;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Update {
    const TABLE: Table = Table::Updates;
    const LABEL: &'static str = "Update";
    type Payload = UpdatePayload;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Deserialize)]
struct TitleRow {
    title: String,
}

/// Typed access to courses, updates and applications for one caller
/// (anonymous visitor or signed-in admin).
#[derive(Clone)]
pub struct Repository {
    backend: Arc<dyn BackendClient>,
    access_token: Option<String>,
}

impl Repository {
    pub fn anonymous(backend: Arc<dyn BackendClient>) -> Self {
        Self {
            backend,
            access_token: None,
        }
    }

    pub fn authenticated(backend: Arc<dyn BackendClient>, access_token: impl Into<String>) -> Self {
        Self {
            backend,
            access_token: Some(access_token.into()),
        }
    }

    pub fn backend(&self) -> &dyn BackendClient {
        self.backend.as_ref()
    }

    pub fn shared_backend(&self) -> Arc<dyn BackendClient> {
        Arc::clone(&self.backend)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    async fn fetch<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>, AppError> {
        let rows = self.backend.select(query, self.access_token()).await?;
        rows.into_iter().map(|row| decode(query.table, row)).collect()
    }

    async fn fetch_one<T: DeserializeOwned>(&self, query: Query) -> Result<T, AppError> {
        self.fetch::<T>(&query.limit(1))
            .await?
            .pop()
            .ok_or(AppError::NotFound)
    }

    /// Every row of an entity table, newest first.
    pub async fn list<E: Entity>(&self) -> Result<Vec<E>, AppError> {
        self.fetch(&Query::from(E::TABLE).order("created_at", false))
            .await
    }

    pub async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        self.list::<Course>().await
    }

    pub async fn list_updates(&self) -> Result<Vec<Update>, AppError> {
        self.list::<Update>().await
    }

    pub async fn get<E: Entity>(&self, id: &str) -> Result<E, AppError> {
        self.fetch_one(Query::from(E::TABLE).eq("id", id)).await
    }

    pub async fn list_applications(&self) -> Result<Vec<Application>, AppError> {
        self.fetch(&Query::from(Table::Applications).order("applied_date", false))
            .await
    }

    pub async fn get_course(&self, id: &str) -> Result<Course, AppError> {
        self.get::<Course>(id).await
    }

    pub async fn get_update(&self, id: &str) -> Result<Update, AppError> {
        self.get::<Update>(id).await
    }

    /// Newest courses first, at most `limit`.
    pub async fn popular_courses(&self, limit: usize) -> Result<Vec<Course>, AppError> {
        self.fetch(&Query::from(Table::Courses).order("created_at", false).limit(limit))
            .await
    }

    /// Updates by display date, newest first, at most `limit`.
    pub async fn latest_updates(&self, limit: usize) -> Result<Vec<Update>, AppError> {
        self.fetch(&Query::from(Table::Updates).order("date", false).limit(limit))
            .await
    }

    pub async fn updates_by_date(&self) -> Result<Vec<Update>, AppError> {
        self.fetch(&Query::from(Table::Updates).order("date", false))
            .await
    }

    pub async fn course_titles(&self) -> Result<Vec<String>, AppError> {
        let rows: Vec<TitleRow> = self
            .fetch(&Query::from(Table::Courses).select(&["title"]).order("title", true))
            .await?;
        Ok(rows.into_iter().map(|row| row.title).collect())
    }

    /// Inserts when `id` is `None`, otherwise updates that row in place.
    pub async fn save<E: Entity>(&self, payload: &E::Payload, id: Option<&str>) -> Result<E, AppError> {
        let row = serde_json::to_value(payload)
            .map_err(|e| BackendError::new(format!("Failed to encode {}: {}", E::LABEL, e)))?;

        let saved = match id {
            None => self.backend.insert(E::TABLE, row, self.access_token()).await?,
            Some(id) => {
                let query = Query::from(E::TABLE).eq("id", id);
                self.backend
                    .update(&query, row, self.access_token())
                    .await?
                    .pop()
                    .ok_or(AppError::NotFound)?
            }
        };
        let entity: E = decode(E::TABLE, saved)?;
        info!("saved {} {}", E::TABLE.as_str(), entity.id());
        Ok(entity)
    }

    pub async fn save_course(&self, payload: &CoursePayload, id: Option<&str>) -> Result<Course, AppError> {
        self.save::<Course>(payload, id).await
    }

    pub async fn save_update(&self, payload: &UpdatePayload, id: Option<&str>) -> Result<Update, AppError> {
        self.save::<Update>(payload, id).await
    }

    pub async fn delete<E: Entity>(&self, id: &str) -> Result<(), AppError> {
        let query = Query::from(E::TABLE).eq("id", id);
        let deleted = self.backend.delete(&query, self.access_token()).await?;
        if deleted == 0 {
            return Err(AppError::NotFound);
        }
        info!("deleted {} {}", E::TABLE.as_str(), id);
        Ok(())
    }

    pub async fn delete_course(&self, id: &str) -> Result<(), AppError> {
        self.delete::<Course>(id).await
    }

    pub async fn delete_update(&self, id: &str) -> Result<(), AppError> {
        self.delete::<Update>(id).await
    }

    /// Any status may follow any other; the console only decides which
    /// transitions it offers.
    pub async fn set_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
    ) -> Result<Application, AppError> {
        let query = Query::from(Table::Applications).eq("id", id);
        let patch = serde_json::json!({ "status": status });
        let row = self
            .backend
            .update(&query, patch, self.access_token())
            .await?
            .pop()
            .ok_or(AppError::NotFound)?;
        info!("application {} set to {}", id, status);
        decode(Table::Applications, row)
    }

    pub async fn submit_application(&self, application: &NewApplication) -> Result<(), AppError> {
        let row = serde_json::to_value(application)
            .map_err(|e| BackendError::new(format!("Failed to encode application: {}", e)))?;
        self.backend
            .insert(Table::Applications, row, self.access_token())
            .await?;
        info!("application received for {}", application.course);
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(table: Table, row: Value) -> Result<T, AppError> {
    serde_json::from_value(row).map_err(|e| {
        AppError::Backend(BackendError::new(format!(
            "malformed {} row: {}",
            table.as_str(),
            e
        )))
    })
}
