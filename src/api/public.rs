use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::api::JsonBody;
use crate::error::AppError;
use crate::models::NewApplicationRequest;
use crate::services::catalog::{self, ApplicationReceipt, CourseCard, CourseDetail, HomePage, UpdateCard};
use crate::services::links::{self, PaymentProofLink, PaymentProofRequest};
use crate::services::upload::ImageFile;
use crate::services::ListView;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CourseOptions {
    pub courses: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentPage {
    pub courses: Vec<String>,
    pub whatsapp_contact: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/home", get(home))
        .route("/api/courses", get(list_courses))
        .route("/api/courses/{id}", get(course_detail))
        .route("/api/updates", get(list_updates))
        .route("/api/apply", get(application_form))
        .route("/api/applications", post(submit_application))
        .route("/api/payment", get(payment_page))
        .route("/api/payment/proof-link", post(payment_proof_link))
        .route("/storage/{bucket}/{file}", get(stored_file))
}

async fn home(State(state): State<AppState>) -> Json<HomePage> {
    Json(catalog::home_page(&state.visitor()).await)
}

async fn list_courses(State(state): State<AppState>) -> Result<Json<ListView<CourseCard>>, AppError> {
    Ok(Json(catalog::courses_page(&state.visitor()).await?))
}

async fn course_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CourseDetail>, AppError> {
    Ok(Json(catalog::course_detail(&state.visitor(), &id).await?))
}

async fn list_updates(State(state): State<AppState>) -> Result<Json<ListView<UpdateCard>>, AppError> {
    Ok(Json(catalog::updates_page(&state.visitor()).await?))
}

async fn application_form(State(state): State<AppState>) -> Json<CourseOptions> {
    Json(CourseOptions {
        courses: catalog::application_course_options(&state.visitor()).await,
    })
}

async fn submit_application(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<NewApplicationRequest>,
) -> Result<(StatusCode, Json<ApplicationReceipt>), AppError> {
    let receipt = catalog::submit_application(&state.visitor(), req, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn payment_page(State(state): State<AppState>) -> Json<PaymentPage> {
    Json(PaymentPage {
        courses: catalog::payment_course_options(&state.visitor()).await,
        whatsapp_contact: state.config.whatsapp_contact.clone(),
    })
}

async fn payment_proof_link(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<PaymentProofRequest>,
) -> Result<Json<PaymentProofLink>, AppError> {
    let link = links::payment_proof_link(
        &state.config.whatsapp_contact,
        &state.config.institute_name,
        &req,
    )?;
    Ok(Json(link))
}

/// Serves images kept on local disk by the embedded backend.
async fn stored_file(
    State(state): State<AppState>,
    Path((bucket, file)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let storage = state.local_storage.as_ref().ok_or(AppError::NotFound)?;
    let bytes = storage
        .read_object(&bucket, &file)
        .await
        .map_err(|e| match e.status {
            Some(400) => AppError::NotFound,
            _ => AppError::Backend(e),
        })?
        .ok_or(AppError::NotFound)?;
    let content_type = ImageFile::new(file, None, Vec::new()).content_type().to_string();
    Ok((
        [
            (CONTENT_TYPE, content_type),
            (CACHE_CONTROL, "max-age=3600".to_string()),
        ],
        Body::from(bytes),
    )
        .into_response())
}
