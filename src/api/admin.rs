use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::auth::AdminSession;
use crate::api::JsonBody;
use crate::error::AppError;
use crate::models::{ApplicationStatus, Course, Update};
use crate::services::export::{self, EXPORT_CONTENT_TYPE, NOTHING_TO_EXPORT};
use crate::services::listing::{
    self, ApplicationRow, CourseRow, ListView, Notice, UpdateRow, delete_prompt, deleted_notice,
    status_notice,
};
use crate::services::{Editable, EditorSession, EditorView, ImageFile, SubmitOutcome};
use crate::state::AppState;

/// A record the console lists, edits and deletes.
pub trait Managed: Editable {
    type Row: Serialize;

    fn title(&self) -> &str;

    fn render(items: &[Self]) -> ListView<Self::Row>;
}

impl Managed for Course {
    type Row = CourseRow;

    fn title(&self) -> &str {
        &self.title
    }

    fn render(items: &[Self]) -> ListView<CourseRow> {
        listing::course_list(items)
    }
}

impl Managed for Update {
    type Row = UpdateRow;

    fn title(&self) -> &str {
        &self.title
    }

    fn render(items: &[Self]) -> ListView<UpdateRow> {
        listing::update_list(items)
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse<R> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
    pub list: ListView<R>,
}

#[derive(Debug, Serialize)]
pub struct EditorResponse<F> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
    pub editor: EditorView<F>,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub email: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NoticeResponse {
    pub notice: Notice,
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: String,
}

/// Text fields and the optional image of an editor form post.
#[derive(Debug, Default)]
pub struct SubmittedForm {
    pub fields: Vec<(String, String)>,
    pub image: Option<ImageFile>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(dashboard))
        .route("/admin/courses", get(list_courses).post(create_course))
        .route("/admin/courses/new", get(new_course))
        .route("/admin/courses/{id}/edit", get(edit_course))
        .route("/admin/courses/{id}", post(update_course).delete(delete_course))
        .route("/admin/updates", get(list_updates).post(create_update))
        .route("/admin/updates/new", get(new_update))
        .route("/admin/updates/{id}/edit", get(edit_update))
        .route("/admin/updates/{id}", post(update_update).delete(delete_update))
        .route("/admin/applications", get(list_applications))
        .route("/admin/applications/{id}/status", post(set_application_status))
        .route("/admin/applications/export", get(export_applications))
}

/// Reads an editor form post. An empty file input counts as no new image.
pub async fn read_form(mut multipart: Multipart) -> Result<SubmittedForm, AppError> {
    let mut form = SubmittedForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            if !file_name.is_empty() && !bytes.is_empty() {
                form.image = Some(ImageFile::new(file_name, content_type, bytes.to_vec()));
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            form.fields.push((name, value));
        }
    }
    Ok(form)
}

async fn dashboard(session: AdminSession) -> Json<Dashboard> {
    Json(Dashboard {
        email: session.user.email,
        full_name: session.user.full_name,
    })
}

async fn list_managed<E: Managed>(
    state: &AppState,
    session: &AdminSession,
    notice: Option<Notice>,
) -> Result<ListResponse<E::Row>, AppError> {
    let items = state.admin(&session.access_token).list::<E>().await?;
    Ok(ListResponse {
        notice,
        list: E::render(&items),
    })
}

async fn open_editor<E: Managed>(
    state: &AppState,
    session: &AdminSession,
    id: Option<&str>,
) -> Result<EditorResponse<E::Form>, AppError> {
    let editor = match id {
        Some(id) => EditorSession::open_edit(state.admin(&session.access_token).get::<E>(id).await?),
        None => EditorSession::<E>::open_create(),
    };
    Ok(EditorResponse {
        notice: None,
        editor: editor.view(),
    })
}

/// Saves the form and answers with the refreshed list, or with the error and
/// the still-open editor.
async fn submit_managed<E: Managed>(
    state: &AppState,
    session: &AdminSession,
    id: Option<&str>,
    form: SubmittedForm,
) -> Result<Response, AppError> {
    let _ticket = state
        .in_flight
        .begin(&session.access_token, E::TABLE.as_str())?;
    let repo = state.admin(&session.access_token);

    let mut editor = match id {
        Some(id) => EditorSession::open_edit(repo.get::<E>(id).await?),
        None => EditorSession::<E>::open_create(),
    };
    for (name, value) in form.fields {
        if !editor.fill(&name, value) {
            debug!("ignoring unknown {} field {}", E::TABLE.as_str(), name);
        }
    }
    if let Some(image) = form.image {
        editor.attach_image(image);
    }

    match editor.submit(&repo, Utc::now()).await {
        SubmitOutcome::Saved { notice, .. } => {
            let body = list_managed::<E>(state, session, Some(notice)).await?;
            Ok(Json(body).into_response())
        }
        SubmitOutcome::Rejected { error, editor } => {
            error.log();
            let body = EditorResponse {
                notice: Some(Notice::from(&error)),
                editor: editor.view(),
            };
            Ok((error.status_code(), Json(body)).into_response())
        }
    }
}

/// Unconfirmed requests are refused with the prompt to confirm. A failed
/// delete reports the error only; the caller keeps its current list.
async fn delete_managed<E: Managed>(
    state: &AppState,
    session: &AdminSession,
    id: &str,
    confirm: bool,
) -> Result<ListResponse<E::Row>, AppError> {
    let repo = state.admin(&session.access_token);
    if !confirm {
        let entity = repo.get::<E>(id).await?;
        return Err(AppError::BadRequest(delete_prompt(entity.title())));
    }
    repo.delete::<E>(id).await?;
    list_managed::<E>(state, session, Some(Notice::success(deleted_notice(E::LABEL)))).await
}

async fn list_courses(
    State(state): State<AppState>,
    session: AdminSession,
) -> Result<Json<ListResponse<CourseRow>>, AppError> {
    Ok(Json(list_managed::<Course>(&state, &session, None).await?))
}

async fn new_course(
    State(state): State<AppState>,
    session: AdminSession,
) -> Result<Json<EditorResponse<<Course as Editable>::Form>>, AppError> {
    Ok(Json(open_editor::<Course>(&state, &session, None).await?))
}

async fn edit_course(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<EditorResponse<<Course as Editable>::Form>>, AppError> {
    Ok(Json(open_editor::<Course>(&state, &session, Some(&id)).await?))
}

async fn create_course(
    State(state): State<AppState>,
    session: AdminSession,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = read_form(multipart).await?;
    submit_managed::<Course>(&state, &session, None, form).await
}

async fn update_course(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = read_form(multipart).await?;
    submit_managed::<Course>(&state, &session, Some(&id), form).await
}

async fn delete_course(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<ListResponse<CourseRow>>, AppError> {
    Ok(Json(delete_managed::<Course>(&state, &session, &id, params.confirm).await?))
}

async fn list_updates(
    State(state): State<AppState>,
    session: AdminSession,
) -> Result<Json<ListResponse<UpdateRow>>, AppError> {
    Ok(Json(list_managed::<Update>(&state, &session, None).await?))
}

async fn new_update(
    State(state): State<AppState>,
    session: AdminSession,
) -> Result<Json<EditorResponse<<Update as Editable>::Form>>, AppError> {
    Ok(Json(open_editor::<Update>(&state, &session, None).await?))
}

async fn edit_update(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<EditorResponse<<Update as Editable>::Form>>, AppError> {
    Ok(Json(open_editor::<Update>(&state, &session, Some(&id)).await?))
}

async fn create_update(
    State(state): State<AppState>,
    session: AdminSession,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = read_form(multipart).await?;
    submit_managed::<Update>(&state, &session, None, form).await
}

async fn update_update(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = read_form(multipart).await?;
    submit_managed::<Update>(&state, &session, Some(&id), form).await
}

async fn delete_update(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<ListResponse<UpdateRow>>, AppError> {
    Ok(Json(delete_managed::<Update>(&state, &session, &id, params.confirm).await?))
}

async fn list_applications(
    State(state): State<AppState>,
    session: AdminSession,
) -> Result<Json<ListResponse<ApplicationRow>>, AppError> {
    let applications = state.admin(&session.access_token).list_applications().await?;
    Ok(Json(ListResponse {
        notice: None,
        list: listing::application_list(&applications),
    }))
}

async fn set_application_status(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<String>,
    JsonBody(change): JsonBody<StatusChange>,
) -> Result<Json<ListResponse<ApplicationRow>>, AppError> {
    let status: ApplicationStatus = change.status.parse()?;
    let repo = state.admin(&session.access_token);
    repo.set_application_status(&id, status).await?;

    let applications = repo.list_applications().await?;
    Ok(Json(ListResponse {
        notice: Some(Notice::success(status_notice(status))),
        list: listing::application_list(&applications),
    }))
}

async fn export_applications(
    State(state): State<AppState>,
    session: AdminSession,
) -> Result<Response, AppError> {
    let repo = state.admin(&session.access_token);
    let Some(export) = export::export_applications(&repo, Utc::now()).await? else {
        return Ok(Json(NoticeResponse {
            notice: Notice::success(NOTHING_TO_EXPORT),
        })
        .into_response());
    };

    info!("{} downloaded {}", session.user.email, export.filename);
    let disposition = format!("attachment; filename=\"{}\"", export.filename);
    Ok((
        [
            (CONTENT_TYPE, EXPORT_CONTENT_TYPE.to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        export.bytes,
    )
        .into_response())
}
