pub mod admin;
pub mod auth;
pub mod public;

use axum::extract::{DefaultBodyLimit, FromRequest, Request, State};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::backend::{Query, Table};
use crate::error::AppError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/health", get(health))
        .merge(public::router())
        .merge(auth::router())
        .merge(admin::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// `Json` whose rejections answer with the same error body as every other
/// failure.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// The backend answers a public one-row read.
async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    let one_row = Query::from(Table::Courses).select(&["id"]).limit(1);
    state.backend.select(&one_row, None).await?;
    Ok(StatusCode::OK)
}
