use axum::extract::{FromRequestParts, State};
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use cookie::time::Duration;
use cookie::{Cookie, SameSite};
use serde::Serialize;
use tracing::{info, warn};

use crate::api::JsonBody;
use crate::error::{AppError, BackendError, LOGIN_PATH};
use crate::models::{LoginRequest, SignupRequest, User};
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "access_token";
pub const ADMIN_HOME: &str = "/admin";

/// A signed-in admin, resolved from the session cookie or a bearer token.
/// Requests without a valid session are sent to the login page.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub access_token: String,
    pub user: User,
}

pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| Cookie::split_parse(v))
        .filter_map(Result::ok)
        .find(|c| c.name() == SESSION_COOKIE && !c.value().is_empty())
        .map(|c| c.value().to_string())
}

async fn resolve(state: &AppState, headers: &HeaderMap) -> Result<Option<AdminSession>, AppError> {
    let Some(token) = session_token(headers) else {
        return Ok(None);
    };
    let user = state.backend.get_user(&token).await?;
    Ok(user.map(|user| AdminSession {
        access_token: token,
        user,
    }))
}

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match resolve(state, &parts.headers).await? {
            Some(session) => Ok(session),
            None => {
                warn!("unauthenticated request to {}", parts.uri.path());
                Err(AppError::Unauthorized)
            }
        }
    }
}

fn session_cookie(token: &str, max_age_secs: i64) -> Result<HeaderValue, AppError> {
    let cookie = Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(max_age_secs))
        .build();
    HeaderValue::from_str(&cookie.to_string()).map_err(|_| AppError::InternalServerError)
}

/// Credential problems reported by the auth service are shown as-is.
fn auth_rejection(err: BackendError) -> AppError {
    match err.status {
        Some(status) if (400..500).contains(&status) => AppError::Validation(err.message),
        _ => AppError::Backend(err),
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub redirect: &'static str,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginPage {
    pub heading: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(LOGIN_PATH, get(login_page).post(login))
        .route("/signup", post(signup))
        .route("/logout", post(logout))
        .route("/api/session", get(session_status))
}

/// Already signed-in admins go straight to the console.
async fn login_page(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    if resolve(&state, &headers).await?.is_some() {
        return Ok(Redirect::to(ADMIN_HOME).into_response());
    }
    Ok(Json(LoginPage {
        heading: "Admin Login",
    })
    .into_response())
}

async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Response, AppError> {
    req.validate()?;
    let session = state
        .backend
        .sign_in(req.email.trim(), &req.password)
        .await
        .map_err(auth_rejection)?;
    info!("admin {} signed in", session.user.email);

    let cookie = session_cookie(&session.access_token, session.expires_in)?;
    let body = Json(LoginResponse {
        redirect: ADMIN_HOME,
        user: session.user,
    });
    Ok(([(SET_COOKIE, cookie)], body).into_response())
}

async fn signup(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SignupRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    req.validate()?;
    let user = state
        .backend
        .sign_up(req.email.trim(), &req.password, req.full_name.trim())
        .await
        .map_err(auth_rejection)?;
    info!("account created for {}", user.email);

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Account created successfully! Please check your email to verify your account."
                .to_string(),
        }),
    ))
}

/// Ends the backend session if there is one and always clears the cookie.
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    if let Some(token) = session_token(&headers) {
        if let Err(e) = state.backend.sign_out(&token).await {
            warn!("sign out failed: {}", e);
        }
    }
    let cookie = session_cookie("", 0)?;
    Ok(([(SET_COOKIE, cookie)], Redirect::to("/")).into_response())
}

async fn session_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionStatus>, AppError> {
    let session = resolve(&state, &headers).await?;
    Ok(Json(SessionStatus {
        authenticated: session.is_some(),
        email: session.map(|s| s.user.email),
    }))
}
