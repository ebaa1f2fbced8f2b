#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use naas_campus::api::router;
use naas_campus::config::AppConfig;
use naas_campus::db::SqliteBackend;
use naas_campus::state::AppState;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const BASE_URL: &str = "http://127.0.0.1:3000";
pub const BOUNDARY: &str = "naas-test-boundary";

pub struct TestApp {
    pub app: Router,
    pub backend: Arc<SqliteBackend>,
    pub storage: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response is not json")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub async fn setup_test_app() -> TestApp {
    let storage = TempDir::new().expect("Failed to create temp dir");
    let backend = SqliteBackend::connect("sqlite::memory:", storage.path(), BASE_URL)
        .await
        .expect("Failed to create test db")
        .with_password_cost(4); // bcrypt minimum cost (bcrypt::MIN_COST is private)
    let backend = Arc::new(backend);
    let config = AppConfig::local("sqlite::memory:", storage.path());
    let state = AppState::with_local_backend(backend.clone(), config);

    TestApp {
        app: router(state),
        backend,
        storage,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router failed");
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body")
            .to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request(Method::GET, uri, token).body(Body::empty()).unwrap())
            .await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request(Method::DELETE, uri, token).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(
            request(Method::POST, uri, token)
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_form(
        &self,
        uri: &str,
        token: Option<&str>,
        fields: &[(&str, &str)],
        image: Option<(&str, &[u8])>,
    ) -> TestResponse {
        self.send(
            request(Method::POST, uri, token)
                .header(CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
                .body(Body::from(multipart_body(fields, image)))
                .unwrap(),
        )
        .await
    }

    /// Creates an admin account, signs in and returns the session token.
    pub async fn admin_token(&self) -> String {
        let signup = self
            .post_json(
                "/signup",
                None,
                serde_json::json!({
                    "full_name": "Campus Admin",
                    "email": "admin@naas.lk",
                    "password": "secret123",
                    "confirm_password": "secret123",
                }),
            )
            .await;
        assert_eq!(signup.status, StatusCode::CREATED);

        let login = self
            .post_json(
                "/login",
                None,
                serde_json::json!({ "email": "admin@naas.lk", "password": "secret123" }),
            )
            .await;
        assert_eq!(login.status, StatusCode::OK);
        session_cookie(&login).expect("login did not set a session cookie")
    }
}

fn request(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header(COOKIE, format!("access_token={}", token)),
        None => builder,
    }
}

pub fn session_cookie(response: &TestResponse) -> Option<String> {
    let cookie = response.header(SET_COOKIE.as_str())?;
    let pair = cookie.split(';').next()?;
    pair.strip_prefix("access_token=").map(str::to_string)
}

pub fn multipart_body(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn course_fields<'a>(title: &'a str, amount: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("title", title),
        ("description", "A practical programme covering the essentials."),
        ("duration", "6 months"),
        ("amount", amount),
        ("syllabus", "Module 1: Basics\nModule 2: Practice"),
    ]
}

pub fn application_json(name: &str, nic: &str) -> Value {
    serde_json::json!({
        "full_name": name,
        "nic": nic,
        "age": 21,
        "gender": "Female",
        "email": "student@example.com",
        "whatsapp": "0771234567",
        "course": "Diploma in ICT",
        "additional_info": "",
    })
}
