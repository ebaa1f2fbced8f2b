use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::require_filled;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    /// Seconds until the access token expires.
    pub expires_in: i64,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require_filled(&[("email", &self.email), ("password", &self.password)])
    }
}

impl SignupRequest {
    /// Runs before any backend call; a rejected signup never reaches the
    /// auth service.
    pub fn validate(&self) -> Result<(), AppError> {
        require_filled(&[("full_name", &self.full_name), ("email", &self.email)])?;
        if self.password != self.confirm_password {
            return Err(AppError::Validation("Passwords do not match".to_string()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }
}
