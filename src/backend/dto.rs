use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{Session, User};

/// Error body shapes returned by the REST, auth and storage APIs.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error)
    }
}

#[derive(Debug, Serialize)]
pub struct PasswordGrantRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SignUpRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub data: SignUpMetadata<'a>,
}

#[derive(Debug, Serialize)]
pub struct SignUpMetadata<'a> {
    pub full_name: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct UserDto {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

impl From<UserDto> for User {
    fn from(dto: UserDto) -> Self {
        let full_name = dto
            .user_metadata
            .get("full_name")
            .and_then(Value::as_str)
            .map(str::to_string);
        User {
            id: dto.id,
            email: dto.email.unwrap_or_default(),
            full_name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionDto {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: i64,
    pub user: UserDto,
}

impl From<SessionDto> for Session {
    fn from(dto: SessionDto) -> Self {
        Session {
            access_token: dto.access_token,
            expires_in: dto.expires_in,
            user: dto.user.into(),
        }
    }
}

/// Sign-up answers with a session when e-mail confirmation is off and with
/// the bare user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(SessionDto),
    User(UserDto),
}

impl SignUpResponse {
    pub fn into_user(self) -> User {
        match self {
            SignUpResponse::Session(session) => session.user.into(),
            SignUpResponse::User(user) => user.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_message_field() {
        let body: ApiErrorBody =
            serde_json::from_str(r#"{"code":"23505","message":"duplicate key","details":null}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("duplicate key"));

        let auth: ApiErrorBody =
            serde_json::from_str(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#)
                .unwrap();
        assert_eq!(auth.into_message().as_deref(), Some("Invalid login credentials"));
    }

    #[test]
    fn sign_up_without_confirmation_returns_user() {
        let body = r#"{"id":"u-1","email":"a@b.c","user_metadata":{"full_name":"Admin One"}}"#;
        let user = serde_json::from_str::<SignUpResponse>(body).unwrap().into_user();
        assert_eq!(user.full_name.as_deref(), Some("Admin One"));
    }

    #[test]
    fn sign_in_session_maps_user() {
        let body = r#"{
            "access_token":"tok","token_type":"bearer","expires_in":3600,"refresh_token":"r",
            "user":{"id":"u-1","email":"a@b.c","user_metadata":{}}
        }"#;
        let session: Session = serde_json::from_str::<SessionDto>(body).unwrap().into();
        assert_eq!(session.access_token, "tok");
        assert_eq!(session.user.email, "a@b.c");
        assert_eq!(session.user.full_name, None);
    }
}
