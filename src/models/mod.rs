pub mod account;
pub mod application;
pub mod course;
pub mod timestamp;
pub mod update;

pub use account::{LoginRequest, Session, SignupRequest, User};
pub use application::{Application, ApplicationStatus, NewApplication, NewApplicationRequest};
pub use course::{Course, CourseForm, CoursePayload};
pub use update::{Update, UpdateForm, UpdatePayload};

/// Names of the form fields that were left blank.
pub(crate) fn blank_fields<'a>(fields: &[(&'a str, &str)]) -> Vec<&'a str> {
    fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect()
}

pub(crate) fn require_filled(fields: &[(&str, &str)]) -> Result<(), crate::error::AppError> {
    let missing = blank_fields(fields);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(crate::error::AppError::Validation(format!(
            "Please fill in all required fields: {}",
            missing.join(", ")
        )))
    }
}
