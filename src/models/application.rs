use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::require_filled;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 3] = [
        ApplicationStatus::Pending,
        ApplicationStatus::Approved,
        ApplicationStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pending",
            ApplicationStatus::Approved => "Approved",
            ApplicationStatus::Rejected => "Rejected",
        }
    }

    /// Transitions offered by the review console. A decided application can
    /// only go back to Pending, never straight to the opposite decision.
    pub fn offered_transitions(&self) -> &'static [ApplicationStatus] {
        match self {
            ApplicationStatus::Pending => &[ApplicationStatus::Approved, ApplicationStatus::Rejected],
            ApplicationStatus::Approved | ApplicationStatus::Rejected => &[ApplicationStatus::Pending],
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ApplicationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::Validation(format!("Unknown application status: {}", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub full_name: String,
    pub nic: String,
    pub age: i32,
    pub gender: String,
    pub email: String,
    pub whatsapp: String,
    /// Course title copied at submission time.
    pub course: String,
    pub additional_info: Option<String>,
    #[serde(with = "crate::models::timestamp")]
    pub applied_date: DateTime<Utc>,
    #[serde(default)]
    pub status: ApplicationStatus,
}

/// Body of the public application form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewApplicationRequest {
    pub full_name: String,
    pub nic: String,
    pub age: i32,
    pub gender: String,
    pub email: String,
    pub whatsapp: String,
    pub course: String,
    #[serde(default)]
    pub additional_info: Option<String>,
}

/// Validated row inserted into the applications table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewApplication {
    pub full_name: String,
    pub nic: String,
    pub age: i32,
    pub gender: String,
    pub email: String,
    pub whatsapp: String,
    pub course: String,
    pub additional_info: Option<String>,
    pub status: ApplicationStatus,
    #[serde(with = "crate::models::timestamp")]
    pub applied_date: DateTime<Utc>,
}

/// Sri Lankan NIC: nine digits plus v/V/x/X (old format) or twelve digits.
pub fn is_valid_nic(nic: &str) -> bool {
    let bytes = nic.as_bytes();
    match bytes.len() {
        10 => {
            bytes[..9].iter().all(u8::is_ascii_digit)
                && matches!(bytes[9], b'v' | b'V' | b'x' | b'X')
        }
        12 => bytes.iter().all(u8::is_ascii_digit),
        _ => false,
    }
}

impl NewApplicationRequest {
    pub fn validate(self, now: DateTime<Utc>) -> Result<NewApplication, AppError> {
        require_filled(&[
            ("full_name", &self.full_name),
            ("nic", &self.nic),
            ("gender", &self.gender),
            ("email", &self.email),
            ("whatsapp", &self.whatsapp),
            ("course", &self.course),
        ])?;

        let nic = self.nic.trim().to_string();
        if !is_valid_nic(&nic) {
            return Err(AppError::Validation(
                "Please enter a valid NIC number".to_string(),
            ));
        }
        if self.age <= 0 {
            return Err(AppError::Validation("Please enter a valid age".to_string()));
        }

        let additional_info = self
            .additional_info
            .map(|info| info.trim().to_string())
            .filter(|info| !info.is_empty());

        Ok(NewApplication {
            full_name: self.full_name.trim().to_string(),
            nic,
            age: self.age,
            gender: self.gender,
            email: self.email.trim().to_string(),
            whatsapp: self.whatsapp.trim().to_string(),
            course: self.course,
            additional_info,
            status: ApplicationStatus::Pending,
            applied_date: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(nic: &str) -> NewApplicationRequest {
        NewApplicationRequest {
            full_name: "Nimal Perera".to_string(),
            nic: nic.to_string(),
            age: 21,
            gender: "Male".to_string(),
            email: "nimal@example.com".to_string(),
            whatsapp: "0771234567".to_string(),
            course: "Diploma in English".to_string(),
            additional_info: Some("   ".to_string()),
        }
    }

    #[test]
    fn nic_formats() {
        assert!(!is_valid_nic("123456789"));
        assert!(is_valid_nic("123456789V"));
        assert!(is_valid_nic("123456789v"));
        assert!(is_valid_nic("123456789x"));
        assert!(is_valid_nic("123456789X"));
        assert!(is_valid_nic("200012345678"));
        assert!(!is_valid_nic("12345678V"));
        assert!(!is_valid_nic("123456789A"));
        assert!(!is_valid_nic("2000123456789"));
        assert!(!is_valid_nic("20001234567X"));
        assert!(!is_valid_nic(""));
        assert!(!is_valid_nic("١٢٣٤٥٦٧٨٩V"));
    }

    #[test]
    fn new_application_defaults_to_pending() {
        let app = request("200012345678").validate(Utc::now()).unwrap();
        assert_eq!(app.status, ApplicationStatus::Pending);
        assert_eq!(app.additional_info, None);
    }

    #[test]
    fn malformed_nic_is_rejected() {
        let err = request("123456789").validate(Utc::now()).unwrap_err();
        assert_eq!(err.notice(), "Please enter a valid NIC number");
    }

    #[test]
    fn review_console_never_jumps_between_decisions() {
        use ApplicationStatus::*;
        assert_eq!(Pending.offered_transitions(), &[Approved, Rejected]);
        assert_eq!(Approved.offered_transitions(), &[Pending]);
        assert_eq!(Rejected.offered_transitions(), &[Pending]);
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("approved".parse::<ApplicationStatus>().unwrap(), ApplicationStatus::Approved);
        assert!("archived".parse::<ApplicationStatus>().is_err());
    }
}
