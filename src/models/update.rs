use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::require_filled;

/// News item shown on the updates page and the home page ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    #[serde(with = "crate::models::timestamp")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePayload {
    pub title: String,
    pub description: String,
    pub image_url: String,
    #[serde(with = "crate::models::timestamp")]
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateForm {
    pub title: String,
    pub description: String,
    /// Optional display date (`YYYY-MM-DD`); submission time when blank.
    pub date: String,
}

impl UpdateForm {
    pub fn from_update(update: &Update) -> Self {
        Self {
            title: update.title.clone(),
            description: update.description.clone(),
            date: String::new(),
        }
    }

    pub fn set_field(&mut self, name: &str, value: String) -> bool {
        match name {
            "title" => self.title = value,
            "description" => self.description = value,
            "date" => self.date = value,
            _ => return false,
        }
        true
    }

    pub fn validate(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        require_filled(&[("title", &self.title), ("description", &self.description)])?;

        let date = self.date.trim();
        if date.is_empty() {
            return Ok(None);
        }
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| AppError::Validation("Date must be YYYY-MM-DD".to_string()))?;
        Ok(day.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()))
    }

    pub fn into_payload(self, image_url: String, now: DateTime<Utc>) -> Result<UpdatePayload, AppError> {
        let date = self.validate()?.unwrap_or(now);
        Ok(UpdatePayload {
            title: self.title.trim().to_string(),
            description: self.description,
            image_url,
            date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn date_defaults_to_submission_time() {
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 14, 30, 0).unwrap();
        let form = UpdateForm {
            title: "Intake open".to_string(),
            description: "May intake".to_string(),
            date: String::new(),
        };
        let payload = form.into_payload("u".to_string(), now).unwrap();
        assert_eq!(payload.date, now);
    }

    #[test]
    fn explicit_date_is_used() {
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 14, 30, 0).unwrap();
        let form = UpdateForm {
            title: "Results".to_string(),
            description: "Exam results released".to_string(),
            date: "2025-02-01".to_string(),
        };
        let payload = form.into_payload("u".to_string(), now).unwrap();
        assert_eq!(payload.date, Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn bad_date_is_a_validation_error() {
        let form = UpdateForm {
            title: "Results".to_string(),
            description: "x".to_string(),
            date: "01/02/2025".to_string(),
        };
        assert!(matches!(form.validate(), Err(AppError::Validation(_))));
    }
}
