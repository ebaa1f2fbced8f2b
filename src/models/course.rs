use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::require_filled;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    pub duration: String,
    pub amount: f64,
    pub image_url: String,
    pub syllabus: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Row written on insert or update. The id and timestamps stay server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoursePayload {
    pub title: String,
    pub description: String,
    pub duration: String,
    pub amount: f64,
    pub syllabus: String,
    pub image_url: String,
}

/// Raw values of the add/edit course form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseForm {
    pub title: String,
    pub description: String,
    pub duration: String,
    pub amount: String,
    pub syllabus: String,
}

impl CourseForm {
    pub fn from_course(course: &Course) -> Self {
        Self {
            title: course.title.clone(),
            description: course.description.clone(),
            duration: course.duration.clone(),
            amount: course.amount.to_string(),
            syllabus: course.syllabus.clone(),
        }
    }

    pub fn set_field(&mut self, name: &str, value: String) -> bool {
        match name {
            "title" => self.title = value,
            "description" => self.description = value,
            "duration" => self.duration = value,
            "amount" => self.amount = value,
            "syllabus" => self.syllabus = value,
            _ => return false,
        }
        true
    }

    pub fn validate(&self) -> Result<f64, AppError> {
        require_filled(&[
            ("title", &self.title),
            ("description", &self.description),
            ("duration", &self.duration),
            ("amount", &self.amount),
            ("syllabus", &self.syllabus),
        ])?;

        let amount: f64 = self
            .amount
            .trim()
            .parse()
            .map_err(|_| AppError::Validation("Amount must be a number".to_string()))?;
        if !amount.is_finite() || amount < 0.0 {
            return Err(AppError::Validation("Amount cannot be negative".to_string()));
        }
        Ok(amount)
    }

    pub fn into_payload(self, image_url: String) -> Result<CoursePayload, AppError> {
        let amount = self.validate()?;
        Ok(CoursePayload {
            title: self.title.trim().to_string(),
            description: self.description,
            duration: self.duration.trim().to_string(),
            amount,
            syllabus: self.syllabus,
            image_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_form() -> CourseForm {
        CourseForm {
            title: "Diploma in English".to_string(),
            description: "Spoken and written English".to_string(),
            duration: "6 months".to_string(),
            amount: "25000".to_string(),
            syllabus: "Grammar, writing, speaking".to_string(),
        }
    }

    #[test]
    fn payload_parses_amount() {
        let payload = filled_form()
            .into_payload("https://cdn.test/course-images/a.png".to_string())
            .expect("valid form");
        assert_eq!(payload.amount, 25000.0);
        assert_eq!(payload.image_url, "https://cdn.test/course-images/a.png");
    }

    #[test]
    fn blank_fields_are_named() {
        let mut form = filled_form();
        form.duration = "  ".to_string();
        form.syllabus.clear();
        let err = form.validate().unwrap_err();
        assert_eq!(
            err.notice(),
            "Please fill in all required fields: duration, syllabus"
        );
    }

    #[test]
    fn non_numeric_amount_is_rejected() {
        let mut form = filled_form();
        form.amount = "twenty".to_string();
        assert!(matches!(form.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn free_course_is_allowed_but_negative_is_not() {
        let mut form = filled_form();
        form.amount = "0".to_string();
        assert_eq!(form.validate().unwrap(), 0.0);

        form.amount = "-500".to_string();
        assert_eq!(form.validate().unwrap_err().notice(), "Amount cannot be negative");
    }
}
