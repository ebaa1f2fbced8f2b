//! Admin list view-models: one row per record plus the actions the console
//! offers on it.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::models::{Application, ApplicationStatus, Course, Update};

pub const EMPTY_COURSES: &str = "No courses yet. Click \"Add New Course\" to create one.";
pub const EMPTY_UPDATES: &str = "No updates yet. Click \"Add New Update\" to create one.";
pub const EMPTY_APPLICATIONS: &str = "No applications yet.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Error,
}

/// Transient toast shown after an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

impl From<&AppError> for Notice {
    fn from(err: &AppError) -> Self {
        Notice::error(err.notice())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ListView<R> {
    Empty { message: String },
    Rows { rows: Vec<R> },
}

impl<R> ListView<R> {
    pub(crate) fn build<T>(items: &[T], empty: &str, row: impl Fn(&T) -> R) -> Self {
        if items.is_empty() {
            ListView::Empty {
                message: empty.to_string(),
            }
        } else {
            ListView::Rows {
                rows: items.iter().map(row).collect(),
            }
        }
    }

    pub fn rows(&self) -> &[R] {
        match self {
            ListView::Empty { .. } => &[],
            ListView::Rows { rows } => rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowAction {
    Edit {
        href: String,
    },
    Delete {
        endpoint: String,
        confirm: String,
    },
    SetStatus {
        label: &'static str,
        status: ApplicationStatus,
        endpoint: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseRow {
    pub id: String,
    pub title: String,
    pub duration: String,
    pub amount: String,
    pub image_url: String,
    pub actions: Vec<RowAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: String,
    pub image_url: String,
    pub actions: Vec<RowAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusBadge {
    pub label: &'static str,
    pub class: String,
}

impl From<ApplicationStatus> for StatusBadge {
    fn from(status: ApplicationStatus) -> Self {
        Self {
            label: status.as_str(),
            class: format!("status-{}", status.as_str().to_lowercase()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationRow {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub whatsapp: String,
    pub course: String,
    pub applied_date: String,
    pub status: StatusBadge,
    pub actions: Vec<RowAction>,
}

fn manage_actions(collection: &str, id: &str, title: &str) -> Vec<RowAction> {
    vec![
        RowAction::Edit {
            href: format!("/admin/{}/{}/edit", collection, id),
        },
        RowAction::Delete {
            endpoint: format!("/admin/{}/{}", collection, id),
            confirm: delete_prompt(title),
        },
    ]
}

pub fn delete_prompt(title: &str) -> String {
    format!("Are you sure you want to delete \"{}\"?", title)
}

pub fn course_list(courses: &[Course]) -> ListView<CourseRow> {
    ListView::build(courses, EMPTY_COURSES, |course| CourseRow {
        id: course.id.clone(),
        title: course.title.clone(),
        duration: course.duration.clone(),
        amount: format_amount(course.amount),
        image_url: course.image_url.clone(),
        actions: manage_actions("courses", &course.id, &course.title),
    })
}

pub fn update_list(updates: &[Update]) -> ListView<UpdateRow> {
    ListView::build(updates, EMPTY_UPDATES, |update| UpdateRow {
        id: update.id.clone(),
        title: update.title.clone(),
        description: update.description.clone(),
        date: calendar_date(&update.date),
        image_url: update.image_url.clone(),
        actions: manage_actions("updates", &update.id, &update.title),
    })
}

pub fn application_list(applications: &[Application]) -> ListView<ApplicationRow> {
    ListView::build(applications, EMPTY_APPLICATIONS, |app| ApplicationRow {
        id: app.id.clone(),
        full_name: app.full_name.clone(),
        email: app.email.clone(),
        whatsapp: app.whatsapp.clone(),
        course: app.course.clone(),
        applied_date: calendar_date(&app.applied_date),
        status: app.status.into(),
        actions: status_actions(&app.id, app.status),
    })
}

/// Approve/Reject while pending, a single Reset once decided.
pub fn status_actions(id: &str, status: ApplicationStatus) -> Vec<RowAction> {
    status
        .offered_transitions()
        .iter()
        .map(|&next| RowAction::SetStatus {
            label: match next {
                ApplicationStatus::Approved => "Approve",
                ApplicationStatus::Rejected => "Reject",
                ApplicationStatus::Pending => "Reset",
            },
            status: next,
            endpoint: format!("/admin/applications/{}/status", id),
        })
        .collect()
}

pub fn status_notice(status: ApplicationStatus) -> String {
    format!("Application {}!", status.as_str().to_lowercase())
}

pub fn saved_notice(label: &str, created: bool) -> String {
    match (label, created) {
        (label, true) => format!("{} added successfully!", label),
        ("Update", false) => "Update modified successfully!".to_string(),
        (label, false) => format!("{} updated successfully!", label),
    }
}

pub fn deleted_notice(label: &str) -> String {
    format!("{} deleted successfully", label)
}

pub fn calendar_date(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// `LKR 45,000` / `LKR 1,250.5`: thousands grouped, at most three decimals.
pub fn format_amount(amount: f64) -> String {
    let negative = amount < 0.0;
    let rounded = format!("{:.3}", amount.abs());
    let (whole, fraction) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let mut grouped = String::new();
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if negative { "-" } else { "" };
    if fraction.is_empty() {
        format!("LKR {}{}", sign, grouped)
    } else {
        format!("LKR {}{}.{}", sign, grouped, fraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn application(status: ApplicationStatus) -> Application {
        Application {
            id: "a-1".to_string(),
            full_name: "Nimali Perera".to_string(),
            nic: "200012345678".to_string(),
            age: 20,
            gender: "Female".to_string(),
            email: "nimali@example.com".to_string(),
            whatsapp: "0771234567".to_string(),
            course: "Diploma in ICT".to_string(),
            additional_info: None,
            applied_date: Utc.with_ymd_and_hms(2025, 2, 14, 8, 0, 0).unwrap(),
            status,
        }
    }

    fn labels(actions: &[RowAction]) -> Vec<&'static str> {
        actions
            .iter()
            .filter_map(|action| match action {
                RowAction::SetStatus { label, .. } => Some(*label),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn empty_lists_show_placeholders() {
        assert_eq!(
            course_list(&[]),
            ListView::Empty {
                message: EMPTY_COURSES.to_string()
            }
        );
        assert!(update_list(&[]).rows().is_empty());
        assert_eq!(
            application_list(&[]),
            ListView::Empty {
                message: "No applications yet.".to_string()
            }
        );
    }

    #[test]
    fn course_rows_carry_edit_and_confirmed_delete() {
        let course = Course {
            id: "c-1".to_string(),
            title: "Diploma in ICT".to_string(),
            description: "d".to_string(),
            duration: "6 months".to_string(),
            amount: 45000.0,
            image_url: "img".to_string(),
            syllabus: "s".to_string(),
            created_at: None,
        };
        let view = course_list(&[course]);
        let row = &view.rows()[0];
        assert_eq!(row.amount, "LKR 45,000");
        assert_eq!(
            row.actions,
            vec![
                RowAction::Edit {
                    href: "/admin/courses/c-1/edit".to_string()
                },
                RowAction::Delete {
                    endpoint: "/admin/courses/c-1".to_string(),
                    confirm: "Are you sure you want to delete \"Diploma in ICT\"?".to_string(),
                },
            ]
        );
    }

    #[test]
    fn pending_offers_approve_and_reject() {
        let view = application_list(&[application(ApplicationStatus::Pending)]);
        let row = &view.rows()[0];
        assert_eq!(labels(&row.actions), vec!["Approve", "Reject"]);
        assert_eq!(row.status.class, "status-pending");
        assert_eq!(row.applied_date, "2025-02-14");
    }

    #[test]
    fn decided_applications_only_offer_reset() {
        for status in [ApplicationStatus::Approved, ApplicationStatus::Rejected] {
            let actions = status_actions("a-1", status);
            assert_eq!(labels(&actions), vec!["Reset"]);
            assert!(matches!(
                actions[0],
                RowAction::SetStatus {
                    status: ApplicationStatus::Pending,
                    ..
                }
            ));
        }
    }

    #[test]
    fn notices_match_console_wording() {
        assert_eq!(status_notice(ApplicationStatus::Approved), "Application approved!");
        assert_eq!(saved_notice("Course", true), "Course added successfully!");
        assert_eq!(saved_notice("Course", false), "Course updated successfully!");
        assert_eq!(saved_notice("Update", true), "Update added successfully!");
        assert_eq!(saved_notice("Update", false), "Update modified successfully!");
        assert_eq!(deleted_notice("Course"), "Course deleted successfully");
    }

    #[test]
    fn amounts_are_grouped() {
        assert_eq!(format_amount(0.0), "LKR 0");
        assert_eq!(format_amount(999.0), "LKR 999");
        assert_eq!(format_amount(1250.5), "LKR 1,250.5");
        assert_eq!(format_amount(1234567.0), "LKR 1,234,567");
        assert_eq!(format_amount(12.3456), "LKR 12.346");
    }
}
