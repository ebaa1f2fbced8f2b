//! Public pages: home, course listing and detail, updates feed and the
//! course pickers of the application and payment forms.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::error::AppError;
use crate::models::{Course, NewApplicationRequest, Update};
use crate::repository::Repository;
use crate::services::listing::{ListView, format_amount};

pub const HOME_COURSES: usize = 3;
pub const HOME_UPDATES: usize = 10;
pub const PREVIEW_CHARS: usize = 100;
pub const GENERAL_INQUIRY: &str = "General Inquiry";

const HOME_NO_COURSES: &str = "No courses available yet.";
const HOME_NO_UPDATES: &str = "No updates available yet.";
const NO_COURSES: &str = "No courses available at the moment. Please check back later.";
const NO_UPDATES: &str = "No updates available at the moment.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseCard {
    pub id: String,
    pub title: String,
    pub description: String,
    pub duration: String,
    pub amount: String,
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateCard {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub date: String,
}

/// A home page block either lists its items or tells why it cannot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Section<R> {
    Loaded(ListView<R>),
    Unavailable { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomePage {
    pub courses: Section<CourseCard>,
    pub updates: Section<UpdateCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseDetail {
    pub id: String,
    pub title: String,
    pub description: String,
    pub syllabus: String,
    pub duration: String,
    pub amount: String,
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationReceipt {
    pub message: String,
}

/// First 100 characters followed by "..." when the text is longer.
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// "March 9, 2025"
pub fn long_date(date: &DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}

fn course_card(course: &Course, truncate: bool) -> CourseCard {
    CourseCard {
        id: course.id.clone(),
        title: course.title.clone(),
        description: if truncate {
            preview(&course.description)
        } else {
            course.description.clone()
        },
        duration: course.duration.clone(),
        amount: format_amount(course.amount),
        image_url: course.image_url.clone(),
    }
}

fn update_card(update: &Update) -> UpdateCard {
    UpdateCard {
        id: update.id.clone(),
        title: update.title.clone(),
        description: update.description.clone(),
        image_url: update.image_url.clone(),
        date: long_date(&update.date),
    }
}

/// Both blocks load independently; a failed one does not hide the other.
pub async fn home_page(repo: &Repository) -> HomePage {
    let courses = match repo.popular_courses(HOME_COURSES).await {
        Ok(courses) => Section::Loaded(ListView::build(&courses, HOME_NO_COURSES, |c| course_card(c, true))),
        Err(e) => {
            error!("Error loading courses: {}", e);
            Section::Unavailable {
                error: "Error loading courses.".to_string(),
            }
        }
    };
    let updates = match repo.latest_updates(HOME_UPDATES).await {
        Ok(updates) => Section::Loaded(ListView::build(&updates, HOME_NO_UPDATES, update_card)),
        Err(e) => {
            error!("Error loading updates: {}", e);
            Section::Unavailable {
                error: "Error loading updates.".to_string(),
            }
        }
    };
    HomePage { courses, updates }
}

pub async fn courses_page(repo: &Repository) -> Result<ListView<CourseCard>, AppError> {
    let courses = repo.list_courses().await?;
    Ok(ListView::build(&courses, NO_COURSES, |c| course_card(c, false)))
}

pub async fn course_detail(repo: &Repository, id: &str) -> Result<CourseDetail, AppError> {
    let course = repo.get_course(id).await?;
    Ok(CourseDetail {
        amount: format_amount(course.amount),
        id: course.id,
        title: course.title,
        description: course.description,
        syllabus: course.syllabus,
        duration: course.duration,
        image_url: course.image_url,
    })
}

pub async fn updates_page(repo: &Repository) -> Result<ListView<UpdateCard>, AppError> {
    let updates = repo.updates_by_date().await?;
    Ok(ListView::build(&updates, NO_UPDATES, update_card))
}

/// Course titles A to Z, or a lone "General Inquiry" so the form stays usable.
pub async fn application_course_options(repo: &Repository) -> Vec<String> {
    match repo.course_titles().await {
        Ok(titles) if !titles.is_empty() => titles,
        Ok(_) => vec![GENERAL_INQUIRY.to_string()],
        Err(e) => {
            error!("Error loading courses: {}", e);
            vec![GENERAL_INQUIRY.to_string()]
        }
    }
}

/// Course titles for the payment form; empty when they cannot be loaded.
pub async fn payment_course_options(repo: &Repository) -> Vec<String> {
    repo.course_titles().await.unwrap_or_else(|e| {
        error!("Error loading courses: {}", e);
        Vec::new()
    })
}

pub async fn submit_application(
    repo: &Repository,
    request: NewApplicationRequest,
    now: DateTime<Utc>,
) -> Result<ApplicationReceipt, AppError> {
    let application = request.validate(now)?;
    repo.submit_application(&application).await?;
    info!("application submitted by {}", application.full_name);
    Ok(ApplicationReceipt {
        message: format!(
            "Thank you {} for applying to {}. We will contact you via WhatsApp ({}) within 24-48 hours.",
            application.full_name, application.course, application.whatsapp
        ),
    })
}
