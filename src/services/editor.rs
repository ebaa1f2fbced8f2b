//! Add/edit form handling for courses and updates.
//!
//! An [`EditorSession`] is built per request: opened empty for create or
//! pre-filled for edit, filled from the submitted form, then submitted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::models::{Course, CourseForm, Update, UpdateForm};
use crate::repository::{Entity, Repository};
use crate::services::listing::{Notice, saved_notice};
use crate::services::upload::{ImageCategory, ImageFile, upload_image};

/// A record type managed through an add/edit form with an image.
pub trait Editable: Entity + Clone {
    type Form: Default + Clone + Serialize;

    const CATEGORY: ImageCategory;

    fn form_of(&self) -> Self::Form;

    fn image_url(&self) -> &str;

    fn set_field(form: &mut Self::Form, name: &str, value: String) -> bool;

    fn check(form: &Self::Form) -> Result<(), AppError>;

    fn payload(
        form: Self::Form,
        image_url: String,
        now: DateTime<Utc>,
    ) -> Result<Self::Payload, AppError>;
}

impl Editable for Course {
    type Form = CourseForm;

    const CATEGORY: ImageCategory = ImageCategory::Course;

    fn form_of(&self) -> CourseForm {
        CourseForm::from_course(self)
    }

    fn image_url(&self) -> &str {
        &self.image_url
    }

    fn set_field(form: &mut CourseForm, name: &str, value: String) -> bool {
        form.set_field(name, value)
    }

    fn check(form: &CourseForm) -> Result<(), AppError> {
        form.validate().map(|_| ())
    }

    fn payload(form: CourseForm, image_url: String, _now: DateTime<Utc>) -> Result<Self::Payload, AppError> {
        form.into_payload(image_url)
    }
}

impl Editable for Update {
    type Form = UpdateForm;

    const CATEGORY: ImageCategory = ImageCategory::Update;

    fn form_of(&self) -> UpdateForm {
        UpdateForm::from_update(self)
    }

    fn image_url(&self) -> &str {
        &self.image_url
    }

    fn set_field(form: &mut UpdateForm, name: &str, value: String) -> bool {
        form.set_field(name, value)
    }

    fn check(form: &UpdateForm) -> Result<(), AppError> {
        form.validate().map(|_| ())
    }

    fn payload(form: UpdateForm, image_url: String, now: DateTime<Utc>) -> Result<Self::Payload, AppError> {
        form.into_payload(image_url, now)
    }
}

#[derive(Debug, Clone)]
pub struct EditorSession<E: Editable> {
    editing: Option<E>,
    form: E::Form,
    image: Option<ImageFile>,
}

/// What the modal shows: its heading, the current values and the image state.
#[derive(Debug, Clone, Serialize)]
pub struct EditorView<F> {
    pub heading: String,
    pub id: Option<String>,
    pub form: F,
    pub image_required: bool,
    pub current_image_url: Option<String>,
    pub pending_image: Option<String>,
}

pub enum SubmitOutcome<E: Editable> {
    Saved { notice: Notice, saved: E },
    Rejected { error: AppError, editor: EditorSession<E> },
}

impl<E: Editable> EditorSession<E> {
    pub fn open_create() -> Self {
        Self {
            editing: None,
            form: E::Form::default(),
            image: None,
        }
    }

    pub fn open_edit(entity: E) -> Self {
        Self {
            form: entity.form_of(),
            editing: Some(entity),
            image: None,
        }
    }

    pub fn editing(&self) -> Option<&E> {
        self.editing.as_ref()
    }

    pub fn form(&self) -> &E::Form {
        &self.form
    }

    /// A new record needs an image; an edit may keep the current one.
    pub fn image_required(&self) -> bool {
        self.editing.is_none()
    }

    /// Returns false for a field the form does not have.
    pub fn fill(&mut self, name: &str, value: impl Into<String>) -> bool {
        E::set_field(&mut self.form, name, value.into())
    }

    pub fn attach_image(&mut self, image: ImageFile) {
        self.image = Some(image);
    }

    pub fn view(&self) -> EditorView<E::Form> {
        let heading = match self.editing {
            Some(_) => format!("Edit {}", E::LABEL),
            None => format!("Add New {}", E::LABEL),
        };
        EditorView {
            heading,
            id: self.editing.as_ref().map(|e| e.id().to_string()),
            form: self.form.clone(),
            image_required: self.image_required(),
            current_image_url: self.editing.as_ref().map(|e| e.image_url().to_string()),
            pending_image: self.image.as_ref().map(|i| i.file_name.clone()),
        }
    }

    /// Validates, uploads a newly picked image and saves. On failure the
    /// session comes back unchanged so the form can be shown again.
    pub async fn submit(self, repo: &Repository, now: DateTime<Utc>) -> SubmitOutcome<E> {
        let result = self.save(repo, now).await;
        match result {
            Ok((saved, created)) => SubmitOutcome::Saved {
                notice: Notice::success(saved_notice(E::LABEL, created)),
                saved,
            },
            Err(error) => {
                warn!("{} editor submit failed: {}", E::TABLE.as_str(), error);
                SubmitOutcome::Rejected { error, editor: self }
            }
        }
    }

    async fn save(&self, repo: &Repository, now: DateTime<Utc>) -> Result<(E, bool), AppError> {
        E::check(&self.form)?;

        let image_url = match &self.image {
            Some(image) => upload_image(repo.backend(), image, E::CATEGORY, repo.access_token()).await?,
            None => self
                .editing
                .as_ref()
                .map(|e| e.image_url().to_string())
                .filter(|url| !url.is_empty())
                .ok_or_else(|| AppError::Validation("Image is required".to_string()))?,
        };

        let payload = E::payload(self.form.clone(), image_url, now)?;
        let id = self.editing.as_ref().map(|e| e.id());
        debug!("saving {} (existing: {:?})", E::TABLE.as_str(), id);
        let saved = repo.save::<E>(&payload, id).await?;
        Ok((saved, id.is_none()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::BackendClient;
    use crate::db::SqliteBackend;

    async fn admin_repo() -> (Repository, tempfile::TempDir) {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let backend = SqliteBackend::connect("sqlite::memory:", dir.path(), "http://localhost:3000")
            .await
            .expect("Failed to create test db")
            .with_password_cost(4); // bcrypt minimum cost (bcrypt::MIN_COST is private)
        backend.sign_up("admin@example.com", "secret123", "Admin").await.unwrap();
        let session = backend.sign_in("admin@example.com", "secret123").await.unwrap();
        let backend: Arc<dyn BackendClient> = Arc::new(backend);
        (Repository::authenticated(backend, session.access_token), dir)
    }

    fn fill_course(editor: &mut EditorSession<Course>, amount: &str) {
        editor.fill("title", "Diploma in ICT");
        editor.fill("description", "Hands-on programme");
        editor.fill("duration", "6 months");
        editor.fill("amount", amount);
        editor.fill("syllabus", "Module 1");
    }

    fn png() -> ImageFile {
        ImageFile::new("banner.png", Some("image/png".to_string()), vec![1, 2, 3])
    }

    #[tokio::test]
    async fn test_create_without_image_is_rejected() {
        let (repo, _dir) = admin_repo().await;
        let mut editor = EditorSession::<Course>::open_create();
        fill_course(&mut editor, "45000");
        assert!(editor.image_required());

        match editor.submit(&repo, Utc::now()).await {
            SubmitOutcome::Rejected { error, editor } => {
                assert_eq!(error.notice(), "Image is required");
                assert_eq!(editor.form().title, "Diploma in ICT");
            }
            SubmitOutcome::Saved { .. } => panic!("course saved without an image"),
        }
        assert!(repo.list_courses().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_uploads_image_and_saves() {
        let (repo, dir) = admin_repo().await;
        let mut editor = EditorSession::<Course>::open_create();
        fill_course(&mut editor, "45000");
        editor.attach_image(png());

        let saved = match editor.submit(&repo, Utc::now()).await {
            SubmitOutcome::Saved { notice, saved } => {
                assert_eq!(notice.message, "Course added successfully!");
                saved
            }
            SubmitOutcome::Rejected { error, .. } => panic!("submit failed: {}", error),
        };
        assert!(saved.image_url.starts_with("http://localhost:3000/storage/course-images/"));
        let file_name = saved.image_url.rsplit('/').next().unwrap();
        assert!(dir.path().join("course-images").join(file_name).exists());
    }

    #[tokio::test]
    async fn test_edit_without_new_image_keeps_current_one() {
        let (repo, _dir) = admin_repo().await;
        let mut editor = EditorSession::<Course>::open_create();
        fill_course(&mut editor, "45000");
        editor.attach_image(png());
        let SubmitOutcome::Saved { saved: original, .. } = editor.submit(&repo, Utc::now()).await else {
            panic!("create failed");
        };

        let mut editor = EditorSession::open_edit(original.clone());
        assert!(!editor.image_required());
        assert_eq!(editor.form().amount, "45000");
        editor.fill("amount", "50000");

        let SubmitOutcome::Saved { notice, saved } = editor.submit(&repo, Utc::now()).await else {
            panic!("edit failed");
        };
        assert_eq!(notice.message, "Course updated successfully!");
        assert_eq!(saved.id, original.id);
        assert_eq!(saved.image_url, original.image_url);
        assert_eq!(saved.amount, 50000.0);
    }

    #[tokio::test]
    async fn test_invalid_amount_keeps_editor_open() {
        let (repo, _dir) = admin_repo().await;
        let mut editor = EditorSession::<Course>::open_create();
        fill_course(&mut editor, "lots");
        editor.attach_image(png());

        let SubmitOutcome::Rejected { error, editor } = editor.submit(&repo, Utc::now()).await else {
            panic!("invalid amount accepted");
        };
        assert!(matches!(error, AppError::Validation(_)));
        assert_eq!(editor.view().pending_image.as_deref(), Some("banner.png"));
    }

    #[tokio::test]
    async fn test_upload_failure_surfaces_backend_message() {
        let (repo, _dir) = admin_repo().await;
        let visitor = Repository::anonymous(repo.shared_backend());
        let mut editor = EditorSession::<Update>::open_create();
        editor.fill("title", "Intake open");
        editor.fill("description", "May intake");
        editor.attach_image(png());

        let SubmitOutcome::Rejected { error, .. } = editor.submit(&visitor, Utc::now()).await else {
            panic!("anonymous upload accepted");
        };
        assert!(matches!(error, AppError::Upload(_)));
        assert!(error.notice().starts_with("Failed to upload image: "));
    }

    #[test]
    fn view_headings() {
        let create = EditorSession::<Update>::open_create().view();
        assert_eq!(create.heading, "Add New Update");
        assert!(create.image_required);
        assert!(create.current_image_url.is_none());
        assert!(!EditorSession::<Update>::open_create().fill("amount", "1"));
    }
}
