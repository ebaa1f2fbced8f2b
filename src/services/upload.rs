use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::{BackendClient, UploadObject, UploadOptions};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageCategory {
    Course,
    Update,
}

impl ImageCategory {
    pub fn bucket(&self) -> &'static str {
        match self {
            ImageCategory::Course => "course-images",
            ImageCategory::Update => "update-images",
        }
    }
}

/// An image picked in an editor form, not yet uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        }
    }

    pub fn extension(&self) -> Option<&str> {
        let (stem, ext) = self.file_name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            None
        } else {
            Some(ext)
        }
    }

    pub fn content_type(&self) -> &str {
        if let Some(content_type) = self.content_type.as_deref().filter(|c| !c.is_empty()) {
            return content_type;
        }
        match self.extension().map(str::to_ascii_lowercase).as_deref() {
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            Some("svg") => "image/svg+xml",
            _ => "application/octet-stream",
        }
    }
}

/// `<unix-millis>_<random>.<ext>`; the extension is dropped when the
/// original name has none.
pub fn generate_file_name(file: &ImageFile, unix_millis: i64) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    let suffix = &suffix[..8];
    match file.extension() {
        Some(ext) => format!("{}_{}.{}", unix_millis, suffix, ext),
        None => format!("{}_{}", unix_millis, suffix),
    }
}

/// Uploads without overwriting and returns the public URL of the object.
pub async fn upload_image(
    backend: &dyn BackendClient,
    file: &ImageFile,
    category: ImageCategory,
    access_token: Option<&str>,
) -> Result<String, AppError> {
    let bucket = category.bucket();
    let path = generate_file_name(file, Utc::now().timestamp_millis());
    debug!("uploading {} ({} bytes) to {}", path, file.bytes.len(), bucket);

    let object = UploadObject {
        bucket,
        path: &path,
        content_type: file.content_type(),
        bytes: file.bytes.clone(),
    };
    backend
        .upload(object, UploadOptions::default(), access_token)
        .await
        .map_err(AppError::Upload)?;

    let url = backend.public_url(bucket, &path);
    info!("uploaded image {}", url);
    Ok(url)
}
