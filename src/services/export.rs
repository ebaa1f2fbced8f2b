use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Format, FormatBorder, Workbook, XlsxError};
use tracing::info;

use crate::error::AppError;
use crate::models::Application;
use crate::repository::Repository;

pub const SHEET_NAME: &str = "Applications";
pub const NOTHING_TO_EXPORT: &str = "No applications to export";
pub const EXPORT_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const EXPORT_COLUMNS: [&str; 10] = [
    "Full Name",
    "NIC",
    "Age",
    "Gender",
    "Email",
    "WhatsApp",
    "Course",
    "Additional Info",
    "Applied Date",
    "Status",
];

/// A generated spreadsheet ready to be downloaded.
#[derive(Debug, Clone)]
pub struct Export {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub rows: usize,
}

pub fn export_filename(today: DateTime<Utc>) -> String {
    format!("NAAS_Applications_{}.xlsx", today.format("%Y-%m-%d"))
}

/// Cell values per application, in [`EXPORT_COLUMNS`] order.
pub fn application_rows(applications: &[Application]) -> Vec<[String; 10]> {
    applications
        .iter()
        .map(|app| {
            [
                app.full_name.clone(),
                app.nic.clone(),
                app.age.to_string(),
                app.gender.clone(),
                app.email.clone(),
                app.whatsapp.clone(),
                app.course.clone(),
                app.additional_info
                    .clone()
                    .filter(|info| !info.is_empty())
                    .unwrap_or_else(|| "N/A".to_string()),
                app.applied_date.format("%Y-%m-%d").to_string(),
                app.status.to_string(),
            ]
        })
        .collect()
}

pub fn build_workbook(applications: &[Application]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let header_format = Format::new().set_bold().set_border(FormatBorder::Thin);

    for (col, header) in EXPORT_COLUMNS.iter().enumerate() {
        worksheet.write_with_format(0, col as u16, *header, &header_format)?;
        worksheet.set_column_width(col as u16, 18.0)?;
    }
    worksheet.set_column_width(4, 28.0)?;
    worksheet.set_column_width(7, 30.0)?;

    for (row_idx, (app, cells)) in applications
        .iter()
        .zip(application_rows(applications))
        .enumerate()
    {
        let row = (row_idx + 1) as u32;
        for (col, cell) in cells.iter().enumerate() {
            if col == 2 {
                worksheet.write_number(row, 2, app.age)?;
            } else {
                worksheet.write_string(row, col as u16, cell)?;
            }
        }
    }

    workbook.save_to_buffer()
}

/// Snapshot of every application, newest first. `None` when there is nothing
/// to export.
pub async fn export_applications(
    repo: &Repository,
    today: DateTime<Utc>,
) -> Result<Option<Export>, AppError> {
    let applications = repo.list_applications().await?;
    if applications.is_empty() {
        info!("export skipped: no applications");
        return Ok(None);
    }

    let bytes = build_workbook(&applications)?;
    let export = Export {
        filename: export_filename(today),
        bytes,
        rows: applications.len(),
    };
    info!("exported {} applications to {}", export.rows, export.filename);
    Ok(Some(export))
}
