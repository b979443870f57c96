//! Axum route handlers for the Screening API.

use axum::{
    extract::{Multipart, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::screening::workflow::{ResumeDocument, ScreeningResult};
use crate::state::AppState;

const JOB_DESCRIPTION_FIELD: &str = "job_description";
const RESUMES_FIELD: &str = "resumes";
const PDF_CONTENT_TYPE: &str = "application/pdf";

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ScreeningReport {
    pub screening_id: Uuid,
    pub screened_at: DateTime<Utc>,
    pub succeeded: usize,
    pub failed: usize,
    /// One entry per uploaded resume, in upload order.
    pub results: Vec<ScreeningResult>,
}

impl ScreeningReport {
    fn new(screening_id: Uuid, results: Vec<ScreeningResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        Self {
            screening_id,
            screened_at: Utc::now(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/screenings
///
/// Multipart form: one `job_description` text field and one or more
/// `resumes` PDF files. Unreadable PDFs and model failures are reported per
/// candidate inside a 200 response; only a malformed request is rejected.
pub async fn handle_screen(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ScreeningReport>, AppError> {
    let mut job_description: Option<String> = None;
    let mut documents: Vec<ResumeDocument> = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().map(str::to_owned);
        match field_name.as_deref() {
            Some(JOB_DESCRIPTION_FIELD) => {
                job_description = Some(field.text().await?);
            }
            Some(RESUMES_FIELD) => {
                let file_name = field
                    .file_name()
                    .map(str::to_owned)
                    .unwrap_or_else(|| format!("resume-{}.pdf", documents.len() + 1));
                let content_type = field.content_type().map(str::to_owned);
                if !is_pdf_upload(content_type.as_deref(), &file_name) {
                    return Err(AppError::Validation(format!(
                        "'{file_name}' is not a PDF; only PDF resumes are accepted"
                    )));
                }
                let bytes = field.bytes().await?;
                documents.push(ResumeDocument::new(file_name, bytes));
            }
            other => debug!("Ignoring unexpected form field {:?}", other),
        }
    }

    let job_description = job_description.unwrap_or_default();
    if job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }
    if documents.is_empty() {
        return Err(AppError::Validation(
            "Upload at least one resume in the 'resumes' field".to_string(),
        ));
    }

    let screening_id = Uuid::new_v4();
    info!(
        "Screening {} started: {} resume(s)",
        screening_id,
        documents.len()
    );

    let results = state
        .screener
        .run_screening_to_end(job_description, documents)
        .await;
    let report = ScreeningReport::new(screening_id, results);

    info!(
        "Screening {} finished: {} succeeded, {} failed",
        screening_id, report.succeeded, report.failed
    );
    Ok(Json(report))
}

fn is_pdf_upload(content_type: Option<&str>, file_name: &str) -> bool {
    let declared_pdf = content_type
        .map(|ct| ct.eq_ignore_ascii_case(PDF_CONTENT_TYPE))
        .unwrap_or(false);
    declared_pdf || file_name.to_ascii_lowercase().ends_with(".pdf")
}
