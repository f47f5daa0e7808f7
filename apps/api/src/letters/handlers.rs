//! Axum route handlers for the Letter API.

use anyhow::Context as _;
use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::letters::filename::generate_filename;
use crate::models::letter::LetterRequest;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PdfQuery {
    /// Serve for in-browser viewing instead of as a download.
    pub inline: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FilenameRequest {
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FilenameResponse {
    pub filename: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/letters/pdf
///
/// Lays out the letter and returns the PDF. Rendering is CPU-bound and runs
/// on the blocking pool.
pub async fn handle_generate_pdf(
    State(state): State<AppState>,
    Query(query): Query<PdfQuery>,
    Json(request): Json<LetterRequest>,
) -> Result<Response, AppError> {
    if request.body_text.trim().is_empty() && request.html_body().is_none() {
        return Err(AppError::Validation(
            "body_text or html_content is required".to_string(),
        ));
    }

    let today = Local::now().date_naive();
    let filename = generate_filename(
        request.context.get("company"),
        request.context.get("job_title"),
        request.context.get("date"),
        today,
    );

    let engine = state.engine.clone();
    let pdf = tokio::task::spawn_blocking(move || engine.generate_pdf(&request, today))
        .await
        .context("PDF rendering task failed")?;

    info!(bytes = pdf.len(), filename = %filename, inline = query.inline, "Letter PDF generated");

    let disposition = content_disposition(&filename, query.inline);
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Bytes::from(pdf),
    )
        .into_response())
}

/// POST /api/v1/letters/filename
///
/// Returns the file name the PDF endpoint would use for the same data.
pub async fn handle_filename(Json(request): Json<FilenameRequest>) -> Json<FilenameResponse> {
    let filename = generate_filename(
        request.company.as_deref(),
        request.job_title.as_deref(),
        request.date.as_deref(),
        Local::now().date_naive(),
    );
    Json(FilenameResponse { filename })
}

// ────────────────────────────────────────────────────────────────────────────
// Content-Disposition
// ────────────────────────────────────────────────────────────────────────────

/// `attachment` or `inline` with an ASCII `filename` and an RFC 5987
/// `filename*` carrying the exact UTF-8 name.
fn content_disposition(filename: &str, inline: bool) -> String {
    let kind = if inline { "inline" } else { "attachment" };
    format!(
        "{kind}; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_fallback(filename),
        percent_encode(filename)
    )
}

fn ascii_fallback(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            'ä' => "ae".to_string(),
            'ö' => "oe".to_string(),
            'ü' => "ue".to_string(),
            'Ä' => "Ae".to_string(),
            'Ö' => "Oe".to_string(),
            'Ü' => "Ue".to_string(),
            'ß' => "ss".to_string(),
            '"' | '\\' => "_".to_string(),
            c if c.is_ascii_graphic() || c == ' ' => c.to_string(),
            _ => "_".to_string(),
        })
        .collect()
}

fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        let unreserved = byte.is_ascii_alphanumeric()
            || matches!(
                byte,
                b'!' | b'#' | b'$' | b'&' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
            );
        if unreserved {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}
