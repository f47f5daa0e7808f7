//! Axum route handlers for template rendering.

use axum::{extract::State, Json};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::letters::dates::format_date;
use crate::models::letter::LetterContext;
use crate::state::AppState;
use crate::textgen::{get_placeholder_descriptions, get_placeholder_list, DEFAULT_TEMPLATE};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateRequest {
    pub template: String,
    #[serde(flatten)]
    pub context: LetterContext,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct PlaceholderInfo {
    pub key: &'static str,
    /// The token as typed into a template, e.g. `{{company}}`.
    pub token: String,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PlaceholdersResponse {
    pub placeholders: Vec<PlaceholderInfo>,
}

#[derive(Debug, Serialize)]
pub struct DefaultTemplateResponse {
    pub template: &'static str,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/letters/generate
///
/// Renders the submitted template. Template faults are not HTTP errors: the
/// renderer answers with a German error line in `text`.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    if request.template.trim().is_empty() {
        return Err(AppError::Validation("template is required".to_string()));
    }

    let mut context = request.context;
    if let Some(date) = context.date.as_deref() {
        context.date = Some(format_date(Some(date), Local::now().date_naive()));
    }

    let text = state.text_generator.render(&request.template, &context);
    info!(
        template_chars = request.template.len(),
        text_chars = text.len(),
        "Letter text generated"
    );

    Ok(Json(GenerateResponse {
        success: true,
        text,
    }))
}

/// GET /api/v1/letters/placeholders
pub async fn handle_placeholders() -> Json<PlaceholdersResponse> {
    let placeholders = get_placeholder_descriptions()
        .into_iter()
        .zip(get_placeholder_list())
        .map(|((key, description), token)| PlaceholderInfo {
            key,
            token,
            description,
        })
        .collect();
    Json(PlaceholdersResponse { placeholders })
}

/// GET /api/v1/letters/default-template
pub async fn handle_default_template() -> Json<DefaultTemplateResponse> {
    Json(DefaultTemplateResponse {
        template: DEFAULT_TEMPLATE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_flattens_context() {
        let request: GenerateRequest = serde_json::from_str(
            r#"{"template": "Hallo {{company}}", "company": "ACME", "date": "2024-03-05"}"#,
        )
        .unwrap();
        assert_eq!(request.template, "Hallo {{company}}");
        assert_eq!(request.context.text("company"), "ACME");
        assert_eq!(request.context.text("date"), "2024-03-05");
    }

    #[tokio::test]
    async fn test_placeholder_tokens() {
        let Json(response) = handle_placeholders().await;
        assert_eq!(response.placeholders.len(), 10);
        assert_eq!(response.placeholders[0].key, "company");
        assert_eq!(response.placeholders[0].token, "{{company}}");
        assert_eq!(response.placeholders[0].description, "Unternehmen");
    }
}
