use serde::{Deserialize, Serialize};

/// Letter data supplied by the calling application.
///
/// Every field is optional; the template renderer and the layout engine treat
/// a missing value exactly like an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LetterContext {
    pub company: Option<String>,
    pub company_address: Option<String>,
    pub job_title: Option<String>,
    pub subject: Option<String>,
    pub date: Option<String>,
    pub contact_person: Option<String>,
    pub your_name: Option<String>,
    pub your_address: Option<String>,
    pub your_email: Option<String>,
    pub your_phone: Option<String>,
}

impl LetterContext {
    /// Looks up a field by its placeholder name. Unknown names return `None`.
    pub fn get(&self, name: &str) -> Option<&str> {
        let value = match name {
            "company" => &self.company,
            "company_address" => &self.company_address,
            "job_title" => &self.job_title,
            "subject" => &self.subject,
            "date" => &self.date,
            "contact_person" => &self.contact_person,
            "your_name" => &self.your_name,
            "your_address" => &self.your_address,
            "your_email" => &self.your_email,
            "your_phone" => &self.your_phone,
            _ => return None,
        };
        value.as_deref()
    }

    /// Field value with surrounding whitespace removed; empty when absent.
    pub fn text(&self, name: &str) -> &str {
        self.get(name).map(str::trim).unwrap_or("")
    }
}

/// Partial margin override in millimetres. Unset sides keep their default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarginOverride {
    pub top: Option<f32>,
    pub bottom: Option<f32>,
    pub left: Option<f32>,
    pub right: Option<f32>,
}

impl MarginOverride {
    pub fn is_empty(&self) -> bool {
        self.top.is_none() && self.bottom.is_none() && self.left.is_none() && self.right.is_none()
    }
}

/// Everything the layout engine needs for one letter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LetterRequest {
    #[serde(flatten)]
    pub context: LetterContext,
    /// Plain-text letter body, usually the template renderer's output.
    pub body_text: String,
    /// Rich-text body in the supported HTML subset. Takes precedence over
    /// `body_text` when non-blank.
    pub html_content: Option<String>,
    pub margins: Option<MarginOverride>,
}

impl LetterRequest {
    pub fn html_body(&self) -> Option<&str> {
        self.html_content
            .as_deref()
            .filter(|html| !html.trim().is_empty())
    }
}
