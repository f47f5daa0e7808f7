//! The fixed placeholder vocabulary and context defaulting.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::models::letter::LetterContext;

/// Recognized placeholders with their German UI descriptions, in display order.
pub const PLACEHOLDERS: &[(&str, &str)] = &[
    ("company", "Unternehmen"),
    ("company_address", "Unternehmensadresse"),
    ("job_title", "Stellenbezeichnung"),
    ("subject", "Betreff"),
    ("date", "Datum"),
    ("contact_person", "Ansprechpartner"),
    ("your_name", "Ihr Name"),
    ("your_address", "Ihre Adresse"),
    ("your_email", "Ihre E-Mail"),
    ("your_phone", "Ihre Telefonnummer"),
];

pub fn is_placeholder(name: &str) -> bool {
    PLACEHOLDERS.iter().any(|(key, _)| *key == name)
}

/// Placeholder tokens as they are typed into a template, e.g. `{{company}}`.
pub fn get_placeholder_list() -> Vec<String> {
    PLACEHOLDERS
        .iter()
        .map(|(key, _)| format!("{{{{{key}}}}}"))
        .collect()
}

pub fn get_placeholder_descriptions() -> Vec<(&'static str, &'static str)> {
    PLACEHOLDERS.to_vec()
}

/// Standard subject line for an application.
pub fn generate_subject(job_title: Option<&str>) -> String {
    match job_title.map(str::trim) {
        Some(title) if !title.is_empty() => format!("Bewerbung als {title}"),
        _ => "Bewerbung".to_string(),
    }
}

/// A context in which every recognized placeholder has a string value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContext {
    values: HashMap<&'static str, String>,
}

impl ResolvedContext {
    /// Applies the defaulting rules: derived subject, today's date, empty
    /// strings for everything else.
    pub fn resolve(context: &LetterContext, today: NaiveDate) -> Self {
        let mut values: HashMap<&'static str, String> = PLACEHOLDERS
            .iter()
            .map(|(key, _)| (*key, context.get(key).unwrap_or_default().to_string()))
            .collect();

        if values["subject"].trim().is_empty() {
            values.insert("subject", generate_subject(context.get("job_title")));
        }
        if values["date"].trim().is_empty() {
            values.insert("date", today.format("%d.%m.%Y").to_string());
        }

        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}
