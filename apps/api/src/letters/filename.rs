//! Suggested file names for exported letters.

use chrono::NaiveDate;

use crate::letters::dates::{parse_date, ISO_FORMAT};

const COMPANY_FALLBACK: &str = "Unternehmen";
const JOB_TITLE_FALLBACK: &str = "Bewerbung";

/// Builds `Bewerbung_<YYYY-MM-DD>_<company>_<job_title>.pdf`.
///
/// `date` may be ISO or `DD.MM.YYYY`; anything else uses `today`.
pub fn generate_filename(
    company: Option<&str>,
    job_title: Option<&str>,
    date: Option<&str>,
    today: NaiveDate,
) -> String {
    let date = date.and_then(parse_date).unwrap_or(today);
    let company = Some(clean_name(company.unwrap_or("")))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| COMPANY_FALLBACK.to_string());
    let job_title = Some(clean_name(job_title.unwrap_or("")))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| JOB_TITLE_FALLBACK.to_string());

    format!(
        "Bewerbung_{}_{}_{}.pdf",
        date.format(ISO_FORMAT),
        company,
        job_title
    )
}

/// Makes a name safe for file systems: path separators become `-`, other
/// hostile characters are dropped, `&` becomes `und` and whitespace runs
/// become single underscores.
fn clean_name(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '/' | '\\' => cleaned.push('-'),
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => {}
            '&' => cleaned.push_str("und"),
            _ => cleaned.push(c),
        }
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join("_")
}
