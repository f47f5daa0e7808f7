//! Date and place handling for the letter's date line.

use chrono::NaiveDate;

/// `DD.MM.YYYY`, the format printed on letters.
pub const DISPLAY_FORMAT: &str = "%d.%m.%Y";
pub const ISO_FORMAT: &str = "%Y-%m-%d";

/// Formats a user-supplied date for display.
///
/// ISO dates are converted to `DD.MM.YYYY`, empty input becomes `today`, and
/// anything else is passed through unchanged.
pub fn format_date(input: Option<&str>, today: NaiveDate) -> String {
    let input = input.map(str::trim).unwrap_or("");
    if input.is_empty() {
        return today.format(DISPLAY_FORMAT).to_string();
    }
    match NaiveDate::parse_from_str(input, ISO_FORMAT) {
        Ok(date) => date.format(DISPLAY_FORMAT).to_string(),
        Err(_) => input.to_string(),
    }
}

/// Parses an ISO or `DD.MM.YYYY` date.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, ISO_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(input, DISPLAY_FORMAT))
        .ok()
}

/// Place name for the date line: the text after the postcode on the last
/// non-empty sender address line, e.g. `"24937 Flensburg"` gives `"Flensburg"`.
pub fn infer_location(address: Option<&str>, fallback: &str) -> String {
    address
        .and_then(|address| address.lines().map(str::trim).filter(|l| !l.is_empty()).last())
        .and_then(|line| line.split_once(' '))
        .map(|(_, place)| place.trim())
        .filter(|place| !place.is_empty())
        .unwrap_or(fallback)
        .to_string()
}
