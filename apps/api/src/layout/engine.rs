//! Composes a complete DIN 5008 letter: the fixed page-one header plus the
//! paginated body, then hands the draw commands to the PDF writer.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::layout::body::{BodyLayout, BODY_FONT_SIZE, LINE_HEIGHT};
use crate::layout::fonts::{FontSet, FontStyle};
use crate::layout::geometry::{mm, PageGeometry};
use crate::layout::html::parse_html;
use crate::layout::paginate::{paginate, DrawCommand};
use crate::layout::pdf::{write_pdf, DocumentInfo};
use crate::letters::dates::{format_date, infer_location};
use crate::models::letter::{LetterContext, LetterRequest};
use crate::textgen::generate_subject;

const SENDER_FONT_SIZE: f32 = 10.0;
const SENDER_LEADING: f32 = 12.0;
/// Space between the postal address and the contact lines of the sender block.
const SENDER_CONTACT_GAP: f32 = 6.0;
const SENDER_LINE_FONT_SIZE: f32 = 7.0;
const SENDER_LINE_SEPARATOR: &str = " · ";
const SENDER_LINE_RULE_OFFSET: f32 = 2.0;
const SENDER_LINE_RULE_THICKNESS: f32 = 0.3;
const SENDER_LINE_RULE_LENGTH_MM: f32 = 85.0;
/// First recipient baseline below the top of the address field.
const ADDRESS_FIRST_BASELINE: f32 = 15.0;

/// A letter after layout, before serialisation.
#[derive(Debug, Clone)]
pub struct LaidOutLetter {
    pub geometry: PageGeometry,
    pub commands: Vec<DrawCommand>,
    pub page_count: usize,
    pub subject: String,
}

/// Stateless letter renderer around the shared, read-only font set.
#[derive(Debug, Clone)]
pub struct LetterEngine {
    fonts: Arc<FontSet>,
    fallback_city: String,
    creator: String,
}

impl LetterEngine {
    pub fn new(fonts: Arc<FontSet>, fallback_city: impl Into<String>, creator: impl Into<String>) -> Self {
        Self {
            fonts,
            fallback_city: fallback_city.into(),
            creator: creator.into(),
        }
    }

    pub fn fonts(&self) -> &FontSet {
        &self.fonts
    }

    /// Renders the letter to PDF bytes. Never fails; an empty body yields a
    /// single page carrying only the header.
    pub fn generate_pdf(&self, request: &LetterRequest, today: NaiveDate) -> Vec<u8> {
        let letter = self.layout(request, today);
        let info = DocumentInfo {
            title: letter.subject.clone(),
            creator: self.creator.clone(),
        };
        write_pdf(
            &letter.commands,
            letter.page_count,
            &self.fonts,
            &letter.geometry,
            &info,
        )
    }

    pub fn layout(&self, request: &LetterRequest, today: NaiveDate) -> LaidOutLetter {
        let geometry = PageGeometry::for_request(request.margins.as_ref());
        let context = &request.context;
        let subject = subject_for(context);

        let mut header = Header {
            fonts: &self.fonts,
            geometry: &geometry,
            commands: Vec::new(),
        };
        header.sender_block(context);
        header.sender_line(context);
        header.recipient(context);
        header.date_line(context, &self.fallback_city, today);
        header.subject(&subject);
        let mut commands = header.commands;

        let body = BodyLayout::new(&self.fonts, geometry.text_width());
        let flow = match request.html_body() {
            Some(html) => body.rich(&parse_html(html)),
            None if !request.body_text.trim().is_empty() => body.plain(&request.body_text),
            None => Vec::new(),
        };
        let paginated = paginate(&flow, &geometry);
        commands.extend(paginated.commands);

        debug!(
            pages = paginated.page_count,
            flow_items = flow.len(),
            rich = request.html_body().is_some(),
            "Letter laid out"
        );

        LaidOutLetter {
            geometry,
            commands,
            page_count: paginated.page_count,
            subject,
        }
    }
}

/// Explicit subject, else one derived from the job title.
fn subject_for(context: &LetterContext) -> String {
    match context.text("subject") {
        "" => generate_subject(context.get("job_title")),
        subject => subject.to_string(),
    }
}

fn non_empty_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

// ────────────────────────────────────────────────────────────────────────────
// Page-one header
// ────────────────────────────────────────────────────────────────────────────

struct Header<'a> {
    fonts: &'a FontSet,
    geometry: &'a PageGeometry,
    commands: Vec<DrawCommand>,
}

impl Header<'_> {
    fn text(&mut self, x: f32, y: f32, text: &str, style: FontStyle, size: f32) {
        self.commands.push(DrawCommand::Text {
            page: 0,
            x,
            y,
            text: text.to_string(),
            style,
            size,
            underline: None,
        });
    }

    fn right_aligned(&mut self, y: f32, text: &str, style: FontStyle, size: f32) {
        let x = self.geometry.text_right() - self.fonts.measure(style, text, size);
        self.text(x, y, text, style, size);
    }

    /// Name, address and contact lines, flush right.
    fn sender_block(&mut self, context: &LetterContext) {
        let mut y = self.geometry.sender_block_top;
        let mut lines: Vec<&str> = Vec::new();
        if !context.text("your_name").is_empty() {
            lines.push(context.text("your_name"));
        }
        lines.extend(non_empty_lines(context.text("your_address")));
        for line in lines {
            self.right_aligned(y, line, FontStyle::Regular, SENDER_FONT_SIZE);
            y += SENDER_LEADING;
        }

        y += SENDER_CONTACT_GAP;
        let phone = context.text("your_phone");
        if !phone.is_empty() {
            self.right_aligned(y, &format!("Tel.: {phone}"), FontStyle::Regular, SENDER_FONT_SIZE);
            y += SENDER_LEADING;
        }
        let email = context.text("your_email");
        if !email.is_empty() {
            self.right_aligned(y, email, FontStyle::Regular, SENDER_FONT_SIZE);
        }
    }

    /// Small return-address line above the address field, with a rule.
    fn sender_line(&mut self, context: &LetterContext) {
        let mut parts: Vec<&str> = Vec::new();
        if !context.text("your_name").is_empty() {
            parts.push(context.text("your_name"));
        }
        parts.extend(non_empty_lines(context.text("your_address")));
        if parts.is_empty() {
            return;
        }

        let left = self.geometry.text_left();
        let y = self.geometry.sender_line;
        let line = parts.join(SENDER_LINE_SEPARATOR);
        self.text(left, y, &line, FontStyle::Regular, SENDER_LINE_FONT_SIZE);
        self.commands.push(DrawCommand::Rule {
            page: 0,
            x: left,
            y: y + SENDER_LINE_RULE_OFFSET,
            length: mm(SENDER_LINE_RULE_LENGTH_MM),
            thickness: SENDER_LINE_RULE_THICKNESS,
        });
    }

    fn recipient(&mut self, context: &LetterContext) {
        let left = self.geometry.text_left();
        let mut y = self.geometry.address_field_top + ADDRESS_FIRST_BASELINE;
        let mut lines: Vec<&str> = Vec::new();
        for field in ["company", "contact_person"] {
            if !context.text(field).is_empty() {
                lines.push(context.text(field));
            }
        }
        lines.extend(non_empty_lines(context.text("company_address")));
        for line in lines {
            self.text(left, y, line, FontStyle::Regular, BODY_FONT_SIZE);
            y += LINE_HEIGHT;
        }
    }

    fn date_line(&mut self, context: &LetterContext, fallback_city: &str, today: NaiveDate) {
        let date = format_date(context.get("date"), today);
        let location = infer_location(context.get("your_address"), fallback_city);
        let line = format!("{location}, den {date}");
        self.right_aligned(self.geometry.date_line, &line, FontStyle::Regular, BODY_FONT_SIZE);
    }

    fn subject(&mut self, subject: &str) {
        let left = self.geometry.text_left();
        self.text(left, self.geometry.subject_line, subject, FontStyle::Bold, BODY_FONT_SIZE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::letter::MarginOverride;

    fn engine() -> LetterEngine {
        LetterEngine::new(Arc::new(FontSet::builtin()), "Flensburg", "letter-api")
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    fn request(body: &str) -> LetterRequest {
        LetterRequest {
            context: LetterContext {
                company: Some("ACME GmbH".into()),
                company_address: Some("Industriestraße 5\n20095 Hamburg".into()),
                job_title: Some("Backend Engineer".into()),
                contact_person: Some("Frau Meier".into()),
                your_name: Some("Max Mustermann".into()),
                your_address: Some("Hauptstraße 1\n24937 Flensburg".into()),
                your_email: Some("max@example.com".into()),
                your_phone: Some("0461 123456".into()),
                date: Some("2024-03-01".into()),
                ..Default::default()
            },
            body_text: body.to_string(),
            ..Default::default()
        }
    }

    fn texts(letter: &LaidOutLetter) -> Vec<(usize, f32, f32, String)> {
        letter
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { page, x, y, text, .. } => Some((*page, *x, *y, text.clone())),
                DrawCommand::Rule { .. } => None,
            })
            .collect()
    }

    fn find<'a>(letter: &'a [(usize, f32, f32, String)], text: &str) -> &'a (usize, f32, f32, String) {
        letter
            .iter()
            .find(|(_, _, _, t)| t == text)
            .unwrap_or_else(|| panic!("{text:?} not drawn"))
    }

    #[test]
    fn test_header_anchors() {
        let letter = engine().layout(&request("Sehr geehrte Frau Meier,"), today());
        let g = &letter.geometry;
        let t = texts(&letter);

        assert_eq!(find(&t, "Max Mustermann").2, g.sender_block_top);
        assert_eq!(find(&t, "ACME GmbH").2, g.address_field_top + ADDRESS_FIRST_BASELINE);
        assert_eq!(find(&t, "Frau Meier").2, g.address_field_top + ADDRESS_FIRST_BASELINE + LINE_HEIGHT);
        assert_eq!(find(&t, "Flensburg, den 01.03.2024").2, g.date_line);
        assert_eq!(find(&t, "Bewerbung als Backend Engineer").2, g.subject_line);
        assert_eq!(find(&t, "Sehr geehrte Frau Meier,").2, g.body_start);
    }

    #[test]
    fn test_sender_block_is_right_aligned() {
        let e = engine();
        let letter = e.layout(&request(""), today());
        let t = texts(&letter);
        let (_, x, _, text) = find(&t, "Tel.: 0461 123456");
        let width = e.fonts().measure(FontStyle::Regular, text, SENDER_FONT_SIZE);
        assert!((x + width - letter.geometry.text_right()).abs() < 1e-3);
    }

    #[test]
    fn test_sender_line_and_rule() {
        let letter = engine().layout(&request(""), today());
        let t = texts(&letter);
        let line = find(&t, "Max Mustermann · Hauptstraße 1 · 24937 Flensburg");
        assert_eq!(line.2, letter.geometry.sender_line);
        let rule = letter
            .commands
            .iter()
            .find_map(|c| match c {
                DrawCommand::Rule { y, length, .. } => Some((*y, *length)),
                DrawCommand::Text { .. } => None,
            })
            .unwrap();
        assert_eq!(rule.0, letter.geometry.sender_line + SENDER_LINE_RULE_OFFSET);
        assert!((rule.1 - mm(85.0)).abs() < 1e-3);
    }

    #[test]
    fn test_explicit_subject_wins() {
        let mut req = request("");
        req.context.subject = Some("Initiativbewerbung".into());
        let letter = engine().layout(&req, today());
        assert_eq!(letter.subject, "Initiativbewerbung");
    }

    #[test]
    fn test_empty_body_is_single_header_page() {
        let letter = engine().layout(&request("   "), today());
        assert_eq!(letter.page_count, 1);
        assert!(texts(&letter).iter().all(|(_, _, y, _)| *y < letter.geometry.body_start));
    }

    #[test]
    fn test_long_body_breaks_to_second_page_at_top_margin() {
        let body = format!("Sehr geehrte Frau Meier,\n{}", "Eine Zeile Text.\n".repeat(80));
        let letter = engine().layout(&request(&body), today());
        assert!(letter.page_count >= 2);

        let t = texts(&letter);
        let first_on_page_two = t.iter().find(|(page, _, _, _)| *page == 1).unwrap();
        assert_eq!(first_on_page_two.2, letter.geometry.continuation_top());
        for (_, _, y, _) in &t {
            assert!(*y <= letter.geometry.body_bottom());
        }
    }

    #[test]
    fn test_header_lines_before_greeting_are_dropped() {
        let body = "Max Mustermann\nACME GmbH\n\nSehr geehrte Frau Meier,\n\nText.";
        let letter = engine().layout(&request(body), today());
        let body_texts: Vec<String> = texts(&letter)
            .into_iter()
            .filter(|(_, _, y, _)| *y >= letter.geometry.body_start)
            .map(|(_, _, _, text)| text)
            .collect();
        assert_eq!(body_texts, vec!["Sehr geehrte Frau Meier,", "Text."]);
    }

    #[test]
    fn test_html_body_takes_precedence() {
        let mut req = request("Sehr geehrte Frau Meier, plain");
        req.html_content = Some("<p>Sehr geehrte <b>Frau Meier</b>,</p>".into());
        let letter = engine().layout(&req, today());
        let t = texts(&letter);
        assert!(t.iter().all(|(_, _, _, text)| !text.contains("plain")));
        let body_start = letter.geometry.body_start;
        assert!(t
            .iter()
            .any(|(_, _, y, text)| *y >= body_start && text == "Frau Meier"));
    }

    #[test]
    fn test_invalid_margin_override_uses_defaults() {
        let mut req = request("Text");
        req.margins = Some(MarginOverride {
            left: Some(150.0),
            ..Default::default()
        });
        let letter = engine().layout(&req, today());
        assert_eq!(letter.geometry, PageGeometry::din5008());
    }

    #[test]
    fn test_valid_margin_override_moves_body() {
        let mut req = request("Text");
        req.margins = Some(MarginOverride {
            left: Some(30.0),
            ..Default::default()
        });
        let letter = engine().layout(&req, today());
        let t = texts(&letter);
        assert!((find(&t, "Text").1 - mm(30.0)).abs() < 1e-3);
    }

    #[test]
    fn test_generate_pdf_bytes() {
        let bytes = engine().generate_pdf(&request("Sehr geehrte Frau Meier,"), today());
        assert!(bytes.starts_with(b"%PDF"));
    }
}
