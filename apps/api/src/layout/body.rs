//! Turns a letter body into flow lines.
//!
//! Two front ends feed the shared pagination loop: the plain-text path
//! classifies lines (blank, bullet, prose) and the rich-text path walks
//! parsed [`RichTextBlock`]s. Both produce [`FlowItem`]s with x offsets
//! relative to the left text edge.

use crate::layout::fonts::{FontSet, FontStyle};
use crate::layout::geometry::mm;
use crate::layout::html::{ListItem, ListKind, RichTextBlock, StyleSet};
use crate::layout::paginate::{FlowItem, Span};
use crate::layout::wrap::{greedy_break, wrap_text, Measured};

pub const BODY_FONT_SIZE: f32 = 11.0;
pub const LINE_HEIGHT: f32 = 14.0;
pub const PARAGRAPH_SPACING: f32 = 11.0;
/// Extra space between two consecutive list items.
pub const BULLET_SPACING: f32 = 8.0;
/// Space added when a list run starts or ends.
pub const LIST_TRANSITION: f32 = PARAGRAPH_SPACING / 2.0;

const BULLET_MARKER_INDENT_MM: f32 = 5.0;
const BULLET_TEXT_INDENT_MM: f32 = 8.0;
const BULLET_MARKER: &str = "•";
const BULLET_PREFIXES: [char; 4] = ['•', '-', '–', '*'];
const GREETINGS: [&str; 3] = ["sehr geehrte", "liebes", "liebe "];

// ────────────────────────────────────────────────────────────────────────────
// Plain-text classification
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass<'a> {
    Blank,
    /// Bullet text with the marker stripped.
    Bullet(&'a str),
    Prose(&'a str),
}

pub fn classify(line: &str) -> LineClass<'_> {
    let line = line.trim();
    if line.is_empty() {
        LineClass::Blank
    } else if line.starts_with(BULLET_PREFIXES) {
        let text = line.trim_start_matches(|c: char| BULLET_PREFIXES.contains(&c) || c == ' ');
        LineClass::Bullet(text.trim())
    } else {
        LineClass::Prose(line)
    }
}

/// Drops everything before the first salutation line. Without a salutation
/// the whole text is kept.
pub fn strip_before_greeting(text: &str) -> Vec<&str> {
    let lines: Vec<&str> = text.split('\n').collect();
    let start = lines
        .iter()
        .position(|line| {
            let lower = line.trim().to_lowercase();
            GREETINGS.iter().any(|greeting| lower.starts_with(greeting))
        })
        .unwrap_or(0);
    lines[start..].to_vec()
}

/// Splits a bullet at its first `(` into a label and the parenthesised rest.
pub fn split_bullet_label(text: &str) -> Option<(&str, &str)> {
    let pos = text.find('(')?;
    let label = text[..pos].trim();
    if label.is_empty() {
        return None;
    }
    Some((label, &text[pos..]))
}

// ────────────────────────────────────────────────────────────────────────────
// Flow builder
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Previous {
    Nothing,
    Text,
    ListItem,
    Blank,
}

/// Rich text fragment: a piece of one word in one style.
struct Fragment {
    text: String,
    styles: StyleSet,
    width: f32,
}

struct RichWord {
    fragments: Vec<Fragment>,
    measured: Measured,
}

pub struct BodyLayout<'a> {
    fonts: &'a FontSet,
    width: f32,
    items: Vec<FlowItem>,
    previous: Previous,
}

impl<'a> BodyLayout<'a> {
    pub fn new(fonts: &'a FontSet, text_width: f32) -> Self {
        Self {
            fonts,
            width: text_width,
            items: Vec::new(),
            previous: Previous::Nothing,
        }
    }

    pub fn plain(mut self, text: &str) -> Vec<FlowItem> {
        for line in strip_before_greeting(text) {
            match classify(line) {
                LineClass::Blank => {
                    self.leave_list();
                    self.items.push(FlowItem::Gap(PARAGRAPH_SPACING));
                    self.previous = Previous::Blank;
                }
                LineClass::Bullet(bullet) => {
                    self.enter_list_item();
                    match split_bullet_label(bullet) {
                        Some((label, rest)) => {
                            let indent = self.text_indent([BULLET_MARKER]);
                            let label_lines = self.wrap_single(label, FontStyle::Bold, self.item_width(indent));
                            let rest_lines = self.wrap_single(rest, FontStyle::Regular, self.item_width(indent));
                            self.push_item_lines(BULLET_MARKER, indent, label_lines, FontStyle::Bold, false);
                            self.push_indented_lines(indent, rest_lines, FontStyle::Regular, false);
                        }
                        None => {
                            let indent = self.text_indent([BULLET_MARKER]);
                            let lines = self.wrap_single(bullet, FontStyle::Regular, self.item_width(indent));
                            self.push_item_lines(BULLET_MARKER, indent, lines, FontStyle::Regular, false);
                        }
                    }
                    self.previous = Previous::ListItem;
                }
                LineClass::Prose(prose) => {
                    self.leave_list();
                    for line in self.wrap_single(prose, FontStyle::Regular, self.width) {
                        self.push_line(vec![self.span(0.0, line, FontStyle::Regular, false)]);
                    }
                    self.previous = Previous::Text;
                }
            }
        }
        self.items
    }

    pub fn rich(mut self, blocks: &[RichTextBlock]) -> Vec<FlowItem> {
        let mut paragraph: Vec<(&str, StyleSet)> = Vec::new();

        for block in blocks {
            match block {
                RichTextBlock::Text { content, .. } if content == "\n" => {
                    // A break on an empty line still takes a line's height.
                    if paragraph.is_empty() {
                        self.leave_list();
                        self.push_line(Vec::new());
                        self.previous = Previous::Text;
                    }
                    self.flush_paragraph(&mut paragraph);
                }
                RichTextBlock::Text { content, styles } => paragraph.push((content.as_str(), *styles)),
                RichTextBlock::ParagraphBreak => {
                    self.flush_paragraph(&mut paragraph);
                    self.leave_list();
                    self.items.push(FlowItem::Gap(PARAGRAPH_SPACING));
                    self.previous = Previous::Blank;
                }
                RichTextBlock::List { kind, items } => {
                    self.flush_paragraph(&mut paragraph);
                    let prefix = |item: &ListItem| -> String {
                        match kind {
                            ListKind::Bullet => BULLET_MARKER.to_string(),
                            ListKind::Numbered => item.prefix.clone(),
                        }
                    };
                    // One indent per list so the item texts line up.
                    let indent = self.text_indent(items.iter().map(prefix));
                    for item in items {
                        self.enter_list_item();
                        let style = FontStyle::from_flags(item.styles.bold, item.styles.italic);
                        let lines = self.wrap_single(&item.content, style, self.item_width(indent));
                        self.push_item_lines(&prefix(item), indent, lines, style, item.styles.underline);
                        self.previous = Previous::ListItem;
                    }
                }
            }
        }
        self.flush_paragraph(&mut paragraph);
        self.items
    }

    // ── spacing ────────────────────────────────────────────────────────────

    fn enter_list_item(&mut self) {
        match self.previous {
            Previous::ListItem => self.items.push(FlowItem::Gap(BULLET_SPACING)),
            Previous::Text | Previous::Blank => self.items.push(FlowItem::Gap(LIST_TRANSITION)),
            Previous::Nothing => {}
        }
    }

    fn leave_list(&mut self) {
        if self.previous == Previous::ListItem {
            self.items.push(FlowItem::Gap(LIST_TRANSITION));
            self.previous = Previous::Text;
        }
    }

    // ── line emission ──────────────────────────────────────────────────────

    /// Item text indent: 8 mm, or further right when a prefix set at the
    /// marker indent would otherwise run into the text.
    fn text_indent<I, S>(&self, prefixes: I) -> f32
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let space = self.fonts.measure(FontStyle::Regular, " ", BODY_FONT_SIZE);
        prefixes
            .into_iter()
            .map(|p| mm(BULLET_MARKER_INDENT_MM) + self.fonts.measure(FontStyle::Regular, p.as_ref(), BODY_FONT_SIZE) + space)
            .fold(mm(BULLET_TEXT_INDENT_MM), f32::max)
    }

    fn item_width(&self, indent: f32) -> f32 {
        self.width - indent
    }

    fn span(&self, x: f32, text: String, style: FontStyle, underline: bool) -> Span {
        Span {
            x,
            width: self.fonts.measure(style, &text, BODY_FONT_SIZE),
            text,
            style,
            size: BODY_FONT_SIZE,
            underline,
        }
    }

    fn push_line(&mut self, spans: Vec<Span>) {
        self.items.push(FlowItem::Line {
            spans,
            advance: LINE_HEIGHT,
        });
    }

    fn wrap_single(&self, text: &str, style: FontStyle, width: f32) -> Vec<String> {
        wrap_text(text, width, |s| self.fonts.measure(style, s, BODY_FONT_SIZE))
    }

    /// First line carries the marker; all lines hang at the text indent.
    fn push_item_lines(
        &mut self,
        marker: &str,
        indent: f32,
        lines: Vec<String>,
        style: FontStyle,
        underline: bool,
    ) {
        let mut lines = lines.into_iter();
        let marker_span = self.span(mm(BULLET_MARKER_INDENT_MM), marker.to_string(), FontStyle::Regular, false);
        let mut first = vec![marker_span];
        if let Some(line) = lines.next() {
            first.push(self.span(indent, line, style, underline));
        }
        self.push_line(first);
        self.push_indented_lines(indent, lines.collect(), style, underline);
    }

    fn push_indented_lines(&mut self, indent: f32, lines: Vec<String>, style: FontStyle, underline: bool) {
        for line in lines {
            let span = self.span(indent, line, style, underline);
            self.push_line(vec![span]);
        }
    }

    // ── rich paragraphs ────────────────────────────────────────────────────

    fn flush_paragraph(&mut self, paragraph: &mut Vec<(&str, StyleSet)>) {
        if paragraph.is_empty() {
            return;
        }
        let words = self.rich_words(paragraph);
        paragraph.clear();
        if words.is_empty() {
            return;
        }
        self.leave_list();

        let measured: Vec<Measured> = words.iter().map(|w| w.measured).collect();
        for range in greedy_break(&measured, self.width) {
            let spans = self.rich_line_spans(&words[range]);
            self.push_line(spans);
        }
        self.previous = Previous::Text;
    }

    fn rich_words(&self, runs: &[(&str, StyleSet)]) -> Vec<RichWord> {
        let mut words: Vec<RichWord> = Vec::new();
        let mut pending_space = false;

        for (text, styles) in runs {
            let style = FontStyle::from_flags(styles.bold, styles.italic);
            for (i, piece) in text.split(|c: char| c.is_ascii_whitespace()).enumerate() {
                if i > 0 {
                    pending_space = true;
                }
                if piece.is_empty() {
                    continue;
                }
                let fragment = Fragment {
                    text: piece.to_string(),
                    styles: *styles,
                    width: self.fonts.measure(style, piece, BODY_FONT_SIZE),
                };
                match words.last_mut() {
                    Some(word) if !pending_space => {
                        word.measured.width += fragment.width;
                        word.fragments.push(fragment);
                    }
                    _ => {
                        let space_before = if words.is_empty() {
                            0.0
                        } else {
                            self.fonts.measure(style, " ", BODY_FONT_SIZE)
                        };
                        words.push(RichWord {
                            measured: Measured {
                                width: fragment.width,
                                space_before,
                            },
                            fragments: vec![fragment],
                        });
                    }
                }
                pending_space = false;
            }
        }
        words
    }

    /// Lays out one wrapped line, merging neighbouring fragments that share
    /// a style so an underline runs unbroken across spaces.
    fn rich_line_spans(&self, words: &[RichWord]) -> Vec<Span> {
        let mut spans: Vec<Span> = Vec::new();
        let mut x = 0.0_f32;

        for (w, word) in words.iter().enumerate() {
            let space = if w == 0 { 0.0 } else { word.measured.space_before };
            for (f, fragment) in word.fragments.iter().enumerate() {
                let gap = if f == 0 { space } else { 0.0 };
                let style = FontStyle::from_flags(fragment.styles.bold, fragment.styles.italic);
                match spans.last_mut() {
                    Some(last) if last.style == style && last.underline == fragment.styles.underline => {
                        if gap > 0.0 {
                            last.text.push(' ');
                        }
                        last.text.push_str(&fragment.text);
                        last.width += gap + fragment.width;
                    }
                    _ => spans.push(Span {
                        x: x + gap,
                        text: fragment.text.clone(),
                        style,
                        size: BODY_FONT_SIZE,
                        width: fragment.width,
                        underline: fragment.styles.underline,
                    }),
                }
                x += gap + fragment.width;
            }
        }
        spans
    }
}
