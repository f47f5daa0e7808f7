//! Parser for the rich-text HTML subset accepted as a letter body.
//!
//! Supported tags are `b/strong`, `i/em`, `u`, `p`, `div`, `br` and
//! `ul/ol/li`. Anything else is dropped as markup while its text is kept.
//! Comments are skipped. A `<` that does not open a tag stays literal text.
//! Nested lists are flattened into the outermost one.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StyleSet {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Bullet,
    Numbered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    pub prefix: String,
    pub content: String,
    pub styles: StyleSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RichTextBlock {
    /// Inline run. A content of `"\n"` is a forced line break.
    Text { content: String, styles: StyleSet },
    ParagraphBreak,
    List { kind: ListKind, items: Vec<ListItem> },
}

pub fn parse_html(input: &str) -> Vec<RichTextBlock> {
    let mut builder = Builder::default();
    for token in tokenize(input) {
        builder.feed(token);
    }
    builder.finish()
}

// ────────────────────────────────────────────────────────────────────────────
// Tokenizer
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Text(String),
    Open(String),
    Close(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Data,
    TagOpen,
    TagName,
    InTag { quote: Option<char> },
    Comment { dashes: u8 },
}

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut name = String::new();
    let mut closing = false;
    let mut tag_start = 0;
    let mut state = State::Data;
    let mut chars = input.char_indices();

    while let Some((i, c)) = chars.next() {
        state = match state {
            State::Data => {
                if c == '<' {
                    tag_start = i;
                    State::TagOpen
                } else {
                    text.push(c);
                    State::Data
                }
            }
            State::TagOpen => {
                if c == '!' && input[i..].starts_with("!--") {
                    chars.nth(1);
                    State::Comment { dashes: 0 }
                } else if c == '/' || c.is_ascii_alphabetic() {
                    closing = c == '/';
                    name.clear();
                    if !closing {
                        name.push(c.to_ascii_lowercase());
                    }
                    State::TagName
                } else if c == '<' {
                    text.push('<');
                    tag_start = i;
                    State::TagOpen
                } else {
                    text.push('<');
                    text.push(c);
                    State::Data
                }
            }
            State::TagName => {
                if c.is_ascii_alphanumeric() {
                    name.push(c.to_ascii_lowercase());
                    State::TagName
                } else if c == '>' {
                    emit_tag(&mut tokens, &mut text, &name, closing);
                    State::Data
                } else {
                    State::InTag { quote: None }
                }
            }
            State::InTag { quote } => match (quote, c) {
                (Some(q), c) if c == q => State::InTag { quote: None },
                (Some(q), _) => State::InTag { quote: Some(q) },
                (None, '"' | '\'') => State::InTag { quote: Some(c) },
                (None, '>') => {
                    emit_tag(&mut tokens, &mut text, &name, closing);
                    State::Data
                }
                (None, _) => State::InTag { quote: None },
            },
            State::Comment { dashes } => match c {
                '-' => State::Comment {
                    dashes: dashes.saturating_add(1),
                },
                '>' if dashes >= 2 => State::Data,
                _ => State::Comment { dashes: 0 },
            },
        };
    }

    match state {
        State::TagOpen | State::TagName | State::InTag { .. } => {
            text.push_str(&input[tag_start..]);
        }
        State::Data | State::Comment { .. } => {}
    }
    flush_text(&mut tokens, &mut text);
    tokens
}

fn flush_text(tokens: &mut Vec<Token>, text: &mut String) {
    if !text.is_empty() {
        tokens.push(Token::Text(decode_entities(text)));
        text.clear();
    }
}

fn emit_tag(tokens: &mut Vec<Token>, text: &mut String, name: &str, closing: bool) {
    flush_text(tokens, text);
    if name.is_empty() {
        return;
    }
    tokens.push(if closing {
        Token::Close(name.to_string())
    } else {
        Token::Open(name.to_string())
    });
}

/// Longest entity body accepted between `&` and `;`.
const MAX_ENTITY_LEN: usize = 10;

fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let decoded = after
            .find(';')
            .filter(|&end| end <= MAX_ENTITY_LEN)
            .and_then(|end| decode_entity(&after[..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &after[end + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{A0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Block builder
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct ItemBuilder {
    content: String,
    styles: Option<StyleSet>,
}

struct ListBuilder {
    kind: ListKind,
    depth: u32,
    items: Vec<ListItem>,
    current: Option<ItemBuilder>,
}

impl ListBuilder {
    fn finish_item(&mut self) {
        let Some(item) = self.current.take() else {
            return;
        };
        let content = collapse_whitespace(&item.content).trim().to_string();
        if content.is_empty() {
            return;
        }
        let prefix = match self.kind {
            ListKind::Bullet => "•".to_string(),
            ListKind::Numbered => format!("{}.", self.items.len() + 1),
        };
        self.items.push(ListItem {
            prefix,
            content,
            styles: item.styles.unwrap_or_default(),
        });
    }
}

#[derive(Default)]
struct Builder {
    blocks: Vec<RichTextBlock>,
    bold: u32,
    italic: u32,
    underline: u32,
    list: Option<ListBuilder>,
}

impl Builder {
    fn styles(&self) -> StyleSet {
        StyleSet {
            bold: self.bold > 0,
            italic: self.italic > 0,
            underline: self.underline > 0,
        }
    }

    fn feed(&mut self, token: Token) {
        match token {
            Token::Text(text) => self.text(&text),
            Token::Open(name) => self.open(&name),
            Token::Close(name) => self.close(&name),
        }
    }

    fn open(&mut self, name: &str) {
        match name {
            "b" | "strong" => self.bold += 1,
            "i" | "em" => self.italic += 1,
            "u" => self.underline += 1,
            "p" | "div" => self.paragraph_break(),
            "br" => self.line_break(),
            "ul" | "ol" => {
                let kind = if name == "ol" {
                    ListKind::Numbered
                } else {
                    ListKind::Bullet
                };
                match self.list.as_mut() {
                    Some(list) => list.depth += 1,
                    None => {
                        self.list = Some(ListBuilder {
                            kind,
                            depth: 0,
                            items: Vec::new(),
                            current: None,
                        })
                    }
                }
            }
            "li" => {
                if let Some(list) = self.list.as_mut() {
                    list.finish_item();
                    list.current = Some(ItemBuilder::default());
                } else {
                    self.paragraph_break();
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &str) {
        match name {
            "b" | "strong" => self.bold = self.bold.saturating_sub(1),
            "i" | "em" => self.italic = self.italic.saturating_sub(1),
            "u" => self.underline = self.underline.saturating_sub(1),
            "p" | "div" => self.paragraph_break(),
            "li" => {
                if let Some(list) = self.list.as_mut() {
                    list.finish_item();
                }
            }
            "ul" | "ol" => match self.list.as_mut() {
                Some(list) if list.depth > 0 => list.depth -= 1,
                Some(_) => self.close_list(),
                None => {}
            },
            _ => {}
        }
    }

    fn text(&mut self, raw: &str) {
        let styles = self.styles();
        if let Some(list) = self.list.as_mut() {
            if list.current.is_none() {
                if raw.trim_matches(is_collapsible).is_empty() {
                    return;
                }
                list.current = Some(ItemBuilder::default());
            }
            if let Some(item) = list.current.as_mut() {
                if item.styles.is_none() && !raw.trim_matches(is_collapsible).is_empty() {
                    item.styles = Some(styles);
                }
                item.content.push_str(raw);
            }
            return;
        }

        let mut content = collapse_whitespace(raw);
        if self.at_line_start() || self.ends_with_space() {
            content = content.trim_start_matches(' ').to_string();
        }
        if content.is_empty() {
            return;
        }
        match self.blocks.last_mut() {
            Some(RichTextBlock::Text {
                content: prev,
                styles: prev_styles,
            }) if *prev_styles == styles && prev.as_str() != "\n" => prev.push_str(&content),
            _ => self.blocks.push(RichTextBlock::Text { content, styles }),
        }
    }

    fn line_break(&mut self) {
        if let Some(list) = self.list.as_mut() {
            if let Some(item) = list.current.as_mut() {
                item.content.push(' ');
            }
            return;
        }
        self.blocks.push(RichTextBlock::Text {
            content: "\n".to_string(),
            styles: self.styles(),
        });
    }

    fn paragraph_break(&mut self) {
        if self.list.is_some() {
            return;
        }
        if matches!(
            self.blocks.last(),
            Some(RichTextBlock::Text { .. } | RichTextBlock::List { .. })
        ) {
            self.blocks.push(RichTextBlock::ParagraphBreak);
        }
    }

    fn close_list(&mut self) {
        let Some(mut list) = self.list.take() else {
            return;
        };
        list.finish_item();
        if !list.items.is_empty() {
            self.blocks.push(RichTextBlock::List {
                kind: list.kind,
                items: list.items,
            });
        }
    }

    fn at_line_start(&self) -> bool {
        match self.blocks.last() {
            None | Some(RichTextBlock::ParagraphBreak | RichTextBlock::List { .. }) => true,
            Some(RichTextBlock::Text { content, .. }) => content == "\n",
        }
    }

    fn ends_with_space(&self) -> bool {
        matches!(self.blocks.last(), Some(RichTextBlock::Text { content, .. }) if content.ends_with(' '))
    }

    fn finish(mut self) -> Vec<RichTextBlock> {
        self.close_list();
        while matches!(self.blocks.last(), Some(RichTextBlock::ParagraphBreak)) {
            self.blocks.pop();
        }
        self.blocks
    }
}

fn is_collapsible(c: char) -> bool {
    c.is_ascii_whitespace()
}

/// Folds runs of ASCII whitespace into one space. Non-breaking spaces stay.
fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_space = false;
    for c in s.chars() {
        if is_collapsible(c) {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}
