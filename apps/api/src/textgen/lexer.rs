//! Splits template source into text, variable and block tokens.
//!
//! Only two delimiters exist: `{{ … }}` and `{% … %}`. Everything else is text.
//! Block tags eat the newline that follows them and the indentation in front of
//! them, so a template can put `{% if %}` on its own line without leaving blank
//! lines behind. A single trailing newline of the source is dropped, so a
//! template file's final line break does not end up in the letter.

use crate::textgen::TemplateError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    /// Inner source of a `{{ … }}` tag and its byte offset.
    Variable { expr: String, offset: usize },
    /// Inner source of a `{% … %}` tag and its byte offset.
    Block { stmt: String, offset: usize },
}

const VAR_OPEN: &str = "{{";
const VAR_CLOSE: &str = "}}";
const BLOCK_OPEN: &str = "{%";
const BLOCK_CLOSE: &str = "%}";

pub fn tokenize(source: &str) -> Result<Vec<Token>, TemplateError> {
    let source = source
        .strip_suffix("\r\n")
        .or_else(|| source.strip_suffix('\n'))
        .unwrap_or(source);
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut pos = 0;

    while pos < source.len() {
        let rest = &source[pos..];
        let next_var = rest.find(VAR_OPEN);
        let next_block = rest.find(BLOCK_OPEN);

        let (start, is_block) = match (next_var, next_block) {
            (None, None) => {
                text.push_str(rest);
                break;
            }
            (Some(v), None) => (v, false),
            (None, Some(b)) => (b, true),
            (Some(v), Some(b)) => {
                if b < v {
                    (b, true)
                } else {
                    (v, false)
                }
            }
        };

        text.push_str(&rest[..start]);
        let tag_offset = pos + start;
        let inner_start = tag_offset + 2;
        let close = if is_block { BLOCK_CLOSE } else { VAR_CLOSE };

        let inner_len =
            source[inner_start..]
                .find(close)
                .ok_or_else(|| TemplateError::Syntax {
                    message: if is_block {
                        "'%}' fehlt".to_string()
                    } else {
                        "'}}' fehlt".to_string()
                    },
                    offset: tag_offset,
                })?;
        let inner = source[inner_start..inner_start + inner_len].to_string();
        pos = inner_start + inner_len + close.len();

        if is_block {
            if starts_line(source, tag_offset) {
                let trimmed_len = text.trim_end_matches([' ', '\t']).len();
                text.truncate(trimmed_len);
            }
            flush(&mut tokens, &mut text);
            tokens.push(Token::Block {
                stmt: inner,
                offset: tag_offset,
            });
            if source[pos..].starts_with("\r\n") {
                pos += 2;
            } else if source[pos..].starts_with('\n') {
                pos += 1;
            }
        } else {
            flush(&mut tokens, &mut text);
            tokens.push(Token::Variable {
                expr: inner,
                offset: tag_offset,
            });
        }
    }

    flush(&mut tokens, &mut text);
    Ok(tokens)
}

fn flush(tokens: &mut Vec<Token>, text: &mut String) {
    if !text.is_empty() {
        tokens.push(Token::Text(std::mem::take(text)));
    }
}

/// True when only spaces or tabs separate `offset` from the start of its line.
fn starts_line(source: &str, offset: usize) -> bool {
    let line_start = source[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    source[line_start..offset]
        .chars()
        .all(|c| c == ' ' || c == '\t')
}
