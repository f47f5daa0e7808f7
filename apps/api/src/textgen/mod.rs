// Letter text generation from user templates.
// The template language is a closed, whitelisted grammar: `{{ name }}` and
// `{% if %}/{% else %}/{% endif %}` over the fixed placeholder set. Template
// text may come from imported or shared templates, so nothing in it can reach
// code, files or the network.

pub mod handlers;
pub mod lexer;
pub mod parser;
pub mod placeholders;
pub mod renderer;

use thiserror::Error;

pub use placeholders::{get_placeholder_descriptions, get_placeholder_list, generate_subject};
pub use renderer::{TextGenerator, DEFAULT_TEMPLATE};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Unbekannter Platzhalter - {0}")]
    UnknownPlaceholder(String),

    #[error("{message} (Position {offset})")]
    Syntax { message: String, offset: usize },
}
