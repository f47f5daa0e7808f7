use crate::layout::LetterEngine;
use crate::textgen::TextGenerator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Layout engine holding the font set resolved at start-up.
    pub engine: LetterEngine,
    pub text_generator: TextGenerator,
}

impl AppState {
    pub fn new(engine: LetterEngine) -> Self {
        Self {
            engine,
            text_generator: TextGenerator::new(),
        }
    }
}
