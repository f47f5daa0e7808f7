// DIN 5008 Form B letter layout.
// Geometry, line breaking, pagination and PDF emission are separate stages:
// header and body are turned into draw commands first, then written out with
// pdf-writer. Layout is CPU-bound and must run inside tokio::task::spawn_blocking.

pub mod body;
pub mod engine;
pub mod font_metrics;
pub mod fonts;
pub mod geometry;
pub mod html;
pub mod paginate;
pub mod pdf;
pub mod subset;
pub mod winansi;
pub mod wrap;

pub use engine::LetterEngine;
pub use fonts::FontSet;
