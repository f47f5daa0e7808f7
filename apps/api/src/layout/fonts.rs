//! Font family resolution.
//!
//! The built-in Helvetica family is always available. A richer TrueType family
//! can replace it when all four faces (regular, bold, italic, bold-italic) load
//! from a configured directory or from a known host location. Resolution runs
//! once at start-up; the resulting `FontSet` is immutable and shared.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::layout::font_metrics::BuiltinFace;
use crate::layout::winansi;

#[derive(Debug, Error)]
pub enum FontError {
    #[error("failed to read font file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse font: {0}")]
    Parse(String),

    #[error("font collection has no face {0}")]
    MissingFace(u32),

    #[error("font is not usable for text: {0}")]
    Unsupported(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Styles
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FontStyle {
    #[default]
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl FontStyle {
    pub const ALL: [FontStyle; 4] = [
        FontStyle::Regular,
        FontStyle::Bold,
        FontStyle::Italic,
        FontStyle::BoldItalic,
    ];

    pub fn from_flags(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => FontStyle::Regular,
            (true, false) => FontStyle::Bold,
            (false, true) => FontStyle::Italic,
            (true, true) => FontStyle::BoldItalic,
        }
    }

    pub fn index(self) -> usize {
        match self {
            FontStyle::Regular => 0,
            FontStyle::Bold => 1,
            FontStyle::Italic => 2,
            FontStyle::BoldItalic => 3,
        }
    }

    fn builtin(self) -> BuiltinFace {
        match self {
            FontStyle::Regular => BuiltinFace::Helvetica,
            FontStyle::Bold => BuiltinFace::HelveticaBold,
            FontStyle::Italic => BuiltinFace::HelveticaOblique,
            FontStyle::BoldItalic => BuiltinFace::HelveticaBoldOblique,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// TrueType faces
// ────────────────────────────────────────────────────────────────────────────

/// A parsed TrueType face ready for embedding.
#[derive(Debug)]
pub struct TrueTypeFace {
    pub postscript_name: String,
    /// Standalone font program (collections are split to the selected face).
    pub data: Vec<u8>,
    /// Advance widths of WinAnsi bytes 0x20..=0xFF, thousandths of an em.
    widths: [u16; 224],
    pub ascent: f32,
    pub descent: f32,
    pub cap_height: f32,
    pub bbox: [f32; 4],
    pub italic: bool,
    pub bold: bool,
}

impl TrueTypeFace {
    pub fn load(path: &Path, index: u32) -> Result<Self, FontError> {
        let data = std::fs::read(path)?;
        Self::parse(data, index)
    }

    pub fn parse(data: Vec<u8>, index: u32) -> Result<Self, FontError> {
        let data = if data.starts_with(b"ttcf") {
            extract_collection_face(&data, index).ok_or(FontError::MissingFace(index))?
        } else {
            data
        };

        let face =
            ttf_parser::Face::parse(&data, 0).map_err(|e| FontError::Parse(e.to_string()))?;

        if face.tables().glyf.is_none() {
            return Err(FontError::Unsupported("no TrueType outlines".to_string()));
        }
        if face.glyph_index('a').is_none() {
            return Err(FontError::Unsupported("no Latin glyphs".to_string()));
        }

        let units_per_em = f32::from(face.units_per_em());
        let scale = |v: f32| v * 1000.0 / units_per_em;
        let notdef = face
            .glyph_hor_advance(ttf_parser::GlyphId(0))
            .unwrap_or_default();

        let mut widths = [0u16; 224];
        for (i, slot) in widths.iter_mut().enumerate() {
            let advance = winansi::decode_byte(0x20 + i as u8)
                .and_then(|c| face.glyph_index(c))
                .and_then(|gid| face.glyph_hor_advance(gid))
                .unwrap_or(notdef);
            *slot = scale(f32::from(advance)).round() as u16;
        }

        let postscript_name = face
            .names()
            .into_iter()
            .filter(|name| name.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
            .find_map(|name| name.to_string())
            .map(|name| sanitize_font_name(&name))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "EmbeddedFont".to_string());

        let bbox = face.global_bounding_box();
        let ascent = scale(f32::from(face.ascender()));
        let descent = scale(f32::from(face.descender()));
        let cap_height = face
            .capital_height()
            .map(|h| scale(f32::from(h)))
            .unwrap_or(ascent * 0.7);
        let italic = face.is_italic() || face.is_oblique();
        let bold = face.is_bold();

        Ok(Self {
            postscript_name,
            widths,
            ascent,
            descent,
            cap_height,
            bbox: [
                scale(f32::from(bbox.x_min)),
                scale(f32::from(bbox.y_min)),
                scale(f32::from(bbox.x_max)),
                scale(f32::from(bbox.y_max)),
            ],
            italic,
            bold,
            data,
        })
    }

    pub fn byte_width(&self, byte: u8) -> u16 {
        if byte < 0x20 {
            return 0;
        }
        self.widths[(byte - 0x20) as usize]
    }

    /// Widths for `/FirstChar 32 /LastChar 255`.
    pub fn pdf_widths(&self) -> impl Iterator<Item = f32> + '_ {
        self.widths.iter().map(|&w| f32::from(w))
    }
}

/// PDF names must not contain whitespace or delimiters.
fn sanitize_font_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_graphic() && !"()<>[]{}/%#".contains(*c))
        .collect()
}

/// Copies one face out of a TrueType collection into a standalone font file.
fn extract_collection_face(data: &[u8], index: u32) -> Option<Vec<u8>> {
    let num_fonts = read_u32(data, 8)?;
    if index >= num_fonts {
        return None;
    }
    let offset = read_u32(data, 12 + 4 * index as usize)? as usize;
    let num_tables = usize::from(read_u16(data, offset + 4)?);
    let header_len = 12 + 16 * num_tables;

    let mut directory = Vec::with_capacity(header_len);
    directory.extend_from_slice(data.get(offset..offset + 12)?);
    let mut tables = Vec::new();

    for i in 0..num_tables {
        let record = offset + 12 + 16 * i;
        let tag = data.get(record..record + 4)?;
        let checksum = read_u32(data, record + 4)?;
        let table_offset = read_u32(data, record + 8)? as usize;
        let length = read_u32(data, record + 12)? as usize;
        let table = data.get(table_offset..table_offset.checked_add(length)?)?;

        let new_offset = (header_len + tables.len()) as u32;
        directory.extend_from_slice(tag);
        directory.extend_from_slice(&checksum.to_be_bytes());
        directory.extend_from_slice(&new_offset.to_be_bytes());
        directory.extend_from_slice(&(length as u32).to_be_bytes());

        tables.extend_from_slice(table);
        while tables.len() % 4 != 0 {
            tables.push(0);
        }
    }

    directory.extend_from_slice(&tables);
    Some(directory)
}

pub(crate) fn read_u32(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub(crate) fn read_u16(data: &[u8], at: usize) -> Option<u16> {
    let bytes = data.get(at..at + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

// ────────────────────────────────────────────────────────────────────────────
// Faces and families
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum FontFace {
    Builtin(BuiltinFace),
    TrueType(Arc<TrueTypeFace>),
}

impl FontFace {
    pub fn byte_width(&self, byte: u8) -> u16 {
        match self {
            FontFace::Builtin(face) => face.metrics().byte_width(byte),
            FontFace::TrueType(face) => face.byte_width(byte),
        }
    }

    /// Rendered width of `text` in points at `size`.
    pub fn measure(&self, text: &str, size: f32) -> f32 {
        let units: u32 = winansi::encode(text)
            .into_iter()
            .map(|byte| u32::from(self.byte_width(byte)))
            .sum();
        units as f32 / 1000.0 * size
    }
}

/// Where one face of a candidate family lives on disk.
struct FaceSource {
    path: &'static str,
    index: u32,
}

struct FamilyCandidate {
    name: &'static str,
    /// Regular, bold, italic, bold-italic.
    faces: [FaceSource; 4],
}

const SYSTEM_FAMILIES: &[FamilyCandidate] = &[
    FamilyCandidate {
        name: "Avenir Next",
        faces: [
            FaceSource {
                path: "/System/Library/Fonts/Avenir Next.ttc",
                index: 7,
            },
            FaceSource {
                path: "/System/Library/Fonts/Avenir Next.ttc",
                index: 0,
            },
            FaceSource {
                path: "/System/Library/Fonts/Avenir Next.ttc",
                index: 4,
            },
            FaceSource {
                path: "/System/Library/Fonts/Avenir Next.ttc",
                index: 1,
            },
        ],
    },
    FamilyCandidate {
        name: "DejaVu Sans",
        faces: [
            FaceSource {
                path: "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
                index: 0,
            },
            FaceSource {
                path: "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
                index: 0,
            },
            FaceSource {
                path: "/usr/share/fonts/truetype/dejavu/DejaVuSans-Oblique.ttf",
                index: 0,
            },
            FaceSource {
                path: "/usr/share/fonts/truetype/dejavu/DejaVuSans-BoldOblique.ttf",
                index: 0,
            },
        ],
    },
];

/// File names expected inside a configured font directory.
pub const FONT_DIR_FILES: [&str; 4] = ["regular.ttf", "bold.ttf", "italic.ttf", "bold-italic.ttf"];

/// The four faces used to set a letter.
#[derive(Debug, Clone)]
pub struct FontSet {
    family: String,
    faces: [FontFace; 4],
}

impl FontSet {
    pub fn builtin() -> Self {
        Self {
            family: "Helvetica".to_string(),
            faces: FontStyle::ALL.map(|style| FontFace::Builtin(style.builtin())),
        }
    }

    /// Picks the richest available family: the configured directory first,
    /// then known host fonts, then Helvetica. Never fails.
    pub fn resolve(font_dir: Option<&Path>, search_system: bool) -> Self {
        if let Some(dir) = font_dir {
            let paths = FONT_DIR_FILES.map(|file| (dir.join(file), 0));
            match load_family(&paths) {
                Ok(faces) => {
                    info!(dir = %dir.display(), "Using fonts from configured directory");
                    return Self::from_truetype(dir.display().to_string(), faces);
                }
                Err(e) => warn!(
                    dir = %dir.display(),
                    error = %e,
                    "Configured font directory unusable, trying other fonts"
                ),
            }
        }

        if search_system {
            for candidate in SYSTEM_FAMILIES {
                let paths = candidate
                    .faces
                    .each_ref()
                    .map(|source| (PathBuf::from(source.path), source.index));
                if !paths.iter().all(|(path, _)| path.exists()) {
                    continue;
                }
                match load_family(&paths) {
                    Ok(faces) => {
                        info!(family = candidate.name, "Using system font family");
                        return Self::from_truetype(candidate.name.to_string(), faces);
                    }
                    Err(e) => debug!(family = candidate.name, error = %e, "System family skipped"),
                }
            }
        }

        info!("Using built-in Helvetica family");
        Self::builtin()
    }

    fn from_truetype(family: String, faces: [TrueTypeFace; 4]) -> Self {
        Self {
            family,
            faces: faces.map(|face| FontFace::TrueType(Arc::new(face))),
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn face(&self, style: FontStyle) -> &FontFace {
        &self.faces[style.index()]
    }

    pub fn measure(&self, style: FontStyle, text: &str, size: f32) -> f32 {
        self.face(style).measure(text, size)
    }

    pub fn is_builtin(&self) -> bool {
        self.faces
            .iter()
            .all(|face| matches!(face, FontFace::Builtin(_)))
    }
}

fn load_family(paths: &[(PathBuf, u32); 4]) -> Result<[TrueTypeFace; 4], FontError> {
    let [regular, bold, italic, bold_italic] = paths;
    Ok([
        TrueTypeFace::load(&regular.0, regular.1)?,
        TrueTypeFace::load(&bold.0, bold.1)?,
        TrueTypeFace::load(&italic.0, italic.1)?,
        TrueTypeFace::load(&bold_italic.0, bold_italic.1)?,
    ])
}
