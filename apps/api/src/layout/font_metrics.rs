//! Glyph-width tables for the built-in Helvetica family.
//!
//! Widths are the Adobe core-font metrics in thousandths of an em, indexed by
//! WinAnsi byte. The oblique faces share the upright widths, so two tables cover
//! all four faces. Characters outside WinAnsi are measured (and later drawn) as
//! `?`.
//!
//! Index layout of `ascii`: `[i]` = width of byte `i + 32`, 0x20 (space) through
//! 0x7E (~). `high` covers 0x80..=0xFF; unassigned slots hold 0 and are never
//! produced by the encoder.

use serde::{Deserialize, Serialize};

use crate::layout::winansi;

// ────────────────────────────────────────────────────────────────────────────
// Built-in faces
// ────────────────────────────────────────────────────────────────────────────

/// The four faces of the standard-14 Helvetica family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuiltinFace {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
}

impl BuiltinFace {
    /// PostScript name written as `/BaseFont`.
    pub fn base_font(self) -> &'static str {
        match self {
            BuiltinFace::Helvetica => "Helvetica",
            BuiltinFace::HelveticaBold => "Helvetica-Bold",
            BuiltinFace::HelveticaOblique => "Helvetica-Oblique",
            BuiltinFace::HelveticaBoldOblique => "Helvetica-BoldOblique",
        }
    }

    pub fn metrics(self) -> &'static FontMetricTable {
        match self {
            BuiltinFace::Helvetica | BuiltinFace::HelveticaOblique => &HELVETICA_TABLE,
            BuiltinFace::HelveticaBold | BuiltinFace::HelveticaBoldOblique => {
                &HELVETICA_BOLD_TABLE
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Metric table
// ────────────────────────────────────────────────────────────────────────────

pub struct FontMetricTable {
    ascii: [u16; 95],
    high: [u16; 128],
}

impl FontMetricTable {
    /// Width of one WinAnsi byte in thousandths of an em.
    pub fn byte_width(&self, byte: u8) -> u16 {
        match byte {
            0x20..=0x7E => self.ascii[(byte - 0x20) as usize],
            0x80..=0xFF => self.high[(byte - 0x80) as usize],
            _ => 0,
        }
    }

    /// Rendered width of `s` in em units.
    pub fn measure_str(&self, s: &str) -> f32 {
        let units: u32 = winansi::encode(s)
            .into_iter()
            .map(|byte| u32::from(self.byte_width(byte)))
            .sum();
        units as f32 / 1000.0
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Static width tables
// ────────────────────────────────────────────────────────────────────────────

/// Helvetica and Helvetica-Oblique.
static HELVETICA_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    ascii: [
        // sp   !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
        278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
        // 0-9
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
        // :    ;    <    =    >    ?    @
        278, 278, 584, 584, 584, 556, 1015,
        // A    B    C    D    E    F    G    H    I    J    K    L    M
        667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
        // N    O    P    Q    R    S    T    U    V    W    X    Y    Z
        722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
        // [    \    ]    ^    _    `
        278, 278, 278, 469, 556, 333,
        // a    b    c    d    e    f    g    h    i    j    k    l    m
        556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
        // n    o    p    q    r    s    t    u    v    w    x    y    z
        556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
        // {    |    }    ~
        334, 260, 334, 584,
    ],
    #[rustfmt::skip]
    high: [
        // 0x80 €   -    ‚    ƒ    „    …     †    ‡    ˆ    ‰     Š    ‹    Œ     -    Ž    -
        556, 0,   222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0,   611, 0,
        // 0x90 -   ‘    ’    “    ”    •    –    —     ˜    ™     š    ›    œ    -    ž    Ÿ
        0,   222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 0,   500, 667,
        // 0xA0 nbsp ¡   ¢    £    ¤    ¥    ¦    §    ¨    ©    ª    «    ¬    shy  ®    ¯
        278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
        // 0xB0 °   ±    ²    ³    ´    µ    ¶    ·    ¸    ¹    º    »    ¼    ½    ¾    ¿
        400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
        // 0xC0 À   Á    Â    Ã    Ä    Å    Æ     Ç    È    É    Ê    Ë    Ì    Í    Î    Ï
        667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
        // 0xD0 Ð   Ñ    Ò    Ó    Ô    Õ    Ö    ×    Ø    Ù    Ú    Û    Ü    Ý    Þ    ß
        722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
        // 0xE0 à   á    â    ã    ä    å    æ    ç    è    é    ê    ë    ì    í    î    ï
        556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
        // 0xF0 ð   ñ    ò    ó    ô    õ    ö    ÷    ø    ù    ú    û    ü    ý    þ    ÿ
        556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
    ],
};

/// Helvetica-Bold and Helvetica-BoldOblique.
static HELVETICA_BOLD_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    ascii: [
        // sp   !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
        278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
        // 0-9
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
        // :    ;    <    =    >    ?    @
        333, 333, 584, 584, 584, 611, 975,
        // A    B    C    D    E    F    G    H    I    J    K    L    M
        722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
        // N    O    P    Q    R    S    T    U    V    W    X    Y    Z
        722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
        // [    \    ]    ^    _    `
        333, 278, 333, 584, 556, 333,
        // a    b    c    d    e    f    g    h    i    j    k    l    m
        556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
        // n    o    p    q    r    s    t    u    v    w    x    y    z
        611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
        // {    |    }    ~
        389, 280, 389, 584,
    ],
    #[rustfmt::skip]
    high: [
        // 0x80
        556, 0,   278, 556, 500, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0,   611, 0,
        // 0x90
        0,   278, 278, 500, 500, 350, 556, 1000, 333, 1000, 556, 333, 944, 0,   500, 667,
        // 0xA0
        278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333,
        // 0xB0
        400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611,
        // 0xC0
        722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
        // 0xD0
        722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
        // 0xE0
        556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278,
        // 0xF0
        611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556,
    ],
};

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
