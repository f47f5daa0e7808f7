//! DIN 5008 Form B page geometry on A4.
//!
//! All positions are in PDF points. Vertical anchors are measured downward
//! from the top edge of the page; `to_pdf_y` flips them into PDF space.

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::models::letter::MarginOverride;

/// Points per millimetre.
pub const PT_PER_MM: f32 = 72.0 / 25.4;

pub fn mm(value: f32) -> f32 {
    value * PT_PER_MM
}

const A4_WIDTH_MM: f32 = 210.0;
const A4_HEIGHT_MM: f32 = 297.0;

const DEFAULT_TOP_MM: f32 = 25.0;
const DEFAULT_BOTTOM_MM: f32 = 30.0;
const DEFAULT_LEFT_MM: f32 = 25.0;
const DEFAULT_RIGHT_MM: f32 = 20.0;

/// First sender-block baseline sits this far below the top margin.
const SENDER_BLOCK_INSET_MM: f32 = 2.0;
const SENDER_LINE_MM: f32 = 45.0;
const ADDRESS_FIELD_TOP_MM: f32 = 50.8;
const ADDRESS_FIELD_HEIGHT_MM: f32 = 45.0;
/// Reference line of Form B, used for place and date.
const DATE_LINE_MM: f32 = 97.4;
const SUBJECT_LINE_MM: f32 = 103.4;
const BODY_START_MM: f32 = 115.0;

const MIN_TEXT_WIDTH_MM: f32 = 60.0;
/// Room that must remain for at least one body line.
const MIN_LINE_ROOM_MM: f32 = 5.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("margin '{0}' must be a finite, non-negative length")]
    InvalidMargin(&'static str),

    #[error("text width of {0:.1}mm is below the minimum of {MIN_TEXT_WIDTH_MM}mm")]
    TextTooNarrow(f32),

    #[error("top margin pushes the sender block below the sender line")]
    TopMarginTooLarge,

    #[error("bottom margin leaves no room for body text")]
    BottomMarginTooLarge,

    #[error("anchor order violated: {0}")]
    AnchorOrder(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margins: Margins,
    pub sender_block_top: f32,
    pub sender_line: f32,
    pub address_field_top: f32,
    pub address_field_height: f32,
    pub date_line: f32,
    pub subject_line: f32,
    pub body_start: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::din5008()
    }
}

impl PageGeometry {
    pub fn din5008() -> Self {
        Self::with_margins_mm(
            DEFAULT_TOP_MM,
            DEFAULT_BOTTOM_MM,
            DEFAULT_LEFT_MM,
            DEFAULT_RIGHT_MM,
        )
    }

    fn with_margins_mm(top: f32, bottom: f32, left: f32, right: f32) -> Self {
        Self {
            width: mm(A4_WIDTH_MM),
            height: mm(A4_HEIGHT_MM),
            margins: Margins {
                top: mm(top),
                bottom: mm(bottom),
                left: mm(left),
                right: mm(right),
            },
            sender_block_top: mm(top + SENDER_BLOCK_INSET_MM),
            sender_line: mm(SENDER_LINE_MM),
            address_field_top: mm(ADDRESS_FIELD_TOP_MM),
            address_field_height: mm(ADDRESS_FIELD_HEIGHT_MM),
            date_line: mm(DATE_LINE_MM),
            subject_line: mm(SUBJECT_LINE_MM),
            body_start: mm(BODY_START_MM),
        }
    }

    /// Applies a partial override, keeping defaults for unset sides.
    pub fn try_with_override(overrides: &MarginOverride) -> Result<Self, GeometryError> {
        let side = |value: Option<f32>, default: f32, name: &'static str| match value {
            Some(v) if !v.is_finite() || v < 0.0 => Err(GeometryError::InvalidMargin(name)),
            Some(v) => Ok(v),
            None => Ok(default),
        };
        let geometry = Self::with_margins_mm(
            side(overrides.top, DEFAULT_TOP_MM, "top")?,
            side(overrides.bottom, DEFAULT_BOTTOM_MM, "bottom")?,
            side(overrides.left, DEFAULT_LEFT_MM, "left")?,
            side(overrides.right, DEFAULT_RIGHT_MM, "right")?,
        );
        geometry.validate()?;
        Ok(geometry)
    }

    /// Geometry for one render call. An override that breaks the layout
    /// invariants is dropped in favour of the defaults.
    pub fn for_request(overrides: Option<&MarginOverride>) -> Self {
        match overrides.filter(|o| !o.is_empty()) {
            None => Self::din5008(),
            Some(o) => Self::try_with_override(o).unwrap_or_else(|e| {
                warn!(error = %e, ?o, "Margin override rejected, using DIN 5008 defaults");
                Self::din5008()
            }),
        }
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        let width_mm = self.text_width() / PT_PER_MM;
        if width_mm < MIN_TEXT_WIDTH_MM {
            return Err(GeometryError::TextTooNarrow(width_mm));
        }
        if self.sender_block_top >= self.sender_line {
            return Err(GeometryError::TopMarginTooLarge);
        }
        if self.address_field_top >= self.date_line {
            return Err(GeometryError::AnchorOrder("address field must precede date line"));
        }
        if self.date_line >= self.subject_line {
            return Err(GeometryError::AnchorOrder("date line must precede subject"));
        }
        if self.subject_line >= self.body_start {
            return Err(GeometryError::AnchorOrder("subject must precede body start"));
        }
        let room = mm(MIN_LINE_ROOM_MM);
        if self.body_start + room > self.body_bottom()
            || self.continuation_top() + room > self.body_bottom()
        {
            return Err(GeometryError::BottomMarginTooLarge);
        }
        Ok(())
    }

    /// Horizontal budget available to word wrap.
    pub fn text_width(&self) -> f32 {
        self.width - self.margins.left - self.margins.right
    }

    pub fn text_left(&self) -> f32 {
        self.margins.left
    }

    pub fn text_right(&self) -> f32 {
        self.width - self.margins.right
    }

    /// Lowest baseline (from the top) a body line may occupy.
    pub fn body_bottom(&self) -> f32 {
        self.height - self.margins.bottom
    }

    /// Where body text resumes on pages after the first.
    pub fn continuation_top(&self) -> f32 {
        self.margins.top
    }

    pub fn to_pdf_y(&self, from_top: f32) -> f32 {
        self.height - from_top
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn test_din5008_defaults() {
        let g = PageGeometry::din5008();
        assert!(approx(g.width, 595.28));
        assert!(approx(g.height, 841.89));
        assert!(approx(g.margins.left, mm(25.0)));
        assert!(approx(g.text_width(), mm(165.0)));
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_anchor_order() {
        let g = PageGeometry::din5008();
        assert!(g.sender_block_top < g.sender_line);
        assert!(g.sender_line < g.address_field_top);
        assert!(g.address_field_top + g.address_field_height < g.date_line);
        assert!(g.date_line < g.subject_line);
        assert!(g.subject_line < g.body_start);
        assert!(g.body_start < g.body_bottom());
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let g = PageGeometry::try_with_override(&MarginOverride {
            left: Some(30.0),
            ..Default::default()
        })
        .unwrap();
        assert!(approx(g.margins.left, mm(30.0)));
        assert!(approx(g.margins.right, mm(20.0)));
        assert!(approx(g.text_width(), mm(160.0)));
    }

    #[test]
    fn test_top_override_moves_sender_block_and_continuation() {
        let g = PageGeometry::try_with_override(&MarginOverride {
            top: Some(15.0),
            ..Default::default()
        })
        .unwrap();
        assert!(approx(g.continuation_top(), mm(15.0)));
        assert!(approx(g.sender_block_top, mm(17.0)));
    }

    #[test]
    fn test_rejects_negative_margin() {
        let err = PageGeometry::try_with_override(&MarginOverride {
            bottom: Some(-1.0),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, GeometryError::InvalidMargin("bottom"));
    }

    #[test]
    fn test_rejects_narrow_text() {
        let result = PageGeometry::try_with_override(&MarginOverride {
            left: Some(80.0),
            right: Some(80.0),
            ..Default::default()
        });
        assert!(matches!(result, Err(GeometryError::TextTooNarrow(_))));
    }

    #[test]
    fn test_rejects_top_past_sender_line() {
        let result = PageGeometry::try_with_override(&MarginOverride {
            top: Some(50.0),
            ..Default::default()
        });
        assert_eq!(result.unwrap_err(), GeometryError::TopMarginTooLarge);
    }

    #[test]
    fn test_rejects_bottom_over_body() {
        let result = PageGeometry::try_with_override(&MarginOverride {
            bottom: Some(200.0),
            ..Default::default()
        });
        assert_eq!(result.unwrap_err(), GeometryError::BottomMarginTooLarge);
    }

    #[test]
    fn test_for_request_falls_back_on_invalid_override() {
        let bad = MarginOverride {
            left: Some(f32::NAN),
            ..Default::default()
        };
        assert_eq!(PageGeometry::for_request(Some(&bad)), PageGeometry::din5008());
        assert_eq!(PageGeometry::for_request(None), PageGeometry::din5008());
    }

    #[test]
    fn test_to_pdf_y_flips() {
        let g = PageGeometry::din5008();
        assert!(approx(g.to_pdf_y(0.0), g.height));
        assert!(approx(g.to_pdf_y(g.height), 0.0));
    }
}
