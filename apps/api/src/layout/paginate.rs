//! The one pagination loop shared by both body paths.
//!
//! Body builders emit a flat stream of [`FlowItem`]s. `paginate` walks that
//! stream with a call-local [`LayoutCursor`], commits each line at the cursor
//! and breaks to a new page before any line whose baseline would pass the
//! bottom margin. The result is a deterministic list of [`DrawCommand`]s.

use serde::Serialize;

use crate::layout::fonts::FontStyle;
use crate::layout::geometry::PageGeometry;

/// A run of text in one face, positioned relative to the text left edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Span {
    pub x: f32,
    pub text: String,
    pub style: FontStyle,
    pub size: f32,
    /// Measured width in points.
    pub width: f32,
    pub underline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FlowItem {
    /// One line of body text; the cursor advances by `advance` afterwards.
    Line { spans: Vec<Span>, advance: f32 },
    /// Extra vertical space. Dropped at the top of a page.
    Gap(f32),
}

/// Positioned output. `y` is measured from the top edge of the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DrawCommand {
    Text {
        page: usize,
        x: f32,
        y: f32,
        text: String,
        style: FontStyle,
        size: f32,
        /// Width of the rule drawn under the text, if underlined.
        underline: Option<f32>,
    },
    Rule {
        page: usize,
        x: f32,
        y: f32,
        length: f32,
        thickness: f32,
    },
}

impl DrawCommand {
    pub fn page(&self) -> usize {
        match self {
            DrawCommand::Text { page, .. } | DrawCommand::Rule { page, .. } => *page,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutCursor {
    pub page: usize,
    /// Baseline of the next line, from the top edge.
    pub y: f32,
    lines_on_page: usize,
}

impl LayoutCursor {
    pub fn new(y: f32) -> Self {
        Self {
            page: 0,
            y,
            lines_on_page: 0,
        }
    }

    fn break_page(&mut self, top: f32) {
        self.page += 1;
        self.y = top;
        self.lines_on_page = 0;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paginated {
    pub commands: Vec<DrawCommand>,
    pub page_count: usize,
}

pub fn paginate(items: &[FlowItem], geometry: &PageGeometry) -> Paginated {
    let mut cursor = LayoutCursor::new(geometry.body_start);
    let mut commands = Vec::new();
    let left = geometry.text_left();

    for item in items {
        match item {
            FlowItem::Gap(gap) => {
                if cursor.lines_on_page > 0 {
                    cursor.y += gap;
                }
            }
            FlowItem::Line { spans, advance } => {
                if cursor.y > geometry.body_bottom() {
                    cursor.break_page(geometry.continuation_top());
                }
                for span in spans {
                    commands.push(DrawCommand::Text {
                        page: cursor.page,
                        x: left + span.x,
                        y: cursor.y,
                        text: span.text.clone(),
                        style: span.style,
                        size: span.size,
                        underline: span.underline.then_some(span.width),
                    });
                }
                cursor.lines_on_page += 1;
                cursor.y += advance;
            }
        }
    }

    Paginated {
        commands,
        page_count: cursor.page + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> FlowItem {
        FlowItem::Line {
            spans: vec![Span {
                x: 0.0,
                text: text.to_string(),
                style: FontStyle::Regular,
                size: 11.0,
                width: 10.0,
                underline: false,
            }],
            advance: 14.0,
        }
    }

    fn text_positions(p: &Paginated) -> Vec<(usize, f32, String)> {
        p.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { page, y, text, .. } => Some((*page, *y, text.clone())),
                DrawCommand::Rule { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_empty_flow_is_single_page() {
        let p = paginate(&[], &PageGeometry::din5008());
        assert_eq!(p.page_count, 1);
        assert!(p.commands.is_empty());
    }

    #[test]
    fn test_first_line_at_body_start() {
        let g = PageGeometry::din5008();
        let p = paginate(&[line("a"), line("b")], &g);
        let pos = text_positions(&p);
        assert_eq!(pos[0].1, g.body_start);
        assert_eq!(pos[1].1, g.body_start + 14.0);
    }

    #[test]
    fn test_leading_gap_is_dropped() {
        let g = PageGeometry::din5008();
        let p = paginate(&[FlowItem::Gap(11.0), line("a")], &g);
        assert_eq!(text_positions(&p)[0].1, g.body_start);
    }

    #[test]
    fn test_gap_between_lines_is_applied() {
        let g = PageGeometry::din5008();
        let p = paginate(&[line("a"), FlowItem::Gap(11.0), line("b")], &g);
        assert_eq!(text_positions(&p)[1].1, g.body_start + 14.0 + 11.0);
    }

    #[test]
    fn test_breaks_before_line_past_bottom_margin() {
        let g = PageGeometry::din5008();
        let items: Vec<FlowItem> = (0..60).map(|i| line(&i.to_string())).collect();
        let p = paginate(&items, &g);
        assert!(p.page_count >= 2);

        let pos = text_positions(&p);
        for (_, y, _) in &pos {
            assert!(*y <= g.body_bottom());
        }
        let first_on_page_two = pos.iter().find(|(page, _, _)| *page == 1).unwrap();
        assert_eq!(first_on_page_two.1, g.continuation_top());
    }

    #[test]
    fn test_gap_does_not_carry_over_page_break() {
        let g = PageGeometry::din5008();
        let per_page = ((g.body_bottom() - g.body_start) / 14.0).floor() as usize + 1;
        let mut items: Vec<FlowItem> = (0..per_page).map(|_| line("x")).collect();
        items.push(FlowItem::Gap(11.0));
        items.push(line("next"));
        let p = paginate(&items, &g);
        let pos = text_positions(&p);
        let next = pos.iter().find(|(_, _, t)| t == "next").unwrap();
        assert_eq!(next.0, 1);
        assert_eq!(next.1, g.continuation_top());
    }

    #[test]
    fn test_underline_carries_span_width() {
        let g = PageGeometry::din5008();
        let item = FlowItem::Line {
            spans: vec![Span {
                x: 5.0,
                text: "unter".into(),
                style: FontStyle::Italic,
                size: 11.0,
                width: 23.5,
                underline: true,
            }],
            advance: 14.0,
        };
        let p = paginate(&[item], &g);
        match &p.commands[0] {
            DrawCommand::Text { x, underline, .. } => {
                assert_eq!(*x, g.text_left() + 5.0);
                assert_eq!(*underline, Some(23.5));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
