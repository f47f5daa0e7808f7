//! PDF emission with `pdf-writer`.
//!
//! Every face is referenced with WinAnsiEncoding, so text is written as the
//! single-byte strings produced by [`winansi::encode`]. Built-in faces are
//! plain Type1 references; TrueType faces are subset to the bytes the letter
//! uses and embedded. All streams are deflated.

use std::borrow::Cow;
use std::collections::BTreeSet;

use pdf_writer::types::FontFlags;
use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str, TextStr};
use tracing::debug;

use crate::layout::fonts::{FontFace, FontSet, FontStyle, TrueTypeFace};
use crate::layout::geometry::PageGeometry;
use crate::layout::paginate::DrawCommand;
use crate::layout::subset::subset_winansi;
use crate::layout::winansi;

const DEFLATE_LEVEL: u8 = 6;

/// Offset of an underline below the baseline.
const UNDERLINE_OFFSET: f32 = 1.5;
const UNDERLINE_THICKNESS: f32 = 0.5;

const FONT_NAMES: [&[u8]; 4] = [b"F1", b"F2", b"F3", b"F4"];

/// Document metadata written to the info dictionary.
#[derive(Debug, Clone, Default)]
pub struct DocumentInfo {
    pub title: String,
    pub creator: String,
}

/// Allocates object ids in order.
struct RefAlloc(i32);

impl RefAlloc {
    fn next(&mut self) -> Ref {
        self.0 += 1;
        Ref::new(self.0)
    }
}

pub fn write_pdf(
    commands: &[DrawCommand],
    page_count: usize,
    fonts: &FontSet,
    geometry: &PageGeometry,
    info: &DocumentInfo,
) -> Vec<u8> {
    let page_count = page_count.max(1);
    let mut alloc = RefAlloc(0);
    let catalog_id = alloc.next();
    let pages_id = alloc.next();
    let info_id = alloc.next();
    let font_ids: Vec<Ref> = FontStyle::ALL.iter().map(|_| alloc.next()).collect();
    let page_ids: Vec<Ref> = (0..page_count).map(|_| alloc.next()).collect();
    let content_ids: Vec<Ref> = (0..page_count).map(|_| alloc.next()).collect();

    let mut pdf = Pdf::new();
    pdf.set_version(1, 7);

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(page_count as i32);

    {
        let mut document_info = pdf.document_info(info_id);
        if !info.title.is_empty() {
            document_info.title(TextStr(&info.title));
        }
        if !info.creator.is_empty() {
            document_info.creator(TextStr(&info.creator));
        }
    }

    let used = used_bytes(commands);
    for (style, font_id) in FontStyle::ALL.iter().zip(&font_ids) {
        match fonts.face(*style) {
            FontFace::Builtin(face) => {
                pdf.type1_font(*font_id)
                    .base_font(Name(face.base_font().as_bytes()))
                    .encoding_predefined(Name(b"WinAnsiEncoding"));
            }
            FontFace::TrueType(face) => {
                write_truetype(&mut pdf, &mut alloc, *font_id, face, &used[style.index()]);
            }
        }
    }

    for (index, (page_id, content_id)) in page_ids.iter().zip(&content_ids).enumerate() {
        {
            let mut page = pdf.page(*page_id);
            page.media_box(Rect::new(0.0, 0.0, geometry.width, geometry.height))
                .parent(pages_id)
                .contents(*content_id);
            let mut resources = page.resources();
            let mut font_dict = resources.fonts();
            for (name, font_id) in FONT_NAMES.iter().zip(&font_ids) {
                font_dict.pair(Name(*name), *font_id);
            }
        }

        let data = page_content(commands, index, geometry);
        let compressed = deflate(&data);
        pdf.stream(*content_id, &compressed).filter(Filter::FlateDecode);
    }

    pdf.finish()
}

/// WinAnsi bytes drawn in each style, indexed by [`FontStyle::index`].
fn used_bytes(commands: &[DrawCommand]) -> [BTreeSet<u8>; 4] {
    let mut used: [BTreeSet<u8>; 4] = Default::default();
    for command in commands {
        if let DrawCommand::Text { text, style, .. } = command {
            used[style.index()].extend(winansi::encode(text));
        }
    }
    used
}

fn deflate(data: &[u8]) -> Vec<u8> {
    miniz_oxide::deflate::compress_to_vec_zlib(data, DEFLATE_LEVEL)
}

fn write_truetype(
    pdf: &mut Pdf,
    alloc: &mut RefAlloc,
    font_id: Ref,
    face: &TrueTypeFace,
    used: &BTreeSet<u8>,
) {
    let descriptor_id = alloc.next();
    let file_id = alloc.next();
    let name = Name(face.postscript_name.as_bytes());

    {
        let mut font = pdf.indirect(font_id).dict();
        font.pair(Name(b"Type"), Name(b"Font"));
        font.pair(Name(b"Subtype"), Name(b"TrueType"));
        font.pair(Name(b"BaseFont"), name);
        font.pair(Name(b"FirstChar"), 32);
        font.pair(Name(b"LastChar"), 255);
        font.insert(Name(b"Widths")).array().items(face.pdf_widths());
        font.pair(Name(b"FontDescriptor"), descriptor_id);
        font.pair(Name(b"Encoding"), Name(b"WinAnsiEncoding"));
    }

    let mut flags = FontFlags::NON_SYMBOLIC;
    if face.italic {
        flags |= FontFlags::ITALIC;
    }
    if face.bold {
        flags |= FontFlags::FORCE_BOLD;
    }
    let [x_min, y_min, x_max, y_max] = face.bbox;

    pdf.font_descriptor(descriptor_id)
        .name(name)
        .flags(flags)
        .bbox(Rect::new(x_min, y_min, x_max, y_max))
        .italic_angle(if face.italic { -12.0 } else { 0.0 })
        .ascent(face.ascent)
        .descent(face.descent)
        .cap_height(face.cap_height)
        .stem_v(if face.bold { 120.0 } else { 80.0 })
        .font_file2(file_id);

    let program = match subset_winansi(&face.data, used) {
        Some(subset) => Cow::Owned(subset),
        None => {
            debug!(font = %face.postscript_name, "Font not subset, embedding whole face");
            Cow::Borrowed(face.data.as_slice())
        }
    };
    let compressed = deflate(&program);
    pdf.stream(file_id, &compressed)
        .filter(Filter::FlateDecode)
        .pair(Name(b"Length1"), program.len() as i32);
}

fn page_content(commands: &[DrawCommand], page: usize, geometry: &PageGeometry) -> Vec<u8> {
    let mut content = Content::new();

    for command in commands.iter().filter(|c| c.page() == page) {
        match command {
            DrawCommand::Text {
                x,
                y,
                text,
                style,
                size,
                underline,
                ..
            } => {
                let baseline = geometry.to_pdf_y(*y);
                let bytes = winansi::encode(text);
                content
                    .begin_text()
                    .set_font(Name(FONT_NAMES[style.index()]), *size)
                    .next_line(*x, baseline)
                    .show(Str(&bytes))
                    .end_text();
                if let Some(width) = underline {
                    let rule_y = baseline - UNDERLINE_OFFSET;
                    content
                        .set_line_width(UNDERLINE_THICKNESS)
                        .move_to(*x, rule_y)
                        .line_to(*x + width, rule_y)
                        .stroke();
                }
            }
            DrawCommand::Rule {
                x,
                y,
                length,
                thickness,
                ..
            } => {
                let rule_y = geometry.to_pdf_y(*y);
                content
                    .set_line_width(*thickness)
                    .move_to(*x, rule_y)
                    .line_to(*x + length, rule_y)
                    .stroke();
            }
        }
    }

    content.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::layout::fonts::FONT_DIR_FILES;

    const DEJAVU_DIR: &str = "/usr/share/fonts/truetype/dejavu";
    const DEJAVU_FILES: [&str; 4] = [
        "DejaVuSans.ttf",
        "DejaVuSans-Bold.ttf",
        "DejaVuSans-Oblique.ttf",
        "DejaVuSans-BoldOblique.ttf",
    ];

    fn text(page: usize, y: f32, text: &str) -> DrawCommand {
        DrawCommand::Text {
            page,
            x: 70.0,
            y,
            text: text.to_string(),
            style: FontStyle::Regular,
            size: 11.0,
            underline: None,
        }
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    fn write(commands: &[DrawCommand], pages: usize, fonts: &FontSet) -> Vec<u8> {
        write_pdf(
            commands,
            pages,
            fonts,
            &PageGeometry::din5008(),
            &DocumentInfo::default(),
        )
    }

    /// DejaVu copied under the file names a configured font directory uses.
    /// `None` when the host has no DejaVu.
    fn dejavu_font_set() -> Option<(tempfile::TempDir, FontSet)> {
        let dir = tempfile::tempdir().unwrap();
        for (source, target) in DEJAVU_FILES.iter().zip(FONT_DIR_FILES) {
            std::fs::copy(format!("{DEJAVU_DIR}/{source}"), dir.path().join(target)).ok()?;
        }
        let fonts = FontSet::resolve(Some(dir.path()), false);
        (!fonts.is_builtin()).then_some((dir, fonts))
    }

    #[test]
    fn test_writes_valid_header_and_trailer() {
        let bytes = write(&[text(0, 300.0, "Hallo")], 1, &FontSet::builtin());
        assert!(bytes.starts_with(b"%PDF-1.7"));
        assert!(bytes.ends_with(b"%%EOF") || bytes.ends_with(b"%%EOF\n"));
    }

    #[test]
    fn test_page_count_matches() {
        let bytes = write(
            &[text(0, 300.0, "eins"), text(1, 100.0, "zwei")],
            2,
            &FontSet::builtin(),
        );
        assert_eq!(count(&bytes, b"/Type /Page\n"), 2);
        assert_eq!(count(&bytes, b"/Count 2"), 1);
    }

    #[test]
    fn test_builtin_fonts_use_winansi() {
        let bytes = write(&[], 1, &FontSet::builtin());
        assert_eq!(count(&bytes, b"/Encoding /WinAnsiEncoding"), 4);
        assert_eq!(count(&bytes, b"/BaseFont /Helvetica-BoldOblique"), 1);
    }

    #[test]
    fn test_content_streams_are_deflated() {
        let bytes = write(
            &[text(0, 300.0, "eins"), text(1, 100.0, "zwei")],
            2,
            &FontSet::builtin(),
        );
        assert_eq!(count(&bytes, b"/Filter /FlateDecode"), 2);
        assert_eq!(count(&bytes, b"(eins) Tj"), 0);
    }

    #[test]
    fn test_deflate_round_trips() {
        let data = page_content(&[text(0, 300.0, "Hallo")], 0, &PageGeometry::din5008());
        let inflated = miniz_oxide::inflate::decompress_to_vec_zlib(&deflate(&data)).unwrap();
        assert_eq!(inflated, data);
    }

    #[test]
    fn test_text_is_shown_with_font_resource() {
        let data = page_content(&[text(0, 300.0, "Hallo")], 0, &PageGeometry::din5008());
        assert_eq!(count(&data, b"(Hallo) Tj"), 1);
        assert_eq!(count(&data, b"/F1 11 Tf"), 1);
    }

    #[test]
    fn test_page_content_only_draws_its_page() {
        let commands = [text(0, 300.0, "eins"), text(1, 100.0, "zwei")];
        let data = page_content(&commands, 1, &PageGeometry::din5008());
        assert_eq!(count(&data, b"(eins)"), 0);
        assert_eq!(count(&data, b"(zwei) Tj"), 1);
    }

    #[test]
    fn test_non_ascii_text_is_not_written_as_utf8() {
        let data = page_content(&[text(0, 300.0, "Grüße")], 0, &PageGeometry::din5008());
        assert_eq!(count(&data, "ü".as_bytes()), 0);
    }

    #[test]
    fn test_used_bytes_are_collected_per_style() {
        let mut bold = text(0, 300.0, "Ab");
        if let DrawCommand::Text { style, .. } = &mut bold {
            *style = FontStyle::Bold;
        }
        let used = used_bytes(&[text(0, 300.0, "ü a"), bold]);
        assert_eq!(used[0], BTreeSet::from([b' ', b'a', 0xFC]));
        assert_eq!(used[1], BTreeSet::from([b'A', b'b']));
        assert!(used[2].is_empty());
    }

    #[test]
    fn test_document_info_title() {
        let bytes = write_pdf(
            &[],
            1,
            &FontSet::builtin(),
            &PageGeometry::din5008(),
            &DocumentInfo {
                title: "Bewerbung".into(),
                creator: "letter-api".into(),
            },
        );
        assert_eq!(count(&bytes, b"/Title (Bewerbung)"), 1);
        assert_eq!(count(&bytes, b"/Creator (letter-api)"), 1);
    }

    #[test]
    fn test_truetype_faces_are_embedded_and_subset() {
        let Some((_dir, fonts)) = dejavu_font_set() else {
            return;
        };
        let commands = [text(0, 300.0, "Sehr geehrte Damen und Herren,"), text(0, 320.0, "Grüße")];
        let bytes = write(&commands, 1, &fonts);

        assert!(bytes.starts_with(b"%PDF-1.7"));
        assert_eq!(count(&bytes, b"/Subtype /TrueType"), 4);
        assert_eq!(count(&bytes, b"/FontFile2"), 4);
        assert_eq!(count(&bytes, b"/FirstChar 32"), 4);
        assert_eq!(count(&bytes, b"/Encoding /WinAnsiEncoding"), 4);
        assert_eq!(count(&bytes, b"/BaseFont /DejaVuSans-Bold\n"), 1);
        assert!(bytes.len() < 400_000, "letter is {} bytes", bytes.len());
    }
}
