//! Glyph subsetting for embedded TrueType faces.
//!
//! Glyph ids stay stable: glyphs the letter does not use become empty
//! outlines in `glyf`/`loca`, and tables a PDF viewer never reads are left
//! out. The face's own `cmap` and the WinAnsi `/Widths` therefore stay valid
//! without any remapping.

use std::collections::BTreeSet;

use crate::layout::fonts::{read_u16, read_u32};
use crate::layout::winansi;

const KEPT_TABLES: [&[u8; 4]; 13] = [
    b"OS/2", b"cmap", b"cvt ", b"fpgm", b"glyf", b"head", b"hhea", b"hmtx", b"loca", b"maxp",
    b"name", b"post", b"prep",
];

const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
const WE_HAVE_A_SCALE: u16 = 0x0008;
const MORE_COMPONENTS: u16 = 0x0020;
const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;

/// `head.checkSumAdjustment` is chosen so the whole file sums to this.
const CHECKSUM_MAGIC: u32 = 0xB1B0_AFBA;

struct TableRecord<'a> {
    tag: [u8; 4],
    data: &'a [u8],
}

/// Reduces a standalone TrueType font to the glyphs needed for `used`
/// WinAnsi bytes (plus `.notdef` and composite components).
///
/// Returns `None` for layouts it does not understand; the caller then embeds
/// the face whole.
pub fn subset_winansi(data: &[u8], used: &BTreeSet<u8>) -> Option<Vec<u8>> {
    let face = ttf_parser::Face::parse(data, 0).ok()?;
    let records = table_records(data)?;
    let head = find(&records, b"head")?;
    let long_loca = read_u16(head, 50)? != 0;
    let num_glyphs = read_u16(find(&records, b"maxp")?, 4)?;
    let loca = find(&records, b"loca")?;
    let glyf = find(&records, b"glyf")?;

    let outline = |gid: u16| glyph_outline(glyf, loca, long_loca, gid);

    let mut keep: BTreeSet<u16> = BTreeSet::from([0]);
    for &byte in used {
        if let Some(gid) = winansi::decode_byte(byte).and_then(|c| face.glyph_index(c)) {
            keep.insert(gid.0);
        }
    }
    let mut pending: Vec<u16> = keep.iter().copied().collect();
    while let Some(gid) = pending.pop() {
        for component in components(outline(gid)?)? {
            if component < num_glyphs && keep.insert(component) {
                pending.push(component);
            }
        }
    }

    let align = if long_loca { 4 } else { 2 };
    let mut new_glyf = Vec::new();
    let mut new_loca = Vec::with_capacity((usize::from(num_glyphs) + 1) * align);
    for gid in 0..num_glyphs {
        push_offset(&mut new_loca, new_glyf.len(), long_loca)?;
        if keep.contains(&gid) {
            new_glyf.extend_from_slice(outline(gid)?);
            while new_glyf.len() % align != 0 {
                new_glyf.push(0);
            }
        }
    }
    push_offset(&mut new_loca, new_glyf.len(), long_loca)?;

    // Glyph names are not needed for a cmap-driven face: version 3 keeps
    // only the fixed header.
    let post = find(&records, b"post").and_then(|post| post.get(..32)).map(|header| {
        let mut header = header.to_vec();
        header[..4].copy_from_slice(&0x0003_0000u32.to_be_bytes());
        header
    });

    let tables: Vec<([u8; 4], &[u8])> = records
        .iter()
        .filter(|record| KEPT_TABLES.iter().any(|tag| **tag == record.tag))
        .map(|record| {
            let table: &[u8] = match &record.tag {
                b"glyf" => &new_glyf,
                b"loca" => &new_loca,
                b"post" => post.as_deref().unwrap_or(record.data),
                _ => record.data,
            };
            (record.tag, table)
        })
        .collect();

    write_sfnt(read_u32(data, 0)?, &tables)
}

fn table_records(data: &[u8]) -> Option<Vec<TableRecord<'_>>> {
    let num_tables = usize::from(read_u16(data, 4)?);
    (0..num_tables)
        .map(|i| {
            let record = 12 + 16 * i;
            let tag: [u8; 4] = data.get(record..record + 4)?.try_into().ok()?;
            let offset = read_u32(data, record + 8)? as usize;
            let length = read_u32(data, record + 12)? as usize;
            let table = data.get(offset..offset.checked_add(length)?)?;
            Some(TableRecord { tag, data: table })
        })
        .collect()
}

fn find<'a>(records: &[TableRecord<'a>], tag: &[u8; 4]) -> Option<&'a [u8]> {
    records
        .iter()
        .find(|record| &record.tag == tag)
        .map(|record| record.data)
}

fn glyph_outline<'a>(glyf: &'a [u8], loca: &[u8], long_loca: bool, gid: u16) -> Option<&'a [u8]> {
    let i = usize::from(gid);
    let (start, end) = if long_loca {
        (read_u32(loca, 4 * i)? as usize, read_u32(loca, 4 * i + 4)? as usize)
    } else {
        (
            usize::from(read_u16(loca, 2 * i)?) * 2,
            usize::from(read_u16(loca, 2 * i + 2)?) * 2,
        )
    };
    glyf.get(start..end)
}

/// Glyph ids referenced by a composite outline; empty for simple glyphs.
fn components(outline: &[u8]) -> Option<Vec<u16>> {
    if outline.is_empty() || (read_u16(outline, 0)? as i16) >= 0 {
        return Some(Vec::new());
    }
    let mut found = Vec::new();
    let mut at = 10;
    loop {
        let flags = read_u16(outline, at)?;
        found.push(read_u16(outline, at + 2)?);
        at += 4;
        at += if flags & ARG_1_AND_2_ARE_WORDS != 0 { 4 } else { 2 };
        if flags & WE_HAVE_A_SCALE != 0 {
            at += 2;
        } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
            at += 4;
        } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
            at += 8;
        }
        if flags & MORE_COMPONENTS == 0 {
            return Some(found);
        }
    }
}

fn push_offset(loca: &mut Vec<u8>, offset: usize, long: bool) -> Option<()> {
    if long {
        loca.extend_from_slice(&u32::try_from(offset).ok()?.to_be_bytes());
    } else {
        loca.extend_from_slice(&u16::try_from(offset / 2).ok()?.to_be_bytes());
    }
    Some(())
}

fn write_sfnt(version: u32, tables: &[([u8; 4], &[u8])]) -> Option<Vec<u8>> {
    let num_tables = u16::try_from(tables.len()).ok().filter(|n| *n > 0)?;
    let entry_selector = (15 - num_tables.leading_zeros()) as u16;
    let search_range = (1u16 << entry_selector) * 16;
    let range_shift = num_tables * 16 - search_range;

    let mut out = Vec::new();
    out.extend_from_slice(&version.to_be_bytes());
    for field in [num_tables, search_range, entry_selector, range_shift] {
        out.extend_from_slice(&field.to_be_bytes());
    }

    let mut offset = 12 + 16 * tables.len();
    let mut head_offset = None;
    let mut body = Vec::new();
    for (tag, table) in tables {
        let mut table = table.to_vec();
        if tag == b"head" {
            table.get_mut(8..12)?.fill(0);
            head_offset = Some(offset);
        }
        out.extend_from_slice(tag);
        out.extend_from_slice(&checksum(&table).to_be_bytes());
        out.extend_from_slice(&u32::try_from(offset).ok()?.to_be_bytes());
        out.extend_from_slice(&u32::try_from(table.len()).ok()?.to_be_bytes());

        body.extend_from_slice(&table);
        while body.len() % 4 != 0 {
            body.push(0);
        }
        offset = 12 + 16 * tables.len() + body.len();
    }
    out.extend_from_slice(&body);

    if let Some(at) = head_offset {
        let adjustment = CHECKSUM_MAGIC.wrapping_sub(checksum(&out));
        out.get_mut(at + 8..at + 12)?
            .copy_from_slice(&adjustment.to_be_bytes());
    }
    Some(out)
}

fn checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}
