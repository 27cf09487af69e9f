//! The assembled font: directory lookup, required-table parsing, and
//! composite glyph resolution.

use crate::error::{PostScriptError, PsResult};

use super::{
    parse::SfntParser,
    table::{
        CompositeOffset, GlyfTable, Glyph, GlyphPoint, Head, Hhea, Hmtx, LocaTable, Maxp,
        RawGlyph, TableTag,
    },
};

/// Composite glyphs may nest; beyond this depth the font is rejected rather
/// than recursed into
const MAX_COMPONENT_DEPTH: usize = 8;

#[derive(Debug)]
pub struct TrueTypeFontFile {
    pub(crate) head: Head,
    pub(crate) maxp: Maxp,
    pub(crate) hhea: Hhea,
    pub(crate) hmtx: Hmtx,
    pub(crate) loca: LocaTable,
    pub(crate) glyf: GlyfTable,
}

impl TrueTypeFontFile {
    /// Parses an sfnt byte buffer (the concatenated `/sfnts` strings of a
    /// Type 42 font). Bad magic, an unsupported sfntVersion, or a missing
    /// required table fail with `invalidfont`
    pub fn parse(buffer: &[u8]) -> PsResult<Self> {
        let mut parser = SfntParser::new(buffer);
        let directory = parser.read_font_directory()?;

        let table_offset = |tag: TableTag| -> PsResult<usize> {
            directory
                .find_table(tag)
                .map(|entry| entry.offset as usize)
                .ok_or(anyhow::anyhow!(PostScriptError::InvalidFont))
        };

        let head = parser.read_head(table_offset(TableTag::HEAD)?)?;
        let maxp = parser.read_maxp(table_offset(TableTag::MAXP)?)?;
        let hhea = parser.read_hhea(table_offset(TableTag::HHEA)?)?;
        let hmtx = parser.read_hmtx(
            table_offset(TableTag::HMTX)?,
            hhea.number_of_h_metrics,
            maxp.num_glyphs,
        )?;
        let loca = parser.read_loca(
            table_offset(TableTag::LOCA)?,
            maxp.num_glyphs,
            head.index_to_loc_format,
        )?;

        let glyf_offset = table_offset(TableTag::GLYF)?;
        let mut raw_glyphs = Vec::with_capacity(usize::from(maxp.num_glyphs));

        for index in 0..usize::from(maxp.num_glyphs) {
            let (start, length) = loca
                .glyph_range(index)
                .ok_or(anyhow::anyhow!(PostScriptError::InvalidFont))?;

            if length == 0 {
                raw_glyphs.push(RawGlyph::Empty);
            } else {
                raw_glyphs.push(parser.read_glyph(glyf_offset + start as usize)?);
            }
        }

        let glyf = GlyfTable {
            glyphs: resolve_glyphs(&raw_glyphs)?,
        };

        Ok(Self {
            head,
            maxp,
            hhea,
            hmtx,
            loca,
            glyf,
        })
    }

    pub fn glyph(&self, index: usize) -> Option<&Glyph> {
        self.glyf.glyphs.get(index)
    }

    pub fn num_glyphs(&self) -> u16 {
        self.maxp.num_glyphs
    }

    pub fn units_per_em(&self) -> u16 {
        self.head.units_per_em
    }

    /// Advance width in font units; glyphs past numberOfHMetrics reuse the
    /// last advance
    pub fn advance_width(&self, index: usize) -> u16 {
        self.hmtx.advance_width(index)
    }

    pub fn left_side_bearing(&self, index: usize) -> i16 {
        self.hmtx.left_side_bearing(index)
    }
}

/// Flattens every glyph, resolving composites recursively with memoization
/// keyed by glyph index
fn resolve_glyphs(raw_glyphs: &[RawGlyph]) -> PsResult<Vec<Glyph>> {
    let mut resolved: Vec<Option<Glyph>> = vec![None; raw_glyphs.len()];

    for index in 0..raw_glyphs.len() {
        resolve_glyph(index, raw_glyphs, &mut resolved, 0)?;
    }

    Ok(resolved
        .into_iter()
        .map(|glyph| glyph.expect("every glyph index was resolved"))
        .collect())
}

fn resolve_glyph(
    index: usize,
    raw_glyphs: &[RawGlyph],
    resolved: &mut Vec<Option<Glyph>>,
    depth: usize,
) -> PsResult<Glyph> {
    if depth > MAX_COMPONENT_DEPTH {
        anyhow::bail!(PostScriptError::InvalidFont);
    }

    if let Some(glyph) = resolved.get(index).and_then(Option::as_ref) {
        return Ok(glyph.clone());
    }

    let raw = raw_glyphs
        .get(index)
        .ok_or(anyhow::anyhow!(PostScriptError::InvalidFont))?;

    let glyph = match raw {
        RawGlyph::Empty => Glyph::empty(),
        RawGlyph::Simple(simple) => Glyph {
            end_points_of_contours: simple.end_points_of_contours.clone(),
            points: simple.points.clone(),
        },
        RawGlyph::Composite(components) => {
            let mut assembled = Glyph::empty();

            for component in components {
                let child = resolve_glyph(
                    usize::from(component.glyph_index),
                    raw_glyphs,
                    resolved,
                    depth + 1,
                )?;

                let [a, b, c, d] = component.transform;
                let transformed: Vec<GlyphPoint> = child
                    .points
                    .iter()
                    .map(|p| GlyphPoint {
                        x: a * p.x + c * p.y,
                        y: b * p.x + d * p.y,
                        on_curve: p.on_curve,
                    })
                    .collect();

                let (dx, dy) = match component.offset {
                    CompositeOffset::XY { dx, dy } => {
                        if component.scaled_offset {
                            (a * dx + c * dy, b * dx + d * dy)
                        } else {
                            (dx, dy)
                        }
                    }
                    CompositeOffset::Anchor { parent, child } => {
                        let parent_point = assembled
                            .points
                            .get(usize::from(parent))
                            .ok_or(anyhow::anyhow!(PostScriptError::InvalidFont))?;
                        let child_point = transformed
                            .get(usize::from(child))
                            .ok_or(anyhow::anyhow!(PostScriptError::InvalidFont))?;

                        (
                            parent_point.x - child_point.x,
                            parent_point.y - child_point.y,
                        )
                    }
                };

                let base = assembled.points.len() as u16;

                for end in &child.end_points_of_contours {
                    assembled.end_points_of_contours.push(base + end);
                }

                assembled.points.extend(transformed.iter().map(|p| GlyphPoint {
                    x: p.x + dx,
                    y: p.y + dy,
                    on_curve: p.on_curve,
                }));
            }

            assembled
        }
    };

    if let Some(slot) = resolved.get_mut(index) {
        *slot = Some(glyph.clone());
    }

    Ok(glyph)
}
