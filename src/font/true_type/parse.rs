//! Cursor-based big-endian reader for sfnt tables. Truncated or malformed
//! data surfaces as `invalidfont`.

use crate::error::{PostScriptError, PsResult};

use super::{
    data_types::{F2Dot14, Fixed},
    table::{
        CompositeComponent, CompositeFlags, CompositeOffset, DirectoryTableEntry, FontDirectory,
        GlyphPoint, Head, Hhea, Hmtx, LocaTable, Maxp, OutlineFlag, RawGlyph, SimpleGlyph,
        TableTag, HEAD_MAGIC,
    },
};

const SFNT_VERSION_TRUE_TYPE: u32 = 0x0001_0000;

pub(crate) struct SfntParser<'a> {
    buffer: &'a [u8],
    cursor: usize,
}

impl<'a> SfntParser<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    pub fn seek(&mut self, offset: usize) {
        self.cursor = offset;
    }

    fn read_u8(&mut self) -> PsResult<u8> {
        let byte = self
            .buffer
            .get(self.cursor)
            .copied()
            .ok_or(anyhow::anyhow!(PostScriptError::InvalidFont))?;

        self.cursor += 1;

        Ok(byte)
    }

    fn read_u16(&mut self) -> PsResult<u16> {
        let b1 = self.read_u8()?;
        let b2 = self.read_u8()?;

        Ok(u16::from_be_bytes([b1, b2]))
    }

    fn read_i16(&mut self) -> PsResult<i16> {
        Ok(self.read_u16()? as i16)
    }

    fn read_u32(&mut self) -> PsResult<u32> {
        let hi = self.read_u16()?;
        let lo = self.read_u16()?;

        Ok((u32::from(hi) << 16) | u32::from(lo))
    }

    fn read_f2dot14(&mut self) -> PsResult<F2Dot14> {
        Ok(F2Dot14(self.read_i16()?))
    }

    fn read_tag(&mut self) -> PsResult<TableTag> {
        let mut tag = [0u8; 4];

        for byte in &mut tag {
            *byte = self.read_u8()?;
        }

        Ok(TableTag::new(tag))
    }

    fn skip(&mut self, n: usize) {
        self.cursor += n;
    }

    /// Offset subtable plus the table directory. Only plain TrueType
    /// outlines are supported; any other sfntVersion is an invalid font
    pub fn read_font_directory(&mut self) -> PsResult<FontDirectory> {
        let version = self.read_u32()?;

        if version != SFNT_VERSION_TRUE_TYPE {
            anyhow::bail!(PostScriptError::InvalidFont);
        }

        let number_of_tables = self.read_u16()?;
        // searchRange, entrySelector, rangeShift are redundant with the count
        self.skip(6);

        let mut entries = Vec::with_capacity(usize::from(number_of_tables));

        for _ in 0..number_of_tables {
            entries.push(DirectoryTableEntry {
                tag: self.read_tag()?,
                checksum: self.read_u32()?,
                offset: self.read_u32()?,
                length: self.read_u32()?,
            });
        }

        Ok(FontDirectory { entries })
    }

    pub fn read_head(&mut self, offset: usize) -> PsResult<Head> {
        self.seek(offset);

        let _version = self.read_u32()?;
        let font_revision = Fixed(self.read_u32()?);
        let _checksum_adjustment = self.read_u32()?;

        if self.read_u32()? != HEAD_MAGIC {
            anyhow::bail!(PostScriptError::InvalidFont);
        }

        let flags = self.read_u16()?;
        let units_per_em = self.read_u16()?;

        // created and modified timestamps
        self.skip(16);

        Ok(Head {
            font_revision,
            flags,
            units_per_em,
            x_min: self.read_i16()?,
            y_min: self.read_i16()?,
            x_max: self.read_i16()?,
            y_max: self.read_i16()?,
            mac_style: self.read_u16()?,
            lowest_rec_ppem: self.read_u16()?,
            font_direction_hint: self.read_i16()?,
            index_to_loc_format: self.read_i16()?,
            glyph_data_format: self.read_i16()?,
        })
    }

    pub fn read_maxp(&mut self, offset: usize) -> PsResult<Maxp> {
        self.seek(offset);

        Ok(Maxp {
            version: Fixed(self.read_u32()?),
            num_glyphs: self.read_u16()?,
        })
    }

    pub fn read_hhea(&mut self, offset: usize) -> PsResult<Hhea> {
        self.seek(offset);

        let _version = self.read_u32()?;
        let ascent = self.read_i16()?;
        let descent = self.read_i16()?;
        let line_gap = self.read_i16()?;
        let advance_width_max = self.read_u16()?;

        // minLeftSideBearing through metricDataFormat
        self.skip(22);

        Ok(Hhea {
            ascent,
            descent,
            line_gap,
            advance_width_max,
            number_of_h_metrics: self.read_u16()?,
        })
    }

    pub fn read_hmtx(
        &mut self,
        offset: usize,
        number_of_h_metrics: u16,
        num_glyphs: u16,
    ) -> PsResult<Hmtx> {
        self.seek(offset);

        let mut advance_widths = Vec::with_capacity(usize::from(number_of_h_metrics));
        let mut left_side_bearings = Vec::with_capacity(usize::from(num_glyphs));

        for _ in 0..number_of_h_metrics {
            advance_widths.push(self.read_u16()?);
            left_side_bearings.push(self.read_i16()?);
        }

        for _ in number_of_h_metrics..num_glyphs {
            left_side_bearings.push(self.read_i16()?);
        }

        Ok(Hmtx {
            advance_widths,
            left_side_bearings,
        })
    }

    /// numGlyphs + 1 entries; the short format stores byte offsets divided
    /// by two
    pub fn read_loca(
        &mut self,
        offset: usize,
        num_glyphs: u16,
        index_to_loc_format: i16,
    ) -> PsResult<LocaTable> {
        self.seek(offset);

        let count = usize::from(num_glyphs) + 1;
        let mut offsets = Vec::with_capacity(count);

        for _ in 0..count {
            let entry = if index_to_loc_format == 0 {
                u32::from(self.read_u16()?) * 2
            } else {
                self.read_u32()?
            };

            offsets.push(entry);
        }

        Ok(LocaTable { offsets })
    }

    /// One glyph record at an absolute buffer offset
    pub fn read_glyph(&mut self, offset: usize) -> PsResult<RawGlyph> {
        self.seek(offset);

        let number_of_contours = self.read_i16()?;

        // bounding box is recomputed from the outline when needed
        self.skip(8);

        if number_of_contours >= 0 {
            self.read_simple_glyph(number_of_contours as u16)
                .map(RawGlyph::Simple)
        } else {
            self.read_composite_glyph().map(RawGlyph::Composite)
        }
    }

    fn read_simple_glyph(&mut self, number_of_contours: u16) -> PsResult<SimpleGlyph> {
        let mut end_points_of_contours = Vec::with_capacity(usize::from(number_of_contours));

        for _ in 0..number_of_contours {
            end_points_of_contours.push(self.read_u16()?);
        }

        let point_count = match end_points_of_contours.last() {
            Some(&last) => usize::from(last) + 1,
            None => 0,
        };

        let instruction_length = usize::from(self.read_u16()?);
        let mut instructions = Vec::with_capacity(instruction_length);
        for _ in 0..instruction_length {
            instructions.push(self.read_u8()?);
        }

        // flags, with REPEAT expansion
        let mut flags = Vec::with_capacity(point_count);
        while flags.len() < point_count {
            let flag = self.read_u8()?;
            flags.push(flag);

            if flag & OutlineFlag::REPEAT != 0 {
                let extra = self.read_u8()?;
                for _ in 0..extra {
                    flags.push(flag);
                }
            }
        }

        if flags.len() != point_count {
            anyhow::bail!(PostScriptError::InvalidFont);
        }

        let xs = self.read_coordinates(
            &flags,
            OutlineFlag::X_SHORT_VECTOR,
            OutlineFlag::X_SAME_OR_POSITIVE,
        )?;
        let ys = self.read_coordinates(
            &flags,
            OutlineFlag::Y_SHORT_VECTOR,
            OutlineFlag::Y_SAME_OR_POSITIVE,
        )?;

        let points = flags
            .iter()
            .zip(xs)
            .zip(ys)
            .map(|((flag, x), y)| GlyphPoint {
                x: f64::from(x),
                y: f64::from(y),
                on_curve: flag & OutlineFlag::ON_CURVE != 0,
            })
            .collect();

        Ok(SimpleGlyph {
            end_points_of_contours,
            instructions,
            points,
        })
    }

    /// Delta-decompressed absolute coordinates for one axis. A short
    /// coordinate is one unsigned byte with the sign in `same_or_positive`;
    /// a long one is either "same as previous" or a signed 16-bit delta
    fn read_coordinates(
        &mut self,
        flags: &[u8],
        short_mask: u8,
        same_or_positive_mask: u8,
    ) -> PsResult<Vec<i32>> {
        let mut coordinates = Vec::with_capacity(flags.len());
        let mut current: i32 = 0;

        for &flag in flags {
            let delta = if flag & short_mask != 0 {
                let magnitude = i32::from(self.read_u8()?);

                if flag & same_or_positive_mask != 0 {
                    magnitude
                } else {
                    -magnitude
                }
            } else if flag & same_or_positive_mask != 0 {
                0
            } else {
                i32::from(self.read_i16()?)
            };

            current += delta;
            coordinates.push(current);
        }

        Ok(coordinates)
    }

    fn read_composite_glyph(&mut self) -> PsResult<Vec<CompositeComponent>> {
        let mut components = Vec::new();

        loop {
            let flags = self.read_u16()?;
            let glyph_index = self.read_u16()?;

            let words = flags & CompositeFlags::ARG_1_AND_2_ARE_WORDS != 0;
            let xy_values = flags & CompositeFlags::ARGS_ARE_XY_VALUES != 0;

            let offset = if xy_values {
                let (dx, dy) = if words {
                    (f64::from(self.read_i16()?), f64::from(self.read_i16()?))
                } else {
                    (
                        f64::from(self.read_u8()? as i8),
                        f64::from(self.read_u8()? as i8),
                    )
                };

                CompositeOffset::XY { dx, dy }
            } else {
                let (parent, child) = if words {
                    (self.read_u16()?, self.read_u16()?)
                } else {
                    (u16::from(self.read_u8()?), u16::from(self.read_u8()?))
                };

                CompositeOffset::Anchor { parent, child }
            };

            let transform = if flags & CompositeFlags::WE_HAVE_A_SCALE != 0 {
                let scale = self.read_f2dot14()?.to_f64();
                [scale, 0.0, 0.0, scale]
            } else if flags & CompositeFlags::WE_HAVE_AN_X_AND_Y_SCALE != 0 {
                let x_scale = self.read_f2dot14()?.to_f64();
                let y_scale = self.read_f2dot14()?.to_f64();
                [x_scale, 0.0, 0.0, y_scale]
            } else if flags & CompositeFlags::WE_HAVE_A_TWO_BY_TWO != 0 {
                [
                    self.read_f2dot14()?.to_f64(),
                    self.read_f2dot14()?.to_f64(),
                    self.read_f2dot14()?.to_f64(),
                    self.read_f2dot14()?.to_f64(),
                ]
            } else {
                [1.0, 0.0, 0.0, 1.0]
            };

            components.push(CompositeComponent {
                glyph_index,
                transform,
                offset,
                scaled_offset: flags & CompositeFlags::SCALED_COMPONENT_OFFSET != 0,
            });

            if flags & CompositeFlags::MORE_COMPONENTS == 0 {
                break;
            }
        }

        // trailing instructions (WE_HAVE_INSTRUCTIONS) are not interpreted

        Ok(components)
    }
}
