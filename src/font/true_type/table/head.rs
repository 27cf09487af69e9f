use crate::font::true_type::data_types::Fixed;

/// The `head` table carries the font-wide geometry parameters the renderer
/// needs: unitsPerEm for scaling and indexToLocFormat for `loca` decoding
#[derive(Debug)]
pub(crate) struct Head {
    pub font_revision: Fixed,
    pub flags: u16,
    pub units_per_em: u16,
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
    pub mac_style: u16,
    /// Smallest readable size in pixels
    pub lowest_rec_ppem: u16,
    pub font_direction_hint: i16,
    /// 0 = short (u16 halved) offsets, 1 = long (u32) offsets
    pub index_to_loc_format: i16,
    pub glyph_data_format: i16,
}

/// Every valid `head` table carries this constant
pub(crate) const HEAD_MAGIC: u32 = 0x5F0F_3CF5;
