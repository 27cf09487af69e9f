use crate::font::true_type::data_types::Fixed;

#[derive(Debug)]
pub(crate) struct Maxp {
    pub version: Fixed,
    /// the number of glyphs in the font
    pub num_glyphs: u16,
}
