/// Horizontal metrics: numberOfHMetrics long entries followed by bare left
/// side bearings for the remaining glyphs, which reuse the last advance
#[derive(Debug)]
pub(crate) struct Hmtx {
    pub advance_widths: Vec<u16>,
    pub left_side_bearings: Vec<i16>,
}

impl Hmtx {
    pub fn advance_width(&self, glyph_index: usize) -> u16 {
        self.advance_widths
            .get(glyph_index)
            .or(self.advance_widths.last())
            .copied()
            .unwrap_or(0)
    }

    pub fn left_side_bearing(&self, glyph_index: usize) -> i16 {
        self.left_side_bearings
            .get(glyph_index)
            .copied()
            .unwrap_or(0)
    }
}
