/// Glyph offsets into `glyf`, always normalized to byte offsets
/// (short-format entries are stored halved and multiplied by 2 on read).
/// There are numGlyphs + 1 entries; equal neighbors mean an empty glyph
#[derive(Debug, Clone)]
pub(crate) struct LocaTable {
    pub offsets: Vec<u32>,
}

impl LocaTable {
    pub fn glyph_range(&self, glyph_index: usize) -> Option<(u32, u32)> {
        let start = *self.offsets.get(glyph_index)?;
        let end = *self.offsets.get(glyph_index + 1)?;

        (end >= start).then_some((start, end - start))
    }
}
