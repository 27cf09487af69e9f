mod font_directory;
mod glyf;
mod head;
mod hhea;
mod hmtx;
mod loca;
mod maxp;
mod tag;

pub use glyf::{Glyph, GlyphPoint};
pub(crate) use font_directory::{DirectoryTableEntry, FontDirectory};
pub(crate) use glyf::{
    CompositeComponent, CompositeFlags, CompositeOffset, GlyfTable, OutlineFlag, RawGlyph,
    SimpleGlyph,
};
pub(crate) use head::{Head, HEAD_MAGIC};
pub(crate) use hhea::Hhea;
pub(crate) use hmtx::Hmtx;
pub(crate) use loca::LocaTable;
pub(crate) use maxp::Maxp;
pub(crate) use tag::TableTag;
