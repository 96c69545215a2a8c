pub mod bitmap_annotator;
pub mod glyphs;
