use crate::rendering::domain::frame_annotator::FrameAnnotator;
use crate::rendering::infrastructure::glyphs::{
    glyph_bits, text_width, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH,
};
use crate::shared::bounding_box::PixelBox;
use crate::shared::color::Rgb;
use crate::shared::frame::Frame;

const OUTLINE_THICKNESS: i32 = 2;
const LABEL_PADDING: i32 = 2;
const LABEL_BAR_HEIGHT: i32 = GLYPH_HEIGHT + 2 * LABEL_PADDING + 1;

/// Software overlay renderer: rectangle outlines plus a filled caption bar
/// with white 5x7 bitmap text.
///
/// The caption sits directly above the box, or just inside its top edge
/// when there is no room above.
#[derive(Default)]
pub struct BitmapAnnotator;

impl BitmapAnnotator {
    pub fn new() -> Self {
        Self
    }
}

impl FrameAnnotator for BitmapAnnotator {
    fn draw_box(&self, frame: &mut Frame, bbox: &PixelBox, color: Rgb, label: &str) {
        let mut canvas = Canvas::new(frame);

        for inset in 0..OUTLINE_THICKNESS {
            canvas.outline(
                bbox.x1.saturating_add(inset),
                bbox.y1.saturating_add(inset),
                bbox.x2.saturating_sub(inset),
                bbox.y2.saturating_sub(inset),
                color,
            );
        }

        if label.is_empty() {
            return;
        }
        let bar_width = text_width(label) + 2 * LABEL_PADDING;
        let above = bbox.y1.saturating_sub(LABEL_BAR_HEIGHT);
        let bar_top = if above >= 0 { above } else { bbox.y1 };
        canvas.fill(
            bbox.x1,
            bar_top,
            bbox.x1.saturating_add(bar_width - 1),
            bar_top.saturating_add(LABEL_BAR_HEIGHT - 1),
            color,
        );
        canvas.text(
            bbox.x1.saturating_add(LABEL_PADDING),
            bar_top.saturating_add(LABEL_PADDING + 1),
            label,
            Rgb::WHITE,
        );
    }
}

/// Bounds-checked pixel writer over an RGB frame.
struct Canvas<'a> {
    data: &'a mut [u8],
    width: i32,
    height: i32,
    channels: usize,
}

impl<'a> Canvas<'a> {
    fn new(frame: &'a mut Frame) -> Self {
        let width = frame.width() as i32;
        let height = frame.height() as i32;
        let channels = frame.channels() as usize;
        Self {
            data: frame.data_mut(),
            width,
            height,
            channels,
        }
    }

    fn put(&mut self, x: i32, y: i32, color: Rgb) {
        if x < 0 || y < 0 || x >= self.width || y >= self.height || self.channels < 3 {
            return;
        }
        let offset = (y as usize * self.width as usize + x as usize) * self.channels;
        self.data[offset..offset + 3].copy_from_slice(&color.channels());
    }

    fn outline(&mut self, left: i32, top: i32, right: i32, bottom: i32, color: Rgb) {
        if right < left || bottom < top {
            return;
        }
        for x in left.max(0)..=right.min(self.width - 1) {
            self.put(x, top, color);
            self.put(x, bottom, color);
        }
        for y in top.max(0)..=bottom.min(self.height - 1) {
            self.put(left, y, color);
            self.put(right, y, color);
        }
    }

    fn fill(&mut self, left: i32, top: i32, right: i32, bottom: i32, color: Rgb) {
        for y in top.max(0)..=bottom.min(self.height - 1) {
            for x in left.max(0)..=right.min(self.width - 1) {
                self.put(x, y, color);
            }
        }
    }

    fn text(&mut self, mut x: i32, y: i32, text: &str, color: Rgb) {
        for ch in text.chars() {
            if let Some(glyph) = glyph_bits(ch) {
                for (row, pattern) in glyph.iter().enumerate() {
                    for col in 0..GLYPH_WIDTH {
                        if (pattern >> (GLYPH_WIDTH - 1 - col)) & 1 == 1 {
                            self.put(
                                x.saturating_add(col),
                                y.saturating_add(row as i32),
                                color,
                            );
                        }
                    }
                }
            }
            x = x.saturating_add(GLYPH_ADVANCE);
        }
    }
}
