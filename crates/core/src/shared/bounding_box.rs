use serde::Serialize;

/// Axis-aligned box in frame pixel coordinates, corners inclusive-exclusive.
///
/// Coordinates may fall outside the frame; detectors report whatever the
/// model produced and nothing downstream clamps it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl PixelBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> i32 {
        self.y2.saturating_sub(self.y1)
    }
}

/// Box expressed as percentages of frame width and height.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PercentBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PercentBox {
    /// `100 * coordinate / dimension` for each edge. Values past the frame
    /// edge are kept as-is, so `x + width` may exceed 100.
    pub fn from_pixels(bbox: &PixelBox, frame_width: u32, frame_height: u32) -> Self {
        let w = frame_width as f64;
        let h = frame_height as f64;
        Self {
            x: bbox.x1 as f64 / w * 100.0,
            y: bbox.y1 as f64 / h * 100.0,
            width: (bbox.x2 as f64 - bbox.x1 as f64) / w * 100.0,
            height: (bbox.y2 as f64 - bbox.y1 as f64) / h * 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case(PixelBox::new(64, 48, 192, 240), 640, 480, [10.0, 10.0, 20.0, 40.0])]
    #[case(PixelBox::new(0, 0, 1920, 1080), 1920, 1080, [0.0, 0.0, 100.0, 100.0])]
    #[case(PixelBox::new(33, 7, 100, 50), 300, 200, [11.0, 3.5, 67.0 / 3.0, 21.5])]
    fn test_percentages_follow_formula(
        #[case] bbox: PixelBox,
        #[case] w: u32,
        #[case] h: u32,
        #[case] expected: [f64; 4],
    ) {
        let pct = PercentBox::from_pixels(&bbox, w, h);
        assert_relative_eq!(pct.x, expected[0], epsilon = 1e-9);
        assert_relative_eq!(pct.y, expected[1], epsilon = 1e-9);
        assert_relative_eq!(pct.width, expected[2], epsilon = 1e-9);
        assert_relative_eq!(pct.height, expected[3], epsilon = 1e-9);
    }

    #[test]
    fn test_box_past_frame_edge_is_not_clamped() {
        let pct = PercentBox::from_pixels(&PixelBox::new(80, -10, 130, 60), 100, 100);
        assert_relative_eq!(pct.x, 80.0);
        assert_relative_eq!(pct.y, -10.0);
        assert_relative_eq!(pct.width, 50.0);
        assert_relative_eq!(pct.height, 70.0);
        assert!(pct.x + pct.width > 100.0);
    }

    #[test]
    fn test_extreme_coordinates_do_not_overflow() {
        let b = PixelBox::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX);
        assert_eq!(b.width(), i32::MAX);
        assert_eq!(b.height(), i32::MAX);

        let pct = PercentBox::from_pixels(&b, 100, 100);
        assert_relative_eq!(pct.width, u32::MAX as f64, max_relative = 1e-12);
        assert_relative_eq!(pct.x, i32::MIN as f64);
    }

    #[test]
    fn test_pixel_box_dimensions() {
        let b = PixelBox::new(10, 20, 40, 80);
        assert_eq!(b.width(), 30);
        assert_eq!(b.height(), 60);
    }
}
