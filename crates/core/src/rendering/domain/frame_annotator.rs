use crate::shared::bounding_box::PixelBox;
use crate::shared::color::Rgb;
use crate::shared::frame::Frame;

/// Draws detection overlays onto a frame in place.
pub trait FrameAnnotator: Send {
    /// Outline `bbox` in `color` and caption it with `label`.
    ///
    /// Parts of the box or caption outside the frame are not drawn; the
    /// box itself is taken as given.
    fn draw_box(&self, frame: &mut Frame, bbox: &PixelBox, color: Rgb, label: &str);
}
