use crate::shared::bounding_box::PixelBox;
use crate::shared::frame::Frame;
use crate::shared::SendError;

/// One raw result from an object detector, in the detector's own label space.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectDetection {
    pub label: String,
    pub confidence: f64,
    pub bbox: PixelBox,
}

/// Finds labelled objects in a frame.
///
/// Results are returned in the detector's native order, already filtered by
/// its confidence floor.
pub trait ObjectDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<ObjectDetection>, SendError>;
}
