use crate::shared::bounding_box::PixelBox;
use crate::shared::frame::Frame;
use crate::shared::SendError;

/// A located face and its identity embedding.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedFace {
    pub bbox: PixelBox,
    pub embedding: Vec<f32>,
}

/// Locates every face in a frame and computes an embedding for each.
///
/// Faces come back in the locator's native order.
pub trait FaceEncoder: Send {
    fn encode(&mut self, frame: &Frame) -> Result<Vec<EncodedFace>, SendError>;
}
