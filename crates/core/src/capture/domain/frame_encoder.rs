use base64::Engine;

use crate::shared::frame::Frame;
use crate::shared::SendError;

/// Compresses a frame into an image byte buffer.
pub trait FrameEncoder: Send + Sync {
    fn encode(&self, frame: &Frame) -> Result<Vec<u8>, SendError>;

    /// MIME type of the encoded bytes.
    fn mime_type(&self) -> &'static str;

    /// `data:<mime>;base64,<payload>` URI for the encoded frame.
    fn encode_data_uri(&self, frame: &Frame) -> Result<String, SendError> {
        let bytes = self.encode(frame)?;
        let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
        Ok(format!("data:{};base64,{payload}", self.mime_type()))
    }
}
