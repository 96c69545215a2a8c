use image::codecs::jpeg::JpegEncoder;

use crate::capture::domain::frame_encoder::FrameEncoder;
use crate::shared::frame::Frame;
use crate::shared::SendError;

pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Encodes RGB frames as baseline JPEG using the `image` crate.
pub struct JpegFrameEncoder {
    quality: u8,
}

impl JpegFrameEncoder {
    /// `quality` is clamped to 1..=100.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegFrameEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl FrameEncoder for JpegFrameEncoder {
    fn encode(&self, frame: &Frame) -> Result<Vec<u8>, SendError> {
        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("Failed to create image from frame data")?;

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, self.quality).encode_image(&img)?;
        Ok(bytes)
    }

    fn mime_type(&self) -> &'static str {
        "image/jpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    #[test]
    fn test_encode_produces_jpeg_of_same_size() {
        let frame = Frame::filled(64, 48, [50, 100, 200]);
        let bytes = JpegFrameEncoder::default().encode(&frame).unwrap();

        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!((img.width(), img.height()), (64, 48));
    }

    #[test]
    fn test_lower_quality_is_smaller() {
        // Noisy content so quality actually matters.
        let data: Vec<u8> = (0..96 * 96 * 3).map(|i| ((i * 7919) % 251) as u8).collect();
        let frame = Frame::new(data, 96, 96, 3, 0);
        let high = JpegFrameEncoder::new(95).encode(&frame).unwrap();
        let low = JpegFrameEncoder::new(10).encode(&frame).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_data_uri_prefix_and_payload() {
        let encoder = JpegFrameEncoder::new(80);
        let frame = Frame::filled(8, 8, [255, 0, 0]);
        let uri = encoder.encode_data_uri(&frame).unwrap();

        let payload = uri.strip_prefix("data:image/jpeg;base64,").unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .unwrap();
        assert_eq!(decoded, encoder.encode(&frame).unwrap());
    }

    #[test]
    fn test_quality_is_clamped() {
        assert_eq!(JpegFrameEncoder::new(0).quality(), 1);
        assert_eq!(JpegFrameEncoder::new(200).quality(), 100);
    }
}
