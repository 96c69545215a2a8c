/// Face locator + ArcFace encoder using ONNX Runtime.
///
/// A YOLO face model finds faces; each crop is embedded by an ArcFace model
/// and L2-normalized, so Euclidean distance between embeddings ranges 0..=2.
use std::path::Path;

use crate::detection::infrastructure::math::{nms, ScoredBox};
use crate::detection::infrastructure::onnx_session::{declared_input_size, load_session};
use crate::detection::infrastructure::onnx_yolo_detector::{
    letterbox, output_rows, to_pixel_box, DEFAULT_INPUT_SIZE, NMS_IOU_THRESH,
};
use crate::recognition::domain::face_encoder::{EncodedFace, FaceEncoder};
use crate::shared::bounding_box::PixelBox;
use crate::shared::frame::Frame;
use crate::shared::SendError;

/// Default confidence for the face locator.
pub const DEFAULT_FACE_CONFIDENCE: f64 = 0.5;

const INPUT_SIZE: usize = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

/// Index of the face score in a locator row: `[cx, cy, w, h, conf, keypoints..]`.
const SCORE_INDEX: usize = 4;

pub struct OnnxFaceEncoder {
    locator: ort::session::Session,
    locator_input: u32,
    embedder: ort::session::Session,
    confidence: f64,
}

impl OnnxFaceEncoder {
    pub fn new(
        locator_path: &Path,
        embedder_path: &Path,
        confidence: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let locator = load_session(locator_path)?;
        let locator_input = declared_input_size(&locator).unwrap_or(DEFAULT_INPUT_SIZE);
        let embedder = load_session(embedder_path)?;
        Ok(Self {
            locator,
            locator_input,
            embedder,
            confidence,
        })
    }

    fn locate(&mut self, frame: &Frame) -> Result<Vec<PixelBox>, SendError> {
        let confidence = self.confidence;
        let (input_tensor, geometry) = letterbox(frame, self.locator_input);
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.locator.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("Face model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut candidates: Vec<ScoredBox> = output_rows(tensor.shape(), data)?
            .into_iter()
            .filter(|row| row.len() > SCORE_INDEX)
            .filter(|row| row[SCORE_INDEX] as f64 >= confidence)
            .map(|row| {
                let (x1, y1, x2, y2) = geometry.unmap_center_box(
                    row[0] as f64,
                    row[1] as f64,
                    row[2] as f64,
                    row[3] as f64,
                );
                ScoredBox {
                    x1,
                    y1,
                    x2,
                    y2,
                    score: row[SCORE_INDEX] as f64,
                    class_id: 0,
                }
            })
            .collect();

        Ok(nms(&mut candidates, NMS_IOU_THRESH)
            .iter()
            .map(to_pixel_box)
            .collect())
    }

    fn embed(&mut self, crop: &[u8], width: u32, height: u32) -> Result<Vec<f32>, SendError> {
        let tensor = preprocess(crop, width, height);
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.embedder.run(ort::inputs![input_value])?;
        let embedding_array = outputs[0].try_extract_array::<f32>()?;
        let embedding_slice = embedding_array
            .as_slice()
            .ok_or("Cannot get embedding slice")?;

        let mut embedding = embedding_slice.to_vec();
        l2_normalize(&mut embedding);
        Ok(embedding)
    }
}

impl FaceEncoder for OnnxFaceEncoder {
    fn encode(&mut self, frame: &Frame) -> Result<Vec<EncodedFace>, SendError> {
        let boxes = self.locate(frame)?;
        let mut faces = Vec::with_capacity(boxes.len());
        for bbox in boxes {
            let Some((crop, w, h)) = crop_rgb(frame, &bbox) else {
                continue;
            };
            let embedding = self.embed(&crop, w, h)?;
            faces.push(EncodedFace { bbox, embedding });
        }
        Ok(faces)
    }
}

/// Copy the part of `bbox` that lies inside the frame. `None` if empty.
fn crop_rgb(frame: &Frame, bbox: &PixelBox) -> Option<(Vec<u8>, u32, u32)> {
    let x1 = bbox.x1.clamp(0, frame.width() as i32) as usize;
    let y1 = bbox.y1.clamp(0, frame.height() as i32) as usize;
    let x2 = bbox.x2.clamp(0, frame.width() as i32) as usize;
    let y2 = bbox.y2.clamp(0, frame.height() as i32) as usize;
    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    let channels = frame.channels() as usize;
    let stride = frame.width() as usize * channels;
    let mut crop = Vec::with_capacity((x2 - x1) * (y2 - y1) * 3);
    for y in y1..y2 {
        let row = &frame.data()[y * stride..(y + 1) * stride];
        for x in x1..x2 {
            crop.extend_from_slice(&row[x * channels..x * channels + 3]);
        }
    }
    Some((crop, (x2 - x1) as u32, (y2 - y1) as u32))
}

/// Resize crop to 112x112, normalize, NCHW layout.
fn preprocess(rgb_data: &[u8], width: u32, height: u32) -> ndarray::Array4<f32> {
    let src_w = width as usize;
    let src_h = height as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));

    for y in 0..INPUT_SIZE {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / INPUT_SIZE as f64) as usize).min(src_h - 1);
        for x in 0..INPUT_SIZE {
            let src_x =
                (((x as f64 + 0.5) * src_w as f64 / INPUT_SIZE as f64) as usize).min(src_w - 1);
            let offset = (src_y * src_w + src_x) * 3;
            if offset + 2 < rgb_data.len() {
                for c in 0..3 {
                    tensor[[0, c, y, x]] = (rgb_data[offset + c] as f32 - NORM_MEAN) / NORM_STD;
                }
            }
        }
    }

    tensor
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize_unit_vector() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        let mut v = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_preprocess_shape_and_normalization() {
        let data = vec![255u8; 50 * 40 * 3];
        let tensor = preprocess(&data, 50, 40);
        assert_eq!(tensor.shape(), &[1, 3, 112, 112]);
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_crop_copies_inner_region() {
        // 4x2 frame, pixel value = column index
        let mut data = Vec::new();
        for _y in 0..2 {
            for x in 0..4u8 {
                data.extend_from_slice(&[x, x, x]);
            }
        }
        let frame = Frame::new(data, 4, 2, 3, 0);
        let (crop, w, h) = crop_rgb(&frame, &PixelBox::new(1, 0, 3, 2)).unwrap();
        assert_eq!((w, h), (2, 2));
        assert_eq!(crop, vec![1, 1, 1, 2, 2, 2, 1, 1, 1, 2, 2, 2]);
    }

    #[test]
    fn test_crop_clamps_to_frame() {
        let frame = Frame::filled(10, 10, [7, 7, 7]);
        let (_, w, h) = crop_rgb(&frame, &PixelBox::new(-5, 8, 4, 20)).unwrap();
        assert_eq!((w, h), (4, 2));
    }

    #[test]
    fn test_crop_outside_frame_is_none() {
        let frame = Frame::filled(10, 10, [0, 0, 0]);
        assert!(crop_rgb(&frame, &PixelBox::new(20, 20, 30, 30)).is_none());
    }
}
