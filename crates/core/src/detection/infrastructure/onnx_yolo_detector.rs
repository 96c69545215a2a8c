/// Multi-class YOLO object detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, per-row class selection and
/// NMS post-processing. Boxes are mapped back to frame pixels.
use std::path::Path;

use crate::detection::domain::object_detector::{ObjectDetection, ObjectDetector};
use crate::shared::bounding_box::PixelBox;
use crate::shared::constants::COCO_CLASS_NAMES;
use crate::shared::frame::Frame;
use crate::shared::SendError;

use super::math::{nms, ScoredBox};
use super::onnx_session::{declared_input_size, load_session};

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
pub(crate) const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default confidence floor for object detection.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// NMS IoU threshold.
pub(crate) const NMS_IOU_THRESH: f64 = 0.45;

/// Box values preceding the class scores in each output row.
const BOX_VALUES: usize = 4;

/// YOLO object detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    class_names: Vec<String>,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a COCO-trained YOLO ONNX model.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;
        let input_size = declared_input_size(&session).unwrap_or(DEFAULT_INPUT_SIZE);
        log::info!(
            "Loaded object detector {} (input {input_size}px)",
            model_path.display()
        );

        Ok(Self {
            session,
            class_names: COCO_CLASS_NAMES.iter().map(|n| n.to_string()).collect(),
            confidence,
            input_size,
        })
    }

    fn label_for(&self, class_id: usize) -> String {
        self.class_names
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{class_id}"))
    }
}

impl ObjectDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<ObjectDetection>, SendError> {
        let (input_tensor, geometry) = letterbox(frame, self.input_size);

        let rows = {
            let input_value = ort::value::Tensor::from_array(input_tensor)?;
            let outputs = self.session.run(ort::inputs![input_value])?;
            if outputs.len() == 0 {
                return Err("YOLO model produced no outputs".into());
            }
            let tensor = outputs[0].try_extract_array::<f32>()?;
            let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;
            output_rows(tensor.shape(), data)?
        };

        let mut candidates = Vec::new();
        for row in rows {
            if let Some(candidate) = parse_row(&row, self.confidence, &geometry) {
                candidates.push(candidate);
            }
        }

        let kept = nms(&mut candidates, NMS_IOU_THRESH);
        Ok(kept
            .into_iter()
            .map(|d| ObjectDetection {
                label: self.label_for(d.class_id),
                confidence: d.score,
                bbox: to_pixel_box(&d),
            })
            .collect())
    }
}

/// Best-scoring class for one `[cx, cy, w, h, score_0, .., score_n]` row,
/// or `None` when the row is malformed or below the confidence floor.
fn parse_row(row: &[f32], confidence: f64, geometry: &Letterbox) -> Option<ScoredBox> {
    if row.len() <= BOX_VALUES {
        return None;
    }
    let (class_id, score) = row[BOX_VALUES..]
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))?;
    let score = *score as f64;
    if score < confidence {
        return None;
    }

    let (x1, y1, x2, y2) = geometry.unmap_center_box(
        row[0] as f64,
        row[1] as f64,
        row[2] as f64,
        row[3] as f64,
    );
    Some(ScoredBox {
        x1,
        y1,
        x2,
        y2,
        score,
        class_id,
    })
}

/// Truncates toward zero, matching an integer cast of the model's float box.
pub(crate) fn to_pixel_box(d: &ScoredBox) -> PixelBox {
    PixelBox::new(d.x1 as i32, d.y1 as i32, d.x2 as i32, d.y2 as i32)
}

// ---------------------------------------------------------------------------
// Pre/post-processing shared with the face locator
// ---------------------------------------------------------------------------

/// Scale and padding applied by [`letterbox`], needed to map boxes back.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Letterbox {
    pub scale: f64,
    pub pad_x: u32,
    pub pad_y: u32,
}

impl Letterbox {
    /// Convert a center-format box in letterbox coords to frame corners.
    pub fn unmap_center_box(&self, cx: f64, cy: f64, w: f64, h: f64) -> (f64, f64, f64, f64) {
        let px = self.pad_x as f64;
        let py = self.pad_y as f64;
        (
            ((cx - w / 2.0) - px) / self.scale,
            ((cy - h / 2.0) - py) / self.scale,
            ((cx + w / 2.0) - px) / self.scale,
            ((cy + h / 2.0) - py) / self.scale,
        )
    }
}

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns the NCHW float32 tensor and the geometry used.
pub(crate) fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding is 114/255 gray, the YOLO convention.
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray(); // [H, W, C] u8
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbor resize + copy into padded region
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x,
            pad_y,
        },
    )
}

/// Split a YOLO output tensor into per-detection rows.
///
/// Exported heads are `[1, features, detections]` (transposed) or
/// `[1, detections, features]`; the smaller axis is the feature axis.
pub(crate) fn output_rows(shape: &[usize], data: &[f32]) -> Result<Vec<Vec<f32>>, SendError> {
    if shape.len() != 3 {
        return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
    }
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if data.len() < num_dets * num_feats {
        return Err(format!("YOLO output shorter than shape {shape:?}").into());
    }

    Ok((0..num_dets)
        .map(|i| {
            if transposed {
                (0..num_feats).map(|f| data[f * num_dets + i]).collect()
            } else {
                data[i * num_feats..(i + 1) * num_feats].to_vec()
            }
        })
        .collect())
}
