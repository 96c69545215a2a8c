use std::sync::Arc;

use thiserror::Error;

use crate::detection::domain::bucket::{Bucket, BucketPalette, LabelSets};
use crate::detection::domain::detection_record::{display_label, DetectionRecord};
use crate::detection::domain::object_detector::ObjectDetector;
use crate::recognition::domain::face_encoder::FaceEncoder;
use crate::recognition::domain::reference_store::ReferenceStore;
use crate::rendering::domain::frame_annotator::FrameAnnotator;
use crate::shared::bounding_box::PercentBox;
use crate::shared::constants::{
    MATCHED_FACE_CONFIDENCE, UNKNOWN_PERSON, UNMATCHED_FACE_CONFIDENCE,
};
use crate::shared::frame::Frame;
use crate::shared::SendError;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("object detector failed: {0}")]
    Detector(#[source] SendError),
    #[error("face encoder failed: {0}")]
    FaceEncoder(#[source] SendError),
}

/// Face matching capability: a locator+encoder plus the shared reference set.
pub struct FaceMatcher {
    encoder: Box<dyn FaceEncoder>,
    store: Arc<ReferenceStore>,
    tolerance: f64,
}

impl FaceMatcher {
    pub fn new(encoder: Box<dyn FaceEncoder>, store: Arc<ReferenceStore>, tolerance: f64) -> Self {
        Self {
            encoder,
            store,
            tolerance,
        }
    }
}

/// Output of one classification pass.
#[derive(Debug)]
pub struct ClassifiedFrame {
    pub annotated: Frame,
    pub detections: Vec<DetectionRecord>,
}

/// Runs the detectors on a frame, buckets their results and draws the overlay.
///
/// Object records come first in detector order, then face records in locator
/// order. Labels outside every bucket are dropped without a box.
pub struct FrameClassifier {
    detector: Box<dyn ObjectDetector>,
    faces: Option<FaceMatcher>,
    labels: LabelSets,
    palette: BucketPalette,
    annotator: Box<dyn FrameAnnotator>,
}

impl FrameClassifier {
    pub fn new(
        detector: Box<dyn ObjectDetector>,
        faces: Option<FaceMatcher>,
        labels: LabelSets,
        palette: BucketPalette,
        annotator: Box<dyn FrameAnnotator>,
    ) -> Self {
        Self {
            detector,
            faces,
            labels,
            palette,
            annotator,
        }
    }

    /// Whether face matching will run: a face encoder is present and the
    /// reference set is non-empty.
    pub fn face_matching_enabled(&self) -> bool {
        self.faces.as_ref().is_some_and(|f| !f.store.is_empty())
    }

    pub fn classify(&mut self, frame: &Frame) -> Result<ClassifiedFrame, ClassifierError> {
        let (width, height) = (frame.width(), frame.height());
        let mut annotated = frame.clone();
        let mut detections = Vec::new();

        let objects = self
            .detector
            .detect(frame)
            .map_err(ClassifierError::Detector)?;
        for object in objects {
            let Some(bucket) = self.labels.classify(&object.label) else {
                continue;
            };
            let caption = format!(
                "{} {}%",
                object.label,
                (object.confidence * 100.0).round() as i64
            );
            self.annotator.draw_box(
                &mut annotated,
                &object.bbox,
                self.palette.color_for(bucket),
                &caption,
            );
            detections.push(DetectionRecord {
                id: DetectionRecord::make_id(bucket, detections.len()),
                class: bucket,
                label: display_label(&object.label),
                confidence: object.confidence,
                person_name: None,
                bounding_box: PercentBox::from_pixels(&object.bbox, width, height),
            });
        }

        if let Some(matcher) = self.faces.as_mut().filter(|m| !m.store.is_empty()) {
            let faces = matcher
                .encoder
                .encode(frame)
                .map_err(ClassifierError::FaceEncoder)?;
            for face in faces {
                let matched = matcher.store.best_match(&face.embedding, matcher.tolerance);
                let (name, confidence) = match matched {
                    Some(reference) => (reference.name.clone(), MATCHED_FACE_CONFIDENCE),
                    None => (UNKNOWN_PERSON.to_string(), UNMATCHED_FACE_CONFIDENCE),
                };
                self.annotator.draw_box(
                    &mut annotated,
                    &face.bbox,
                    self.palette.color_for(Bucket::Face),
                    &name,
                );
                detections.push(DetectionRecord {
                    id: DetectionRecord::make_id(Bucket::Face, detections.len()),
                    class: Bucket::Face,
                    label: "Face".to_string(),
                    confidence,
                    person_name: Some(name),
                    bounding_box: PercentBox::from_pixels(&face.bbox, width, height),
                });
            }
        }

        Ok(ClassifiedFrame {
            annotated,
            detections,
        })
    }
}
