use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::capture::domain::capture_session::CaptureSession;
use crate::capture::domain::frame_encoder::FrameEncoder;
use crate::pipeline::connection_registry::ConnectionRegistry;
use crate::pipeline::frame_classifier::FrameClassifier;
use crate::pipeline::frame_sink::FrameSink;
use crate::pipeline::pacer::Pacer;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::stream_message::StreamMessage;

/// Why a session loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client went away or the sink was closed.
    Disconnected,
    /// The camera could not be opened; one error message was sent.
    OpenFailed,
    /// The detector or face pipeline failed mid-stream.
    ClassifierFailed,
    /// A push on the primary path failed.
    SendFailed,
}

/// Per-client streaming loop: read, maybe classify, encode, push, sleep.
///
/// Every `every_n_frames`-th frame (by the capture's 1-based counter) goes
/// through the classifier; the rest are streamed untouched with no
/// detection message. Frame and detection messages for a tick are sent in
/// that order.
pub struct StreamSession {
    capture: CaptureSession,
    classifier: Arc<Mutex<FrameClassifier>>,
    encoder: Arc<dyn FrameEncoder>,
    every_n_frames: u64,
    logger: Box<dyn PipelineLogger>,
}

impl StreamSession {
    pub fn new(
        capture: CaptureSession,
        classifier: Arc<Mutex<FrameClassifier>>,
        encoder: Arc<dyn FrameEncoder>,
        every_n_frames: u64,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            capture,
            classifier,
            encoder,
            every_n_frames: every_n_frames.max(1),
            logger,
        }
    }

    /// Drive the session until it ends. The sink is registered for the
    /// lifetime of the loop and unregistered on every exit path.
    pub async fn run<S, P>(
        mut self,
        mut sink: S,
        mut pacer: P,
        registry: &ConnectionRegistry<S>,
    ) -> SessionEnd
    where
        S: FrameSink + Clone,
        P: Pacer,
    {
        let id = registry.register(sink.clone());

        let end = match self.capture.open() {
            Ok(()) => self.stream(&mut sink, &mut pacer).await,
            Err(e) => {
                log::error!("{e}");
                if let Err(send_err) = sink.send(&StreamMessage::error(e.to_string())).await {
                    log::warn!("Could not report open failure: {send_err}");
                }
                SessionEnd::OpenFailed
            }
        };

        self.capture.close();
        sink.close().await;
        registry.unregister(id);
        self.logger.summary();
        end
    }

    async fn stream<S: FrameSink, P: Pacer>(&mut self, sink: &mut S, pacer: &mut P) -> SessionEnd {
        let camera_id = self.capture.camera().id.clone();
        let mut streamed: u64 = 0;

        loop {
            if !sink.is_connected() {
                return SessionEnd::Disconnected;
            }

            let started = Instant::now();
            let read = self.capture.read();
            self.logger.timing("capture", elapsed_ms(started));
            let frame = match read {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    pacer.tick().await;
                    continue;
                }
                Err(e) => {
                    log::debug!("{camera_id}: no frame this tick: {e}");
                    pacer.tick().await;
                    continue;
                }
            };

            let (frame, detections) = if frame.index() % self.every_n_frames == 0 {
                let started = Instant::now();
                let classified = {
                    let mut classifier = self
                        .classifier
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    classifier.classify(&frame)
                };
                self.logger.timing("classify", elapsed_ms(started));
                match classified {
                    Ok(out) => {
                        self.logger.metric("detections", out.detections.len() as f64);
                        (out.annotated, out.detections)
                    }
                    Err(e) => {
                        log::error!("{camera_id}: {e}");
                        return SessionEnd::ClassifierFailed;
                    }
                }
            } else {
                (frame, Vec::new())
            };

            let started = Instant::now();
            let data = match self.encoder.encode_data_uri(&frame) {
                Ok(data) => data,
                Err(e) => {
                    log::warn!("{camera_id}: dropping frame {}: {e}", frame.index());
                    pacer.tick().await;
                    continue;
                }
            };
            self.logger.timing("encode", elapsed_ms(started));

            let started = Instant::now();
            let frame_message = StreamMessage::Frame {
                camera_id: camera_id.clone(),
                data,
            };
            if let Err(e) = sink.send(&frame_message).await {
                log::warn!("{camera_id}: {e}");
                return SessionEnd::SendFailed;
            }
            if !detections.is_empty() {
                let detection_message = StreamMessage::Detection {
                    camera_id: camera_id.clone(),
                    data: detections,
                };
                if let Err(e) = sink.send(&detection_message).await {
                    log::warn!("{camera_id}: {e}");
                    return SessionEnd::SendFailed;
                }
            }
            self.logger.timing("send", elapsed_ms(started));

            streamed += 1;
            self.logger.progress(streamed);
            pacer.tick().await;
        }
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::capture_source::{CaptureError, CaptureSource};
    use crate::detection::domain::bucket::{Bucket, BucketPalette, LabelSets};
    use crate::detection::domain::object_detector::{ObjectDetection, ObjectDetector};
    use crate::pipeline::connection_registry::test_support::MemorySink;
    use crate::pipeline::pacer::ImmediatePacer;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::rendering::infrastructure::bitmap_annotator::BitmapAnnotator;
    use crate::shared::bounding_box::PixelBox;
    use crate::shared::camera::{CameraDescriptor, Locator};
    use crate::shared::frame::Frame;
    use crate::shared::SendError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct SourceState {
        closes: usize,
    }

    /// Yields `frames` gray frames, then reports no frame forever. With
    /// `flaky_reads`, every frame is preceded by one failed read.
    struct FiniteSource {
        remaining: usize,
        fail_open: bool,
        flaky_reads: bool,
        failed_last: bool,
        state: Arc<Mutex<SourceState>>,
    }

    impl CaptureSource for FiniteSource {
        fn open(&mut self, locator: &Locator) -> Result<(), CaptureError> {
            if self.fail_open {
                return Err(CaptureError::Open {
                    locator: locator.to_string(),
                    reason: "busy".into(),
                });
            }
            Ok(())
        }

        fn grab(&mut self) -> Result<Option<Frame>, CaptureError> {
            if self.remaining == 0 {
                return Ok(None);
            }
            if self.flaky_reads && !self.failed_last {
                self.failed_last = true;
                return Err(CaptureError::Read("decoder hiccup".into()));
            }
            self.failed_last = false;
            self.remaining -= 1;
            Ok(Some(Frame::filled(32, 24, [90, 90, 90])))
        }

        fn close(&mut self) {
            self.state.lock().unwrap().closes += 1;
        }
    }

    /// Reports one person per call and counts its invocations.
    struct CountingDetector {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl ObjectDetector for CountingDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<ObjectDetection>, SendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err("model crashed".into());
            }
            Ok(vec![ObjectDetection {
                label: "person".into(),
                confidence: 0.9,
                bbox: PixelBox::new(8, 6, 24, 18),
            }])
        }
    }

    /// Emits the raw pixel bytes so tests can tell annotated frames apart.
    struct RawEncoder;

    impl FrameEncoder for RawEncoder {
        fn encode(&self, frame: &Frame) -> Result<Vec<u8>, SendError> {
            Ok(frame.data().to_vec())
        }

        fn mime_type(&self) -> &'static str {
            "application/octet-stream"
        }
    }

    struct Harness {
        session: StreamSession,
        source: Arc<Mutex<SourceState>>,
        detector_calls: Arc<AtomicUsize>,
    }

    fn harness(frames: usize, every_n: u64, fail_open: bool, fail_detect: bool) -> Harness {
        build_harness(frames, every_n, fail_open, fail_detect, false)
    }

    fn build_harness(
        frames: usize,
        every_n: u64,
        fail_open: bool,
        fail_detect: bool,
        flaky_reads: bool,
    ) -> Harness {
        let source = Arc::new(Mutex::new(SourceState::default()));
        let detector_calls = Arc::new(AtomicUsize::new(0));
        let camera = CameraDescriptor {
            id: "cam-1".into(),
            locator: Locator::Device(0),
            name: "Main Gate".into(),
            location: "Centenary Gate".into(),
        };
        let capture = CaptureSession::new(
            camera,
            Box::new(FiniteSource {
                remaining: frames,
                fail_open,
                flaky_reads,
                failed_last: false,
                state: source.clone(),
            }),
        );
        let classifier = FrameClassifier::new(
            Box::new(CountingDetector {
                calls: detector_calls.clone(),
                fail: fail_detect,
            }),
            None,
            LabelSets::default(),
            BucketPalette::default(),
            Box::new(BitmapAnnotator::new()),
        );
        let session = StreamSession::new(
            capture,
            Arc::new(Mutex::new(classifier)),
            Arc::new(RawEncoder),
            every_n,
            Box::new(NullPipelineLogger),
        );
        Harness {
            session,
            source,
            detector_calls,
        }
    }

    fn kinds(messages: &[StreamMessage]) -> Vec<&'static str> {
        messages
            .iter()
            .map(|m| match m {
                StreamMessage::Frame { .. } => "frame",
                StreamMessage::Detection { .. } => "detection",
                StreamMessage::Error { .. } => "error",
            })
            .collect()
    }

    #[tokio::test]
    async fn test_connect_stream_and_disconnect() {
        let h = harness(10, 3, false, false);
        let registry = ConnectionRegistry::new();
        let sink = MemorySink {
            disconnect_after: Some(4),
            ..MemorySink::default()
        };

        let end = h.session.run(sink.clone(), ImmediatePacer, &registry).await;

        assert_eq!(end, SessionEnd::Disconnected);
        let messages = sink.messages();
        assert_eq!(kinds(&messages), vec!["frame", "frame", "frame", "detection"]);

        let raw = RawEncoder
            .encode_data_uri(&Frame::filled(32, 24, [90, 90, 90]))
            .unwrap();
        let StreamMessage::Frame { data: first, camera_id } = &messages[0] else {
            panic!("expected frame");
        };
        assert_eq!(camera_id, "cam-1");
        assert_eq!(first, &raw);
        let StreamMessage::Frame { data: third, .. } = &messages[2] else {
            panic!("expected frame");
        };
        assert_ne!(third, &raw, "classified frame should carry the overlay");

        let StreamMessage::Detection { data, .. } = &messages[3] else {
            panic!("expected detection");
        };
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].class, Bucket::Person);
        assert_eq!(data[0].id, "person-0");

        assert_eq!(h.detector_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.source.lock().unwrap().closes, 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_only_every_nth_frame_is_classified() {
        let h = harness(6, 2, false, false);
        let registry = ConnectionRegistry::new();
        // 6 frames + 3 detection messages.
        let sink = MemorySink {
            disconnect_after: Some(9),
            ..MemorySink::default()
        };

        h.session.run(sink.clone(), ImmediatePacer, &registry).await;

        assert_eq!(
            kinds(&sink.messages()),
            vec![
                "frame",
                "frame",
                "detection",
                "frame",
                "frame",
                "detection",
                "frame",
                "frame",
                "detection"
            ]
        );
        assert_eq!(h.detector_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_read_errors_are_skipped_ticks() {
        let h = build_harness(6, 3, false, false, true);
        let registry = ConnectionRegistry::new();
        // 6 frames + 2 detection messages.
        let sink = MemorySink {
            disconnect_after: Some(8),
            ..MemorySink::default()
        };

        let end = h.session.run(sink.clone(), ImmediatePacer, &registry).await;

        assert_eq!(end, SessionEnd::Disconnected);
        // Failed reads do not advance the counter, so frames 3 and 6 are
        // still the classified ones.
        assert_eq!(
            kinds(&sink.messages()),
            vec!["frame", "frame", "frame", "detection", "frame", "frame", "frame", "detection"]
        );
        assert_eq!(h.detector_calls.load(Ordering::SeqCst), 2);
        assert_eq!(h.source.lock().unwrap().closes, 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_open_failure_sends_one_error_and_ends() {
        let h = harness(3, 3, true, false);
        let registry = ConnectionRegistry::new();
        let sink = MemorySink::default();

        let end = h.session.run(sink.clone(), ImmediatePacer, &registry).await;

        assert_eq!(end, SessionEnd::OpenFailed);
        assert_eq!(
            sink.messages(),
            vec![StreamMessage::error("Failed to open camera: device 0 (busy)")]
        );
        assert!(!sink.is_connected());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_classifier_failure_ends_session_and_releases_camera() {
        let h = harness(5, 1, false, true);
        let registry = ConnectionRegistry::new();
        let sink = MemorySink::default();

        let end = h.session.run(sink.clone(), ImmediatePacer, &registry).await;

        assert_eq!(end, SessionEnd::ClassifierFailed);
        assert!(sink.messages().is_empty());
        assert_eq!(h.source.lock().unwrap().closes, 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_ends_session() {
        let h = harness(5, 3, false, false);
        let registry = ConnectionRegistry::new();

        let end = h
            .session
            .run(MemorySink::failing(), ImmediatePacer, &registry)
            .await;

        assert_eq!(end, SessionEnd::SendFailed);
        assert_eq!(h.source.lock().unwrap().closes, 1);
        assert!(registry.is_empty());
    }
}
