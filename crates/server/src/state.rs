use std::sync::{Arc, Mutex};

use gatewatch_core::capture::domain::capture_source::CaptureSource;
use gatewatch_core::capture::domain::frame_encoder::FrameEncoder;
use gatewatch_core::config::ServiceConfig;
use gatewatch_core::pipeline::connection_registry::ConnectionRegistry;
use gatewatch_core::pipeline::frame_classifier::FrameClassifier;
use gatewatch_core::recognition::domain::reference_store::ReferenceStore;

use crate::ws_sink::WsFrameSink;

/// Builds a fresh capture adapter for each session.
pub type CaptureFactory = Arc<dyn Fn() -> Box<dyn CaptureSource> + Send + Sync>;

/// Everything a request handler needs. Built once before the server starts;
/// only the registry changes afterwards.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub references: Arc<ReferenceStore>,
    pub classifier: Arc<Mutex<FrameClassifier>>,
    pub encoder: Arc<dyn FrameEncoder>,
    pub registry: Arc<ConnectionRegistry<WsFrameSink>>,
    pub capture_factory: CaptureFactory,
}
