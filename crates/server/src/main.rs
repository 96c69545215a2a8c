mod routes;
mod state;
mod ws_sink;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::{Arc, Mutex};

use clap::Parser;

use gatewatch_core::capture::domain::capture_source::CaptureSource;
use gatewatch_core::capture::infrastructure::ffmpeg_capture::FfmpegCapture;
use gatewatch_core::capture::infrastructure::jpeg_frame_encoder::JpegFrameEncoder;
use gatewatch_core::config::ServiceConfig;
use gatewatch_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use gatewatch_core::pipeline::connection_registry::ConnectionRegistry;
use gatewatch_core::pipeline::frame_classifier::{FaceMatcher, FrameClassifier};
use gatewatch_core::pipeline::stream_message::StreamMessage;
use gatewatch_core::recognition::domain::face_encoder::FaceEncoder;
use gatewatch_core::recognition::domain::reference_store::ReferenceStore;
use gatewatch_core::recognition::infrastructure::onnx_face_encoder::{
    OnnxFaceEncoder, DEFAULT_FACE_CONFIDENCE,
};
use gatewatch_core::recognition::infrastructure::reference_loader::load_reference_faces;
use gatewatch_core::rendering::infrastructure::bitmap_annotator::BitmapAnnotator;
use gatewatch_core::shared::constants::{
    EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL, FACE_MODEL_NAME, FACE_MODEL_URL, SERVICE_NAME,
};
use gatewatch_core::shared::model_resolver;

use crate::state::AppState;
use crate::ws_sink::WsFrameSink;

/// Directory checked for models shipped next to the binary.
const BUNDLED_MODEL_DIR: &str = "models";

/// Streams annotated camera frames and detections to browser clients.
#[derive(Parser, Debug)]
#[command(name = "gatewatch")]
struct Cli {
    /// JSON configuration file (defaults to the platform config dir).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind.
    #[arg(long)]
    port: Option<u16>,

    /// Camera id served when a client does not ask for one.
    #[arg(long)]
    camera: Option<String>,

    /// Object detection confidence floor (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Run detection every Nth frame (1 = every frame).
    #[arg(long)]
    every_n_frames: Option<u64>,

    /// Directory of reference face images (First_Last.jpg).
    #[arg(long)]
    known_faces: Option<PathBuf>,

    /// JPEG quality of streamed frames (1-100).
    #[arg(long)]
    quality: Option<u8>,

    /// Disable face recognition.
    #[arg(long)]
    no_faces: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = ServiceConfig::load(cli.config.as_deref())?;
    apply_overrides(&cli, &mut config);
    config.validate()?;

    // Model downloads use blocking I/O, so everything is built before the
    // runtime starts.
    let mut face_encoder = build_face_encoder(&config);
    let references = Arc::new(load_references(&config, face_encoder.as_mut()));
    let classifier = build_classifier(&config, face_encoder, references.clone())?;
    let encoder = JpegFrameEncoder::new(config.jpeg_quality);

    let state = AppState {
        config: Arc::new(config),
        references,
        classifier: Arc::new(Mutex::new(classifier)),
        encoder: Arc::new(encoder),
        registry: Arc::new(ConnectionRegistry::new()),
        capture_factory: Arc::new(|| Box::new(FfmpegCapture::new()) as Box<dyn CaptureSource>),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(state))
}

async fn serve(state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("{SERVICE_NAME} listening on http://{addr}");

    let registry = state.registry.clone();
    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(shutdown_signal(registry))
        .await?;
    log::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C after telling every client the server is going away.
async fn shutdown_signal(registry: Arc<ConnectionRegistry<WsFrameSink>>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
        return;
    }
    log::info!("Shutting down ({} clients connected)", registry.len());
    registry
        .broadcast_best_effort(&StreamMessage::error("Server shutting down"))
        .await;
    registry.close_all().await;
}

fn apply_overrides(cli: &Cli, config: &mut ServiceConfig) {
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(camera) = &cli.camera {
        config.default_camera = camera.clone();
    }
    if let Some(confidence) = cli.confidence {
        config.confidence = confidence;
    }
    if let Some(n) = cli.every_n_frames {
        config.every_n_frames = n;
    }
    if let Some(dir) = &cli.known_faces {
        config.known_faces_dir = dir.clone();
    }
    if let Some(quality) = cli.quality {
        config.jpeg_quality = quality;
    }
    if cli.no_faces {
        config.face_recognition = false;
    }
}

fn build_classifier(
    config: &ServiceConfig,
    face_encoder: Option<OnnxFaceEncoder>,
    references: Arc<ReferenceStore>,
) -> Result<FrameClassifier, Box<dyn std::error::Error>> {
    let model_path = resolve_object_model(&config.model)?;
    let detector = OnnxYoloDetector::new(&model_path, config.confidence)?;

    let faces = face_encoder.map(|encoder| {
        FaceMatcher::new(Box::new(encoder), references, config.face_tolerance)
    });

    Ok(FrameClassifier::new(
        Box::new(detector),
        faces,
        config.labels.clone(),
        config.colors,
        Box::new(BitmapAnnotator::new()),
    ))
}

/// The COCO detector is never downloaded: use the configured path if it
/// exists, else look the file name up in the model cache and bundled dir.
fn resolve_object_model(model: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if model.is_file() {
        return Ok(model.to_path_buf());
    }
    let name = model
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| format!("Invalid model path: {}", model.display()))?;
    log::info!("Resolving model: {name}");
    Ok(model_resolver::resolve(
        name,
        None,
        Some(Path::new(BUNDLED_MODEL_DIR)),
        None,
    )?)
}

/// Face locator+embedder, or `None` when disabled or unavailable.
fn build_face_encoder(config: &ServiceConfig) -> Option<OnnxFaceEncoder> {
    if !config.face_recognition {
        log::warn!("Face recognition disabled");
        return None;
    }
    match try_build_face_encoder() {
        Ok(encoder) => Some(encoder),
        Err(e) => {
            log::warn!("Face recognition unavailable, continuing without it: {e}");
            None
        }
    }
}

fn try_build_face_encoder() -> Result<OnnxFaceEncoder, Box<dyn std::error::Error>> {
    let bundled = Path::new(BUNDLED_MODEL_DIR);
    log::info!("Resolving model: {FACE_MODEL_NAME}");
    let locator = model_resolver::resolve(
        FACE_MODEL_NAME,
        Some(FACE_MODEL_URL),
        Some(bundled),
        Some(Box::new(download_progress)),
    )?;
    log::info!("Resolving model: {EMBEDDING_MODEL_NAME}");
    let embedder = model_resolver::resolve(
        EMBEDDING_MODEL_NAME,
        Some(EMBEDDING_MODEL_URL),
        Some(bundled),
        Some(Box::new(download_progress)),
    )?;
    OnnxFaceEncoder::new(&locator, &embedder, DEFAULT_FACE_CONFIDENCE)
}

fn load_references(
    config: &ServiceConfig,
    encoder: Option<&mut OnnxFaceEncoder>,
) -> ReferenceStore {
    let encoder = encoder.map(|e| e as &mut dyn FaceEncoder);
    match load_reference_faces(&config.known_faces_dir, encoder) {
        Ok(store) => store,
        Err(e) => {
            log::warn!(
                "Could not read {}: {e}; face matching disabled",
                config.known_faces_dir.display()
            );
            ReferenceStore::default()
        }
    }
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading face model... {downloaded} bytes");
    }
}
