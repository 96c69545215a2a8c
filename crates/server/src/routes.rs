use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use gatewatch_core::capture::domain::capture_session::CaptureSession;
use gatewatch_core::pipeline::frame_sink::FrameSink;
use gatewatch_core::pipeline::pacer::IntervalPacer;
use gatewatch_core::pipeline::pipeline_logger::StatsPipelineLogger;
use gatewatch_core::pipeline::stream_message::StreamMessage;
use gatewatch_core::pipeline::stream_session::StreamSession;
use gatewatch_core::shared::camera::CameraDescriptor;
use gatewatch_core::shared::constants::SERVICE_NAME;

use crate::state::AppState;
use crate::ws_sink::WsFrameSink;

/// Frames between debug progress lines in a session log.
const PROGRESS_LOG_FRAMES: u64 = 300;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/cameras", get(cameras))
        .route("/ws", get(stream))
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StatusBody {
    pub service: String,
    pub status: String,
    pub cameras: usize,
    pub known_faces: usize,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CameraBody {
    pub id: String,
    pub name: String,
    pub location: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    pub camera: Option<String>,
}

pub async fn status(State(state): State<AppState>) -> Response {
    let body = StatusBody {
        service: SERVICE_NAME.to_string(),
        status: "running".to_string(),
        cameras: state.config.cameras.len(),
        known_faces: state.references.len(),
    };
    with_cors(Json(body))
}

pub async fn cameras(State(state): State<AppState>) -> Response {
    let body: Vec<CameraBody> = state
        .config
        .camera_descriptors()
        .into_iter()
        .map(|c| CameraBody {
            id: c.id,
            name: c.name,
            location: c.location,
        })
        .collect();
    with_cors(Json(body))
}

pub async fn stream(
    ws: WebSocketUpgrade,
    Query(query): Query<StreamQuery>,
    State(state): State<AppState>,
) -> Response {
    let requested = query.camera;
    with_cors(ws.on_upgrade(move |socket| run_socket(socket, state, requested)))
}

/// Camera for a stream request: the requested id, or the default camera.
pub fn select_camera(state: &AppState, requested: Option<&str>) -> Result<CameraDescriptor, String> {
    let id = requested.unwrap_or(state.config.default_camera.as_str());
    state
        .config
        .camera(id)
        .ok_or_else(|| format!("Unknown camera: {id}"))
}

async fn run_socket(socket: WebSocket, state: AppState, requested: Option<String>) {
    let (tx, mut rx) = socket.split();
    let mut sink = WsFrameSink::new(tx);

    let camera = match select_camera(&state, requested.as_deref()) {
        Ok(camera) => camera,
        Err(text) => {
            log::warn!("{text}");
            if let Err(e) = sink.send(&StreamMessage::error(text)).await {
                log::warn!("Could not report unknown camera: {e}");
            }
            sink.close().await;
            return;
        }
    };

    let reader_sink = sink.clone();
    let reader = tokio::spawn(async move {
        while let Some(message) = rx.next().await {
            match message {
                Ok(Message::Close(_)) | Err(_) => break,
                // Clients have nothing to say beyond connect/disconnect.
                Ok(_) => {}
            }
        }
        reader_sink.mark_closed();
    });

    let logger = StatsPipelineLogger::new(camera.name.clone(), PROGRESS_LOG_FRAMES);
    let capture = CaptureSession::new(camera, (state.capture_factory)());
    let session = StreamSession::new(
        capture,
        state.classifier.clone(),
        state.encoder.clone(),
        state.config.every_n_frames,
        Box::new(logger),
    );
    let pacer = IntervalPacer::new(state.config.tick_interval());
    let end = session.run(sink, pacer, &state.registry).await;
    log::debug!("Session ended: {end:?}");
    reader.abort();
}

fn with_cors(response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}
