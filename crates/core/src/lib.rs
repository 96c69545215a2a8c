//! Capture, detection, face matching and streaming core for GateWatch.
//!
//! Each concern keeps its traits and value types under `domain/` and its
//! adapters (ONNX, ffmpeg, JPEG) under `infrastructure/`. The `pipeline`
//! module wires them into the per-client session loop.

pub mod capture;
pub mod config;
pub mod detection;
pub mod pipeline;
pub mod recognition;
pub mod rendering;
pub mod shared;
