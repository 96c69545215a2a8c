pub mod connection_registry;
pub mod frame_classifier;
pub mod frame_sink;
pub mod pacer;
pub mod pipeline_logger;
pub mod stream_message;
pub mod stream_session;
