pub mod capture_session;
pub mod capture_source;
pub mod frame_encoder;
