pub mod ffmpeg_capture;
pub mod jpeg_frame_encoder;
