pub mod onnx_face_encoder;
pub mod reference_loader;
