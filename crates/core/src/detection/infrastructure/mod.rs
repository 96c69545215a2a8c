pub mod math;
pub mod onnx_session;
pub mod onnx_yolo_detector;
