pub mod bounding_box;
pub mod camera;
pub mod color;
pub mod constants;
pub mod frame;
pub mod model_resolver;

/// Error type returned across the seams to opaque collaborators
/// (detectors, encoders). `Send` so it can be held across await points.
pub type SendError = Box<dyn std::error::Error + Send + Sync>;
