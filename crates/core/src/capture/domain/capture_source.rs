use thiserror::Error;

use crate::shared::camera::Locator;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to open camera: {locator} ({reason})")]
    Open { locator: String, reason: String },
    #[error("capture read failed: {0}")]
    Read(String),
    #[error("capture source is not open")]
    NotOpen,
}

/// A device or stream that produces RGB frames on demand.
pub trait CaptureSource: Send {
    /// Acquire the device behind `locator`.
    fn open(&mut self, locator: &Locator) -> Result<(), CaptureError>;

    /// Next decoded frame. `Ok(None)` means no frame is available right now.
    fn grab(&mut self) -> Result<Option<Frame>, CaptureError>;

    /// Release the device. Safe to call when not open.
    fn close(&mut self);
}
