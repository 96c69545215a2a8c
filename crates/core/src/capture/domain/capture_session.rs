use crate::capture::domain::capture_source::{CaptureError, CaptureSource};
use crate::shared::camera::CameraDescriptor;
use crate::shared::frame::Frame;

/// Runtime capture state for one camera, owned by a single client session.
///
/// Counts successfully read frames (1-based, wrapping on overflow) and stamps
/// each frame with its count. The count only drives frame-skip pacing.
pub struct CaptureSession {
    camera: CameraDescriptor,
    source: Box<dyn CaptureSource>,
    open: bool,
    frame_count: u64,
}

impl CaptureSession {
    pub fn new(camera: CameraDescriptor, source: Box<dyn CaptureSource>) -> Self {
        Self {
            camera,
            source,
            open: false,
            frame_count: 0,
        }
    }

    pub fn open(&mut self) -> Result<(), CaptureError> {
        self.source.open(&self.camera.locator)?;
        self.open = true;
        log::info!("Started camera: {}", self.camera.name);
        Ok(())
    }

    /// Next frame, or `None` when closed or nothing is available yet.
    pub fn read(&mut self) -> Result<Option<Frame>, CaptureError> {
        if !self.open {
            return Ok(None);
        }
        match self.source.grab()? {
            Some(frame) => {
                self.frame_count = self.frame_count.wrapping_add(1);
                Ok(Some(frame.with_index(self.frame_count)))
            }
            None => Ok(None),
        }
    }

    pub fn close(&mut self) {
        if self.open {
            self.source.close();
            self.open = false;
            log::info!("Stopped camera: {}", self.camera.name);
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn camera(&self) -> &CameraDescriptor {
        &self.camera
    }
}
