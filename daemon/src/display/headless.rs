use async_trait::async_trait;
use filterpanel::display::{PanelSize, DisplayError, DisplaySurface};
use filterpanel::frame::Frame;
use log::debug;

/// Accepts frames without a panel attached. Useful when developing off the
/// target device.
pub struct HeadlessSurface {
    dimensions: PanelSize,
    frames: u64,
}

impl HeadlessSurface {
    pub fn new(dimensions: PanelSize) -> Self {
        Self {
            dimensions,
            frames: 0,
        }
    }
}

#[async_trait]
impl DisplaySurface for HeadlessSurface {
    fn dimensions(&self) -> PanelSize {
        self.dimensions
    }

    async fn push_frame(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        let frame_dimensions = PanelSize::new(frame.width(), frame.height());
        if frame_dimensions != self.dimensions {
            return Err(DisplayError::SizeMismatch {
                frame: frame_dimensions,
                display: self.dimensions,
            });
        }
        self.frames += 1;
        debug!("headless frame {}", self.frames);
        Ok(())
    }
}
