use std::fmt;

use async_trait::async_trait;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use thiserror::Error;

use crate::frame::Frame;

#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("failed to open display {0}: {1}")]
    Open(String, std::io::Error),
    #[error("failed to write frame to {0}: {1}")]
    Write(String, std::io::Error),
    #[error("frame is {frame} but the display expects {display}")]
    SizeMismatch {
        frame: PanelSize,
        display: PanelSize,
    },
    #[error("unsupported rotation {0}, expected 0, 90, 180 or 270")]
    InvalidRotation(u16),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanelSize {
    pub width: u32,
    pub height: u32,
}

impl PanelSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn size(self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl fmt::Display for PanelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Clockwise rotation applied when mapping a logical frame onto the panel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl TryFrom<u16> for Rotation {
    type Error = DisplayError;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(DisplayError::InvalidRotation(other)),
        }
    }
}

impl Rotation {
    /// The size frames must have to fill a panel of the given native size.
    pub fn logical_dimensions(self, native: PanelSize) -> PanelSize {
        match self {
            Rotation::Deg0 | Rotation::Deg180 => native,
            Rotation::Deg90 | Rotation::Deg270 => PanelSize::new(native.height, native.width),
        }
    }

    /// Map a logical pixel to its native panel coordinates.
    fn to_native(self, x: u32, y: u32, native: PanelSize) -> (u32, u32) {
        match self {
            Rotation::Deg0 => (x, y),
            Rotation::Deg90 => (native.width - 1 - y, x),
            Rotation::Deg180 => (native.width - 1 - x, native.height - 1 - y),
            Rotation::Deg270 => (y, native.height - 1 - x),
        }
    }
}

pub fn rgb565(color: Rgb888) -> u16 {
    let mut rgb565: u16 = (color.r() as u16 & 0b11111000) << 8;
    rgb565 |= (color.g() as u16 & 0b11111100) << 3;
    rgb565 |= (color.b() as u16) >> 3;
    rgb565
}

/// Encode a logical frame as little-endian RGB565 in native panel order.
pub fn encode_rgb565_le(
    frame: &Frame,
    rotation: Rotation,
    native: PanelSize,
) -> Result<Vec<u8>, DisplayError> {
    let expected = rotation.logical_dimensions(native);
    let actual = PanelSize::new(frame.width(), frame.height());
    if actual != expected {
        return Err(DisplayError::SizeMismatch {
            frame: actual,
            display: expected,
        });
    }

    let mut raw = vec![0u8; native.width as usize * native.height as usize * 2];
    for (i, color) in frame.pixels().iter().enumerate() {
        let x = i as u32 % frame.width();
        let y = i as u32 / frame.width();
        let (nx, ny) = rotation.to_native(x, y, native);
        let offset = (ny as usize * native.width as usize + nx as usize) * 2;
        raw[offset..offset + 2].copy_from_slice(&rgb565(*color).to_le_bytes());
    }
    Ok(raw)
}

/// A panel that accepts complete frames.
///
/// Sizes are logical: rotation has already been applied, so frames are
/// built at exactly this size.
#[async_trait]
pub trait DisplaySurface: Send {
    fn dimensions(&self) -> PanelSize;

    /// Push one complete frame. Either the whole frame is handed to the
    /// panel or an error is returned.
    async fn push_frame(&mut self, frame: &Frame) -> Result<(), DisplayError>;

    /// Release the underlying handles. Called exactly once at shutdown.
    fn release(&mut self) {}
}

#[async_trait]
impl<S: DisplaySurface + ?Sized> DisplaySurface for Box<S> {
    fn dimensions(&self) -> PanelSize {
        (**self).dimensions()
    }

    async fn push_frame(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        (**self).push_frame(frame).await
    }

    fn release(&mut self) {
        (**self).release()
    }
}
