//! Linux fbdev panel, e.g. the ST7789 exposed as `/dev/fb1` by the kernel's
//! fbtft or panel-mipi-dbi driver.

use std::io::SeekFrom;

use async_trait::async_trait;
use filterpanel::display::{PanelSize, DisplayError, DisplaySurface, Rotation, encode_rgb565_le};
use filterpanel::frame::Frame;
use log::info;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

pub struct FramebufferSurface {
    path: String,
    file: Option<File>,
    native: PanelSize,
    rotation: Rotation,
}

impl FramebufferSurface {
    pub async fn open(path: &str, native: PanelSize, rotation: Rotation) -> Result<Self, DisplayError> {
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .await
            .map_err(|e| DisplayError::Open(path.to_string(), e))?;
        info!("opened framebuffer {path} ({native} native, {rotation:?})");
        Ok(Self {
            path: path.to_string(),
            file: Some(file),
            native,
            rotation,
        })
    }

    fn write_error(&self, e: std::io::Error) -> DisplayError {
        DisplayError::Write(self.path.clone(), e)
    }
}

#[async_trait]
impl DisplaySurface for FramebufferSurface {
    fn dimensions(&self) -> PanelSize {
        self.rotation.logical_dimensions(self.native)
    }

    async fn push_frame(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        let raw = encode_rgb565_le(frame, self.rotation, self.native)?;
        let Some(file) = self.file.as_mut() else {
            return Err(self.write_error(std::io::Error::other("framebuffer already released")));
        };
        let result = async {
            file.seek(SeekFrom::Start(0)).await?;
            file.write_all(&raw).await?;
            file.flush().await
        }
        .await;
        result.map_err(|e| self.write_error(e))
    }

    fn release(&mut self) {
        if self.file.take().is_some() {
            info!("closed framebuffer {}", self.path);
        }
    }
}
