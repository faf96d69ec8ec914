use filterpanel::display::DisplaySurface;
use log::info;

use crate::config::{DisplayBackend, DisplayConfig};
use crate::error::DaemonError;

pub mod framebuffer;
pub mod headless;

/// Open the configured panel. Any failure here is fatal for the daemon.
pub async fn open_surface(config: &DisplayConfig) -> Result<Box<dyn DisplaySurface>, DaemonError> {
    let rotation = config.rotation()?;
    let native = config.native_dimensions();
    let surface: Box<dyn DisplaySurface> = match config.backend {
        DisplayBackend::Framebuffer => Box::new(
            framebuffer::FramebufferSurface::open(&config.device, native, rotation).await?,
        ),
        DisplayBackend::Headless => Box::new(headless::HeadlessSurface::new(
            rotation.logical_dimensions(native),
        )),
    };
    info!(
        "display ready: {:?} backend, {} frames",
        config.backend,
        surface.dimensions()
    );
    Ok(surface)
}
