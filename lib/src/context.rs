use log::info;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::display::DisplaySurface;

/// Owns every hardware handle the daemon acquires: the display surface and
/// the tasks holding the button input registrations.
///
/// Release runs exactly once, either through [`HardwareContext::shutdown`] or,
/// if that was skipped, when the context is dropped.
pub struct HardwareContext<S: DisplaySurface> {
    surface: S,
    input_tracker: TaskTracker,
    input_token: CancellationToken,
    released: bool,
}

impl<S: DisplaySurface> HardwareContext<S> {
    /// Input tasks are cancelled when `shutdown_token` is, or at release.
    pub fn new(surface: S, shutdown_token: &CancellationToken) -> Self {
        Self {
            surface,
            input_tracker: TaskTracker::new(),
            input_token: shutdown_token.child_token(),
            released: false,
        }
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Tracker that input reader tasks must be spawned on.
    pub fn input_tracker(&self) -> &TaskTracker {
        &self.input_tracker
    }

    /// Token input reader tasks must stop on.
    pub fn input_token(&self) -> CancellationToken {
        self.input_token.clone()
    }

    /// Stop the input readers, wait for them to drop their handles, then
    /// release the display.
    pub async fn shutdown(mut self) {
        self.input_token.cancel();
        self.input_tracker.close();
        self.input_tracker.wait().await;
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.input_token.cancel();
        self.input_tracker.close();
        self.surface.release();
        info!("released display and input handles");
    }
}

impl<S: DisplaySurface> Drop for HardwareContext<S> {
    fn drop(&mut self) {
        self.release();
    }
}
