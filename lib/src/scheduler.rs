//! The poll-and-render loop.
//!
//! Every tick queries the probe and redraws unconditionally, so the clock
//! line stays live even while the filter state is unchanged.

use std::time::Duration;

use chrono::Local;
use log::{debug, error, info};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::display::{DisplayError, DisplaySurface};
use crate::probe::StateProbe;
use crate::render::Renderer;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    ShuttingDown,
}

pub struct StatusLoop<'a> {
    probe: &'a StateProbe,
    renderer: &'a Renderer,
    interval: Duration,
}

impl<'a> StatusLoop<'a> {
    /// `interval` must be non-zero.
    pub fn new(probe: &'a StateProbe, renderer: &'a Renderer, interval: Duration) -> Self {
        Self {
            probe,
            renderer,
            interval,
        }
    }

    /// Run until `shutdown_token` is cancelled or the display fails.
    ///
    /// The first frame is drawn immediately. Returns the number of frames
    /// pushed, or the display error that stopped the loop.
    pub async fn run<S: DisplaySurface + ?Sized>(
        &self,
        surface: &mut S,
        shutdown_token: &CancellationToken,
    ) -> Result<u64, DisplayError> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut state = LoopState::Running;
        let mut failure = None;
        let mut frames = 0;

        while state == LoopState::Running {
            tokio::select! {
                _ = shutdown_token.cancelled() => {
                    state = LoopState::ShuttingDown;
                    continue;
                }
                _ = ticker.tick() => {}
            }

            let filter_state = tokio::select! {
                _ = shutdown_token.cancelled() => {
                    state = LoopState::ShuttingDown;
                    continue;
                }
                filter_state = self.probe.query() => filter_state,
            };

            let now = Local::now().naive_local();
            match self.renderer.render(&mut *surface, filter_state, now).await {
                Ok(()) => frames += 1,
                Err(e) => {
                    error!("display failed, shutting down: {e}");
                    failure = Some(e);
                    state = LoopState::ShuttingDown;
                }
            }
            debug!("tick {frames} done, filter is {filter_state}");
        }

        info!("status loop stopped after {frames} frames");
        match failure {
            Some(e) => Err(e),
            None => Ok(frames),
        }
    }
}
