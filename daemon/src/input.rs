//! Button input from Linux evdev devices.
//!
//! The panel's buttons are exposed through the `gpio-key` overlay with the
//! pins pulled up and active-low, so a falling edge arrives as an `EV_KEY`
//! event with value 1. Each configured button gets one reader task that owns
//! its open device; cancelling the task closes the device.

use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::OpenOptionsExt;

use filterpanel::buttons::{ButtonEvent, ButtonPress};
use log::{debug, info, warn};
use tokio::io::unix::AsyncFd;
use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::{ButtonConfig, ButtonsConfig};

const EV_KEY: u16 = 0x01;
const KEY_PRESSED: i32 = 1;

const TIMEVAL_SIZE: usize = std::mem::size_of::<libc::timeval>();
const INPUT_EVENT_SIZE: usize = std::mem::size_of::<libc::input_event>();

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    /// Whether this is a key going down, optionally restricted to one code.
    pub fn is_press(&self, key_code: Option<u16>) -> bool {
        self.kind == EV_KEY && self.value == KEY_PRESSED && key_code.is_none_or(|code| code == self.code)
    }
}

/// Decode one native-endian `struct input_event`.
pub fn parse_input_event(buf: &[u8]) -> Option<InputEvent> {
    let fields = buf.get(TIMEVAL_SIZE..TIMEVAL_SIZE + 8)?;
    Some(InputEvent {
        kind: u16::from_ne_bytes([fields[0], fields[1]]),
        code: u16::from_ne_bytes([fields[2], fields[3]]),
        value: i32::from_ne_bytes([fields[4], fields[5], fields[6], fields[7]]),
    })
}

pub struct InputButton {
    path: String,
    fd: AsyncFd<File>,
    key_code: Option<u16>,
}

impl InputButton {
    pub fn open(path: &str, key_code: Option<u16>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)?;
        Ok(Self {
            path: path.to_string(),
            fd: AsyncFd::new(file)?,
            key_code,
        })
    }

    async fn read_event(&self) -> io::Result<InputEvent> {
        let mut buf = [0u8; INPUT_EVENT_SIZE];
        loop {
            let mut guard = self.fd.readable().await?;
            let read = guard.try_io(|inner| {
                let mut file: &File = inner.get_ref();
                file.read(&mut buf)
            });
            match read {
                Ok(Ok(n)) if n == INPUT_EVENT_SIZE => {
                    return parse_input_event(&buf)
                        .ok_or_else(|| io::Error::from(io::ErrorKind::InvalidData));
                }
                Ok(Ok(n)) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("short read of {n} bytes"),
                    ));
                }
                Ok(Err(e)) => return Err(e),
                Err(_would_block) => continue,
            }
        }
    }

    /// Wait for the next press, skipping releases, repeats and sync events.
    pub async fn next_press(&self) -> io::Result<()> {
        loop {
            let event = self.read_event().await?;
            if event.is_press(self.key_code) {
                return Ok(());
            }
        }
    }
}

/// Open both configured buttons and start one reader task per button.
///
/// A device that cannot be opened is logged and skipped; the other button
/// and the display keep working.
pub fn run_input_readers(
    task_tracker: &TaskTracker,
    shutdown_token: CancellationToken,
    config: &ButtonsConfig,
    presses: Sender<ButtonPress>,
) {
    let buttons = [
        (ButtonEvent::BlockPressed, &config.block),
        (ButtonEvent::AllowPressed, &config.allow),
    ];
    for (event, button_config) in buttons {
        if let Some(button) = open_button(event, button_config) {
            run_input_reader(task_tracker, button, event, presses.clone(), shutdown_token.clone());
        }
    }
}

fn open_button(event: ButtonEvent, config: &ButtonConfig) -> Option<InputButton> {
    let path = config.device.as_deref()?;
    match InputButton::open(path, config.key_code) {
        Ok(button) => {
            info!("listening for {event:?} on {path}");
            Some(button)
        }
        Err(e) => {
            warn!("{path} unavailable, {event:?} disabled: {e}");
            None
        }
    }
}

fn run_input_reader(
    task_tracker: &TaskTracker,
    button: InputButton,
    event: ButtonEvent,
    presses: Sender<ButtonPress>,
    shutdown_token: CancellationToken,
) {
    task_tracker.spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown_token.cancelled() => break,
                result = button.next_press() => match result {
                    Ok(()) => match presses.try_send(ButtonPress::now(event)) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => debug!("dropping {event:?}, controller busy"),
                        Err(TrySendError::Closed(_)) => break,
                    },
                    Err(e) => {
                        warn!("reading {} failed, {event:?} disabled: {e}", button.path);
                        break;
                    }
                },
            }
        }
        info!("released {}", button.path);
    });
}
