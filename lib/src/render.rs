//! Draws the status screen: a full-screen state color, a centered title and
//! a clock line near the bottom.

use chrono::NaiveDateTime;
use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_10X20};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::text::renderer::TextRenderer;
use embedded_graphics::text::{Baseline, Text};
use log::debug;

use crate::display::{PanelSize, DisplayError, DisplaySurface};
use crate::frame::Frame;
use crate::state::FilterState;

pub const RESTRICTIVE: Rgb888 = Rgb888::new(200, 0, 0);
pub const PERMISSIVE: Rgb888 = Rgb888::new(0, 180, 0);
const TEXT_COLOR: Rgb888 = Rgb888::WHITE;

const TITLE_TOP: i32 = 22;
const CLOCK_LEFT: i32 = 6;
const CLOCK_FROM_BOTTOM: i32 = 18;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn background_color(state: FilterState) -> Rgb888 {
    match state {
        FilterState::Blocked => RESTRICTIVE,
        FilterState::Allowed => PERMISSIVE,
    }
}

pub fn format_timestamp(now: NaiveDateTime) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// Rendered width of `text` in pixels.
pub fn text_width(text: &str, font: &MonoFont) -> u32 {
    MonoTextStyle::new(font, TEXT_COLOR)
        .measure_string(text, Point::zero(), Baseline::Top)
        .bounding_box
        .size
        .width
}

/// Left edge that horizontally centers a run of `text_width` pixels.
pub fn centered_left(frame_width: u32, text_width: u32) -> i32 {
    (frame_width.saturating_sub(text_width) / 2) as i32
}

pub struct Renderer {
    title_prefix: String,
    title_font: &'static MonoFont<'static>,
    clock_font: &'static MonoFont<'static>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new("")
    }
}

impl Renderer {
    pub fn new(title_prefix: impl Into<String>) -> Self {
        Self {
            title_prefix: title_prefix.into(),
            title_font: &FONT_10X20,
            clock_font: &FONT_6X10,
        }
    }

    pub fn title(&self, state: FilterState) -> String {
        let prefix = self.title_prefix.trim();
        if prefix.is_empty() {
            state.label().to_string()
        } else {
            format!("{prefix} {}", state.label())
        }
    }

    /// Top-left corner of the title for a frame `frame_width` pixels wide.
    pub fn title_position(&self, frame_width: u32, title: &str) -> Point {
        let left = centered_left(frame_width, text_width(title, self.title_font));
        Point::new(left, TITLE_TOP)
    }

    pub fn clock_position(&self, frame_height: u32) -> Point {
        Point::new(CLOCK_LEFT, frame_height as i32 - CLOCK_FROM_BOTTOM)
    }

    /// Build a complete frame. Pure: no I/O, same inputs give the same frame.
    pub fn build_frame(&self, size: PanelSize, state: FilterState, now: NaiveDateTime) -> Frame {
        let mut frame = Frame::new(size.size(), background_color(state));

        let title = self.title(state);
        let title_style = MonoTextStyle::new(self.title_font, TEXT_COLOR);
        Text::with_baseline(
            &title,
            self.title_position(size.width, &title),
            title_style,
            Baseline::Top,
        )
        .draw(&mut frame)
        .ok();

        let clock_style = MonoTextStyle::new(self.clock_font, TEXT_COLOR);
        Text::with_baseline(
            &format_timestamp(now),
            self.clock_position(size.height),
            clock_style,
            Baseline::Top,
        )
        .draw(&mut frame)
        .ok();

        frame
    }

    /// Draw the full screen and push it to `surface` as one frame.
    pub async fn render<S: DisplaySurface + ?Sized>(
        &self,
        surface: &mut S,
        state: FilterState,
        now: NaiveDateTime,
    ) -> Result<(), DisplayError> {
        let frame = self.build_frame(surface.dimensions(), state, now);
        surface.push_frame(&frame).await?;
        debug!("rendered {state} at {}", format_timestamp(now));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const PANEL: PanelSize = PanelSize {
        width: 240,
        height: 135,
    };

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn white_columns_in_rows(frame: &Frame, rows: std::ops::Range<i32>) -> Vec<i32> {
        let mut columns = Vec::new();
        for y in rows {
            for x in 0..frame.width() as i32 {
                if frame.pixel(x, y) == Some(TEXT_COLOR) {
                    columns.push(x);
                }
            }
        }
        columns
    }

    #[test]
    fn test_timestamp_format() {
        assert_eq!(format_timestamp(at(7, 5, 3)), "2024-03-09 07:05:03");
    }

    #[test]
    fn test_titles() {
        let renderer = Renderer::new("YouTube");
        assert_eq!(renderer.title(FilterState::Blocked), "YouTube BLOCKED");
        assert_eq!(renderer.title(FilterState::Allowed), "YouTube ALLOWED");
        assert_eq!(Renderer::new("").title(FilterState::Blocked), "BLOCKED");
    }

    #[test]
    fn test_background_depends_only_on_state() {
        let renderer = Renderer::new("YouTube");
        for now in [at(0, 0, 0), at(12, 34, 56), at(23, 59, 59)] {
            for state in [FilterState::Blocked, FilterState::Allowed] {
                let frame = renderer.build_frame(PANEL, state, now);
                let expected = background_color(state);
                assert_eq!(frame.pixel(0, 0), Some(expected));
                assert_eq!(frame.pixel(239, 134), Some(expected));
                assert_eq!(frame.pixel(120, 70), Some(expected));
            }
        }
        assert_ne!(RESTRICTIVE, PERMISSIVE);
    }

    #[test]
    fn test_title_is_centered() {
        let renderer = Renderer::new("YouTube");
        for title in ["YouTube BLOCKED", "ALLOWED", "X", ""] {
            let width = text_width(title, &FONT_10X20);
            assert_eq!(width, title.len() as u32 * 10);
            let position = renderer.title_position(PANEL.width, title);
            assert_eq!((PANEL.width as i32 - width as i32) / 2, position.x);
        }
    }

    #[test]
    fn test_title_wider_than_frame_starts_at_edge() {
        assert_eq!(centered_left(50, 80), 0);
        assert_eq!(centered_left(240, 150), 45);
    }

    #[test]
    fn test_title_pixels_within_measured_box() {
        let renderer = Renderer::new("YouTube");
        let frame = renderer.build_frame(PANEL, FilterState::Blocked, at(1, 2, 3));
        let left = renderer.title_position(240, "YouTube BLOCKED").x;
        let columns = white_columns_in_rows(&frame, TITLE_TOP..TITLE_TOP + 20);
        assert!(!columns.is_empty());
        assert!(columns.iter().all(|x| *x >= left && *x < left + 150));
    }

    #[test]
    fn test_clock_line_changes_with_time() {
        let renderer = Renderer::new("YouTube");
        let a = renderer.build_frame(PANEL, FilterState::Allowed, at(1, 2, 3));
        let b = renderer.build_frame(PANEL, FilterState::Allowed, at(1, 2, 4));
        assert_ne!(a, b);

        let clock_top = 135 - CLOCK_FROM_BOTTOM;
        let columns = white_columns_in_rows(&a, clock_top..clock_top + 10);
        assert!(!columns.is_empty());
        assert!(columns.iter().all(|x| *x >= CLOCK_LEFT));
        // "YYYY-MM-DD HH:MM:SS" is 19 glyphs of 6px
        assert!(columns.iter().all(|x| *x < CLOCK_LEFT + 19 * 6));
    }

    #[test]
    fn test_build_frame_is_deterministic() {
        let renderer = Renderer::new("YouTube");
        let a = renderer.build_frame(PANEL, FilterState::Blocked, at(9, 9, 9));
        let b = renderer.build_frame(PANEL, FilterState::Blocked, at(9, 9, 9));
        assert_eq!(a, b);
    }
}
