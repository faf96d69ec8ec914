use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

/// An in-memory RGB888 frame, row-major, in the panel's logical orientation.
///
/// Built fresh for every render, handed to the surface, then dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<Rgb888>,
}

impl Frame {
    pub fn new(size: Size, background: Rgb888) -> Self {
        Self {
            width: size.width,
            height: size.height,
            pixels: vec![background; size.width as usize * size.height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Rgb888] {
        &self.pixels
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgb888> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Frame {
    type Color = Rgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let Some(i) = self.index(point.x, point.y) {
                self.pixels[i] = color;
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        if area.size == Size::zero() {
            return Ok(());
        }
        let x_start = area.top_left.x as usize;
        let x_end = x_start + area.size.width as usize;
        for y in area.rows() {
            let row = y as usize * self.width as usize;
            self.pixels[row + x_start..row + x_end].fill(color);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_frame_is_filled() {
        let frame = Frame::new(Size::new(4, 3), Rgb888::RED);
        assert_eq!(frame.pixels().len(), 12);
        assert!(frame.pixels().iter().all(|p| *p == Rgb888::RED));
    }

    #[test]
    fn test_draw_clips_out_of_bounds() {
        let mut frame = Frame::new(Size::new(4, 3), Rgb888::BLACK);
        frame
            .draw_iter([
                Pixel(Point::new(1, 1), Rgb888::WHITE),
                Pixel(Point::new(-1, 0), Rgb888::WHITE),
                Pixel(Point::new(4, 0), Rgb888::WHITE),
                Pixel(Point::new(0, 3), Rgb888::WHITE),
            ])
            .ok();
        assert_eq!(frame.pixel(1, 1), Some(Rgb888::WHITE));
        assert_eq!(frame.pixels().iter().filter(|p| **p == Rgb888::WHITE).count(), 1);
        assert_eq!(frame.pixel(4, 0), None);
    }

    #[test]
    fn test_fill_solid_clips_to_frame() {
        let mut frame = Frame::new(Size::new(4, 3), Rgb888::BLACK);
        frame
            .fill_solid(&Rectangle::new(Point::new(2, 1), Size::new(10, 10)), Rgb888::GREEN)
            .ok();
        assert_eq!(frame.pixel(1, 1), Some(Rgb888::BLACK));
        assert_eq!(frame.pixel(2, 1), Some(Rgb888::GREEN));
        assert_eq!(frame.pixel(3, 2), Some(Rgb888::GREEN));
        assert_eq!(frame.pixel(3, 0), Some(Rgb888::BLACK));
    }
}
