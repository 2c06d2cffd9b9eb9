use serde::{Deserialize, Serialize};

/// A box expressed as fractions of the image size, origin at the bottom-left
/// corner. This is what the recognition collaborators report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A box in image pixels, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        NormalizedRect { x, y, width, height }
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    /// Distance of the top edge from the top of the image, still normalized.
    pub fn top(&self) -> f64 {
        1.0 - self.y - self.height
    }

    pub fn to_pixel_rect(&self, image_width: u32, image_height: u32) -> PixelRect {
        let w = image_width as f64;
        let h = image_height as f64;
        PixelRect {
            x: self.x * w,
            y: self.top() * h,
            width: self.width * w,
            height: self.height * h,
        }
    }
}

impl PixelRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        PixelRect { x, y, width, height }
    }

    /// Integer (x, y, width, height) of the part of this rectangle that lies
    /// inside an image of the given size, or None when nothing does.
    pub fn clip_to(&self, image_width: u32, image_height: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = self.x.max(0.0).round();
        let y0 = self.y.max(0.0).round();
        let x1 = (self.x + self.width).min(image_width as f64).round();
        let y1 = (self.y + self.height).min(image_height as f64).round();

        if !(x1 > x0 && y1 > y0) {
            return None;
        }

        let x = x0 as u32;
        let y = y0 as u32;
        let width = (x1 as u32).min(image_width).saturating_sub(x);
        let height = (y1 as u32).min(image_height).saturating_sub(y);
        if width == 0 || height == 0 {
            return None;
        }
        Some((x, y, width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_rect_flips_vertical_axis() {
        let rect = NormalizedRect::new(0.25, 0.5, 0.5, 0.25).to_pixel_rect(200, 100);
        assert_eq!(rect, PixelRect::new(50.0, 25.0, 100.0, 25.0));
    }

    #[test]
    fn test_clip_inside_image() {
        let rect = PixelRect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(rect.clip_to(100, 100), Some((10, 20, 30, 40)));
    }

    #[test]
    fn test_clip_partially_outside() {
        let rect = PixelRect::new(-10.0, 90.0, 30.0, 40.0);
        assert_eq!(rect.clip_to(100, 100), Some((0, 90, 20, 10)));
    }

    #[test]
    fn test_clip_fully_outside() {
        assert_eq!(PixelRect::new(120.0, 0.0, 10.0, 10.0).clip_to(100, 100), None);
        assert_eq!(PixelRect::new(5.0, 5.0, 0.0, 10.0).clip_to(100, 100), None);
    }
}
