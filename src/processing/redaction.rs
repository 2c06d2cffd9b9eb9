use crate::models::PixelRect;
use image::{DynamicImage, GenericImageView, Rgba};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

pub struct Redactor;

impl Redactor {
    /// Copy of `image` with `rect` painted opaque black. Parts of the
    /// rectangle outside the image are ignored.
    pub fn mask(image: &DynamicImage, rect: &PixelRect) -> DynamicImage {
        let (x, y, width, height) = match rect.clip_to(image.width(), image.height()) {
            Some(clipped) => clipped,
            None => {
                log::debug!("Redaction {:?} is outside the image", rect);
                return image.clone();
            }
        };

        let mut canvas = image.to_rgba8();
        draw_filled_rect_mut(
            &mut canvas,
            Rect::at(x as i32, y as i32).of_size(width, height),
            Rgba([0, 0, 0, 255]),
        );
        DynamicImage::ImageRgba8(canvas)
    }
}
