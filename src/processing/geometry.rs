// Box arithmetic for redaction and face cropping
// The constants below are fitted to the two supported card layouts

use crate::models::{NormalizedRect, PixelRect};

// A birth-date line wider than this also covers the sex glyph
const BIRTH_DATE_MAX_WIDTH: f64 = 0.27;
const BIRTH_DATE_SEX_GLYPH_WIDTH: f64 = 0.08;

const NUMBER_SPLIT_OFFSET_DIVISOR: f64 = 2.1;
const NUMBER_SPLIT_WIDTH_DIVISOR: f64 = 1.9;

const FACE_EXPANSION: f64 = 1.5;

/// Which correction to apply to a matched line's box before redacting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedactionKind {
    WholeLine,
    BirthDate,
    NumberCheckCharacter,
}

pub struct GeometryCalculator;

impl GeometryCalculator {
    pub fn to_pixel_rect(rect: &NormalizedRect, image_width: u32, image_height: u32) -> PixelRect {
        rect.to_pixel_rect(image_width, image_height)
    }

    pub fn adjust(kind: RedactionKind, rect: &NormalizedRect) -> NormalizedRect {
        match kind {
            RedactionKind::WholeLine => *rect,
            RedactionKind::BirthDate => Self::birth_date_box(rect),
            RedactionKind::NumberCheckCharacter => Self::number_check_box(rect),
        }
    }

    /// Drops the sex glyph from a birth-date box that runs into it.
    pub fn birth_date_box(rect: &NormalizedRect) -> NormalizedRect {
        if rect.width > BIRTH_DATE_MAX_WIDTH {
            NormalizedRect::new(
                rect.x,
                rect.y,
                rect.width - BIRTH_DATE_SEX_GLYPH_WIDTH,
                rect.height,
            )
        } else {
            *rect
        }
    }

    /// Right-hand portion of a registration/number line.
    pub fn number_check_box(rect: &NormalizedRect) -> NormalizedRect {
        NormalizedRect::new(
            rect.x + rect.width / NUMBER_SPLIT_OFFSET_DIVISOR,
            rect.y,
            rect.width / NUMBER_SPLIT_WIDTH_DIVISOR,
            rect.height,
        )
    }

    /// Small printed field under the photo, recognised by position alone.
    /// The vertical range is measured from the top edge of the card.
    pub fn is_small_number_field(rect: &NormalizedRect) -> bool {
        let top = rect.top();
        0.65 < rect.x
            && rect.x < 0.75
            && 0.15 < top
            && top < 0.25
            && 0.01 < rect.width
            && rect.width < 0.12
            && 0.02 < rect.height
            && rect.height < 0.05
    }

    /// Pixel crop around a detected face: 1.5x larger, anchored on the
    /// face's bottom edge and shifted left by a sixth of the new width.
    pub fn face_crop_rect(face: &NormalizedRect, image_width: u32, image_height: u32) -> PixelRect {
        let w = image_width as f64;
        let h = image_height as f64;
        let width = face.width * w * FACE_EXPANSION;
        let height = face.height * h * FACE_EXPANSION;
        let x_shift = width / 6.0;

        PixelRect::new(
            face.x * w - x_shift,
            (1.0 - face.y) * h - height,
            width,
            height,
        )
    }
}
