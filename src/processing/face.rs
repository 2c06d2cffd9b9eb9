use crate::models::NormalizedRect;
use crate::processing::geometry::GeometryCalculator;
use image::{DynamicImage, GenericImageView};

pub struct FaceCropper;

impl FaceCropper {
    /// Widest detection wins; on a tie the earlier one is kept.
    pub fn select_face(faces: &[NormalizedRect]) -> Option<&NormalizedRect> {
        let mut selected: Option<&NormalizedRect> = None;
        for face in faces {
            if selected.map_or(true, |current| current.width < face.width) {
                selected = Some(face);
            }
        }
        selected
    }

    pub fn crop(source: &DynamicImage, faces: &[NormalizedRect]) -> Option<DynamicImage> {
        let face = match Self::select_face(faces) {
            Some(face) => face,
            None => {
                log::info!("No face detected");
                return None;
            }
        };
        log::debug!("Detected {} face(s), cropping {:?}", faces.len(), face);

        let rect = GeometryCalculator::face_crop_rect(face, source.width(), source.height());
        match rect.clip_to(source.width(), source.height()) {
            Some((x, y, width, height)) => Some(source.crop_imm(x, y, width, height)),
            None => {
                log::warn!("Face crop {:?} lies outside the image", rect);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_selects_widest_face() {
        let faces = [
            NormalizedRect::new(0.1, 0.3, 0.10, 0.2),
            NormalizedRect::new(0.5, 0.3, 0.15, 0.2),
        ];
        assert_eq!(FaceCropper::select_face(&faces), Some(&faces[1]));
    }

    #[test]
    fn test_tie_keeps_first() {
        let faces = [
            NormalizedRect::new(0.1, 0.3, 0.15, 0.2),
            NormalizedRect::new(0.5, 0.3, 0.15, 0.2),
        ];
        assert_eq!(FaceCropper::select_face(&faces), Some(&faces[0]));
    }

    #[test]
    fn test_no_faces_no_crop() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(100, 60));
        assert!(FaceCropper::crop(&image, &[]).is_none());
    }

    #[test]
    fn test_crop_size() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(1000, 500));
        let faces = [
            NormalizedRect::new(0.05, 0.4, 0.10, 0.2),
            NormalizedRect::new(0.6, 0.3, 0.2, 0.3),
        ];
        let face = FaceCropper::crop(&image, &faces).unwrap();
        // 0.2 * 1000 * 1.5 by 0.3 * 500 * 1.5
        assert_eq!(face.dimensions(), (300, 225));
    }

    #[test]
    fn test_crop_is_clipped_to_image() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(100, 100));
        let faces = [NormalizedRect::new(0.0, 0.0, 0.5, 0.5)];
        let face = FaceCropper::crop(&image, &faces).unwrap();
        // x starts at -12.5, y at 100 - 75 = 25
        assert_eq!(face.dimensions(), (63, 75));
    }
}
