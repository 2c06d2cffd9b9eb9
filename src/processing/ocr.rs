// Boundary with the recognition engines
// Text recognition, face detection and card classification all run outside
// this crate; these traits describe what the scanner needs from them.

use crate::models::NormalizedRect;
use crate::utils::ScanError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Top candidate for one recognised line of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedLine {
    pub text: String,
    #[serde(default)]
    pub bounding_box: Option<NormalizedRect>,
}

impl RecognizedLine {
    pub fn new(text: impl Into<String>, bounding_box: Option<NormalizedRect>) -> Self {
        RecognizedLine {
            text: text.into(),
            bounding_box,
        }
    }

    pub fn text_only(text: impl Into<String>) -> Self {
        Self::new(text, None)
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Box for the characters in `range` (character offsets). Engines only
    /// report whole-line boxes here, so a sub-range gets the matching
    /// horizontal slice of the line box.
    pub fn bounding_box(&self, range: Range<usize>) -> Option<NormalizedRect> {
        let line_box = self.bounding_box?;
        let count = self.char_count();
        let start = range.start.min(count);
        let end = range.end.min(count);

        if count == 0 || (start == 0 && end == count) {
            return Some(line_box);
        }
        if end <= start {
            return None;
        }

        let unit = line_box.width / count as f64;
        Some(NormalizedRect::new(
            line_box.x + unit * start as f64,
            line_box.y,
            unit * (end - start) as f64,
            line_box.height,
        ))
    }

    pub fn full_bounding_box(&self) -> Option<NormalizedRect> {
        self.bounding_box(0..self.char_count())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierObservation {
    pub label: String,
    pub confidence_percent: f64,
}

/// Produces lines in reading order, top of the card first.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<RecognizedLine>, ScanError>;
}

pub trait FaceDetector: Send + Sync {
    fn detect_faces(&self, image: &DynamicImage) -> Result<Vec<NormalizedRect>, ScanError>;
}

pub trait DocumentClassifier: Send + Sync {
    fn classify(&self, image: &DynamicImage) -> Result<Option<ClassifierObservation>, ScanError>;
}
