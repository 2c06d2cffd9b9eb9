// Recorded recognition results, replayed in place of live engines
// Lets a scan be reproduced from a JSON capture of what the engines saw.

use crate::models::NormalizedRect;
use crate::processing::ocr::{
    ClassifierObservation, DocumentClassifier, FaceDetector, RecognizedLine, TextRecognizer,
};
use crate::utils::ScanError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordedScan {
    /// Latin-script lines in reading order.
    pub primary: Vec<RecognizedLine>,
    /// Ideographic-script lines in reading order.
    pub secondary: Vec<String>,
    pub faces: Vec<NormalizedRect>,
    pub classification: Option<ClassifierObservation>,
}

impl RecordedScan {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ScanError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn primary_recognizer(&self) -> RecordedText {
        RecordedText {
            lines: self.primary.clone(),
        }
    }

    pub fn secondary_recognizer(&self) -> RecordedText {
        RecordedText {
            lines: self
                .secondary
                .iter()
                .map(|text| RecognizedLine::text_only(text.as_str()))
                .collect(),
        }
    }

    pub fn face_detector(&self) -> RecordedFaces {
        RecordedFaces {
            faces: self.faces.clone(),
        }
    }

    pub fn classifier(&self) -> RecordedClassification {
        RecordedClassification {
            observation: self.classification.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedText {
    lines: Vec<RecognizedLine>,
}

impl TextRecognizer for RecordedText {
    fn recognize(&self, _image: &DynamicImage) -> Result<Vec<RecognizedLine>, ScanError> {
        Ok(self.lines.clone())
    }
}

#[derive(Debug, Clone)]
pub struct RecordedFaces {
    faces: Vec<NormalizedRect>,
}

impl FaceDetector for RecordedFaces {
    fn detect_faces(&self, _image: &DynamicImage) -> Result<Vec<NormalizedRect>, ScanError> {
        Ok(self.faces.clone())
    }
}

#[derive(Debug, Clone)]
pub struct RecordedClassification {
    observation: Option<ClassifierObservation>,
}

impl DocumentClassifier for RecordedClassification {
    fn classify(&self, _image: &DynamicImage) -> Result<Option<ClassifierObservation>, ScanError> {
        Ok(self.observation.clone())
    }
}
