pub mod ccc;
pub mod code_table;
pub mod cross_validation;
pub mod extraction;
pub mod face;
pub mod geometry;
pub mod ocr;
pub mod redaction;
pub mod replay;

pub use ccc::CccDecoder;
pub use code_table::CodeTable;
pub use cross_validation::CrossValidator;
pub use extraction::FieldExtractor;
pub use face::FaceCropper;
pub use geometry::{GeometryCalculator, RedactionKind};
pub use ocr::{ClassifierObservation, DocumentClassifier, FaceDetector, RecognizedLine, TextRecognizer};
pub use redaction::Redactor;
pub use replay::RecordedScan;
