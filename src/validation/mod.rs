pub mod completeness;
pub mod model;

pub use completeness::{CompletenessResult, CompletenessValidator};
pub use model::{ModelClassification, ModelClassifier};
