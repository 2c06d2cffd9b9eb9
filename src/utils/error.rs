use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Image processing error: {0}")]
    ImageProcessingError(String),
    #[error("Recognition error in {pass} pass: {message}")]
    RecognitionError { pass: String, message: String },
    #[error("Code table error: {0}")]
    CodeTableError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ScanError {
    pub fn recognition(pass: impl Into<String>, message: impl Into<String>) -> Self {
        ScanError::RecognitionError {
            pass: pass.into(),
            message: message.into(),
        }
    }
}
