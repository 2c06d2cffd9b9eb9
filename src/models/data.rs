use crate::utils::ScanError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageOutputFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardModel {
    Unknown,
    New,
    Old,
}

impl CardModel {
    // Raw values used by the stored card format
    pub fn raw_value(&self) -> i16 {
        match self {
            CardModel::Unknown => 0,
            CardModel::New => 1,
            CardModel::Old => 2,
        }
    }
}

impl Default for CardModel {
    fn default() -> Self {
        CardModel::Unknown
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
        }
    }

    /// Looks for a literal "F", then a literal "M", anywhere in the text.
    pub fn from_latin_marker(text: &str) -> Option<Sex> {
        if text.contains('F') {
            Some(Sex::Female)
        } else if text.contains('M') {
            Some(Sex::Male)
        } else {
            None
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record fields that the recognition passes fill in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    EnglishName,
    Ccc,
    DateOfBirth,
    Sex,
    DateOfIssue,
    DateOfRegistration,
    Number,
    Symbols,
}

impl Field {
    /// Fields that must hold a non-blank value before a card can be saved.
    pub const REQUIRED: [Field; 7] = [
        Field::EnglishName,
        Field::DateOfBirth,
        Field::DateOfIssue,
        Field::DateOfRegistration,
        Field::Sex,
        Field::Symbols,
        Field::Number,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Field::EnglishName => "English name",
            Field::Ccc => "Chinese commercial code",
            Field::DateOfBirth => "Date of birth",
            Field::Sex => "Sex",
            Field::DateOfIssue => "Date of issue",
            Field::DateOfRegistration => "Date of registration",
            Field::Number => "Number",
            Field::Symbols => "Symbols",
        }
    }
}

/// A single write to the record, produced by the extraction rules.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    EnglishName(String),
    Ccc {
        codes: Vec<u32>,
        ccc_string: String,
        chinese_name: String,
    },
    DateOfBirth(String),
    Sex(Sex),
    DateOfIssue(String),
    DateOfRegistration(String),
    Number(String),
    Symbols(String),
}

impl FieldUpdate {
    pub fn field(&self) -> Field {
        match self {
            FieldUpdate::EnglishName(_) => Field::EnglishName,
            FieldUpdate::Ccc { .. } => Field::Ccc,
            FieldUpdate::DateOfBirth(_) => Field::DateOfBirth,
            FieldUpdate::Sex(_) => Field::Sex,
            FieldUpdate::DateOfIssue(_) => Field::DateOfIssue,
            FieldUpdate::DateOfRegistration(_) => Field::DateOfRegistration,
            FieldUpdate::Number(_) => Field::Number,
            FieldUpdate::Symbols(_) => Field::Symbols,
        }
    }
}

/// The card being assembled from one scan attempt. Every field is written at
/// most once; later writes to a set field are ignored.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentRecord {
    english_name: Option<String>,
    chinese_name: Option<String>,
    ccc_codes: Vec<u32>,
    ccc_string: Option<String>,
    date_of_birth: Option<String>,
    sex: Option<Sex>,
    date_of_issue: Option<String>,
    date_of_registration: Option<String>,
    number: Option<String>,
    symbols: Option<String>,
    card_model: Option<CardModel>,
    classifier_confidence_percent: Option<f64>,
    model_warning: bool,
    #[serde(skip)]
    source_image: Option<DynamicImage>,
    #[serde(skip)]
    masked_image: Option<DynamicImage>,
    #[serde(skip)]
    face_image: Option<DynamicImage>,
}

impl DocumentRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_set(&self, field: Field) -> bool {
        match field {
            Field::EnglishName => self.english_name.is_some(),
            Field::Ccc => !self.ccc_codes.is_empty(),
            Field::DateOfBirth => self.date_of_birth.is_some(),
            Field::Sex => self.sex.is_some(),
            Field::DateOfIssue => self.date_of_issue.is_some(),
            Field::DateOfRegistration => self.date_of_registration.is_some(),
            Field::Number => self.number.is_some(),
            Field::Symbols => self.symbols.is_some(),
        }
    }

    /// Writes the update if its field is still unset. Returns whether the
    /// record changed.
    pub fn apply(&mut self, update: FieldUpdate) -> bool {
        if self.is_set(update.field()) {
            return false;
        }
        match update {
            FieldUpdate::EnglishName(value) => self.english_name = Some(value),
            FieldUpdate::Ccc {
                codes,
                ccc_string,
                chinese_name,
            } => {
                if codes.is_empty() {
                    return false;
                }
                self.ccc_codes = codes;
                self.ccc_string = Some(ccc_string);
                self.chinese_name = Some(chinese_name);
            }
            FieldUpdate::DateOfBirth(value) => self.date_of_birth = Some(value),
            FieldUpdate::Sex(value) => self.sex = Some(value),
            FieldUpdate::DateOfIssue(value) => self.date_of_issue = Some(value),
            FieldUpdate::DateOfRegistration(value) => self.date_of_registration = Some(value),
            FieldUpdate::Number(value) => self.number = Some(value),
            FieldUpdate::Symbols(value) => self.symbols = Some(value),
        }
        true
    }

    /// Text value of a field, as it would be displayed or stored.
    pub fn text(&self, field: Field) -> Option<&str> {
        match field {
            Field::EnglishName => self.english_name.as_deref(),
            Field::Ccc => self.ccc_string.as_deref(),
            Field::DateOfBirth => self.date_of_birth.as_deref(),
            Field::Sex => self.sex.as_ref().map(Sex::as_str),
            Field::DateOfIssue => self.date_of_issue.as_deref(),
            Field::DateOfRegistration => self.date_of_registration.as_deref(),
            Field::Number => self.number.as_deref(),
            Field::Symbols => self.symbols.as_deref(),
        }
    }

    pub fn english_name(&self) -> Option<&str> {
        self.english_name.as_deref()
    }

    pub fn chinese_name(&self) -> Option<&str> {
        self.chinese_name.as_deref()
    }

    pub fn ccc_codes(&self) -> &[u32] {
        &self.ccc_codes
    }

    pub fn ccc_string(&self) -> Option<&str> {
        self.ccc_string.as_deref()
    }

    pub fn date_of_birth(&self) -> Option<&str> {
        self.date_of_birth.as_deref()
    }

    pub fn sex(&self) -> Option<Sex> {
        self.sex
    }

    pub fn date_of_issue(&self) -> Option<&str> {
        self.date_of_issue.as_deref()
    }

    pub fn date_of_registration(&self) -> Option<&str> {
        self.date_of_registration.as_deref()
    }

    pub fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    pub fn symbols(&self) -> Option<&str> {
        self.symbols.as_deref()
    }

    pub fn card_model(&self) -> Option<CardModel> {
        self.card_model
    }

    pub fn classifier_confidence_percent(&self) -> Option<f64> {
        self.classifier_confidence_percent
    }

    pub fn model_warning(&self) -> bool {
        self.model_warning
    }

    pub fn set_classification(&mut self, model: CardModel, confidence_percent: Option<f64>, warning: bool) {
        self.card_model = Some(model);
        self.classifier_confidence_percent = confidence_percent;
        self.model_warning = warning;
    }

    pub fn source_image(&self) -> Option<&DynamicImage> {
        self.source_image.as_ref()
    }

    pub fn masked_image(&self) -> Option<&DynamicImage> {
        self.masked_image.as_ref()
    }

    pub fn face_image(&self) -> Option<&DynamicImage> {
        self.face_image.as_ref()
    }

    pub fn set_source_image(&mut self, image: DynamicImage) {
        self.masked_image = Some(image.clone());
        self.source_image = Some(image);
    }

    pub fn set_masked_image(&mut self, image: DynamicImage) {
        self.masked_image = Some(image);
    }

    pub fn set_face_image(&mut self, image: DynamicImage) {
        self.face_image = Some(image);
    }

    /// Snapshot for persistence. Only complete records can be saved.
    pub fn to_saved_card(&self) -> Result<SavedCard, ScanError> {
        let result = crate::validation::CompletenessValidator::validate(self);
        if !result.is_complete {
            let missing: Vec<&str> = result.issues.iter().map(|i| i.message.as_str()).collect();
            return Err(ScanError::ValidationError(format!(
                "Card is incomplete: {}",
                missing.join(", ")
            )));
        }

        Ok(SavedCard {
            chinese_name: self.chinese_name.clone(),
            english_name: self.english_name.clone().unwrap_or_default(),
            ccc: self.ccc_string.clone(),
            date_of_birth: self.date_of_birth.clone().unwrap_or_default(),
            sex: self.sex.map(|s| s.as_str().to_string()).unwrap_or_default(),
            date_of_issue: self.date_of_issue.clone().unwrap_or_default(),
            date_of_registration: self.date_of_registration.clone().unwrap_or_default(),
            symbols: self.symbols.clone().unwrap_or_default(),
            number: self.number.clone().unwrap_or_default(),
            model: self.card_model.unwrap_or_default().raw_value(),
            face_jpeg: self.face_image.as_ref().map(encode_jpeg_base64).transpose()?,
            source_jpeg: self.source_image.as_ref().map(encode_jpeg_base64).transpose()?,
            saved_at: chrono::Local::now().to_rfc3339(),
        })
    }
}

/// Read-only form of a card once the user saves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedCard {
    pub chinese_name: Option<String>,
    pub english_name: String,
    pub ccc: Option<String>,
    pub date_of_birth: String,
    pub sex: String,
    pub date_of_issue: String,
    pub date_of_registration: String,
    pub symbols: String,
    pub number: String,
    pub model: i16,
    pub face_jpeg: Option<String>,
    pub source_jpeg: Option<String>,
    pub saved_at: String,
}

fn encode_jpeg_base64(image: &DynamicImage) -> Result<String, ScanError> {
    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_to(&mut Cursor::new(&mut buffer), ImageOutputFormat::Jpeg(100))
        .map_err(|e| ScanError::ImageProcessingError(format!("Failed to encode JPEG: {}", e)))?;
    Ok(STANDARD.encode(buffer))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub issue_type: ValidationIssueType,
    pub field: Option<Field>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationIssueType {
    MissingField,
    BlankField,
}
