use crate::models::{DocumentRecord, Field, ValidationIssue, ValidationIssueType};

#[derive(Debug, Clone)]
pub struct CompletenessResult {
    pub is_complete: bool,
    pub issues: Vec<ValidationIssue>,
}

pub struct CompletenessValidator;

impl CompletenessValidator {
    pub fn validate(record: &DocumentRecord) -> CompletenessResult {
        let mut issues = Vec::new();

        for field in Field::REQUIRED {
            match record.text(field) {
                None => issues.push(ValidationIssue {
                    issue_type: ValidationIssueType::MissingField,
                    field: Some(field),
                    message: format!("{} is missing", field.label()),
                }),
                Some(value) if value.trim().is_empty() => issues.push(ValidationIssue {
                    issue_type: ValidationIssueType::BlankField,
                    field: Some(field),
                    message: format!("{} is blank", field.label()),
                }),
                Some(_) => {}
            }
        }

        CompletenessResult {
            is_complete: issues.is_empty(),
            issues,
        }
    }

    /// A card may be saved once no pass is running and every required field
    /// holds a non-blank value.
    pub fn is_save_allowed(record: &DocumentRecord, passes_in_flight: bool) -> bool {
        !passes_in_flight && Self::validate(record).is_complete
    }
}
