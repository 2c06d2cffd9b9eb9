// Sex confirmation from the ideographic recognition pass
// On the card the 男/女 marker sits next to the code digits, so it is only
// trusted once a 4-digit run has been seen in this pass.

use crate::models::{DocumentRecord, Field, FieldUpdate, Sex};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CODE_RUN_PATTERN: Regex = Regex::new(r"[0-9]{4}").unwrap();
}

const FEMALE_GLYPH: char = '女';
const MALE_GLYPH: char = '男';

#[derive(Debug, Default)]
pub struct CrossValidator {
    code_seen: bool,
}

impl CrossValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.code_seen = false;
    }

    pub fn process(&mut self, line: &str, record: &mut DocumentRecord) {
        if CODE_RUN_PATTERN.is_match(line) {
            self.code_seen = true;
        }

        if !self.code_seen || record.is_set(Field::Sex) {
            return;
        }

        let sex = if line.contains(FEMALE_GLYPH) {
            Sex::Female
        } else if line.contains(MALE_GLYPH) {
            Sex::Male
        } else {
            return;
        };

        if record.apply(FieldUpdate::Sex(sex)) {
            log::debug!("Sex <- {} (ideographic pass)", sex);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_after_code_run() {
        let mut validator = CrossValidator::new();
        let mut record = DocumentRecord::new();
        validator.process("陳大文", &mut record);
        validator.process("7115 1129 2429", &mut record);
        validator.process("01-01-1980 女 F", &mut record);
        assert_eq!(record.sex(), Some(Sex::Female));
    }

    #[test]
    fn test_marker_on_same_line_as_code() {
        let mut validator = CrossValidator::new();
        let mut record = DocumentRecord::new();
        validator.process("1980 男", &mut record);
        assert_eq!(record.sex(), Some(Sex::Male));
    }

    #[test]
    fn test_marker_before_code_run_is_ignored() {
        let mut validator = CrossValidator::new();
        let mut record = DocumentRecord::new();
        validator.process("性別 男", &mut record);
        assert_eq!(record.sex(), None);
        assert!(!validator.code_seen);
    }

    #[test]
    fn test_does_not_override_existing_sex() {
        let mut validator = CrossValidator::new();
        let mut record = DocumentRecord::new();
        record.apply(FieldUpdate::Sex(Sex::Male));
        validator.process("7115 女", &mut record);
        assert_eq!(record.sex(), Some(Sex::Male));
    }

    #[test]
    fn test_reset_forgets_code_run() {
        let mut validator = CrossValidator::new();
        let mut record = DocumentRecord::new();
        validator.process("7115", &mut record);
        validator.reset();
        validator.process("女", &mut record);
        assert_eq!(record.sex(), None);
    }
}
