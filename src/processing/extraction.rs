// Field extraction from the Latin-script recognition pass
//
// Each recognised line is tested against an ordered list of rules. The first
// rule whose field is still unset and whose pattern matches the line wins, so
// the rule order mirrors the top-to-bottom layout of the card. Lines arriving
// in a different order can land in the wrong field; nothing here tries to
// recover from that.

use crate::models::{DocumentRecord, Field, FieldUpdate, NormalizedRect, Sex};
use crate::processing::geometry::{GeometryCalculator, RedactionKind};
use crate::processing::ocr::RecognizedLine;
use crate::processing::{CccDecoder, CodeTable};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ENGLISH_NAME_PATTERN: Regex = Regex::new(r"[a-zA-Z\s]+,[a-zA-Z\s]+").unwrap();
    static ref CCC_PATTERN: Regex = Regex::new(r"[0-9\s]{4,}").unwrap();
    static ref DATE_OF_BIRTH_PATTERN: Regex =
        Regex::new(r"[0-9\s]{2,}-[0-9\s]{2,}-[0-9]{4,}").unwrap();
    static ref DATE_OF_ISSUE_PATTERN: Regex = Regex::new(r"\([0-9]+-[0-9]+\)").unwrap();
    static ref DATE_OF_REGISTRATION_PATTERN: Regex =
        Regex::new(r"[0-9\s]{2,}-[0-9\s]{2,}-[0-9\s]{2}").unwrap();
    static ref NUMBER_PATTERN: Regex = Regex::new(r"[A-Z0-9]{7}\s?.[A-E0-9]\)").unwrap();
}

const SYMBOLS_MAX_CHARS: usize = 10;

/// What one rule pulled out of a line.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub updates: Vec<FieldUpdate>,
    pub redaction: Option<RedactionKind>,
}

impl Extraction {
    fn single(update: FieldUpdate) -> Self {
        Extraction {
            updates: vec![update],
            redaction: None,
        }
    }
}

pub struct ExtractionRule {
    pub name: &'static str,
    pub field: Field,
    extract: fn(&str, &CccDecoder<'_>) -> Option<Extraction>,
}

impl ExtractionRule {
    pub fn extract(&self, line: &str, decoder: &CccDecoder<'_>) -> Option<Extraction> {
        (self.extract)(line, decoder)
    }
}

static RULES: [ExtractionRule; 7] = [
    ExtractionRule {
        name: "english_name",
        field: Field::EnglishName,
        extract: extract_english_name,
    },
    ExtractionRule {
        name: "ccc",
        field: Field::Ccc,
        extract: extract_ccc,
    },
    ExtractionRule {
        name: "date_of_birth",
        field: Field::DateOfBirth,
        extract: extract_date_of_birth,
    },
    ExtractionRule {
        name: "date_of_issue",
        field: Field::DateOfIssue,
        extract: extract_date_of_issue,
    },
    ExtractionRule {
        name: "date_of_registration",
        field: Field::DateOfRegistration,
        extract: extract_date_of_registration,
    },
    ExtractionRule {
        name: "number",
        field: Field::Number,
        extract: extract_number,
    },
    ExtractionRule {
        name: "symbols",
        field: Field::Symbols,
        extract: extract_symbols,
    },
];

/// The rules in evaluation order.
pub fn rules() -> &'static [ExtractionRule] {
    &RULES
}

fn extract_english_name(line: &str, _: &CccDecoder<'_>) -> Option<Extraction> {
    let found = ENGLISH_NAME_PATTERN.find(line)?;
    Some(Extraction::single(FieldUpdate::EnglishName(
        found.as_str().to_string(),
    )))
}

fn extract_ccc(line: &str, decoder: &CccDecoder<'_>) -> Option<Extraction> {
    let found = CCC_PATTERN.find(line)?.as_str();
    // "dddd dddd" shape only, not any long digit run
    if found.chars().count() <= 4 || found.chars().nth(4) != Some(' ') {
        return None;
    }

    let mut codes = Vec::new();
    let mut tokens = Vec::new();
    for token in found.split_whitespace() {
        match token.parse::<u32>() {
            Ok(code) => {
                codes.push(code);
                tokens.push(token);
            }
            Err(e) => log::warn!("Skipping code group {:?}: {}", token, e),
        }
    }
    if codes.is_empty() {
        return None;
    }

    let chinese_name = decoder.decode_all(&codes);
    Some(Extraction::single(FieldUpdate::Ccc {
        codes,
        ccc_string: tokens.join(" ").trim().to_string(),
        chinese_name,
    }))
}

fn extract_date_of_birth(line: &str, _: &CccDecoder<'_>) -> Option<Extraction> {
    let found = DATE_OF_BIRTH_PATTERN.find(line)?;
    let mut updates = vec![FieldUpdate::DateOfBirth(remove_whitespace(found.as_str()))];
    // The sex letter is printed on the same line
    if let Some(sex) = Sex::from_latin_marker(line) {
        updates.push(FieldUpdate::Sex(sex));
    }
    Some(Extraction {
        updates,
        redaction: Some(RedactionKind::BirthDate),
    })
}

fn extract_date_of_issue(line: &str, _: &CccDecoder<'_>) -> Option<Extraction> {
    let found = DATE_OF_ISSUE_PATTERN.find(line)?;
    Some(Extraction::single(FieldUpdate::DateOfIssue(
        found.as_str().to_string(),
    )))
}

fn extract_date_of_registration(line: &str, _: &CccDecoder<'_>) -> Option<Extraction> {
    let found = DATE_OF_REGISTRATION_PATTERN.find(line)?;
    let mut extraction = Extraction::single(FieldUpdate::DateOfRegistration(remove_whitespace(
        found.as_str(),
    )));
    // The number usually shares the registration line
    if let Some(number) = match_number(line) {
        extraction.updates.push(FieldUpdate::Number(number));
        extraction.redaction = Some(RedactionKind::NumberCheckCharacter);
    }
    Some(extraction)
}

fn extract_number(line: &str, _: &CccDecoder<'_>) -> Option<Extraction> {
    let number = match_number(line)?;
    Some(Extraction {
        updates: vec![FieldUpdate::Number(number)],
        redaction: Some(RedactionKind::WholeLine),
    })
}

fn extract_symbols(line: &str, _: &CccDecoder<'_>) -> Option<Extraction> {
    let has_star = line.contains('*') || line.contains('•');
    if !has_star || line.chars().count() >= SYMBOLS_MAX_CHARS {
        return None;
    }

    let mut symbols = line.to_string();
    // A trailing 7 is a misread Z
    if symbols.ends_with('7') {
        symbols.pop();
        symbols.push('Z');
    }
    Some(Extraction::single(FieldUpdate::Symbols(
        symbols.replace('•', "*"),
    )))
}

fn match_number(line: &str) -> Option<String> {
    let found = NUMBER_PATTERN.find(line)?;
    let mut number = remove_whitespace(found.as_str());
    // A leading 7 is a misread Z
    if number.starts_with('7') {
        number.replace_range(..1, "Z");
    }
    Some(number)
}

fn remove_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Result of running one line through the rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineOutcome {
    pub rule: Option<&'static str>,
    pub redaction: Option<RedactionKind>,
}

pub struct FieldExtractor<'a> {
    decoder: CccDecoder<'a>,
    redact_small_number_field: bool,
}

impl<'a> FieldExtractor<'a> {
    pub fn new(table: &'a CodeTable) -> Self {
        FieldExtractor {
            decoder: CccDecoder::new(table),
            redact_small_number_field: true,
        }
    }

    pub fn with_small_number_field_redaction(mut self, enabled: bool) -> Self {
        self.redact_small_number_field = enabled;
        self
    }

    /// Runs one line through the rules and returns the normalized box to
    /// redact for it, if any.
    pub fn process(&self, line: &RecognizedLine, record: &mut DocumentRecord) -> Option<NormalizedRect> {
        let outcome = self.process_text(&line.text, record);
        match outcome.redaction {
            Some(kind) => line
                .full_bounding_box()
                .map(|rect| GeometryCalculator::adjust(kind, &rect)),
            None if self.redact_small_number_field => line
                .full_bounding_box()
                .filter(GeometryCalculator::is_small_number_field),
            None => None,
        }
    }

    pub fn process_text(&self, line: &str, record: &mut DocumentRecord) -> LineOutcome {
        let mut outcome = LineOutcome::default();

        for rule in rules() {
            if record.is_set(rule.field) {
                continue;
            }
            if let Some(extraction) = rule.extract(line, &self.decoder) {
                for update in extraction.updates {
                    let field = update.field();
                    if record.apply(update) {
                        log::debug!("{} <- {:?}", field.label(), record.text(field));
                    }
                }
                outcome.rule = Some(rule.name);
                outcome.redaction = extraction.redaction;
                break;
            }
        }

        // Late sex marker once the name and birth date are known
        if record.is_set(Field::DateOfBirth)
            && record.is_set(Field::EnglishName)
            && !record.is_set(Field::Sex)
        {
            if let Some(sex) = Sex::from_latin_marker(line) {
                record.apply(FieldUpdate::Sex(sex));
                log::debug!("Sex <- {} (fallback)", sex);
            }
        }

        outcome
    }
}
