// Runs the four recognition passes over one card image and merges their
// results into a single record.
//
// The passes run on their own threads and report back over one channel. Only
// the thread that owns the ScanSession mutates the record, and every result is
// tagged with the generation it was started under so that anything arriving
// after a reset is dropped.

use crate::models::{DocumentRecord, NormalizedRect, SavedCard};
use crate::processing::{
    ClassifierObservation, CodeTable, CrossValidator, DocumentClassifier, FaceCropper,
    FaceDetector, FieldExtractor, GeometryCalculator, RecognizedLine, RecordedScan, Redactor,
    TextRecognizer,
};
use crate::utils::{ScanConfig, ScanError};
use crate::validation::{CompletenessValidator, ModelClassifier};
use image::{DynamicImage, GenericImageView};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Primary,
    Secondary,
    Face,
    Classifier,
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            PassKind::Primary => "latin text",
            PassKind::Secondary => "ideographic text",
            PassKind::Face => "face detection",
            PassKind::Classifier => "card classification",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub enum PassOutput {
    PrimaryLines(Vec<RecognizedLine>),
    SecondaryLines(Vec<RecognizedLine>),
    Faces(Vec<NormalizedRect>),
    Classification(Option<ClassifierObservation>),
    Failed { pass: PassKind, message: String },
}

impl PassOutput {
    pub fn pass(&self) -> PassKind {
        match self {
            PassOutput::PrimaryLines(_) => PassKind::Primary,
            PassOutput::SecondaryLines(_) => PassKind::Secondary,
            PassOutput::Faces(_) => PassKind::Face,
            PassOutput::Classification(_) => PassKind::Classifier,
            PassOutput::Failed { pass, .. } => *pass,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PassEvent {
    pub generation: u64,
    pub output: PassOutput,
}

#[derive(Debug, Default, Clone, Copy)]
struct InFlight {
    primary: bool,
    secondary: bool,
    face: bool,
    classifier: bool,
}

impl InFlight {
    fn all() -> Self {
        InFlight {
            primary: true,
            secondary: true,
            face: true,
            classifier: true,
        }
    }

    fn finish(&mut self, pass: PassKind) {
        match pass {
            PassKind::Primary => self.primary = false,
            PassKind::Secondary => self.secondary = false,
            PassKind::Face => self.face = false,
            PassKind::Classifier => self.classifier = false,
        }
    }

    fn any(&self) -> bool {
        self.primary || self.secondary || self.face || self.classifier
    }
}

/// Owner of the record for one scan attempt at a time.
pub struct ScanSession {
    config: ScanConfig,
    code_table: Arc<CodeTable>,
    generation: u64,
    record: DocumentRecord,
    in_flight: InFlight,
    cross_validator: CrossValidator,
}

impl ScanSession {
    pub fn new(config: ScanConfig, code_table: Arc<CodeTable>) -> Self {
        ScanSession {
            config,
            code_table,
            generation: 0,
            record: DocumentRecord::new(),
            in_flight: InFlight::default(),
            cross_validator: CrossValidator::new(),
        }
    }

    /// Session using the table named in the config, or the embedded one.
    pub fn from_config(config: ScanConfig) -> Result<Self, ScanError> {
        let code_table = match &config.code_table_path {
            Some(path) => CodeTable::from_path(path)?,
            None => CodeTable::embedded().clone(),
        };
        Ok(Self::new(config, Arc::new(code_table)))
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn record(&self) -> &DocumentRecord {
        &self.record
    }

    /// Drops the current record and anything still in flight for it.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.record.reset();
        self.in_flight = InFlight::default();
        self.cross_validator.reset();
    }

    /// Starts a new attempt on `image` and returns its generation.
    pub fn begin(&mut self, image: DynamicImage) -> u64 {
        self.reset();
        self.record.set_source_image(image);
        self.in_flight = InFlight::all();
        self.generation
    }

    /// Stops waiting for the passes of the current attempt. Fields already
    /// filled in are kept; later results are discarded.
    pub fn expire(&mut self) {
        self.generation += 1;
        self.in_flight = InFlight::default();
    }

    pub fn is_recognizing(&self) -> bool {
        self.in_flight.any()
    }

    pub fn is_save_allowed(&self) -> bool {
        CompletenessValidator::is_save_allowed(&self.record, self.is_recognizing())
    }

    pub fn saved_card(&self) -> Result<SavedCard, ScanError> {
        if self.is_recognizing() {
            return Err(ScanError::ValidationError(
                "Recognition is still running".to_string(),
            ));
        }
        self.record.to_saved_card()
    }

    /// Applies one pass result. Returns false when the result belongs to an
    /// earlier attempt and was dropped.
    pub fn apply(&mut self, event: PassEvent) -> bool {
        if event.generation != self.generation {
            log::debug!(
                "Discarding {} result from generation {} (current {})",
                event.output.pass(),
                event.generation,
                self.generation
            );
            return false;
        }

        let pass = event.output.pass();
        match event.output {
            PassOutput::PrimaryLines(lines) => self.apply_primary(&lines),
            PassOutput::SecondaryLines(lines) => {
                for line in &lines {
                    self.cross_validator.process(&line.text, &mut self.record);
                }
            }
            PassOutput::Faces(faces) => {
                let face = self
                    .record
                    .source_image()
                    .and_then(|source| FaceCropper::crop(source, &faces));
                if let Some(face) = face {
                    self.record.set_face_image(face);
                }
            }
            PassOutput::Classification(observation) => {
                let classification = ModelClassifier::new(&self.config)
                    .classify_observation(observation.as_ref());
                self.record.set_classification(
                    classification.model,
                    observation.map(|o| o.confidence_percent),
                    classification.warning,
                );
            }
            PassOutput::Failed { pass, message } => {
                log::warn!("{} pass produced no observations: {}", pass, message);
            }
        }

        self.in_flight.finish(pass);
        log::info!("Finished {} pass", pass);
        true
    }

    fn apply_primary(&mut self, lines: &[RecognizedLine]) {
        let extractor = FieldExtractor::new(&self.code_table)
            .with_small_number_field_redaction(self.config.redact_small_number_field);

        for line in lines {
            let rect = match extractor.process(line, &mut self.record) {
                Some(rect) => rect,
                None => continue,
            };
            if let Some(masked) = self.record.masked_image() {
                let (width, height) = masked.dimensions();
                let pixel_rect = GeometryCalculator::to_pixel_rect(&rect, width, height);
                let redacted = Redactor::mask(masked, &pixel_rect);
                self.record.set_masked_image(redacted);
            }
        }
    }
}

/// The recognition engines for the four passes.
pub struct CardScanner {
    primary: Arc<dyn TextRecognizer>,
    secondary: Arc<dyn TextRecognizer>,
    faces: Arc<dyn FaceDetector>,
    classifier: Arc<dyn DocumentClassifier>,
}

impl CardScanner {
    pub fn new(
        primary: Arc<dyn TextRecognizer>,
        secondary: Arc<dyn TextRecognizer>,
        faces: Arc<dyn FaceDetector>,
        classifier: Arc<dyn DocumentClassifier>,
    ) -> Self {
        CardScanner {
            primary,
            secondary,
            faces,
            classifier,
        }
    }

    pub fn from_recording(scan: &RecordedScan) -> Self {
        Self::new(
            Arc::new(scan.primary_recognizer()),
            Arc::new(scan.secondary_recognizer()),
            Arc::new(scan.face_detector()),
            Arc::new(scan.classifier()),
        )
    }

    /// Scans `image` into `session`, blocking until every pass has reported
    /// or the configured timeout runs out.
    pub fn scan(&self, session: &mut ScanSession, image: DynamicImage) -> Result<(), ScanError> {
        let generation = session.begin(image.clone());
        let receiver = match self.start(Arc::new(image), generation) {
            Ok(receiver) => receiver,
            Err(e) => {
                session.expire();
                return Err(e);
            }
        };

        let deadline = session.config().pass_timeout().map(|t| Instant::now() + t);
        while session.is_recognizing() {
            let event = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match receiver.recv_timeout(remaining) {
                        Ok(event) => event,
                        Err(RecvTimeoutError::Timeout) => {
                            log::warn!("Recognition timed out, discarding late results");
                            session.expire();
                            break;
                        }
                        Err(RecvTimeoutError::Disconnected) => {
                            abandon_passes(session);
                            break;
                        }
                    }
                }
                None => match receiver.recv() {
                    Ok(event) => event,
                    Err(_) => {
                        abandon_passes(session);
                        break;
                    }
                },
            };
            session.apply(event);
        }

        Ok(())
    }

    /// Spawns the passes; their results arrive on the returned channel.
    pub fn start(&self, image: Arc<DynamicImage>, generation: u64) -> Result<Receiver<PassEvent>, ScanError> {
        let (sender, receiver) = mpsc::channel();

        let recognizer = Arc::clone(&self.primary);
        let source = Arc::clone(&image);
        spawn_pass(PassKind::Primary, generation, sender.clone(), move || {
            recognizer.recognize(&source).map(PassOutput::PrimaryLines)
        })?;

        let recognizer = Arc::clone(&self.secondary);
        let source = Arc::clone(&image);
        spawn_pass(PassKind::Secondary, generation, sender.clone(), move || {
            recognizer.recognize(&source).map(PassOutput::SecondaryLines)
        })?;

        let detector = Arc::clone(&self.faces);
        let source = Arc::clone(&image);
        spawn_pass(PassKind::Face, generation, sender.clone(), move || {
            detector.detect_faces(&source).map(PassOutput::Faces)
        })?;

        let classifier = Arc::clone(&self.classifier);
        let source = image;
        spawn_pass(PassKind::Classifier, generation, sender, move || {
            classifier.classify(&source).map(PassOutput::Classification)
        })?;

        Ok(receiver)
    }
}

// Every sender is gone but some passes never reported.
fn abandon_passes(session: &mut ScanSession) {
    log::warn!("Recognition passes ended without reporting, treating them as failed");
    session.expire();
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "pass panicked".to_string()
    }
}

fn spawn_pass<F>(pass: PassKind, generation: u64, sender: Sender<PassEvent>, run: F) -> Result<(), ScanError>
where
    F: FnOnce() -> Result<PassOutput, ScanError> + Send + 'static,
{
    thread::Builder::new()
        .name(format!("hkid-{:?}", pass).to_lowercase())
        .spawn(move || {
            let output = match panic::catch_unwind(AssertUnwindSafe(run)) {
                Ok(Ok(output)) => output,
                Ok(Err(e)) => PassOutput::Failed {
                    pass,
                    message: e.to_string(),
                },
                Err(payload) => PassOutput::Failed {
                    pass,
                    message: panic_message(payload.as_ref()),
                },
            };
            // Nobody is listening any more after a timeout
            let _ = sender.send(PassEvent { generation, output });
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CardModel, Sex};
    use crate::processing::replay::RecordedText;
    use crate::utils::config::NEW_CARD_LABEL;
    use image::{Rgb, RgbImage, Rgba};
    use std::time::Duration;

    fn white_card() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 250, Rgb([255, 255, 255])))
    }

    fn table() -> Arc<CodeTable> {
        Arc::new(CodeTable::from_entries([("7115", "陳"), ("1129", "大"), ("2429", "文")]))
    }

    fn line(text: &str, x: f64, y: f64, width: f64, height: f64) -> RecognizedLine {
        RecognizedLine::new(text, Some(NormalizedRect::new(x, y, width, height)))
    }

    fn recording() -> RecordedScan {
        RecordedScan {
            primary: vec![
                line("HONG KONG PERMANENT IDENTITY CARD", 0.05, 0.88, 0.6, 0.06),
                line("CHAN, Tai Man", 0.05, 0.72, 0.35, 0.05),
                line("7115 1129 2429", 0.05, 0.65, 0.3, 0.05),
                line("01-01-1980", 0.38, 0.57, 0.2, 0.05),
                line("***AZ", 0.38, 0.48, 0.1, 0.05),
                line("(01-96)", 0.38, 0.40, 0.1, 0.05),
                line("15-03-96 Z683365(5)", 0.38, 0.30, 0.6, 0.06),
            ],
            secondary: vec!["陳大文".to_string(), "7115 1129 2429".to_string(), "女".to_string()],
            faces: vec![
                NormalizedRect::new(0.05, 0.2, 0.1, 0.15),
                NormalizedRect::new(0.5, 0.2, 0.2, 0.4),
            ],
            classification: Some(ClassifierObservation {
                label: NEW_CARD_LABEL.to_string(),
                confidence_percent: 97.0,
            }),
        }
    }

    #[test]
    fn test_full_scan() {
        let scanner = CardScanner::from_recording(&recording());
        let mut session = ScanSession::new(ScanConfig::default(), table());
        scanner.scan(&mut session, white_card()).unwrap();

        let record = session.record();
        assert!(!session.is_recognizing());
        assert_eq!(record.english_name(), Some("CHAN, Tai Man"));
        assert_eq!(record.chinese_name(), Some("陳大文"));
        assert_eq!(record.date_of_birth(), Some("01-01-1980"));
        assert_eq!(record.sex(), Some(Sex::Female));
        assert_eq!(record.number(), Some("Z683365(5)"));
        assert_eq!(record.card_model(), Some(CardModel::New));
        assert!(!record.model_warning());
        assert_eq!(record.face_image().map(|f| f.dimensions()), Some((120, 150)));
        assert!(session.is_save_allowed());
        assert!(session.saved_card().is_ok());
    }

    #[test]
    fn test_scan_redacts_birth_date() {
        let scanner = CardScanner::from_recording(&recording());
        let mut session = ScanSession::new(ScanConfig::default(), table());
        scanner.scan(&mut session, white_card()).unwrap();

        let masked = session.record().masked_image().unwrap();
        // Birth date box: x 0.38..0.58, top 1 - 0.57 - 0.05 = 0.38
        assert_eq!(masked.get_pixel(200, 100), Rgba([0, 0, 0, 255]));
        // The name is not redacted
        assert_eq!(masked.get_pixel(40, 62), Rgba([255, 255, 255, 255]));
        // Source stays clean
        let source = session.record().source_image().unwrap();
        assert_eq!(source.get_pixel(200, 100), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_stale_results_are_discarded() {
        let mut session = ScanSession::new(ScanConfig::default(), table());
        let stale = session.begin(white_card());
        session.begin(white_card());

        let applied = session.apply(PassEvent {
            generation: stale,
            output: PassOutput::PrimaryLines(vec![RecognizedLine::text_only("CHAN, Tai Man")]),
        });
        assert!(!applied);
        assert_eq!(session.record().english_name(), None);
        assert!(session.is_recognizing());
    }

    #[test]
    fn test_reset_discards_in_flight_results() {
        let mut session = ScanSession::new(ScanConfig::default(), table());
        let generation = session.begin(white_card());
        session.reset();
        assert!(!session.is_recognizing());

        assert!(!session.apply(PassEvent {
            generation,
            output: PassOutput::SecondaryLines(vec![RecognizedLine::text_only("7115 女")]),
        }));
        assert_eq!(session.record().sex(), None);
        assert!(session.record().source_image().is_none());
    }

    #[test]
    fn test_save_waits_for_all_passes() {
        let mut session = ScanSession::new(ScanConfig::default(), table());
        let generation = session.begin(white_card());
        let lines: Vec<RecognizedLine> = recording().primary;
        session.apply(PassEvent {
            generation,
            output: PassOutput::PrimaryLines(lines),
        });
        session.apply(PassEvent {
            generation,
            output: PassOutput::SecondaryLines(vec![RecognizedLine::text_only("1980 男")]),
        });
        assert!(session.is_recognizing());
        assert!(!session.is_save_allowed());
        assert!(session.saved_card().is_err());

        for output in [PassOutput::Faces(Vec::new()), PassOutput::Classification(None)] {
            session.apply(PassEvent { generation, output });
        }
        assert!(session.is_save_allowed());
        assert!(session.record().face_image().is_none());
        assert!(session.record().model_warning());
    }

    struct FailingRecognizer;

    impl TextRecognizer for FailingRecognizer {
        fn recognize(&self, _image: &DynamicImage) -> Result<Vec<RecognizedLine>, ScanError> {
            Err(ScanError::recognition("latin text", "engine unavailable"))
        }
    }

    #[test]
    fn test_failed_pass_does_not_block_others() {
        let scan = recording();
        let scanner = CardScanner::new(
            Arc::new(FailingRecognizer),
            Arc::new(scan.secondary_recognizer()),
            Arc::new(scan.face_detector()),
            Arc::new(scan.classifier()),
        );
        let mut session = ScanSession::new(ScanConfig::default(), table());
        scanner.scan(&mut session, white_card()).unwrap();

        assert!(!session.is_recognizing());
        assert_eq!(session.record().english_name(), None);
        assert_eq!(session.record().sex(), Some(Sex::Female));
        assert!(session.record().face_image().is_some());
        assert!(!session.is_save_allowed());
    }

    struct PanickingDetector;

    impl FaceDetector for PanickingDetector {
        fn detect_faces(&self, _image: &DynamicImage) -> Result<Vec<NormalizedRect>, ScanError> {
            panic!("face engine crashed")
        }
    }

    #[test]
    fn test_panicking_pass_counts_as_failed() {
        let scan = recording();
        let scanner = CardScanner::new(
            Arc::new(scan.primary_recognizer()),
            Arc::new(scan.secondary_recognizer()),
            Arc::new(PanickingDetector),
            Arc::new(scan.classifier()),
        );
        let mut session = ScanSession::new(ScanConfig::default(), table());
        scanner.scan(&mut session, white_card()).unwrap();

        assert!(!session.is_recognizing());
        assert!(session.record().face_image().is_none());
        assert_eq!(session.record().sex(), Some(Sex::Female));
        assert!(session.is_save_allowed());
    }

    #[test]
    fn test_lost_sender_releases_session() {
        let mut session = ScanSession::new(ScanConfig::default(), table());
        let generation = session.begin(white_card());
        session.apply(PassEvent {
            generation,
            output: PassOutput::PrimaryLines(recording().primary),
        });
        assert!(session.is_recognizing());

        abandon_passes(&mut session);
        assert!(!session.is_recognizing());
        assert_ne!(session.generation(), generation);
    }

    struct SlowRecognizer {
        inner: RecordedText,
    }

    impl TextRecognizer for SlowRecognizer {
        fn recognize(&self, image: &DynamicImage) -> Result<Vec<RecognizedLine>, ScanError> {
            thread::sleep(Duration::from_millis(500));
            self.inner.recognize(image)
        }
    }

    #[test]
    fn test_timeout_releases_session() {
        let scan = recording();
        let scanner = CardScanner::new(
            Arc::new(SlowRecognizer {
                inner: scan.primary_recognizer(),
            }),
            Arc::new(scan.secondary_recognizer()),
            Arc::new(scan.face_detector()),
            Arc::new(scan.classifier()),
        );
        let config = ScanConfig {
            pass_timeout_ms: Some(50),
            ..ScanConfig::default()
        };
        let mut session = ScanSession::new(config, table());
        scanner.scan(&mut session, white_card()).unwrap();

        assert!(!session.is_recognizing());
        assert_eq!(session.record().english_name(), None);
    }

    #[test]
    fn test_late_pass_after_expiry_is_discarded() {
        let scan = recording();
        let scanner = CardScanner::new(
            Arc::new(SlowRecognizer {
                inner: scan.primary_recognizer(),
            }),
            Arc::new(scan.secondary_recognizer()),
            Arc::new(scan.face_detector()),
            Arc::new(scan.classifier()),
        );
        let mut session = ScanSession::new(ScanConfig::default(), table());
        let image = white_card();
        let generation = session.begin(image.clone());
        let receiver = scanner.start(Arc::new(image), generation).unwrap();
        session.expire();

        let mut late = 0;
        for event in receiver {
            assert_eq!(event.generation, generation);
            assert!(!session.apply(event));
            late += 1;
        }
        assert_eq!(late, 4);
        assert_eq!(session.record().english_name(), None);
        assert_eq!(session.record().sex(), None);
        assert!(session.record().face_image().is_none());
    }
}
