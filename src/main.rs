// Replays recorded recognition results against a card image and prints the
// extracted card.

use clap::Parser;
use hkid_reader::{
    models::CardModel, processing::RecordedScan, utils::ScanConfig, utils::ScanError, CardScanner,
    ScanSession,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hkid-reader", about = "Extract and redact Hong Kong identity card fields")]
struct Args {
    /// JSON capture of the recognition engines' output
    #[arg(long)]
    observations: PathBuf,

    /// Card photo the observations were taken from
    #[arg(long)]
    image: PathBuf,

    /// Scanner configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the redacted image
    #[arg(long)]
    masked_out: Option<PathBuf>,

    /// Where to write the cropped face
    #[arg(long)]
    face_out: Option<PathBuf>,

    /// Where to write the saved card (JSON)
    #[arg(long)]
    save_out: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn run(args: &Args) -> Result<(), ScanError> {
    let config = match &args.config {
        Some(path) => ScanConfig::from_path(path)?,
        None => ScanConfig::default(),
    };
    let recording = RecordedScan::from_path(&args.observations)?;
    let image = image::open(&args.image).map_err(|e| {
        ScanError::ImageProcessingError(format!("Failed to open {}: {}", args.image.display(), e))
    })?;

    let mut session = ScanSession::from_config(config)?;
    CardScanner::from_recording(&recording).scan(&mut session, image)?;
    let record = session.record();

    println!("{}", serde_json::to_string_pretty(record)?);

    if record.model_warning() {
        println!("Warning: card model could not be recognised");
    } else if let Some(model) = record.card_model() {
        let name = match model {
            CardModel::New => "NEW",
            CardModel::Old => "OLD",
            CardModel::Unknown => "UNKNOWN",
        };
        println!("Card model: {}", name);
    }

    if let (Some(path), Some(masked)) = (&args.masked_out, record.masked_image()) {
        masked
            .save(path)
            .map_err(|e| ScanError::ImageProcessingError(format!("Failed to write {}: {}", path.display(), e)))?;
    }
    if let Some(path) = &args.face_out {
        match record.face_image() {
            Some(face) => face.save(path).map_err(|e| {
                ScanError::ImageProcessingError(format!("Failed to write {}: {}", path.display(), e))
            })?,
            None => println!("No face found, {} not written", path.display()),
        }
    }

    if session.is_save_allowed() {
        println!("Card can be saved");
        if let Some(path) = &args.save_out {
            let card = session.saved_card()?;
            std::fs::write(path, serde_json::to_string_pretty(&card)?)?;
        }
    } else {
        let result = hkid_reader::validation::CompletenessValidator::validate(record);
        println!("Card cannot be saved:");
        for issue in &result.issues {
            println!("  - {}", issue.message);
        }
    }

    Ok(())
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(err) = run(&args) {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
