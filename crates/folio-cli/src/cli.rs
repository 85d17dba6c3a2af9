// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Argument parsing and subcommand execution for the `folio` binary.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use folio_core::error::Result;
use folio_core::{AppConfig, Point, Quad, ScanKind};
use folio_document::image::raster;
use folio_document::text::fragment::parse_detections;
use folio_document::{ReadingOrder, ReconstructedDocument, Rectifier, normalize_detections};
use folio_records::ScanHistory;
use tracing::info;

/// Corner inset used when no corners are given, in source pixels.
const DEFAULT_MARGIN: f64 = 60.0;

/// History database used by `folio history` when `--db` is not given.
const DEFAULT_HISTORY_DB: &str = "folio-history.db";

/// Folio: flatten document photos and rebuild recognised text in reading order
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(version)]
#[command(about = "Flatten document photos and rebuild recognised text in reading order", long_about = None)]
pub struct Cli {
    /// JSON settings file; defaults apply when it is missing or invalid
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Scan history database; `rectify` and `ocr` record their results here
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Flatten and enhance a photographed page
    Rectify(RectifyArgs),

    /// Rebuild reading-order text from a JSON file of raw detections
    Reconstruct(ReconstructArgs),

    /// Recognise text in an image with the ocrs engine
    #[cfg(feature = "ocr")]
    Ocr(OcrArgs),

    /// Inspect or clear the scan history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Args, Debug)]
pub struct RectifyArgs {
    /// Photo of the document
    pub input: PathBuf,

    /// Where to write the flattened page (format from the extension)
    #[arg(short, long)]
    pub out: PathBuf,

    /// Corners as x1,y1,x2,y2,x3,y3,x4,y4: top-left, top-right, bottom-right, bottom-left
    #[arg(long, value_parser = parse_corners, allow_hyphen_values = true)]
    pub corners: Option<Quad>,

    /// Inset of the default corners when --corners is not given
    #[arg(long, default_value_t = DEFAULT_MARGIN)]
    pub margin: f64,
}

#[derive(Args, Debug)]
pub struct ReconstructArgs {
    /// JSON array of {"text", "region"} detections
    pub detections: PathBuf,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(feature = "ocr")]
#[derive(Args, Debug)]
pub struct OcrArgs {
    /// Image to recognise
    pub image: PathBuf,

    /// Directory holding text-detection.rten and text-recognition.rten
    #[arg(long)]
    pub models: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum HistoryAction {
    /// List stored scans, newest first
    List {
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete one record
    Delete { id: i64 },
    /// Delete every record
    Clear,
}

/// Run the parsed command.
pub async fn execute(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_or_default(path),
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Rectify(args) => rectify(&config, cli.db.as_deref(), args),
        Commands::Reconstruct(args) => {
            let document = load_document(&config, &args.detections)?;
            print_document(&document, args.json)
        }
        #[cfg(feature = "ocr")]
        Commands::Ocr(args) => ocr(&config, cli.db.as_deref(), args).await,
        Commands::History { action } => {
            let db = cli.db.unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_DB));
            history(&db, action)
        }
    }
}

// -- Subcommands --------------------------------------------------------------

fn rectify(config: &AppConfig, db: Option<&Path>, args: RectifyArgs) -> Result<()> {
    let source = raster::open(&args.input)?;
    let quad = match args.corners {
        Some(quad) => quad,
        None => {
            let quad = Quad::inset(source.width(), source.height(), args.margin);
            info!(margin = args.margin, "No corners given; using inset page corners");
            quad
        }
    };

    let output = Rectifier::from_config(config).rectify_quad(&source, &quad)?;
    raster::save(&output, &args.out)?;
    println!("{} ({}x{})", args.out.display(), output.width(), output.height());

    if let Some(db) = db {
        let bytes = std::fs::read(&args.out)?;
        let out_path = args.out.display().to_string();
        let summary = format!("rectified {}", args.input.display());
        ScanHistory::open(db)?.add(ScanKind::Document, &summary, Some(&out_path), Some(&bytes))?;
    }
    Ok(())
}

/// Read raw detections from `path` and rebuild their reading order.
fn load_document(config: &AppConfig, path: &Path) -> Result<ReconstructedDocument> {
    let json = std::fs::read_to_string(path)?;
    let fragments = normalize_detections(parse_detections(&json)?);
    Ok(ReadingOrder::new(&config.reading_order).reconstruct_document(&fragments))
}

#[cfg(feature = "ocr")]
async fn ocr(config: &AppConfig, db: Option<&Path>, args: OcrArgs) -> Result<()> {
    use folio_document::{DetectionEngine, OcrConfig, OcrsDetector};

    let image = raster::open(&args.image)?;
    let ocr_config = args.models.map(OcrConfig::from_dir).unwrap_or_default();

    let engine = DetectionEngine::with_reading_order(&config.reading_order);
    engine.initialize(move || OcrsDetector::load(&ocr_config)).await?;
    let document = engine.recognize(&image).await?;
    print_document(&document, args.json)?;

    if let Some(db) = db {
        let bytes = std::fs::read(&args.image)?;
        let image_path = args.image.display().to_string();
        ScanHistory::open(db)?.add(ScanKind::Ocr, &document.text(), Some(&image_path), Some(&bytes))?;
    }
    Ok(())
}

fn history(db: &Path, action: HistoryAction) -> Result<()> {
    let history = ScanHistory::open(db)?;
    match action {
        HistoryAction::List { json } => {
            let records = history.list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }
            for record in records {
                let preview = record.content.lines().next().unwrap_or_default();
                println!(
                    "{}\t{}\t{}\t{}",
                    record.id,
                    record.created_at,
                    record.kind.as_str(),
                    preview
                );
            }
        }
        HistoryAction::Delete { id } => {
            if history.delete(id)? {
                println!("deleted record {id}");
            } else {
                println!("no record with id {id}");
            }
        }
        HistoryAction::Clear => {
            let removed = history.clear()?;
            println!("removed {removed} records");
        }
    }
    Ok(())
}

// -- Output -------------------------------------------------------------------

fn print_document(document: &ReconstructedDocument, json: bool) -> Result<()> {
    let stats = document.stats();
    if json {
        let value = serde_json::json!({
            "lines": document.lines(),
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", document.text());
        eprintln!(
            "{} characters, {} words, {} lines",
            stats.characters, stats.words, stats.lines
        );
    }
    Ok(())
}

/// Parse `x1,y1,x2,y2,x3,y3,x4,y4` into a quadrilateral.
fn parse_corners(value: &str) -> std::result::Result<Quad, String> {
    let numbers = value
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|err| format!("invalid coordinate {part:?}: {err}"))
        })
        .collect::<std::result::Result<Vec<f64>, String>>()?;

    if numbers.len() != 8 {
        return Err(format!(
            "expected 8 comma-separated numbers, got {}",
            numbers.len()
        ));
    }

    let points: Vec<Point> = numbers
        .chunks_exact(2)
        .map(|xy| Point::new(xy[0], xy[1]))
        .collect();
    Quad::from_points(&points).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_corner_list() {
        let quad = parse_corners("0,0, 100,0,100,150,0,150").unwrap();
        assert_eq!(quad.bottom_right(), Point::new(100.0, 150.0));
    }

    #[test]
    fn rejects_bad_corner_lists() {
        assert!(parse_corners("1,2,3").unwrap_err().contains("expected 8"));
        assert!(parse_corners("a,0,1,0,1,1,0,1").unwrap_err().contains("invalid coordinate"));
        assert!(parse_corners("inf,0,1,0,1,1,0,1").is_err());
    }

    #[test]
    fn rectify_arguments() {
        let cli = Cli::try_parse_from([
            "folio",
            "rectify",
            "photo.jpg",
            "--out",
            "page.png",
            "--corners",
            "-2,3,100,0,100,150,0,150",
            "--db",
            "h.db",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("h.db")));
        let Commands::Rectify(args) = cli.command else {
            panic!("expected rectify");
        };
        assert_eq!(args.margin, DEFAULT_MARGIN);
        assert_eq!(args.corners.unwrap().top_left(), Point::new(-2.0, 3.0));
    }

    #[test]
    fn rectify_requires_output() {
        assert!(Cli::try_parse_from(["folio", "rectify", "photo.jpg"]).is_err());
    }

    #[test]
    fn reconstruct_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detections.json");
        std::fs::write(
            &path,
            r#"[
                {"text": "world", "region": {"left": 70, "top": 0, "right": 120, "bottom": 20}},
                {"text": "second", "region": {"points": [[0, 60], [60, 60], [60, 80], [0, 80]]}},
                {"text": "hello", "region": {"left": 0, "top": 2, "right": 50, "bottom": 22}},
                {"text": "  ", "region": {"left": 0, "top": 0, "right": 5, "bottom": 5}}
            ]"#,
        )
        .unwrap();

        let document = load_document(&AppConfig::default(), &path).unwrap();
        assert_eq!(document.lines(), ["hello  world", "second"]);
    }

    #[test]
    fn reconstruct_missing_file_is_io_error() {
        let err = load_document(&AppConfig::default(), Path::new("/nonexistent/d.json")).unwrap_err();
        assert!(matches!(err, folio_core::FolioError::Io(_)));
    }

    #[test]
    fn history_commands_run_against_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("history.db");
        ScanHistory::open(&db)
            .unwrap()
            .add(ScanKind::Ocr, "line one\nline two", None, None)
            .unwrap();

        history(&db, HistoryAction::List { json: false }).unwrap();
        history(&db, HistoryAction::Delete { id: 99 }).unwrap();
        history(&db, HistoryAction::Clear).unwrap();
        assert_eq!(ScanHistory::open(&db).unwrap().count().unwrap(), 0);
    }
}
