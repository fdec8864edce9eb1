//! Voccurate: curation tools for Pascal VOC object-detection datasets.
//!
//! Voccurate inspects class distributions, renames classes across a corpus,
//! copies annotation files filtered by class, exports per-object crops as a
//! classification dataset, and reviews or deletes individual boxes and whole
//! image/annotation pairs.
//!
//! # Modules
//!
//! - [`voc`]: Annotation store (parse, rename, remove, save)
//! - [`corpus`]: Annotation directory discovery and image pairing
//! - [`inventory`]: Per-class counts and percentages
//! - [`ops`]: Batch rename, filtered copy and crop export
//! - [`viewer`]: Single-pair viewer/editor session
//! - [`error`]: Error types for voccurate operations

pub mod corpus;
pub mod error;
pub mod inventory;
pub mod ops;
pub mod viewer;
pub mod voc;

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use serde::Serialize;

pub use error::CurateError;

use corpus::Corpus;
use inventory::InventoryOptions;
use ops::CropOptions;
use viewer::{RenderStyle, ViewerSession};

/// The voccurate CLI application.
#[derive(Parser)]
#[command(name = "voccurate")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Show debug logging (RUST_LOG overrides this).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List the distinct class names in the corpus.
    Classes(CorpusArgs),
    /// Count objects per class with percentages.
    Inventory(InventoryArgs),
    /// Rename one or more classes in every annotation file, in place.
    Rename(RenameArgs),
    /// Copy annotation files keeping only objects of the selected classes.
    Copy(CopyArgs),
    /// Crop objects of the selected classes into per-class image folders.
    Crops(CropsArgs),
    /// Show one image/annotation pair, optionally rendering it to a file.
    View(ViewArgs),
    /// Delete one bounding box from a pair's annotation file.
    DeleteBox(DeleteBoxArgs),
    /// Delete an image and its annotation file.
    DeletePair(PairArgs),
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Arguments shared by every command that reads annotation files.
#[derive(clap::Args)]
struct CorpusArgs {
    /// Directory containing the .xml annotation files.
    #[arg(long, env = "VOCCURATE_XML_DIR")]
    xml_dir: PathBuf,
}

#[derive(clap::Args)]
struct InventoryArgs {
    #[command(flatten)]
    corpus: CorpusArgs,

    /// Output format for the inventory.
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(clap::Args)]
struct RenameArgs {
    #[command(flatten)]
    corpus: CorpusArgs,

    /// Class to rename (repeatable).
    #[arg(long = "from", required = true)]
    from: Vec<String>,

    /// New class name.
    #[arg(long)]
    to: String,

    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(clap::Args)]
struct CopyArgs {
    #[command(flatten)]
    corpus: CorpusArgs,

    /// Directory that receives the filtered annotation files.
    #[arg(long)]
    output_dir: PathBuf,

    /// Class to keep (repeatable).
    #[arg(long = "class", required = true)]
    classes: Vec<String>,

    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(clap::Args)]
struct CropsArgs {
    #[command(flatten)]
    corpus: CorpusArgs,

    /// Directory containing the images.
    #[arg(long, env = "VOCCURATE_IMAGE_DIR")]
    image_dir: PathBuf,

    /// Directory that receives one sub-directory per class.
    #[arg(long)]
    output_dir: PathBuf,

    /// Class to export (repeatable).
    #[arg(long = "class", required = true)]
    classes: Vec<String>,

    /// Pixels added around each box before cropping.
    #[arg(long, default_value_t = ops::DEFAULT_CROP_MARGIN)]
    margin: u32,

    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

/// Selects one image/annotation pair.
#[derive(clap::Args)]
struct PairArgs {
    #[command(flatten)]
    corpus: CorpusArgs,

    /// Directory containing the images.
    #[arg(long, env = "VOCCURATE_IMAGE_DIR")]
    image_dir: PathBuf,

    /// Pair index, in image file name order.
    #[arg(long, default_value_t = 0)]
    index: usize,
}

#[derive(clap::Args)]
struct ViewArgs {
    #[command(flatten)]
    pair: PairArgs,

    /// Object to highlight (zero-based).
    #[arg(long)]
    select: Option<usize>,

    /// Hide predicted objects below this confidence.
    #[arg(long, default_value_t = viewer::DEFAULT_CONFIDENCE_THRESHOLD)]
    threshold: f64,

    /// Write the annotated image to this path.
    #[arg(long)]
    render: Option<PathBuf>,

    /// TrueType/OpenType font used for class labels.
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(clap::Args)]
struct DeleteBoxArgs {
    #[command(flatten)]
    pair: PairArgs,

    /// Object to delete (zero-based).
    #[arg(long)]
    select: usize,
}

/// Run the voccurate CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), CurateError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Classes(args)) => run_classes(args),
        Some(Commands::Inventory(args)) => run_inventory(args),
        Some(Commands::Rename(args)) => run_rename(args),
        Some(Commands::Copy(args)) => run_copy(args),
        Some(Commands::Crops(args)) => run_crops(args),
        Some(Commands::View(args)) => run_view(args),
        Some(Commands::DeleteBox(args)) => run_delete_box(args),
        Some(Commands::DeletePair(args)) => run_delete_pair(args),
        None => {
            println!("voccurate {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Curation tools for Pascal VOC annotation sets.");
            println!();
            println!("Run 'voccurate --help' for usage information.");
            Ok(())
        }
    }
}

/// Configure `env_logger`: `RUST_LOG` wins, otherwise warnings (or debug with
/// `--verbose`) from this crate only.
pub fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_env("RUST_LOG");
    } else {
        let level = if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        };
        builder.filter(None, LevelFilter::Off);
        builder.filter(Some("voccurate"), level);
    }

    // A second init (tests, embedding) keeps the first logger.
    let _ = builder.try_init();
}

fn run_classes(args: CorpusArgs) -> Result<(), CurateError> {
    let corpus = Corpus::open(&args.xml_dir, None)?;
    let classes = inventory::list_corpus_classes(&corpus);
    if classes.is_empty() {
        println!("No classes found.");
    }
    for class in classes {
        println!("{class}");
    }
    Ok(())
}

fn run_inventory(args: InventoryArgs) -> Result<(), CurateError> {
    let corpus = Corpus::open(&args.corpus.xml_dir, None)?;
    let inventory = inventory::build_inventory(&corpus, &InventoryOptions::default());
    emit(&inventory, args.output)
}

fn run_rename(args: RenameArgs) -> Result<(), CurateError> {
    let corpus = Corpus::open(&args.corpus.xml_dir, None)?;
    let old_names = class_set(&args.from);
    let report = ops::rename_corpus(&corpus, &old_names, &args.to)?;
    emit(&report, args.output)
}

fn run_copy(args: CopyArgs) -> Result<(), CurateError> {
    let corpus = Corpus::open(&args.corpus.xml_dir, None)?;
    let selected = class_set(&args.classes);
    let report = ops::copy_filtered(&corpus, &args.output_dir, &selected)?;
    emit(&report, args.output)
}

fn run_crops(args: CropsArgs) -> Result<(), CurateError> {
    let corpus = Corpus::open(&args.corpus.xml_dir, Some(&args.image_dir))?;
    let selected = class_set(&args.classes);
    let opts = CropOptions {
        margin: args.margin,
    };
    let report = ops::export_crops(&corpus, &args.output_dir, &selected, &opts)?;
    emit(&report, args.output)
}

fn run_view(args: ViewArgs) -> Result<(), CurateError> {
    let (mut session, position, total) = open_pair(&args.pair)?;
    session.set_confidence_threshold(args.threshold)?;
    if let Some(index) = args.select {
        session.select(index)?;
    }

    println!(
        "Pair {}/{}: {}",
        position + 1,
        total,
        session.pair().image_name()
    );
    println!("Annotations:");
    let lines = session.annotation_lines();
    if lines.is_empty() {
        println!("No annotations found.");
    }
    for line in lines {
        println!("{line}");
    }

    if let Some(path) = args.render {
        let font = args.font.as_deref().map(viewer::load_font).transpose()?;
        session
            .render(&RenderStyle::default(), font.as_ref())
            .save(&path)
            .map_err(|source| CurateError::Image {
                path: path.clone(),
                source,
            })?;
        println!("Rendered to {}", path.display());
    }

    Ok(())
}

fn run_delete_box(args: DeleteBoxArgs) -> Result<(), CurateError> {
    let (mut session, _, _) = open_pair(&args.pair)?;
    session.select(args.select)?;
    let removed = session.delete_selected()?;
    println!(
        "Selected bounding box deleted ({}, {} remaining).",
        removed.class_name().unwrap_or("(none)"),
        session.objects().len()
    );
    Ok(())
}

fn run_delete_pair(args: PairArgs) -> Result<(), CurateError> {
    let (session, _, _) = open_pair(&args)?;
    let pair = session.delete_pair()?;
    println!("Image and XML pair deleted: {}", pair.image_name());
    Ok(())
}

/// Open the session for `args.index`, returning it with the pair count.
fn open_pair(args: &PairArgs) -> Result<(ViewerSession, usize, usize), CurateError> {
    let corpus = Corpus::open(&args.corpus.xml_dir, Some(&args.image_dir))?;
    let pairs = corpus.image_pairs();
    if pairs.is_empty() {
        return Err(CurateError::EmptyResult {
            message: "no matching image and XML pairs found".to_string(),
        });
    }

    let total = pairs.len();
    let pair = pairs
        .into_iter()
        .nth(args.index)
        .ok_or_else(|| CurateError::InvalidArgument {
            message: format!("pair index {} is out of range (0..{total})", args.index),
        })?;

    Ok((ViewerSession::open(pair)?, args.index, total))
}

fn class_set(raw: &[String]) -> BTreeSet<String> {
    raw.iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn emit<T>(value: &T, format: OutputFormat) -> Result<(), CurateError>
where
    T: Serialize + std::fmt::Display,
{
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => print!("{value}"),
    }
    Ok(())
}
