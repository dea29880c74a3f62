mod artwork_store;
mod catalog;
mod config;
mod config_persistence;
mod covers;
mod extract;
mod fs_atomic;
mod month_labeling;
mod ocr;
mod play_parser;
mod records;
mod screenshot_discovery;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::{info, warn};

use catalog::itunes::ItunesCatalog;
use config::{sanitize_config, Config};
use covers::CoversRunOptions;
use ocr::{PreprocessingRecognizer, TesseractRecognizer, TextRecognizer};

#[derive(Parser)]
#[command(name = "playshot")]
#[command(about = "Extract song plays from listening-history screenshots and fetch their cover art")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// OCR a folder of screenshots into a month-grouped JSON document
    Extract {
        /// Folder containing the screenshots
        #[arg(short, long)]
        images: Option<PathBuf>,

        /// Where to write the JSON document
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Tesseract language list, e.g. `kor+eng`
        #[arg(short, long)]
        languages: Option<String>,

        /// Grayscale screenshots before recognition
        #[arg(long, default_value = "false")]
        preprocess: bool,
    },

    /// Download album artwork for every song in a JSON document
    Covers {
        /// JSON document produced by `extract`
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Where to write the annotated document
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Folder for downloaded artwork
        #[arg(long)]
        covers_dir: Option<PathBuf>,

        /// Look up every song again even when its cover is already on disk
        #[arg(long, default_value = "false")]
        refresh: bool,
    },
}

fn path_string(path: PathBuf) -> String {
    path.to_string_lossy().to_string()
}

fn apply_cli_overrides(config: Config, command: &Commands) -> Config {
    let mut config = config;
    match command {
        Commands::Extract {
            images,
            output,
            languages,
            preprocess,
        } => {
            if let Some(images) = images {
                config.extract.image_dir = path_string(images.clone());
            }
            if let Some(output) = output {
                config.extract.output_file = path_string(output.clone());
            }
            if let Some(languages) = languages {
                config.ocr.languages = languages.clone();
            }
            if *preprocess {
                config.ocr.preprocess = true;
            }
        }
        Commands::Covers {
            input,
            output,
            covers_dir,
            refresh: _,
        } => {
            if let Some(input) = input {
                config.covers.input_file = path_string(input.clone());
            }
            if let Some(output) = output {
                config.covers.output_file = path_string(output.clone());
            }
            if let Some(covers_dir) = covers_dir {
                config.covers.covers_dir = path_string(covers_dir.clone());
            }
        }
    }
    sanitize_config(config)
}

fn log_level_for(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn run_extract_command(config: &Config) -> Result<(), String> {
    let version = ocr::ensure_tesseract(&config.ocr.command)?;
    info!("Using {version}");

    let tesseract = TesseractRecognizer::new(&config.ocr);
    let recognizer: Box<dyn TextRecognizer> = if config.ocr.preprocess {
        Box::new(PreprocessingRecognizer::new(
            tesseract,
            config.ocr.upscale_factor,
        ))
    } else {
        Box::new(tesseract)
    };
    let report = extract::run_extract(&config.extract, recognizer.as_ref())?;
    if report.images == 0 {
        warn!(
            "No screenshots matched {:?} in {}",
            config.extract.image_extensions, config.extract.image_dir
        );
    } else if report.songs == 0 {
        warn!(
            "No play-count lines recognized in {}; check the OCR languages and plays pattern",
            report.output.display()
        );
    }
    Ok(())
}

fn run_covers_command(config: &Config, refresh: bool) -> Result<(), String> {
    let catalog = ItunesCatalog::new(&config.covers);
    let report = covers::run_covers(&config.covers, &catalog, CoversRunOptions { refresh })?;
    if report.songs > 0 && report.covers == 0 {
        warn!(
            "No covers found for any song in {}",
            report.output.display()
        );
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut clog = colog::default_builder();
    clog.filter(None, log_level_for(cli.verbose));
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("panic: {}", panic_info);
    }));

    let config = config_persistence::load_config(cli.config.as_deref())?;
    let config = apply_cli_overrides(config, &cli.command);

    match &cli.command {
        Commands::Extract { .. } => run_extract_command(&config)?,
        Commands::Covers { refresh, .. } => run_covers_command(&config, *refresh)?,
    }
    Ok(())
}
