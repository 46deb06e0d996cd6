use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "dimscan",
    version,
    about = "Extract dimension annotations from technical drawings"
)]
struct Cli {
    /// Page to scan (image file or PDF)
    #[arg(short = 'i', long = "input")]
    input: Option<PathBuf>,

    /// Run OCR even when the PDF has a text layer
    #[arg(long = "force-ocr")]
    force_ocr: bool,

    /// Zero-based PDF page
    #[arg(short = 'p', long = "page", default_value_t = 0)]
    page: u32,

    /// Rasterization DPI for PDF input (default: 300)
    #[arg(long = "dpi")]
    dpi: Option<u32>,

    /// Minimum OCR confidence (overrides settings [ocr] min_confidence)
    #[arg(long = "min-conf")]
    min_conf: Option<i64>,

    /// Write an annotated PNG of the page
    #[arg(short = 'o', long = "overlay")]
    overlay: Option<PathBuf>,

    /// Token id to highlight in the overlay
    #[arg(long = "highlight")]
    highlight: Option<usize>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Show installed OCR languages and exit
    #[arg(long = "show-languages")]
    show_languages: bool,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    dimscan::logging::init(cli.verbose)?;

    if !cli.show_languages && cli.input.is_none() {
        return Err(anyhow!("nothing to scan: pass --input"));
    }

    let output = dimscan::run(dimscan::Config {
        input: cli.input,
        force_ocr: cli.force_ocr,
        page: cli.page,
        dpi: cli.dpi,
        min_conf: cli.min_conf,
        overlay: cli.overlay,
        highlight: cli.highlight,
        settings_path: cli.read_settings,
        show_languages: cli.show_languages,
    })?;

    println!("{}", output);
    Ok(())
}
