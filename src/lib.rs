use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use std::fs;
use pdfplumber::Pdf;
use std::path::{Path, PathBuf};
use tracing::info;

pub mod logging;
pub mod ocr;
pub mod pdf;
pub mod settings;
pub mod text_layer;

pub use ocr::{
    DimensionExtraction, OcrTokenSource, Orientation, Tesseract, TesseractConfig, Token,
    extract_dimensions,
};
pub use pdf::PdfKind;
pub use settings::{DetectSettings, Settings, TextLayerThresholds, Thresholds};
pub use text_layer::{TextToken, extract_text_layer};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub input: Option<PathBuf>,
    /// Skip the text layer of PDFs and always run OCR.
    pub force_ocr: bool,
    pub page: u32,
    pub dpi: Option<u32>,
    pub min_conf: Option<i64>,
    pub overlay: Option<PathBuf>,
    pub highlight: Option<usize>,
    pub settings_path: Option<String>,
    pub show_languages: bool,
}

#[derive(Debug, Serialize)]
struct RasterOutput<'a> {
    width: u32,
    height: u32,
    total: usize,
    tokens: &'a [Token],
}

#[derive(Debug, Serialize)]
struct TextLayerOutput<'a> {
    pdf_kind: PdfKind,
    page: u32,
    total: usize,
    tokens: &'a [TextToken],
}

pub fn run(config: Config) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;

    if config.show_languages {
        let languages = ocr::list_tesseract_languages(Path::new(&settings.ocr.binary))?;
        return Ok(languages.join("\n"));
    }
    let input = config
        .input
        .as_deref()
        .ok_or_else(|| anyhow!("--input is required"))?;
    if !config.force_ocr && pdf::is_pdf_file(input)? {
        let document = pdf::open_pdf(input)?;
        let kind = pdf::detect_pdf_kind(&document, &settings.detect)?;
        if kind.has_text_layer() {
            return run_text_layer(&config, &settings, &document, kind);
        }
        info!("no text layer to read, falling back to OCR");
    }

    let tesseract = Tesseract::new(tesseract_config(&settings, config.dpi))?;
    run_raster(&config, &settings, &tesseract)
}

/// Engine settings from `[ocr]`; a page rasterized at `page_dpi` tells the
/// engine its resolution unless the settings pin one.
pub fn tesseract_config(settings: &Settings, page_dpi: Option<u32>) -> TesseractConfig {
    TesseractConfig {
        binary: PathBuf::from(&settings.ocr.binary),
        languages: settings.ocr.languages.clone(),
        oem: settings.ocr.oem,
        dpi: settings.ocr.dpi.or(page_dpi),
    }
}

/// Raster path: load the page, extract dimensions with `source`, optionally
/// write the overlay, and return the result as pretty JSON.
pub fn run_raster<S: OcrTokenSource>(
    config: &Config,
    settings: &Settings,
    source: &S,
) -> Result<String> {
    let input = config
        .input
        .as_deref()
        .ok_or_else(|| anyhow!("--input is required"))?;
    let dpi = config.dpi.unwrap_or(pdf::DEFAULT_DPI);
    let image = pdf::load_page(input, config.page, dpi)?;
    let min_conf = config.min_conf.unwrap_or(settings.ocr.min_confidence);

    let extraction = extract_dimensions(&image, source, min_conf, &settings.thresholds)?;

    if let Some(path) = config.overlay.as_deref() {
        let png = ocr::render_overlay(
            &image,
            &extraction.tokens,
            config.highlight,
            &settings.overlay,
        )?;
        write_overlay(path, &png)?;
    }

    serde_json::to_string_pretty(&RasterOutput {
        width: extraction.width,
        height: extraction.height,
        total: extraction.tokens.len(),
        tokens: &extraction.tokens,
    })
    .with_context(|| "failed to serialize tokens")
}

/// Text-layer path: read the page's characters from `document` and return
/// the typed tokens as pretty JSON.
pub fn run_text_layer(
    config: &Config,
    settings: &Settings,
    document: &Pdf,
    kind: PdfKind,
) -> Result<String> {
    let page = pdf::text_page(document, config.page)?;
    let tokens = extract_text_layer(&page, &settings.text_layer);

    if let Some(path) = config.overlay.as_deref() {
        let input = config
            .input
            .as_deref()
            .ok_or_else(|| anyhow!("--overlay needs --input for the page image"))?;
        let dpi = config.dpi.unwrap_or(pdf::DEFAULT_DPI);
        let image = pdf::load_page(input, config.page, dpi)?;
        let png = ocr::render_text_layer_overlay(
            &image,
            dpi as f32,
            &tokens,
            config.highlight,
            &settings.overlay,
        )?;
        write_overlay(path, &png)?;
    }

    serde_json::to_string_pretty(&TextLayerOutput {
        pdf_kind: kind,
        page: config.page,
        total: tokens.len(),
        tokens: &tokens,
    })
    .with_context(|| "failed to serialize tokens")
}

fn write_overlay(path: &Path, png: &[u8]) -> Result<()> {
    fs::write(path, png)
        .with_context(|| format!("failed to write overlay: {}", path.display()))?;
    info!("overlay written to {}", path.display());
    Ok(())
}
