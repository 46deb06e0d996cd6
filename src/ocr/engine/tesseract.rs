use anyhow::{Context, Result, anyhow};
use image::GrayImage;
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

use super::parse::RawToken;

/// Page segmentation strategies the pipeline asks the engine for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentationMode {
    /// One uniform block of text; good on dense tables.
    Block,
    /// Sparse text in no particular order; good on isolated numerals.
    Sparse,
    /// Fully automatic page segmentation.
    Auto,
}

impl SegmentationMode {
    /// Order in which an orientation pass runs the modes.
    pub const PASSES: [SegmentationMode; 3] = [
        SegmentationMode::Block,
        SegmentationMode::Sparse,
        SegmentationMode::Auto,
    ];

    pub fn psm(self) -> u32 {
        match self {
            SegmentationMode::Block => 6,
            SegmentationMode::Sparse => 11,
            SegmentationMode::Auto => 3,
        }
    }
}

/// Anything that turns an image into word-level tokens.
pub trait OcrTokenSource {
    fn recognize(&self, image: &GrayImage, mode: SegmentationMode) -> Result<Vec<RawToken>>;
}

impl<T: OcrTokenSource + ?Sized> OcrTokenSource for &T {
    fn recognize(&self, image: &GrayImage, mode: SegmentationMode) -> Result<Vec<RawToken>> {
        (**self).recognize(image, mode)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TesseractConfig {
    pub binary: PathBuf,
    pub languages: String,
    pub oem: u32,
    pub dpi: Option<u32>,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            languages: "ita+eng".to_string(),
            oem: 3,
            dpi: None,
        }
    }
}

/// Runs the `tesseract` command line tool and reads its TSV output.
#[derive(Debug, Clone)]
pub struct Tesseract {
    config: TesseractConfig,
}

impl Tesseract {
    /// Builds a source whose language list has been checked against the installed packs.
    pub fn new(mut config: TesseractConfig) -> Result<Self> {
        config.languages = normalize_ocr_languages(&config.binary, &config.languages)?;
        Ok(Self { config })
    }

    fn run_tsv(&self, path: &Path, mode: SegmentationMode) -> Result<String> {
        let mut command = Command::new(&self.config.binary);
        command
            .arg(path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.config.languages)
            .arg("--oem")
            .arg(self.config.oem.to_string())
            .arg("--psm")
            .arg(mode.psm().to_string());
        if let Some(dpi) = self.config.dpi {
            command.arg("--dpi").arg(dpi.to_string());
        }
        let output = command
            .arg("tsv")
            .output()
            .with_context(|| "failed to run tesseract (is it installed?)")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("tesseract failed: {}", stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl OcrTokenSource for Tesseract {
    fn recognize(&self, image: &GrayImage, mode: SegmentationMode) -> Result<Vec<RawToken>> {
        let mut tmp = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .with_context(|| "failed to create temp file for OCR")?;
        image
            .write_to(&mut tmp, image::ImageFormat::Png)
            .with_context(|| "failed to write temp image for OCR")?;
        tmp.flush().with_context(|| "failed to flush temp image for OCR")?;

        let tsv = self.run_tsv(tmp.path(), mode)?;
        let tokens = parse_tsv_words(&tsv);
        debug!("tesseract psm {}: {} words", mode.psm(), tokens.len());
        Ok(tokens)
    }
}

/// Word rows (level 5) of tesseract's TSV output. Rows that do not parse are skipped.
pub(crate) fn parse_tsv_words(tsv: &str) -> Vec<RawToken> {
    let mut tokens = Vec::new();
    for (idx, row) in tsv.lines().enumerate() {
        if idx == 0 {
            continue;
        }
        let cols = row.split('\t').collect::<Vec<_>>();
        if cols.len() < 12 {
            continue;
        }
        if cols[0].trim().parse::<i32>().ok() != Some(5) {
            continue;
        }
        let (Ok(left), Ok(top), Ok(width), Ok(height)) = (
            cols[6].trim().parse::<u32>(),
            cols[7].trim().parse::<u32>(),
            cols[8].trim().parse::<u32>(),
            cols[9].trim().parse::<u32>(),
        ) else {
            continue;
        };
        tokens.push(RawToken {
            text: cols[11].to_string(),
            conf: cols[10].trim().to_string(),
            left,
            top,
            width,
            height,
        });
    }
    tokens
}

pub fn list_tesseract_languages(binary: &Path) -> Result<Vec<String>> {
    let output = Command::new(binary)
        .arg("--list-langs")
        .output()
        .with_context(|| "failed to run tesseract --list-langs")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("tesseract --list-langs failed: {}", stderr.trim()));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_language_list(&stdout))
}

fn parse_language_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_ocr_languages(binary: &Path, requested: &str) -> Result<String> {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("ocr languages is empty"));
    }

    let available = match list_tesseract_languages(binary) {
        Ok(list) => list,
        Err(_) => return Ok(trimmed.to_string()),
    };
    select_languages(trimmed, &available)
}

fn select_languages(requested: &str, available: &[String]) -> Result<String> {
    let mut chosen = Vec::new();
    let mut missing = Vec::new();
    for raw in requested.split(['+', ',', ' ']) {
        let lang = raw.trim();
        if lang.is_empty() {
            continue;
        }
        if available.iter().any(|value| value == lang) {
            chosen.push(lang.to_string());
        } else {
            missing.push(lang.to_string());
        }
    }

    if chosen.is_empty() {
        return Err(anyhow!(
            "ocr language(s) not available: {} (available: {})",
            missing.join(", "),
            available.join(", ")
        ));
    }
    if !missing.is_empty() {
        warn!(
            "ocr language(s) not available: {} (available: {})",
            missing.join(", "),
            available.join(", ")
        );
    }

    Ok(chosen.join("+"))
}
