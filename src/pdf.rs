use anyhow::{Context, Result, anyhow};
use image::DynamicImage;
use pdfplumber::{Page, Pdf};
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;
use tracing::{debug, info};

use crate::settings::DetectSettings;

pub const DEFAULT_DPI: u32 = 300;

const PDF_MIME: &str = "application/pdf";

/// Loads the page to scan: image files are decoded directly, PDFs have one
/// page (zero-based) rasterized at `dpi`.
pub fn load_page(path: &Path, page: u32, dpi: u32) -> Result<DynamicImage> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read input: {}", path.display()))?;
    if !is_pdf(&bytes) {
        return image::load_from_memory(&bytes)
            .with_context(|| format!("failed to decode image: {}", path.display()));
    }
    let png = render_pdf_page(&bytes, page, dpi)?;
    let image =
        image::load_from_memory(&png).with_context(|| "failed to decode rendered pdf page")?;
    info!(
        "rendered pdf page {} at {} dpi: {}x{}",
        page,
        dpi,
        image.width(),
        image.height()
    );
    Ok(image)
}

pub fn is_pdf(bytes: &[u8]) -> bool {
    infer::get(bytes).is_some_and(|kind| kind.mime_type() == PDF_MIME)
}

/// True when the file at `path` is a PDF rather than an image.
pub fn is_pdf_file(path: &Path) -> Result<bool> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read input: {}", path.display()))?;
    Ok(is_pdf(&bytes))
}

pub fn open_pdf(path: &Path) -> Result<Pdf> {
    Pdf::open_file(path, None).with_context(|| format!("failed to open pdf: {}", path.display()))
}

/// Fetches one page (zero-based) with its text layer.
pub fn text_page(pdf: &Pdf, page: u32) -> Result<Page> {
    pdf.page(page as usize)
        .with_context(|| format!("pdf has no page {} ({} pages)", page, pdf.page_count()))
}

/// What a PDF is made of, judged from its leading pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PdfKind {
    /// Every sampled page has a text layer.
    Textual,
    /// Every sampled page is a scan: images and no text.
    Rasterized,
    Hybrid,
}

impl PdfKind {
    /// Textual and hybrid documents are read from their text layer.
    pub fn has_text_layer(self) -> bool {
        self != PdfKind::Rasterized
    }
}

/// The parts of a page that decide its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageContent {
    pub text_chars: usize,
    pub images: usize,
}

impl PageContent {
    pub fn of(page: &Page) -> Self {
        let text: String = page.chars().iter().map(|ch| ch.text.as_str()).collect();
        Self {
            text_chars: text.trim().chars().count(),
            images: page.images().len(),
        }
    }
}

pub fn classify_pages(pages: &[PageContent], min_text_chars: usize) -> PdfKind {
    let has_text = |page: &PageContent| page.text_chars > min_text_chars;
    if pages.iter().all(has_text) {
        PdfKind::Textual
    } else if pages.iter().all(|page| page.images > 0 && !has_text(page)) {
        PdfKind::Rasterized
    } else {
        PdfKind::Hybrid
    }
}

/// Samples the first pages of `pdf` and tells whether it carries a text layer.
pub fn detect_pdf_kind(pdf: &Pdf, settings: &DetectSettings) -> Result<PdfKind> {
    let sampled = pdf.page_count().min(settings.sample_pages);
    let mut pages = Vec::with_capacity(sampled);
    for index in 0..sampled {
        let page = pdf
            .page(index)
            .with_context(|| format!("failed to read pdf page {}", index))?;
        let content = PageContent::of(&page);
        debug!(
            "page {}: {} text chars, {} images",
            index, content.text_chars, content.images
        );
        pages.push(content);
    }
    let kind = classify_pages(&pages, settings.min_text_chars);
    info!("pdf kind: {:?} ({} pages sampled)", kind, sampled);
    Ok(kind)
}

fn render_pdf_page(pdf_bytes: &[u8], page: u32, dpi: u32) -> Result<Vec<u8>> {
    let dir = tempdir().with_context(|| "failed to create temp dir for pdf")?;
    let input_path = dir.path().join("input.pdf");
    fs::write(&input_path, pdf_bytes).with_context(|| "failed to write temp pdf")?;
    let output_path = dir.path().join("page.png");
    // Both tools number pages from 1.
    let page_number = (page + 1).to_string();
    let dpi = dpi.to_string();

    if command_exists("mutool") {
        let output = Command::new("mutool")
            .arg("draw")
            .arg("-r")
            .arg(&dpi)
            .arg("-o")
            .arg(&output_path)
            .arg(&input_path)
            .arg(&page_number)
            .output()
            .with_context(|| "failed to run mutool")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("mutool failed: {}", stderr.trim()));
        }
    } else if command_exists("pdftoppm") {
        let output = Command::new("pdftoppm")
            .arg("-png")
            .arg("-r")
            .arg(&dpi)
            .arg("-f")
            .arg(&page_number)
            .arg("-l")
            .arg(&page_number)
            .arg("-singlefile")
            .arg(&input_path)
            .arg(dir.path().join("page"))
            .output()
            .with_context(|| "failed to run pdftoppm")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("pdftoppm failed: {}", stderr.trim()));
        }
    } else {
        return Err(anyhow!(
            "pdf rendering requires mutool or pdftoppm (install mupdf or poppler)"
        ));
    }

    fs::read(&output_path).with_context(|| format!("pdf has no page {}", page))
}

fn command_exists(cmd: &str) -> bool {
    match Command::new(cmd).arg("-h").output() {
        Ok(_) => true,
        Err(err) => err.kind() != ErrorKind::NotFound,
    }
}
