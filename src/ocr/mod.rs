mod engine;
mod render;

pub use engine::{
    DimensionExtraction, OcrTokenSource, RawToken, SegmentationMode, Tesseract, TesseractConfig,
    extract_dimensions, list_tesseract_languages,
};
pub use engine::{
    collapse_duplicates, compose, filter_dense_regions, fuse_dimension_patterns,
    is_horizontal_text, is_relevant_text, parse_raw_tokens, preprocess_for_ocr,
    resolve_cross_orientation, rotate_bbox_clockwise, run_orientation, to_canonical,
};
pub use render::{render_overlay, render_svg_bytes, render_text_layer_overlay};

use serde::{Deserialize, Serialize};

/// Pixel box in the frame of the image it was detected on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BBoxPx {
    pub x: u32,
    pub y: u32,
    #[serde(rename = "width")]
    pub w: u32,
    #[serde(rename = "height")]
    pub h: u32,
}

impl BBoxPx {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> u32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }

    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.w as f32 * 0.5,
            self.y as f32 + self.h as f32 * 0.5,
        )
    }
}

/// Page rotation a detection was produced at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    #[serde(rename = "0deg")]
    Deg0,
    #[serde(rename = "90deg")]
    Deg90,
}

impl Orientation {
    pub fn label(self) -> &'static str {
        match self {
            Orientation::Deg0 => "0deg",
            Orientation::Deg90 => "90deg",
        }
    }
}

/// Pixel sizes of a rotated image and of the page it was rotated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationFrame {
    pub orientation: Orientation,
    pub width: u32,
    pub height: u32,
    pub original_width: u32,
    pub original_height: u32,
}

impl RotationFrame {
    pub fn new(orientation: Orientation, original_width: u32, original_height: u32) -> Self {
        let (width, height) = match orientation {
            Orientation::Deg0 => (original_width, original_height),
            Orientation::Deg90 => (original_height, original_width),
        };
        Self {
            orientation,
            width,
            height,
            original_width,
            original_height,
        }
    }
}

/// A recognized dimension candidate.
///
/// `id` is only meaningful once the compositor has numbered the final list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub id: usize,
    pub text: String,
    pub bbox: BBoxPx,
    pub confidence: u32,
    pub source: Orientation,
}

impl Token {
    pub fn new(
        text: impl Into<String>,
        bbox: BBoxPx,
        confidence: u32,
        source: Orientation,
    ) -> Self {
        Self {
            id: 0,
            text: text.into(),
            bbox,
            confidence,
            source,
        }
    }
}
