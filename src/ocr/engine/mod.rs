mod compose;
mod density;
mod filter;
mod geom;
mod merge;
mod orientation;
mod overlap;
mod parse;
mod preprocess;
mod tesseract;

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView};
use tracing::info;

use crate::ocr::{BBoxPx, Orientation, Token};
use crate::settings::Thresholds;

pub use compose::compose;
pub use density::filter_dense_regions;
pub use filter::{is_horizontal_text, is_relevant_text};
pub use geom::{rotate_bbox_clockwise, to_canonical};
pub use merge::{collapse_duplicates, fuse_dimension_patterns};
pub use orientation::run_orientation;
pub use overlap::resolve_cross_orientation;
pub use parse::{RawToken, parse_raw_tokens};
pub use preprocess::preprocess_for_ocr;
pub use tesseract::{
    OcrTokenSource, SegmentationMode, Tesseract, TesseractConfig, list_tesseract_languages,
};

/// Every dimension found on a page, in page pixel coordinates.
#[derive(Debug, Clone)]
pub struct DimensionExtraction {
    pub width: u32,
    pub height: u32,
    pub tokens: Vec<Token>,
}

impl DimensionExtraction {
    pub fn from_orientation(&self, orientation: Orientation) -> impl Iterator<Item = &Token> {
        self.tokens
            .iter()
            .filter(move |token| token.source == orientation)
    }
}

/// Full raster pipeline for one page.
///
/// The page is read at 0° and at 90°; the 90° detections are thinned out in
/// text-dense areas, mapped back onto the page, and reconciled with the 0° set
/// before numbering.
pub fn extract_dimensions<S: OcrTokenSource>(
    image: &DynamicImage,
    source: &S,
    min_conf: i64,
    thresholds: &Thresholds,
) -> Result<DimensionExtraction> {
    let (width, height) = image.dimensions();

    let horizontal = run_orientation(image, Orientation::Deg0, source, min_conf, thresholds)?;
    let rotated =
        orientation::run_orientation_pass(image, Orientation::Deg90, source, min_conf, thresholds)?;

    let reference_raw = source
        .recognize(&rotated.prepared, thresholds.density_mode)
        .with_context(|| "ocr failed on density reference pass")?;
    let reference: Vec<BBoxPx> = parse_raw_tokens(
        &reference_raw,
        thresholds.density_min_confidence,
        thresholds.density_min_box_px,
        Orientation::Deg90,
    )
    .into_iter()
    .map(|token| token.bbox)
    .collect();
    info!("density: {} reference boxes on rotated page", reference.len());

    let before_density = rotated.tokens.len();
    let sparse = filter_dense_regions(rotated.tokens, &reference, thresholds);
    info!(
        "density: dropped {} of {} rotated candidates",
        before_density - sparse.len(),
        before_density
    );

    let frame = rotated.frame;
    let vertical: Vec<Token> = sparse
        .into_iter()
        .map(|token| Token {
            bbox: to_canonical(&token.bbox, &frame),
            ..token
        })
        .collect();

    let (before_h, before_v) = (horizontal.len(), vertical.len());
    let (horizontal, vertical) = resolve_cross_orientation(horizontal, vertical, thresholds);
    info!(
        "overlap: removed {} horizontal and {} vertical, kept {} + {}",
        before_h - horizontal.len(),
        before_v - vertical.len(),
        horizontal.len(),
        vertical.len()
    );

    let tokens = compose(horizontal, vertical);
    info!("extracted {} dimension tokens", tokens.len());
    Ok(DimensionExtraction {
        width,
        height,
        tokens,
    })
}
