use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView, GrayImage};
use tracing::info;

use crate::ocr::{Orientation, RotationFrame, Token};
use crate::settings::Thresholds;

use super::filter::{contains_digit, filter_candidates};
use super::merge::{collapse_duplicates, fuse_dimension_patterns, sort_by_position};
use super::parse::parse_raw_tokens;
use super::preprocess::preprocess_for_ocr;
use super::tesseract::{OcrTokenSource, SegmentationMode};

/// Output of one orientation pass, in the frame of the rotated image.
pub(crate) struct OrientationPass {
    pub(crate) frame: RotationFrame,
    /// Binarized rotated page, reused by the density filter.
    pub(crate) prepared: GrayImage,
    pub(crate) tokens: Vec<Token>,
}

fn rotate(image: &DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Deg0 => image.clone(),
        // Clockwise with frame expansion; `to_canonical` inverts exactly this.
        Orientation::Deg90 => image.rotate90(),
    }
}

/// Runs every segmentation mode over one rotation of the page and reduces the
/// combined output to fused, deduplicated dimension candidates.
pub fn run_orientation<S: OcrTokenSource>(
    image: &DynamicImage,
    orientation: Orientation,
    source: &S,
    min_conf: i64,
    thresholds: &Thresholds,
) -> Result<Vec<Token>> {
    Ok(run_orientation_pass(image, orientation, source, min_conf, thresholds)?.tokens)
}

pub(crate) fn run_orientation_pass<S: OcrTokenSource>(
    image: &DynamicImage,
    orientation: Orientation,
    source: &S,
    min_conf: i64,
    thresholds: &Thresholds,
) -> Result<OrientationPass> {
    let (width, height) = image.dimensions();
    let frame = RotationFrame::new(orientation, width, height);
    let rotated = rotate(image, orientation);
    let prepared = preprocess_for_ocr(&rotated);

    let mut candidates = Vec::new();
    for mode in SegmentationMode::PASSES {
        let raw = source.recognize(&prepared, mode).with_context(|| {
            format!("ocr failed at {} (psm {})", orientation.label(), mode.psm())
        })?;
        candidates.extend(parse_raw_tokens(
            &raw,
            min_conf,
            thresholds.min_box_px,
            orientation,
        ));
    }
    let total = candidates.len();

    let relevant = filter_candidates(candidates, thresholds);
    info!(
        "{}: {} candidates, {} kept after relevance/horizontal filter",
        orientation.label(),
        total,
        relevant.len()
    );

    let before_collapse = relevant.len();
    let mut unique = collapse_duplicates(relevant, thresholds);
    sort_by_position(&mut unique);
    info!(
        "{}: collapsed {} duplicates",
        orientation.label(),
        before_collapse - unique.len()
    );

    let before_fuse = unique.len();
    let tokens: Vec<Token> = fuse_dimension_patterns(unique, thresholds)
        .into_iter()
        .filter(|token| contains_digit(&token.text))
        .collect();
    info!(
        "{}: {} tokens after pattern fusion (from {})",
        orientation.label(),
        tokens.len(),
        before_fuse
    );

    Ok(OrientationPass {
        frame,
        prepared,
        tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::RawToken;
    use image::{ImageBuffer, Luma};

    /// Each segmentation mode reads the same "25" with its own confidence and
    /// a slightly shifted box, plus some noise.
    struct PerModeSource;

    fn raw(text: &str, conf: &str, left: u32, top: u32) -> RawToken {
        RawToken {
            text: text.to_string(),
            conf: conf.to_string(),
            left,
            top,
            width: if text.len() > 1 { 20 } else { 8 },
            height: 12,
        }
    }

    impl OcrTokenSource for PerModeSource {
        fn recognize(&self, _image: &GrayImage, mode: SegmentationMode) -> Result<Vec<RawToken>> {
            Ok(match mode {
                SegmentationMode::Block => {
                    vec![raw("25", "70", 10, 10), raw("x", "90", 40, 10)]
                }
                SegmentationMode::Sparse => {
                    vec![raw("25", "90", 11, 10), raw("abc", "95", 60, 30)]
                }
                SegmentationMode::Auto => {
                    vec![raw("25", "90", 12, 10), raw("x", "92", 40, 40)]
                }
            })
        }
    }

    fn blank_page() -> DynamicImage {
        DynamicImage::ImageLuma8(ImageBuffer::from_pixel(120, 80, Luma([255u8])))
    }

    #[test]
    fn passes_collapse_to_one_reading_and_drop_lone_times() {
        let tokens = run_orientation(
            &blank_page(),
            Orientation::Deg0,
            &PerModeSource,
            60,
            &Thresholds::default(),
        )
        .expect("orientation pass");

        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["25"]);
        // Sparse beats Block on confidence; Auto only ties, so Sparse's box stays.
        assert_eq!(tokens[0].confidence, 90);
        assert_eq!((tokens[0].bbox.x, tokens[0].bbox.y), (11, 10));
        assert_eq!(tokens[0].source, Orientation::Deg0);
    }

    #[test]
    fn engine_failure_names_the_pass() {
        struct Broken;
        impl OcrTokenSource for Broken {
            fn recognize(&self, _: &GrayImage, _: SegmentationMode) -> Result<Vec<RawToken>> {
                Err(anyhow::anyhow!("engine crashed"))
            }
        }
        let err = run_orientation(
            &blank_page(),
            Orientation::Deg90,
            &Broken,
            60,
            &Thresholds::default(),
        )
        .expect_err("failing engine");
        assert!(format!("{err:#}").contains("ocr failed at 90deg (psm 6)"));
    }
}
