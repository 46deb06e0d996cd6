use crate::ocr::{BBoxPx, Token};
use crate::settings::Thresholds;

/// Number of reference boxes whose centers fall strictly inside the search circle
/// around `bbox`. A reference box centered exactly on `bbox` is the box itself and
/// does not count.
fn neighbor_count(bbox: &BBoxPx, reference: &[BBoxPx], radius_multiplier: f32) -> usize {
    let (cx, cy) = bbox.center();
    let radius = bbox.w.max(bbox.h) as f32 * radius_multiplier;
    reference
        .iter()
        .filter(|other| {
            let (ox, oy) = other.center();
            let distance = ((cx - ox).powi(2) + (cy - oy).powi(2)).sqrt();
            distance > 0.0 && distance < radius
        })
        .count()
}

/// Drops candidates sitting in crowded text, where a "rotated number" is far more
/// likely to be running text read sideways than an isolated dimension label.
///
/// Candidates and `reference` must be in the same frame.
pub fn filter_dense_regions(
    candidates: Vec<Token>,
    reference: &[BBoxPx],
    thresholds: &Thresholds,
) -> Vec<Token> {
    candidates
        .into_iter()
        .filter(|token| {
            let density =
                neighbor_count(&token.bbox, reference, thresholds.density_radius_multiplier);
            let keep = density <= thresholds.density_max_neighbors;
            if !keep {
                tracing::debug!("density: dropped '{}' ({} neighbors)", token.text, density);
            }
            keep
        })
        .collect()
}
