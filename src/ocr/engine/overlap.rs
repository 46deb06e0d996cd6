use crate::ocr::{BBoxPx, Token};
use crate::settings::Thresholds;

use super::geom::overlap_ratio_of_smaller;

// Reading length of a horizontal detection is its width; a 90° detection mapped
// back to the page stands upright, so its reading length is its height.
fn horizontal_length(bbox: &BBoxPx) -> u32 {
    bbox.w
}

fn vertical_length(bbox: &BBoxPx) -> u32 {
    bbox.h
}

fn overlaps(a: &BBoxPx, b: &BBoxPx, thresholds: &Thresholds) -> bool {
    overlap_ratio_of_smaller(a, b) > thresholds.overlap_ratio
}

/// Settles page regions claimed by both a 0° and a (canonicalized) 90° detection.
///
/// Two ordered passes:
/// 1. a 0° token is dropped when it overlaps a 90° token with a strictly longer
///    reading length;
/// 2. a 90° token is dropped when it overlaps a surviving 0° token whose reading
///    length is at least as long.
///
/// Equal lengths therefore always favour the 0° token. Pass 2 only consults the
/// 0° survivors of pass 1, so results depend on this order.
pub fn resolve_cross_orientation(
    horizontal: Vec<Token>,
    vertical: Vec<Token>,
    thresholds: &Thresholds,
) -> (Vec<Token>, Vec<Token>) {
    let kept_horizontal: Vec<Token> = horizontal
        .into_iter()
        .filter(|h| {
            !vertical.iter().any(|v| {
                overlaps(&h.bbox, &v.bbox, thresholds)
                    && vertical_length(&v.bbox) > horizontal_length(&h.bbox)
            })
        })
        .collect();

    let kept_vertical: Vec<Token> = vertical
        .into_iter()
        .filter(|v| {
            !kept_horizontal.iter().any(|h| {
                overlaps(&h.bbox, &v.bbox, thresholds)
                    && horizontal_length(&h.bbox) >= vertical_length(&v.bbox)
            })
        })
        .collect();

    (kept_horizontal, kept_vertical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::Orientation;

    fn horizontal(x: u32, y: u32, w: u32, h: u32) -> Token {
        Token::new("40", BBoxPx::new(x, y, w, h), 80, Orientation::Deg0)
    }

    fn vertical(x: u32, y: u32, w: u32, h: u32) -> Token {
        Token::new("60", BBoxPx::new(x, y, w, h), 80, Orientation::Deg90)
    }

    #[test]
    fn longer_vertical_wins() {
        let (h, v) = resolve_cross_orientation(
            vec![horizontal(100, 100, 40, 10)],
            vec![vertical(100, 80, 30, 60)],
            &Thresholds::default(),
        );
        assert!(h.is_empty());
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn longer_horizontal_wins() {
        let (h, v) = resolve_cross_orientation(
            vec![horizontal(100, 100, 80, 10)],
            vec![vertical(100, 80, 60, 50)],
            &Thresholds::default(),
        );
        assert_eq!(h.len(), 1);
        assert!(v.is_empty());
    }

    #[test]
    fn equal_length_keeps_horizontal() {
        let (h, v) = resolve_cross_orientation(
            vec![horizontal(100, 100, 40, 10)],
            vec![vertical(100, 80, 30, 40)],
            &Thresholds::default(),
        );
        assert_eq!(h.len(), 1);
        assert!(v.is_empty());
    }

    #[test]
    fn small_overlap_keeps_both() {
        let (h, v) = resolve_cross_orientation(
            vec![horizontal(100, 100, 40, 10)],
            vec![vertical(130, 60, 30, 60)],
            &Thresholds::default(),
        );
        assert_eq!((h.len(), v.len()), (1, 1));
    }

    #[test]
    fn second_pass_only_sees_surviving_horizontals() {
        // The horizontal loses to the tall vertical in pass 1, so it can no longer
        // remove the short vertical it also covers.
        let (h, v) = resolve_cross_orientation(
            vec![horizontal(100, 100, 40, 10)],
            vec![vertical(100, 80, 30, 60), vertical(110, 98, 25, 14)],
            &Thresholds::default(),
        );
        assert!(h.is_empty());
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn empty_sets_pass_through() {
        let (h, v) = resolve_cross_orientation(Vec::new(), Vec::new(), &Thresholds::default());
        assert!(h.is_empty() && v.is_empty());
        let (h, _) = resolve_cross_orientation(
            vec![horizontal(0, 0, 10, 10)],
            Vec::new(),
            &Thresholds::default(),
        );
        assert_eq!(h.len(), 1);
    }
}
