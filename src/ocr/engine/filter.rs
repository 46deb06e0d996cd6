use crate::ocr::{BBoxPx, Token};
use crate::settings::Thresholds;

/// Text worth carrying forward: anything with a digit, or a lone `x` waiting to be fused.
pub fn is_relevant_text(text: &str) -> bool {
    contains_digit(text) || text.eq_ignore_ascii_case("x")
}

pub(super) fn contains_digit(text: &str) -> bool {
    text.chars().any(|ch| ch.is_ascii_digit())
}

/// Whether a box reads left to right in the frame it was detected in.
///
/// Single glyphs get a loose bound since even upright ones are often taller than wide.
pub fn is_horizontal_text(bbox: &BBoxPx, text: &str, thresholds: &Thresholds) -> bool {
    let w = bbox.w as f32;
    let h = bbox.h as f32;
    if text.chars().count() == 1 {
        h <= w * thresholds.single_char_max_height_ratio
    } else {
        w >= h * thresholds.multi_char_min_width_ratio
    }
}

pub(super) fn filter_candidates(tokens: Vec<Token>, thresholds: &Thresholds) -> Vec<Token> {
    tokens
        .into_iter()
        .filter(|token| is_relevant_text(&token.text))
        .filter(|token| is_horizontal_text(&token.bbox, &token.text, thresholds))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relevance_needs_digit_or_bare_x() {
        assert!(is_relevant_text("25"));
        assert!(is_relevant_text("Ø12"));
        assert!(is_relevant_text("x"));
        assert!(is_relevant_text("X"));
        assert!(!is_relevant_text("xx"));
        assert!(!is_relevant_text("mm"));
        assert!(!is_relevant_text(""));
    }

    #[test]
    fn single_char_height_bound_is_inclusive() {
        let thresholds = Thresholds::default();
        assert!(is_horizontal_text(&BBoxPx::new(0, 0, 10, 29), "7", &thresholds));
        assert!(is_horizontal_text(&BBoxPx::new(0, 0, 10, 30), "7", &thresholds));
        assert!(!is_horizontal_text(&BBoxPx::new(0, 0, 10, 31), "7", &thresholds));
    }

    #[test]
    fn multi_char_needs_width() {
        let thresholds = Thresholds::default();
        assert!(is_horizontal_text(&BBoxPx::new(0, 0, 31, 50), "120", &thresholds));
        assert!(!is_horizontal_text(&BBoxPx::new(0, 0, 29, 50), "120", &thresholds));
    }
}
