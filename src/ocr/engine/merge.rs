use crate::ocr::Token;
use crate::settings::Thresholds;

use super::geom::{overlap_ratio_of, union_bbox};

/// Collapses repeats of the same word coming from different segmentation passes.
///
/// An incoming token duplicates a kept one when the lower-cased texts match and
/// their intersection covers more than `duplicate_overlap` of the kept box. The
/// kept token adopts the incoming box and confidence only when the incoming
/// confidence is strictly higher, so it always ends up with the best score seen.
/// Order of first appearance is preserved.
pub fn collapse_duplicates(tokens: Vec<Token>, thresholds: &Thresholds) -> Vec<Token> {
    let mut unique: Vec<Token> = Vec::with_capacity(tokens.len());

    for token in tokens {
        let lowered = token.text.to_lowercase();
        let existing = unique.iter_mut().find(|kept| {
            kept.text.to_lowercase() == lowered
                && overlap_ratio_of(&kept.bbox, &token.bbox) > thresholds.duplicate_overlap
        });
        match existing {
            Some(kept) => {
                if token.confidence > kept.confidence {
                    kept.confidence = token.confidence;
                    kept.bbox = token.bbox;
                }
            }
            None => unique.push(token),
        }
    }
    unique
}

/// Top to bottom, then left to right.
pub(super) fn sort_by_position(tokens: &mut [Token]) {
    tokens.sort_by_key(|token| (token.bbox.y, token.bbox.x));
}

/// Digits, optionally with `.`, `,` or `-` separators.
pub(super) fn is_bare_number(text: &str) -> bool {
    let mut digits = 0usize;
    for ch in text.chars() {
        match ch {
            '0'..='9' => digits += 1,
            '.' | ',' | '-' => {}
            _ => return false,
        }
    }
    digits > 0
}

fn is_times(text: &str) -> bool {
    text.eq_ignore_ascii_case("x")
}

/// Fuses `NUMBER x NUMBER` runs into one `{a}x{b}` token.
///
/// Input must already be in reading order. After a number, up to
/// `fusion_x_lookahead` tokens are searched for an `x`, and after that up to
/// `fusion_number_lookahead` tokens for the second number. The three parts must
/// share a text line and the numbers must be less than `fusion_max_gap_px` apart.
/// The fused box spans every token from the first number through the second.
pub fn fuse_dimension_patterns(tokens: Vec<Token>, thresholds: &Thresholds) -> Vec<Token> {
    if tokens.len() < 2 {
        return tokens;
    }

    let mut fused = Vec::with_capacity(tokens.len());
    let mut i = 0usize;
    while i < tokens.len() {
        if let Some(end) = find_pattern_end(&tokens, i, thresholds) {
            let run = &tokens[i..=end];
            let bbox = run
                .iter()
                .skip(1)
                .fold(run[0].bbox, |acc, token| union_bbox(&acc, &token.bbox));
            let confidence = run.iter().map(|token| token.confidence).max().unwrap_or(0);
            let text = format!("{}x{}", tokens[i].text, tokens[end].text);
            fused.push(Token::new(text, bbox, confidence, tokens[i].source));
            i = end + 1;
            continue;
        }
        fused.push(tokens[i].clone());
        i += 1;
    }
    fused
}

fn find_pattern_end(tokens: &[Token], start: usize, thresholds: &Thresholds) -> Option<usize> {
    let first = &tokens[start];
    if !is_bare_number(&first.text) {
        return None;
    }

    let x_end = tokens.len().min(start + 1 + thresholds.fusion_x_lookahead);
    for j in start + 1..x_end {
        let times = &tokens[j];
        if !is_times(&times.text) {
            continue;
        }
        let number_end = tokens.len().min(j + 1 + thresholds.fusion_number_lookahead);
        for k in j + 1..number_end {
            let second = &tokens[k];
            if !is_bare_number(&second.text) {
                continue;
            }
            if same_line(first, times, second, thresholds)
                && (second.bbox.x as i64 - first.bbox.right() as i64) < thresholds.fusion_max_gap_px
            {
                return Some(k);
            }
        }
    }
    None
}

fn same_line(first: &Token, times: &Token, second: &Token, thresholds: &Thresholds) -> bool {
    let tolerance = first.bbox.h.max(second.bbox.h) as f32 * thresholds.fusion_line_tolerance;
    let (_, first_cy) = first.bbox.center();
    let (_, times_cy) = times.bbox.center();
    let (_, second_cy) = second.bbox.center();
    (first_cy - times_cy).abs() < tolerance && (times_cy - second_cy).abs() < tolerance
}
