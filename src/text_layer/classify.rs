use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;

use super::{TokenKind, Word};
use crate::settings::TextLayerThresholds;

static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4}",
        r"\d{4}[/\-.]\d{1,2}[/\-.]\d{1,2}",
        r"(?i)\d{1,2}\s+(?:gen|jan|feb|mar|apr|mag|may|giu|jun|lug|jul|ago|aug|set|sep|ott|oct|nov|dic|dec)[a-z]*\s+\d{2,4}",
    ])
});

static REFERENCE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)(?:prog|project|doc|ref|cod|rif|rev|n)[°.]?\s*[:\-]?\s*\d+",
        r"(?i)[a-z]{2,}-\d+",
        r"(?i)(?:rev|version|ver)[.:]?\s*\d+",
    ])
});

const UNITS: &[&str] = &[
    "mm", "cm", "m", "km", "kg", "g", "l", "ml", "°", "kw", "kva", "v", "a", "hz", "bar", "mpa",
];

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).unwrap_or_else(|e| panic!("Failed to compile regex pattern {p}: {e}"))
        })
        .collect()
}

pub fn is_date(text: &str) -> bool {
    DATE_PATTERNS.iter().any(|re| re.is_match(text))
}

pub fn is_reference(text: &str) -> bool {
    REFERENCE_PATTERNS.iter().any(|re| re.is_match(text))
}

pub fn is_measurement_unit(text: &str) -> bool {
    let lower = text.to_lowercase();
    UNITS.iter().any(|unit| lower.contains(unit))
}

/// Type of a word, or `None` when it carries nothing worth keeping.
///
/// Checks run in order number, date, reference, unit; a later match wins.
pub fn classify(text: &str) -> Option<TokenKind> {
    let mut kind = None;
    if text.chars().any(|c| c.is_ascii_digit()) {
        kind = Some(TokenKind::Number);
    }
    if is_date(text) {
        kind = Some(TokenKind::Date);
    }
    if is_reference(text) {
        kind = Some(TokenKind::Reference);
    }
    if is_measurement_unit(text) {
        kind = Some(TokenKind::Unit);
    }
    kind
}

/// Texts of the nearest words around `word`, closest first, joined by spaces.
pub fn context_around(
    word: &Word,
    all: &[Word],
    thresholds: &TextLayerThresholds,
) -> Option<String> {
    let (cx, cy) = word.center();
    let mut near: Vec<(f64, &str)> = all
        .iter()
        .filter(|other| !(other.text == word.text && (other.x0 - word.x0).abs() < 1.0))
        .filter_map(|other| {
            let (ox, oy) = other.center();
            let distance = ((cx - ox).powi(2) + (cy - oy).powi(2)).sqrt();
            (distance < thresholds.context_radius).then_some((distance, other.text.as_str()))
        })
        .collect();
    near.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    let context = near
        .iter()
        .take(thresholds.context_limit)
        .map(|(_, text)| *text)
        .collect::<Vec<_>>()
        .join(" ");
    (!context.is_empty()).then_some(context)
}
