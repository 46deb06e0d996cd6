//! Dimension extraction for pages that carry a vector text layer.
//!
//! Works on the characters pdfplumber reads from the page (PDF points,
//! top-left origin) instead of OCR output. Characters printed at a quarter
//! turn are split off and regrouped on their own; the rest go through word
//! building and two merge passes before every word is classified.

mod classify;
mod merge;

use pdfplumber::{Char, Page, WordOptions};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::settings::TextLayerThresholds;

pub use classify::{classify, context_around, is_date, is_measurement_unit, is_reference};
pub use merge::{merge_horizontal_digits, merge_vertical_chars, reconstruct_rotated_words};

/// True for glyphs drawn at 90° or 270°: the transformation matrix has no
/// horizontal scale component and a full shear component.
pub fn is_rotated(ch: &Char) -> bool {
    ch.ctm[0].abs() < 0.1 && ch.ctm[1].abs() > 0.9
}

/// A group of characters with the box that encloses them.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Word {
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.x0 + self.width() / 2.0,
            self.top + self.height() / 2.0,
        )
    }

    pub(crate) fn from_parts<'a, I>(parts: I) -> Option<Self>
    where
        I: IntoIterator<Item = (&'a str, f64, f64, f64, f64)>,
    {
        let mut iter = parts.into_iter();
        let (text, x0, x1, top, bottom) = iter.next()?;
        let mut word = Word {
            text: text.to_string(),
            x0,
            x1,
            top,
            bottom,
        };
        for (text, x0, x1, top, bottom) in iter {
            word.text.push_str(text);
            word.x0 = word.x0.min(x0);
            word.x1 = word.x1.max(x1);
            word.top = word.top.min(top);
            word.bottom = word.bottom.max(bottom);
        }
        Some(word)
    }
}

impl From<&pdfplumber::Word> for Word {
    fn from(word: &pdfplumber::Word) -> Self {
        Self {
            text: word.text.clone(),
            x0: word.bbox.x0,
            x1: word.bbox.x1,
            top: word.bbox.top,
            bottom: word.bbox.bottom,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Number,
    Date,
    Reference,
    Unit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextSource {
    #[serde(rename = "pdfplumber")]
    TextLayer,
}

/// Box in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBoxPt {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl From<&Word> for BBoxPt {
    fn from(word: &Word) -> Self {
        Self {
            x: word.x0,
            y: word.top,
            width: word.width(),
            height: word.height(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextToken {
    pub id: usize,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub bbox: BBoxPt,
    pub confidence: u32,
    pub source: TextSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

pub fn word_options(thresholds: &TextLayerThresholds) -> WordOptions {
    WordOptions {
        x_tolerance: thresholds.word_x_tolerance,
        y_tolerance: thresholds.word_y_tolerance,
        keep_blank_chars: false,
        use_text_flow: true,
        ..WordOptions::default()
    }
}

/// Extracts typed tokens from one page of a PDF with a text layer.
///
/// Words come from pdfplumber's grouping; any word holding a quarter-turned
/// glyph is left out there and rebuilt from the rotated characters instead.
pub fn extract_text_layer(page: &Page, thresholds: &TextLayerThresholds) -> Vec<TextToken> {
    let rotated: Vec<Char> = page
        .chars()
        .iter()
        .filter(|ch| is_rotated(ch))
        .cloned()
        .collect();
    let words: Vec<Word> = page
        .extract_words(&word_options(thresholds))
        .iter()
        .filter(|word| !word.chars.iter().any(is_rotated))
        .map(Word::from)
        .collect();
    info!(
        "text layer page {}: {} chars ({} rotated), {} words",
        page.page_number(),
        page.chars().len(),
        rotated.len(),
        words.len()
    );
    tokens_from_words(words, &rotated, thresholds)
}

/// Merges, classifies and numbers the words of one page.
pub fn tokens_from_words(
    words: Vec<Word>,
    rotated: &[Char],
    thresholds: &TextLayerThresholds,
) -> Vec<TextToken> {
    let before = words.len();
    let words = merge_horizontal_digits(words, thresholds);
    info!(
        "text layer: horizontal digit merge {} -> {} words",
        before,
        words.len()
    );

    let before = words.len();
    let mut words = merge_vertical_chars(words, thresholds);
    info!(
        "text layer: vertical merge {} -> {} words",
        before,
        words.len()
    );

    if !rotated.is_empty() {
        let rebuilt = reconstruct_rotated_words(rotated, thresholds);
        info!(
            "text layer: {} words rebuilt from rotated chars",
            rebuilt.len()
        );
        words.extend(rebuilt);
    }

    let mut tokens = Vec::new();
    for word in &words {
        let text = word.text.trim();
        if text.is_empty() {
            continue;
        }
        let Some(kind) = classify(text) else {
            continue;
        };
        tokens.push(TextToken {
            id: tokens.len(),
            text: text.to_string(),
            kind,
            bbox: BBoxPt::from(word),
            confidence: 100,
            source: TextSource::TextLayer,
            context: context_around(word, &words, thresholds),
        });
    }
    info!("text layer: {} tokens retained", tokens.len());
    tokens
}

#[cfg(test)]
pub(crate) fn ch(text: &str, x0: f64, top: f64, width: f64, height: f64) -> Char {
    Char {
        text: text.to_string(),
        bbox: pdfplumber::BBox::new(x0, top, x0 + width, top + height),
        fontname: "Helvetica".to_string(),
        size: height,
        doctop: top,
        upright: true,
        direction: pdfplumber::TextDirection::Ltr,
        stroking_color: None,
        non_stroking_color: None,
        ctm: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        char_code: 0,
        mcid: None,
        tag: None,
    }
}

#[cfg(test)]
pub(crate) fn turned(text: &str, x0: f64, top: f64) -> Char {
    Char {
        upright: false,
        ctm: [0.0, 1.0, -1.0, 0.0, 0.0, 0.0],
        ..ch(text, x0, top, 8.0, 6.0)
    }
}

#[cfg(test)]
pub(crate) fn word(text: &str, x0: f64, top: f64, width: f64, height: f64) -> Word {
    Word {
        text: text.to_string(),
        x0,
        x1: x0 + width,
        top,
        bottom: top + height,
    }
}
