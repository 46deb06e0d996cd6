use crate::ocr::{BBoxPx, Orientation, Token};

/// One word as reported by an OCR engine, before any validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    pub text: String,
    /// Confidence exactly as the engine printed it; `-1` and garbage are both possible.
    pub conf: String,
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// Validates raw words into tokens tagged with `source`.
///
/// Drops empty text, unreadable or low confidence, and boxes under `min_box_px`
/// on either side.
pub fn parse_raw_tokens(
    raw: &[RawToken],
    min_conf: i64,
    min_box_px: u32,
    source: Orientation,
) -> Vec<Token> {
    raw.iter()
        .filter_map(|token| {
            let text = token.text.trim();
            if text.is_empty() {
                return None;
            }
            let conf = parse_confidence(&token.conf)?;
            if conf < min_conf {
                return None;
            }
            if token.width < min_box_px || token.height < min_box_px {
                return None;
            }
            Some(Token::new(
                text,
                BBoxPx::new(token.left, token.top, token.width, token.height),
                conf.clamp(0, 100) as u32,
                source,
            ))
        })
        .collect()
}

/// Integer confidence; fractional values are truncated the way engines round down.
fn parse_confidence(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(conf) = value.parse::<i64>() {
        return Some(conf);
    }
    let conf = value.parse::<f64>().ok()?;
    conf.is_finite().then(|| conf.trunc() as i64)
}
