use std::cmp::Ordering;
use std::collections::HashSet;

use pdfplumber::Char;
use tracing::debug;

use super::Word;
use crate::settings::TextLayerThresholds;

fn is_single_digit(word: &Word) -> bool {
    let mut chars = word.text.trim().chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_digit())
}

fn is_single_char(word: &Word) -> bool {
    word.text.trim().chars().count() == 1
}

fn trimmed_union(words: &[&Word]) -> Option<Word> {
    Word::from_parts(
        words
            .iter()
            .map(|w| (w.text.trim(), w.x0, w.x1, w.top, w.bottom)),
    )
}

/// Joins runs of single digits printed on one line with wide letter-spacing.
///
/// Output follows line order (top, then left). A run continues while the next
/// single digit sits on the same line and starts after the previous one ends,
/// no further than the maximum gap.
pub fn merge_horizontal_digits(words: Vec<Word>, thresholds: &TextLayerThresholds) -> Vec<Word> {
    let mut order: Vec<usize> = (0..words.len()).collect();
    order.sort_by(|&a, &b| {
        words[a]
            .top
            .partial_cmp(&words[b].top)
            .unwrap_or(Ordering::Equal)
            .then(
                words[a]
                    .x0
                    .partial_cmp(&words[b].x0)
                    .unwrap_or(Ordering::Equal),
            )
    });

    let mut used = HashSet::new();
    let mut merged = Vec::with_capacity(words.len());

    for (pos, &i) in order.iter().enumerate() {
        if used.contains(&i) {
            continue;
        }
        let word = &words[i];
        used.insert(i);
        if !is_single_digit(word) {
            merged.push(word.clone());
            continue;
        }

        let mut run = vec![i];
        let mut run_end = word.x1;
        for &j in &order[pos + 1..] {
            if used.contains(&j) || !is_single_digit(&words[j]) {
                continue;
            }
            let other = &words[j];
            if (other.top - word.top).abs() >= thresholds.digit_line_tolerance {
                break;
            }
            let gap = other.x0 - run_end;
            if gap < 0.0 || gap > thresholds.digit_max_gap {
                continue;
            }
            run.push(j);
            run_end = other.x1;
        }

        if run.len() < 2 {
            merged.push(word.clone());
            continue;
        }
        used.extend(run.iter().copied());
        let mut parts: Vec<&Word> = run.iter().map(|&k| &words[k]).collect();
        parts.sort_by(|a, b| a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal));
        if let Some(joined) = trimmed_union(&parts) {
            debug!("merged {} digits into '{}'", parts.len(), joined.text);
            merged.push(joined);
        }
    }
    merged
}

/// Joins characters stacked in a column into one word read top to bottom.
///
/// Only single characters and boxes much taller than wide take part. Each
/// remaining word collects every eligible word below it within the column and
/// gap tolerances derived from its own size.
pub fn merge_vertical_chars(words: Vec<Word>, thresholds: &TextLayerThresholds) -> Vec<Word> {
    let eligible = |w: &Word| {
        w.height() > w.width() * thresholds.vertical_box_ratio || is_single_char(w)
    };

    let mut used = HashSet::new();
    let mut merged = Vec::with_capacity(words.len());

    for (i, word) in words.iter().enumerate() {
        if used.contains(&i) {
            continue;
        }
        if !eligible(word) {
            merged.push(word.clone());
            used.insert(i);
            continue;
        }

        let (base_x, _) = word.center();
        let y_tolerance = thresholds
            .vertical_min_y_tolerance
            .max(word.height() * thresholds.vertical_y_multiplier);
        let mut column = vec![i];
        for (j, other) in words.iter().enumerate() {
            if j == i || used.contains(&j) || !eligible(other) {
                continue;
            }
            // Words above are picked up when their own turn comes.
            if other.top <= word.top {
                continue;
            }
            let y_gap = other.top - if j > i { word.bottom } else { word.top };
            let x_tolerance = thresholds
                .vertical_min_x_tolerance
                .max(word.width().max(other.width()) * thresholds.vertical_x_multiplier);
            let (other_x, _) = other.center();
            if (base_x - other_x).abs() < x_tolerance && y_gap < y_tolerance {
                column.push(j);
            }
        }

        if column.len() < 2 {
            merged.push(word.clone());
            used.insert(i);
            continue;
        }
        used.extend(column.iter().copied());
        let mut parts: Vec<&Word> = column.iter().map(|&k| &words[k]).collect();
        parts.sort_by(|a, b| a.top.partial_cmp(&b.top).unwrap_or(Ordering::Equal));
        if let Some(joined) = trimmed_union(&parts) {
            debug!("merged {} stacked chars into '{}'", parts.len(), joined.text);
            merged.push(joined);
        }
    }
    merged
}

/// Groups quarter-turned characters into words.
///
/// The glyphs are already oriented, so they only need grouping: sorted left to
/// right and bottom to top, consecutive characters close on both axes share a
/// word.
pub fn reconstruct_rotated_words(chars: &[Char], thresholds: &TextLayerThresholds) -> Vec<Word> {
    let mut sorted: Vec<&Char> = chars.iter().collect();
    sorted.sort_by(|a, b| {
        a.bbox
            .x0
            .partial_cmp(&b.bbox.x0)
            .unwrap_or(Ordering::Equal)
            .then(
                b.bbox
                    .bottom
                    .partial_cmp(&a.bbox.bottom)
                    .unwrap_or(Ordering::Equal),
            )
    });

    let mut words = Vec::new();
    let mut group: Vec<&Char> = Vec::new();
    for ch in sorted {
        if let Some(last) = group.last() {
            let adjacent = (ch.bbox.x0 - last.bbox.x0).abs() < thresholds.rotated_x_adjacency
                && (ch.bbox.bottom - last.bbox.bottom).abs() < thresholds.rotated_y_adjacency;
            if !adjacent {
                words.extend(char_group_word(&group));
                group.clear();
            }
        }
        group.push(ch);
    }
    words.extend(char_group_word(&group));
    words
}

fn char_group_word(group: &[&Char]) -> Option<Word> {
    Word::from_parts(group.iter().map(|c| {
        let b = &c.bbox;
        (c.text.as_str(), b.x0, b.x1, b.top, b.bottom)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_layer::{turned, word};

    fn texts(words: &[Word]) -> Vec<&str> {
        words.iter().map(|w| w.text.as_str()).collect()
    }

    #[test]
    fn spaced_digits_on_one_line_become_one_number() {
        let words = vec![
            word("5", 160.0, 101.0, 6.0, 10.0),
            word("1", 100.0, 100.0, 6.0, 10.0),
            word("2", 130.0, 100.0, 6.0, 10.0),
            word("mm", 400.0, 100.0, 12.0, 10.0),
        ];
        let merged = merge_horizontal_digits(words, &TextLayerThresholds::default());
        assert_eq!(texts(&merged), vec!["125", "mm"]);
        let number = &merged[0];
        assert_eq!((number.x0, number.x1), (100.0, 166.0));
        assert_eq!((number.top, number.bottom), (100.0, 111.0));
    }

    #[test]
    fn digits_on_different_lines_stay_apart() {
        let words = vec![
            word("1", 100.0, 100.0, 6.0, 10.0),
            word("2", 110.0, 105.0, 6.0, 10.0),
        ];
        let merged = merge_horizontal_digits(words, &TextLayerThresholds::default());
        assert_eq!(texts(&merged), vec!["1", "2"]);
    }

    #[test]
    fn digit_gap_is_bounded() {
        let words = vec![
            word("1", 0.0, 0.0, 6.0, 10.0),
            word("2", 207.0, 0.0, 6.0, 10.0),
        ];
        let merged = merge_horizontal_digits(words, &TextLayerThresholds::default());
        assert_eq!(texts(&merged), vec!["1", "2"]);
    }

    #[test]
    fn stacked_chars_read_top_to_bottom() {
        let words = vec![
            word("Ø", 300.0, 50.0, 7.0, 9.0),
            word("DESCRIZIONE", 10.0, 10.0, 80.0, 10.0),
            word("4", 301.0, 62.0, 6.0, 9.0),
            word("0", 300.0, 74.0, 6.0, 9.0),
        ];
        let merged = merge_vertical_chars(words, &TextLayerThresholds::default());
        assert_eq!(texts(&merged), vec!["Ø40", "DESCRIZIONE"]);
        let column = &merged[0];
        assert_eq!((column.x0, column.x1), (300.0, 307.0));
        assert_eq!((column.top, column.bottom), (50.0, 83.0));
    }

    #[test]
    fn distant_columns_do_not_merge() {
        let words = vec![
            word("1", 0.0, 0.0, 6.0, 9.0),
            word("2", 100.0, 20.0, 6.0, 9.0),
        ];
        let merged = merge_vertical_chars(words, &TextLayerThresholds::default());
        assert_eq!(texts(&merged), vec!["1", "2"]);
    }

    #[test]
    fn rotated_chars_group_by_adjacency() {
        let chars = vec![
            turned("5", 200.0, 100.0),
            turned("2", 200.0, 108.0),
            turned("7", 260.0, 100.0),
        ];
        let words = reconstruct_rotated_words(&chars, &TextLayerThresholds::default());
        assert_eq!(texts(&words), vec!["25", "7"]);
        assert_eq!((words[0].top, words[0].bottom), (100.0, 114.0));
    }

    #[test]
    fn no_rotated_chars_no_words() {
        assert!(reconstruct_rotated_words(&[], &TextLayerThresholds::default()).is_empty());
    }
}
