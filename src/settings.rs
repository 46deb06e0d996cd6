use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ocr::SegmentationMode;

/// Tunable heuristics of the raster pipeline. Values are calibrated, not physical.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Boxes narrower or shorter than this are OCR noise.
    pub min_box_px: u32,
    /// A single glyph counts as horizontal while `h <= w * ratio`.
    pub single_char_max_height_ratio: f32,
    /// Longer runs count as horizontal while `w >= h * ratio`.
    pub multi_char_min_width_ratio: f32,
    pub duplicate_overlap: f32,
    pub fusion_x_lookahead: usize,
    pub fusion_number_lookahead: usize,
    pub fusion_max_gap_px: i64,
    pub fusion_line_tolerance: f32,
    pub density_min_confidence: i64,
    pub density_min_box_px: u32,
    pub density_radius_multiplier: f32,
    pub density_max_neighbors: usize,
    pub density_mode: SegmentationMode,
    pub overlap_ratio: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_box_px: 5,
            single_char_max_height_ratio: 3.0,
            multi_char_min_width_ratio: 0.6,
            duplicate_overlap: 0.5,
            fusion_x_lookahead: 5,
            fusion_number_lookahead: 3,
            fusion_max_gap_px: 100,
            fusion_line_tolerance: 0.5,
            density_min_confidence: 30,
            density_min_box_px: 3,
            density_radius_multiplier: 2.5,
            density_max_neighbors: 8,
            density_mode: SegmentationMode::Block,
            overlap_ratio: 0.5,
        }
    }
}

/// Tunable heuristics of the vector text path, in PDF points.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TextLayerThresholds {
    pub word_x_tolerance: f64,
    pub word_y_tolerance: f64,
    pub digit_line_tolerance: f64,
    pub digit_max_gap: f64,
    pub vertical_box_ratio: f64,
    pub vertical_min_x_tolerance: f64,
    pub vertical_x_multiplier: f64,
    pub vertical_min_y_tolerance: f64,
    pub vertical_y_multiplier: f64,
    pub rotated_x_adjacency: f64,
    pub rotated_y_adjacency: f64,
    pub context_radius: f64,
    pub context_limit: usize,
}

impl Default for TextLayerThresholds {
    fn default() -> Self {
        Self {
            word_x_tolerance: 3.0,
            word_y_tolerance: 3.0,
            digit_line_tolerance: 5.0,
            digit_max_gap: 200.0,
            vertical_box_ratio: 2.0,
            vertical_min_x_tolerance: 20.0,
            vertical_x_multiplier: 1.5,
            vertical_min_y_tolerance: 50.0,
            vertical_y_multiplier: 2.0,
            rotated_x_adjacency: 15.0,
            rotated_y_adjacency: 20.0,
            context_radius: 50.0,
            context_limit: 3,
        }
    }
}

/// How a PDF is routed between the text layer and OCR.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectSettings {
    /// Only the leading pages are inspected.
    pub sample_pages: usize,
    /// A page counts as textual above this many non-blank characters.
    pub min_text_chars: usize,
}

impl Default for DetectSettings {
    fn default() -> Self {
        Self {
            sample_pages: 5,
            min_text_chars: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    pub binary: String,
    pub languages: String,
    pub oem: u32,
    pub dpi: Option<u32>,
    pub min_confidence: i64,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            binary: "tesseract".to_string(),
            languages: "ita+eng".to_string(),
            oem: 3,
            dpi: None,
            min_confidence: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    pub horizontal_color: String,
    pub vertical_color: String,
    pub highlight_color: String,
    pub number_color: String,
    pub date_color: String,
    pub reference_color: String,
    pub unit_color: String,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            horizontal_color: "#0066FF".to_string(),
            vertical_color: "#FF00FF".to_string(),
            highlight_color: "#FFD700".to_string(),
            number_color: "#0066FF".to_string(),
            date_color: "#FF6B35".to_string(),
            reference_color: "#9D4EDD".to_string(),
            unit_color: "#06FFA5".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ocr: OcrSettings,
    pub thresholds: Thresholds,
    pub text_layer: TextLayerThresholds,
    pub detect: DetectSettings,
    pub overlay: OverlaySettings,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    load_layered(&ordered_paths)
}

/// Reads every existing file in order; later tables override earlier ones key by key.
pub(crate) fn load_layered(paths: &[PathBuf]) -> Result<Settings> {
    let mut merged = toml::Table::new();
    for path in paths {
        if !path.exists() {
            continue;
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings: {}", path.display()))?;
        let parsed: toml::Table = toml::from_str(&content)
            .with_context(|| format!("failed to parse settings: {}", path.display()))?;
        merge_tables(&mut merged, parsed);
    }
    toml::Value::Table(merged)
        .try_into::<Settings>()
        .with_context(|| "invalid settings")
}

fn merge_tables(base: &mut toml::Table, incoming: toml::Table) {
    for (key, value) in incoming {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(table)) => {
                merge_tables(existing, table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".dimscan"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_files_yield_defaults() {
        let dir = tempdir().expect("tempdir");
        let settings = load_layered(&[dir.path().join("absent.toml")]).expect("settings");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.ocr.min_confidence, 60);
        assert_eq!(settings.thresholds.density_max_neighbors, 8);
    }

    #[test]
    fn later_files_override_individual_keys() {
        let dir = tempdir().expect("tempdir");
        let base = dir.path().join("settings.toml");
        let local = dir.path().join("settings.local.toml");
        fs::write(
            &base,
            "[ocr]\nlanguages = \"eng\"\nmin_confidence = 50\n\n[thresholds]\nfusion_max_gap_px = 80\n",
        )
        .expect("write base");
        fs::write(
            &local,
            "[ocr]\nmin_confidence = 70\n\n[thresholds]\ndensity_mode = \"sparse\"\n",
        )
        .expect("write local");

        let settings = load_layered(&[base, local]).expect("settings");
        assert_eq!(settings.ocr.languages, "eng");
        assert_eq!(settings.ocr.min_confidence, 70);
        assert_eq!(settings.ocr.binary, "tesseract");
        assert_eq!(settings.thresholds.fusion_max_gap_px, 80);
        assert_eq!(settings.thresholds.density_mode, SegmentationMode::Sparse);
        assert_eq!(settings.thresholds.min_box_px, 5);
    }

    #[test]
    fn text_layer_and_overlay_sections_are_read() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            "[text_layer]\ncontext_radius = 80.0\n\n[detect]\nsample_pages = 2\n\n\
             [overlay]\nhighlight_color = \"#00FF00\"\n",
        )
        .expect("write");

        let settings = load_layered(&[path]).expect("settings");
        assert_eq!(settings.text_layer.context_radius, 80.0);
        assert_eq!(settings.text_layer.context_limit, 3);
        assert_eq!(settings.detect.sample_pages, 2);
        assert_eq!(settings.detect.min_text_chars, 100);
        assert_eq!(settings.overlay.highlight_color, "#00FF00");
        assert_eq!(settings.overlay.vertical_color, "#FF00FF");
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let err = load_settings(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("settings file not found"));
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[ocr\nlanguages = 1").expect("write");
        let err = load_layered(&[path]).unwrap_err();
        assert!(format!("{err:#}").contains("broken.toml"));
    }
}
