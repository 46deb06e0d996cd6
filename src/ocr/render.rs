use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{DynamicImage, GenericImageView};
use resvg::render;
use std::io::Cursor;
use tiny_skia::Pixmap;
use usvg::{Options, Tree};

use super::{Orientation, Token};
use crate::settings::OverlaySettings;
use crate::text_layer::{TextToken, TokenKind};

const STROKE: f32 = 3.0;
const HIGHLIGHT_STROKE: f32 = 5.0;

struct OverlayRect<'a> {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    color: &'a str,
    stroke: f32,
}

/// Draws every token box over the page, colored by the orientation it came from.
pub fn render_overlay(
    image: &DynamicImage,
    tokens: &[Token],
    highlight: Option<usize>,
    colors: &OverlaySettings,
) -> Result<Vec<u8>> {
    let rects = tokens
        .iter()
        .map(|token| {
            let color = match token.source {
                Orientation::Deg0 => colors.horizontal_color.as_str(),
                Orientation::Deg90 => colors.vertical_color.as_str(),
            };
            highlighted(
                OverlayRect {
                    x: token.bbox.x as f64,
                    y: token.bbox.y as f64,
                    w: token.bbox.w as f64,
                    h: token.bbox.h as f64,
                    color,
                    stroke: STROKE,
                },
                token.id,
                highlight,
                colors,
            )
        })
        .collect::<Vec<_>>();
    let svg = build_svg(image, &rects)?;
    render_svg_bytes(&svg)
}

/// Same as [`render_overlay`] for text-layer tokens, whose boxes are in PDF points
/// and must be scaled to the `dpi` the page was rasterized at.
pub fn render_text_layer_overlay(
    image: &DynamicImage,
    dpi: f32,
    tokens: &[TextToken],
    highlight: Option<usize>,
    colors: &OverlaySettings,
) -> Result<Vec<u8>> {
    let scale = dpi as f64 / 72.0;
    let rects = tokens
        .iter()
        .map(|token| {
            let color = match token.kind {
                TokenKind::Number => colors.number_color.as_str(),
                TokenKind::Date => colors.date_color.as_str(),
                TokenKind::Reference => colors.reference_color.as_str(),
                TokenKind::Unit => colors.unit_color.as_str(),
            };
            highlighted(
                OverlayRect {
                    x: token.bbox.x * scale,
                    y: token.bbox.y * scale,
                    w: token.bbox.width * scale,
                    h: token.bbox.height * scale,
                    color,
                    stroke: STROKE,
                },
                token.id,
                highlight,
                colors,
            )
        })
        .collect::<Vec<_>>();
    let svg = build_svg(image, &rects)?;
    render_svg_bytes(&svg)
}

fn highlighted<'a>(
    rect: OverlayRect<'a>,
    id: usize,
    highlight: Option<usize>,
    colors: &'a OverlaySettings,
) -> OverlayRect<'a> {
    if highlight == Some(id) {
        OverlayRect {
            color: colors.highlight_color.as_str(),
            stroke: HIGHLIGHT_STROKE,
            ..rect
        }
    } else {
        rect
    }
}

fn build_svg(image: &DynamicImage, rects: &[OverlayRect<'_>]) -> Result<String> {
    let (width, height) = image.dimensions();
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .with_context(|| "failed to encode page image for overlay")?;
    let data_uri = format!("data:image/png;base64,{}", BASE64.encode(&png));

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    ));
    svg.push_str(&format!(
        r#"<image href="{uri}" xlink:href="{uri}" x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="none"/>"#,
        uri = data_uri,
        w = width,
        h = height
    ));

    for rect in rects {
        svg.push_str(&format!(
            r#"<rect x="{x}" y="{y}" width="{w}" height="{h}" fill="none" stroke="{color}" stroke-width="{stroke}"/>"#,
            x = rect.x,
            y = rect.y,
            w = rect.w,
            h = rect.h,
            color = escape_xml(rect.color),
            stroke = rect.stroke
        ));
    }

    svg.push_str("</svg>");
    Ok(svg)
}

/// Rasterizes an SVG document to PNG bytes.
pub fn render_svg_bytes(svg: &str) -> Result<Vec<u8>> {
    let tree = Tree::from_str(svg, &Options::default()).with_context(|| "failed to parse SVG")?;
    let size = tree.size().to_int_size();
    let mut pixmap =
        Pixmap::new(size.width(), size.height()).ok_or_else(|| anyhow!("empty SVG size"))?;
    let mut pixmap_mut = pixmap.as_mut();
    render(&tree, tiny_skia::Transform::identity(), &mut pixmap_mut);
    let image = image::RgbaImage::from_raw(size.width(), size.height(), pixmap.data().to_vec())
        .ok_or_else(|| anyhow!("failed to build image buffer from SVG"))?;
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .with_context(|| "failed to encode image from SVG")?;
    Ok(bytes)
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
