use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::filter::median_filter;

const CLAHE_TILES: u32 = 8;
const CLAHE_CLIP_LIMIT: f32 = 2.0;
const DENOISE_RADIUS: u32 = 1;

/// Grayscale, local contrast equalization, light denoise, Otsu binarization,
/// then a polarity flip whenever the binarized page is mostly light.
pub fn preprocess_for_ocr(image: &DynamicImage) -> GrayImage {
    let luma = to_luma(image);
    let equalized = equalize_tiles(&luma, CLAHE_TILES, CLAHE_CLIP_LIMIT);
    let denoised = median_filter(&equalized, DENOISE_RADIUS, DENOISE_RADIUS);
    let threshold = otsu_level(&denoised);
    let mut binary = binarize(&denoised, threshold);
    if mean_value(&binary) > 127.0 {
        invert(&mut binary);
    }
    binary
}

fn to_luma(image: &DynamicImage) -> GrayImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut luma = GrayImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as f32 / 255.0;
        let r = (r as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        let g = (g as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        let b = (b as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        let value = (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round() as u8;
        luma.put_pixel(x, y, Luma([value]));
    }
    luma
}

/// Contrast-limited adaptive histogram equalization over a `tiles x tiles` grid,
/// blending neighbouring tile mappings bilinearly.
fn equalize_tiles(image: &GrayImage, tiles: u32, clip_limit: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }
    let tiles_x = tiles.min(width).max(1);
    let tiles_y = tiles.min(height).max(1);
    let tile_w = width.div_ceil(tiles_x);
    let tile_h = height.div_ceil(tiles_y);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);
            luts.push(tile_lut(image, (x0, y0, x1, y1), clip_limit));
        }
    }

    let lut_at = |tx: u32, ty: u32| &luts[(ty * tiles_x + tx) as usize];
    let mut output = GrayImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels() {
        let value = pixel[0] as usize;
        let gx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
        let gy = (y as f32 + 0.5) / tile_h as f32 - 0.5;
        let tx0 = gx.floor().clamp(0.0, (tiles_x - 1) as f32) as u32;
        let ty0 = gy.floor().clamp(0.0, (tiles_y - 1) as f32) as u32;
        let tx1 = (tx0 + 1).min(tiles_x - 1);
        let ty1 = (ty0 + 1).min(tiles_y - 1);
        let fx = (gx - tx0 as f32).clamp(0.0, 1.0);
        let fy = (gy - ty0 as f32).clamp(0.0, 1.0);

        let top = lut_at(tx0, ty0)[value] as f32 * (1.0 - fx) + lut_at(tx1, ty0)[value] as f32 * fx;
        let bottom =
            lut_at(tx0, ty1)[value] as f32 * (1.0 - fx) + lut_at(tx1, ty1)[value] as f32 * fx;
        let blended = top * (1.0 - fy) + bottom * fy;
        output.put_pixel(x, y, Luma([blended.round().clamp(0.0, 255.0) as u8]));
    }
    output
}

fn tile_lut(
    image: &GrayImage,
    (x0, y0, x1, y1): (u32, u32, u32, u32),
    clip_limit: f32,
) -> [u8; 256] {
    let mut hist = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[image.get_pixel(x, y)[0] as usize] += 1;
        }
    }
    let total = (x1 - x0) * (y1 - y0);
    let mut lut = [0u8; 256];
    if total == 0 {
        for (idx, slot) in lut.iter_mut().enumerate() {
            *slot = idx as u8;
        }
        return lut;
    }

    let clip = ((clip_limit * total as f32 / 256.0) as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }
    let share = excess / 256;
    let remainder = (excess % 256) as usize;
    for (idx, bin) in hist.iter_mut().enumerate() {
        *bin += share + u32::from(idx < remainder);
    }

    let scale = 255.0 / total as f32;
    let mut cumulative = 0u32;
    for (idx, bin) in hist.iter().enumerate() {
        cumulative += bin;
        lut[idx] = (cumulative as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

fn binarize(image: &GrayImage, threshold: u8) -> GrayImage {
    let mut output = image.clone();
    for pixel in output.pixels_mut() {
        pixel[0] = if pixel[0] > threshold { 255 } else { 0 };
    }
    output
}

fn mean_value(image: &GrayImage) -> f32 {
    let count = image.width() as u64 * image.height() as u64;
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = image.pixels().map(|pixel| pixel[0] as u64).sum();
    sum as f32 / count as f32
}

fn invert(image: &mut GrayImage) {
    for pixel in image.pixels_mut() {
        pixel[0] = 255 - pixel[0];
    }
}
