use crate::ocr::{BBoxPx, RotationFrame};

pub(super) fn intersection_area(a: &BBoxPx, b: &BBoxPx) -> u64 {
    let ix1 = a.x.max(b.x);
    let iy1 = a.y.max(b.y);
    let ix2 = a.right().min(b.right());
    let iy2 = a.bottom().min(b.bottom());

    if ix2 <= ix1 || iy2 <= iy1 {
        return 0;
    }
    (ix2 - ix1) as u64 * (iy2 - iy1) as u64
}

/// Intersection as a fraction of `reference`'s own area.
pub(super) fn overlap_ratio_of(reference: &BBoxPx, other: &BBoxPx) -> f32 {
    let area = reference.area();
    if area == 0 {
        return 0.0;
    }
    intersection_area(reference, other) as f32 / area as f32
}

/// Intersection as a fraction of the smaller box; zero when either box is empty.
pub(super) fn overlap_ratio_of_smaller(a: &BBoxPx, b: &BBoxPx) -> f32 {
    let min_area = a.area().min(b.area());
    if min_area == 0 {
        return 0.0;
    }
    intersection_area(a, b) as f32 / min_area as f32
}

pub(super) fn union_bbox(a: &BBoxPx, b: &BBoxPx) -> BBoxPx {
    let x1 = a.x.min(b.x);
    let y1 = a.y.min(b.y);
    let x2 = a.right().max(b.right());
    let y2 = a.bottom().max(b.bottom());
    BBoxPx {
        x: x1,
        y: y1,
        w: x2 - x1,
        h: y2 - y1,
    }
}

/// Maps a box detected on the 90° image back onto the unrotated page.
///
/// The 90° image is produced by a clockwise quarter turn with frame expansion
/// (`image::imageops::rotate90`), which sends page pixel `(x, y)` to
/// `(original_height - 1 - y, x)`. Inverting that for a whole box gives
/// `x0 = y_rot`, `y0 = original_height - x_rot - w_rot` with the extents swapped.
/// Frames with zero size are a caller error.
pub fn to_canonical(bbox: &BBoxPx, frame: &RotationFrame) -> BBoxPx {
    match frame.orientation {
        crate::ocr::Orientation::Deg0 => *bbox,
        crate::ocr::Orientation::Deg90 => BBoxPx {
            x: bbox.y,
            y: frame
                .original_height
                .saturating_sub(bbox.x)
                .saturating_sub(bbox.w),
            w: bbox.h,
            h: bbox.w,
        },
    }
}

/// Forward counterpart of [`to_canonical`]: where a page box lands on the 90° image.
pub fn rotate_bbox_clockwise(bbox: &BBoxPx, original_height: u32) -> BBoxPx {
    BBoxPx {
        x: original_height.saturating_sub(bbox.y).saturating_sub(bbox.h),
        y: bbox.x,
        w: bbox.h,
        h: bbox.w,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::Orientation;
    use image::{GrayImage, Luma};

    #[test]
    fn smaller_box_ratio_ignores_larger_box() {
        let small = BBoxPx::new(10, 10, 10, 10);
        let large = BBoxPx::new(0, 0, 100, 100);
        assert_eq!(overlap_ratio_of_smaller(&small, &large), 1.0);
        assert!(overlap_ratio_of(&large, &small) < 0.02);
    }

    #[test]
    fn disjoint_boxes_do_not_intersect() {
        let a = BBoxPx::new(0, 0, 10, 10);
        let b = BBoxPx::new(10, 0, 10, 10);
        assert_eq!(intersection_area(&a, &b), 0);
    }

    #[test]
    fn transform_round_trips_rotated_boxes() {
        let frame = RotationFrame::new(Orientation::Deg90, 640, 480);
        for bbox in [
            BBoxPx::new(0, 0, 10, 20),
            BBoxPx::new(100, 200, 35, 12),
            BBoxPx::new(600, 400, 40, 80),
            BBoxPx::new(17, 3, 1, 1),
        ] {
            let rotated = rotate_bbox_clockwise(&bbox, frame.original_height);
            assert!(rotated.right() <= frame.width);
            assert!(rotated.bottom() <= frame.height);
            assert_eq!(to_canonical(&rotated, &frame), bbox);
        }
    }

    #[test]
    fn transform_matches_image_rotation_primitive() {
        let (width, height) = (120u32, 80u32);
        let mut page = GrayImage::from_pixel(width, height, Luma([255]));
        let mark = BBoxPx::new(30, 10, 25, 8);
        for y in mark.y..mark.bottom() {
            for x in mark.x..mark.right() {
                page.put_pixel(x, y, Luma([0]));
            }
        }

        let rotated = image::imageops::rotate90(&page);
        let frame = RotationFrame::new(Orientation::Deg90, width, height);
        assert_eq!(rotated.dimensions(), (frame.width, frame.height));

        let mut min = (u32::MAX, u32::MAX);
        let mut max = (0u32, 0u32);
        for (x, y, pixel) in rotated.enumerate_pixels() {
            if pixel[0] == 0 {
                min = (min.0.min(x), min.1.min(y));
                max = (max.0.max(x), max.1.max(y));
            }
        }
        let found = BBoxPx::new(min.0, min.1, max.0 - min.0 + 1, max.1 - min.1 + 1);

        assert_eq!(found, rotate_bbox_clockwise(&mark, height));
        assert_eq!(to_canonical(&found, &frame), mark);
    }

    #[test]
    fn zero_degree_frame_is_identity() {
        let frame = RotationFrame::new(Orientation::Deg0, 50, 40);
        let bbox = BBoxPx::new(3, 4, 5, 6);
        assert_eq!(to_canonical(&bbox, &frame), bbox);
    }
}
