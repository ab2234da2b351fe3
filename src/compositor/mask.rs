//! Rounded-corner and feathered edge masks for layers.
//!
//! Masks are scalar coverage fields in [0, 1] sampled at pixel centers and
//! applied destination-in, so a layer keeps its color and loses alpha
//! outside the mask shape.

use image::RgbaImage;

use super::filter::blur_coverage;

/// Coverage for a rounded rectangle spanning the whole `width` x `height`
/// grid. `radius` is clamped to half the shorter side. Edges get one pixel
/// of antialiasing.
pub fn rounded_rect_coverage(width: u32, height: u32, radius: f32) -> Vec<f32> {
    rect_coverage(
        width,
        height,
        0.0,
        0.0,
        width as f32,
        height as f32,
        radius,
    )
}

/// Coverage for a rounded rectangle at an arbitrary position inside the
/// grid. Everything outside the rectangle is zero.
pub fn rect_coverage(
    grid_width: u32,
    grid_height: u32,
    rect_x: f32,
    rect_y: f32,
    rect_width: f32,
    rect_height: f32,
    radius: f32,
) -> Vec<f32> {
    let mut coverage = vec![0.0f32; (grid_width * grid_height) as usize];
    if rect_width <= 0.0 || rect_height <= 0.0 {
        return coverage;
    }
    let radius = radius.clamp(0.0, rect_width.min(rect_height) / 2.0);
    let half_w = rect_width / 2.0;
    let half_h = rect_height / 2.0;
    let center_x = rect_x + half_w;
    let center_y = rect_y + half_h;

    for y in 0..grid_height {
        for x in 0..grid_width {
            let px = x as f32 + 0.5 - center_x;
            let py = y as f32 + 0.5 - center_y;
            let dist = rounded_rect_distance(px, py, half_w, half_h, radius);
            coverage[(y * grid_width + x) as usize] = (0.5 - dist).clamp(0.0, 1.0);
        }
    }
    coverage
}

/// Signed distance from a point (relative to the rect center) to the edge
/// of a rounded rectangle. Negative inside.
fn rounded_rect_distance(px: f32, py: f32, half_w: f32, half_h: f32, radius: f32) -> f32 {
    let qx = px.abs() - (half_w - radius);
    let qy = py.abs() - (half_h - radius);
    let outside = (qx.max(0.0).powi(2) + qy.max(0.0).powi(2)).sqrt();
    outside + qx.max(qy).min(0.0) - radius
}

/// Mask for a feathered layer, over a grid padded by `pad` pixels on every
/// side of the `width` x `height` layer image.
///
/// The hard shape is the layer rectangle inset by `feather_start`, with the
/// corner radius reduced by the same amount, and the whole field is then
/// Gaussian-blurred with `feather` as sigma. The caller draws the padded
/// result at `(x - pad, y - pad)`.
pub fn feathered_coverage(
    width: u32,
    height: u32,
    pad: u32,
    corner_radius: f32,
    feather: f32,
    feather_start: f32,
) -> Vec<f32> {
    let grid_w = width + 2 * pad;
    let grid_h = height + 2 * pad;
    let inset = feather_start.max(0.0);
    let rect_w = width as f32 - 2.0 * inset;
    let rect_h = height as f32 - 2.0 * inset;
    let radius = (corner_radius - inset).max(0.0);
    let hard = rect_coverage(
        grid_w,
        grid_h,
        pad as f32 + inset,
        pad as f32 + inset,
        rect_w,
        rect_h,
        radius,
    );
    blur_coverage(&hard, grid_w, grid_h, feather)
}

/// Destination-in: multiplies each pixel's alpha by the coverage value.
pub fn apply_coverage(image: &mut RgbaImage, coverage: &[f32]) {
    debug_assert_eq!(image.len() / 4, coverage.len());
    for (pixel, &cov) in image.pixels_mut().zip(coverage.iter()) {
        let a = pixel[3] as f32 * cov.clamp(0.0, 1.0);
        pixel[3] = a.round().clamp(0.0, 255.0) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(coverage: &[f32], width: u32, x: u32, y: u32) -> f32 {
        coverage[(y * width + x) as usize]
    }

    #[test]
    fn test_square_corners_fill_the_rect() {
        let cov = rounded_rect_coverage(10, 8, 0.0);
        assert_eq!(at(&cov, 10, 0, 0), 1.0);
        assert_eq!(at(&cov, 10, 9, 7), 1.0);
        assert_eq!(at(&cov, 10, 5, 4), 1.0);
    }

    #[test]
    fn test_rounded_corners_cut_the_corner_pixels() {
        let cov = rounded_rect_coverage(20, 20, 6.0);
        assert!(at(&cov, 20, 0, 0) < 0.5);
        // Edge midpoints are unaffected by the corner radius.
        assert_eq!(at(&cov, 20, 10, 0), 1.0);
        assert_eq!(at(&cov, 20, 0, 10), 1.0);
        assert_eq!(at(&cov, 20, 10, 10), 1.0);
    }

    #[test]
    fn test_huge_radius_clamps_to_a_disc() {
        let cov = rounded_rect_coverage(10, 10, 1000.0);
        assert_eq!(at(&cov, 10, 0, 0), 0.0);
        assert_eq!(at(&cov, 10, 9, 9), 0.0);
        assert_eq!(at(&cov, 10, 5, 5), 1.0);
    }

    #[test]
    fn test_offset_rect_leaves_surroundings_empty() {
        let cov = rect_coverage(20, 20, 5.0, 5.0, 10.0, 10.0, 0.0);
        assert_eq!(at(&cov, 20, 1, 1), 0.0);
        assert_eq!(at(&cov, 20, 10, 10), 1.0);
        assert_eq!(at(&cov, 20, 18, 18), 0.0);
    }

    #[test]
    fn test_degenerate_rect_is_empty() {
        let cov = rect_coverage(8, 8, 4.0, 4.0, 0.0, -3.0, 2.0);
        assert!(cov.iter().all(|&c| c == 0.0));
    }

    #[test]
    fn test_feathered_mask_fades_across_the_bounds() {
        // 40x40 layer, 6px pad, feather sigma 2, hard edge inset 5.
        let cov = feathered_coverage(40, 40, 6, 0.0, 2.0, 5.0);
        let grid = 40 + 2 * 6;
        // Deep inside the inset rect: fully opaque.
        assert!(at(&cov, grid, 26, 26) > 0.99);
        // At the original layer edge, 5px past the hard shape: mostly gone.
        assert!(at(&cov, grid, 6, 26) < 0.05);
        // Out in the padding: effectively zero.
        assert!(at(&cov, grid, 1, 26) < 1e-3);
    }

    #[test]
    fn test_apply_coverage_scales_alpha_only() {
        let mut img = RgbaImage::from_pixel(2, 1, image::Rgba([40, 80, 120, 200]));
        apply_coverage(&mut img, &[1.0, 0.5]);
        assert_eq!(*img.get_pixel(0, 0), image::Rgba([40, 80, 120, 200]));
        assert_eq!(*img.get_pixel(1, 0), image::Rgba([40, 80, 120, 100]));
    }
}
