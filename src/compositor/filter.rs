//! Per-layer image adjustments: blur, brightness, contrast, saturation and
//! hue rotation, applied in that order.

use image::RgbaImage;

use crate::document::Adjustments;

/// Applies the full adjustment chain to an image in place.
///
/// Blur runs first on premultiplied color, then the color operators run
/// per pixel on straight [0, 1] values with clamping between steps, the
/// same order a `blur() brightness() contrast() saturate() hue-rotate()`
/// filter list evaluates in.
pub fn apply_adjustments(image: &mut RgbaImage, adjustments: &Adjustments) {
    if adjustments.is_identity() {
        return;
    }
    if adjustments.blur > 0.0 {
        *image = gaussian_blur(image, adjustments.blur);
    }
    if adjustments.brightness != 100.0 {
        apply_brightness(image, adjustments.brightness / 100.0);
    }
    if adjustments.contrast != 100.0 {
        apply_contrast(image, adjustments.contrast / 100.0);
    }
    if adjustments.saturation != 100.0 {
        apply_saturation(image, adjustments.saturation / 100.0);
    }
    if adjustments.hue != 0.0 {
        apply_hue_rotate(image, adjustments.hue.to_radians());
    }
}

/// Runs `f` over the RGB channels of every pixel, clamping the result.
/// Alpha is left untouched.
fn apply_color_filter(image: &mut RgbaImage, f: impl Fn([f32; 3]) -> [f32; 3]) {
    for pixel in image.pixels_mut() {
        let rgb = f([
            pixel[0] as f32 / 255.0,
            pixel[1] as f32 / 255.0,
            pixel[2] as f32 / 255.0,
        ]);
        for i in 0..3 {
            pixel[i] = (rgb[i] * 255.0).round().clamp(0.0, 255.0) as u8;
        }
    }
}

pub fn apply_brightness(image: &mut RgbaImage, factor: f32) {
    apply_color_filter(image, |c| [c[0] * factor, c[1] * factor, c[2] * factor]);
}

pub fn apply_contrast(image: &mut RgbaImage, factor: f32) {
    apply_color_filter(image, |c| {
        [
            (c[0] - 0.5) * factor + 0.5,
            (c[1] - 0.5) * factor + 0.5,
            (c[2] - 0.5) * factor + 0.5,
        ]
    });
}

pub fn apply_saturation(image: &mut RgbaImage, s: f32) {
    apply_color_filter(image, |c| {
        let [r, g, b] = c;
        [
            (0.213 + 0.787 * s) * r + (0.715 - 0.715 * s) * g + (0.072 - 0.072 * s) * b,
            (0.213 - 0.213 * s) * r + (0.715 + 0.285 * s) * g + (0.072 - 0.072 * s) * b,
            (0.213 - 0.213 * s) * r + (0.715 - 0.715 * s) * g + (0.072 + 0.928 * s) * b,
        ]
    });
}

pub fn apply_hue_rotate(image: &mut RgbaImage, radians: f32) {
    let (sin, cos) = radians.sin_cos();
    apply_color_filter(image, |c| {
        let [r, g, b] = c;
        [
            (0.213 + cos * 0.787 - sin * 0.213) * r
                + (0.715 - cos * 0.715 - sin * 0.715) * g
                + (0.072 - cos * 0.072 + sin * 0.928) * b,
            (0.213 - cos * 0.213 + sin * 0.143) * r
                + (0.715 + cos * 0.285 + sin * 0.140) * g
                + (0.072 - cos * 0.072 - sin * 0.283) * b,
            (0.213 - cos * 0.213 - sin * 0.787) * r
                + (0.715 - cos * 0.715 + sin * 0.715) * g
                + (0.072 + cos * 0.928 + sin * 0.072) * b,
        ]
    });
}

/// 1D Gaussian kernel with radius `ceil(3 * sigma)`, normalized to sum 1.
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (3.0 * sigma).ceil().max(1.0) as usize;
    let mut kernel = Vec::with_capacity(2 * radius + 1);
    let denom = 2.0 * sigma * sigma;
    for i in 0..=2 * radius {
        let x = i as f32 - radius as f32;
        kernel.push((-x * x / denom).exp());
    }
    let sum: f32 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// Separable Gaussian blur on premultiplied color.
///
/// Pixels outside the image count as fully transparent, so content fades
/// out at the edges instead of smearing the border inward.
pub fn gaussian_blur(image: &RgbaImage, sigma: f32) -> RgbaImage {
    if sigma <= 0.0 {
        return image.clone();
    }
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as i64;

    let mut premultiplied: Vec<[f32; 4]> = Vec::with_capacity((width * height) as usize);
    for pixel in image.pixels() {
        let a = pixel[3] as f32 / 255.0;
        premultiplied.push([
            pixel[0] as f32 / 255.0 * a,
            pixel[1] as f32 / 255.0 * a,
            pixel[2] as f32 / 255.0 * a,
            a,
        ]);
    }

    let horizontal = convolve_rows(&premultiplied, width, height, &kernel, radius);
    let transposed = convolve_columns(&horizontal, width, height, &kernel, radius);

    let mut out = RgbaImage::new(width, height);
    for (dst, src) in out.pixels_mut().zip(transposed.iter()) {
        let a = src[3];
        if a > 0.0 {
            dst[0] = (src[0] / a * 255.0).round().clamp(0.0, 255.0) as u8;
            dst[1] = (src[1] / a * 255.0).round().clamp(0.0, 255.0) as u8;
            dst[2] = (src[2] / a * 255.0).round().clamp(0.0, 255.0) as u8;
        }
        dst[3] = (a * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    out
}

fn convolve_rows(
    src: &[[f32; 4]],
    width: u32,
    height: u32,
    kernel: &[f32],
    radius: i64,
) -> Vec<[f32; 4]> {
    let mut out = vec![[0.0f32; 4]; src.len()];
    for y in 0..height as i64 {
        let row = y * width as i64;
        for x in 0..width as i64 {
            let mut acc = [0.0f32; 4];
            for (k, &weight) in kernel.iter().enumerate() {
                let sx = x + k as i64 - radius;
                if sx < 0 || sx >= width as i64 {
                    continue;
                }
                let sample = src[(row + sx) as usize];
                for i in 0..4 {
                    acc[i] += sample[i] * weight;
                }
            }
            out[(row + x) as usize] = acc;
        }
    }
    out
}

fn convolve_columns(
    src: &[[f32; 4]],
    width: u32,
    height: u32,
    kernel: &[f32],
    radius: i64,
) -> Vec<[f32; 4]> {
    let mut out = vec![[0.0f32; 4]; src.len()];
    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let mut acc = [0.0f32; 4];
            for (k, &weight) in kernel.iter().enumerate() {
                let sy = y + k as i64 - radius;
                if sy < 0 || sy >= height as i64 {
                    continue;
                }
                let sample = src[(sy * width as i64 + x) as usize];
                for i in 0..4 {
                    acc[i] += sample[i] * weight;
                }
            }
            out[(y * width as i64 + x) as usize] = acc;
        }
    }
    out
}

/// Separable Gaussian blur on a scalar coverage field in [0, 1].
/// Used for feathered mask edges; outside the field counts as zero.
pub fn blur_coverage(mask: &[f32], width: u32, height: u32, sigma: f32) -> Vec<f32> {
    if sigma <= 0.0 || mask.is_empty() {
        return mask.to_vec();
    }
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as i64;

    let mut horizontal = vec![0.0f32; mask.len()];
    for y in 0..height as i64 {
        let row = y * width as i64;
        for x in 0..width as i64 {
            let mut acc = 0.0f32;
            for (k, &weight) in kernel.iter().enumerate() {
                let sx = x + k as i64 - radius;
                if sx < 0 || sx >= width as i64 {
                    continue;
                }
                acc += mask[(row + sx) as usize] * weight;
            }
            horizontal[(row + x) as usize] = acc;
        }
    }

    let mut out = vec![0.0f32; mask.len()];
    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let mut acc = 0.0f32;
            for (k, &weight) in kernel.iter().enumerate() {
                let sy = y + k as i64 - radius;
                if sy < 0 || sy >= height as i64 {
                    continue;
                }
                acc += horizontal[(sy * width as i64 + x) as usize] * weight;
            }
            out[(y * width as i64 + x) as usize] = acc;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, image::Rgba(rgba))
    }

    #[test]
    fn test_identity_adjustments_change_nothing() {
        let mut img = solid(4, 4, [10, 20, 30, 255]);
        let original = img.clone();
        apply_adjustments(&mut img, &Adjustments::default());
        assert_eq!(img, original);
    }

    #[test]
    fn test_brightness_scales_channels() {
        let mut img = solid(2, 2, [100, 50, 10, 200]);
        apply_brightness(&mut img, 2.0);
        let p = img.get_pixel(0, 0);
        assert_eq!(p[0], 200);
        assert_eq!(p[1], 100);
        assert_eq!(p[2], 20);
        assert_eq!(p[3], 200, "alpha must not change");
    }

    #[test]
    fn test_brightness_clamps_at_white() {
        let mut img = solid(1, 1, [200, 200, 200, 255]);
        apply_brightness(&mut img, 3.0);
        assert_eq!(img.get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn test_contrast_pivots_on_middle_gray() {
        let mut img = solid(1, 1, [128, 128, 128, 255]);
        apply_contrast(&mut img, 5.0);
        let p = img.get_pixel(0, 0);
        // ~0.502 stays pinned near the pivot even at extreme contrast.
        assert!((p[0] as i32 - 128).abs() <= 3);
    }

    #[test]
    fn test_zero_saturation_is_weighted_gray() {
        let mut img = solid(1, 1, [255, 0, 0, 255]);
        apply_saturation(&mut img, 0.0);
        let p = img.get_pixel(0, 0);
        // Pure red desaturates to its luminance weight, 0.213.
        let expected = (0.213f32 * 255.0).round() as u8;
        assert_eq!(p[0], expected);
        assert_eq!(p[1], expected);
        assert_eq!(p[2], expected);
    }

    #[test]
    fn test_full_hue_rotation_is_identity() {
        let mut img = solid(1, 1, [180, 90, 30, 255]);
        apply_hue_rotate(&mut img, std::f32::consts::TAU);
        let p = img.get_pixel(0, 0);
        assert!((p[0] as i32 - 180).abs() <= 1);
        assert!((p[1] as i32 - 90).abs() <= 1);
        assert!((p[2] as i32 - 30).abs() <= 1);
    }

    #[test]
    fn test_kernel_is_normalized_and_odd() {
        for sigma in [0.4, 1.0, 3.7] {
            let kernel = gaussian_kernel(sigma);
            assert_eq!(kernel.len() % 2, 1);
            let sum: f32 = kernel.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_blur_keeps_uniform_interior() {
        let img = solid(31, 31, [60, 120, 180, 255]);
        let blurred = gaussian_blur(&img, 2.0);
        // Far from edges every tap sees the same value.
        let p = blurred.get_pixel(15, 15);
        assert_eq!(p[0], 60);
        assert_eq!(p[1], 120);
        assert_eq!(p[2], 180);
        assert_eq!(p[3], 255);
    }

    #[test]
    fn test_blur_spreads_a_point() {
        let mut img = solid(21, 21, [0, 0, 0, 0]);
        img.put_pixel(10, 10, image::Rgba([255, 255, 255, 255]));
        let blurred = gaussian_blur(&img, 2.0);
        assert!(blurred.get_pixel(10, 10)[3] < 255);
        assert!(blurred.get_pixel(12, 10)[3] > 0);
    }

    #[test]
    fn test_blur_fades_at_edges() {
        let img = solid(20, 20, [255, 255, 255, 255]);
        let blurred = gaussian_blur(&img, 3.0);
        // Transparent padding pulls edge alpha down.
        assert!(blurred.get_pixel(0, 0)[3] < 255);
        assert_eq!(blurred.get_pixel(10, 10)[3], 255);
    }

    #[test]
    fn test_coverage_blur_preserves_uniform_interior() {
        let mask = vec![1.0f32; 25 * 25];
        let blurred = blur_coverage(&mask, 25, 25, 1.5);
        assert!((blurred[12 * 25 + 12] - 1.0).abs() < 1e-4);
        assert!(blurred[0] < 1.0);
    }
}
