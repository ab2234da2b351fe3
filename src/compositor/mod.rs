//! CPU compositor for the layered document.
//!
//! Rendering walks the layer stack back to front over the base image. Each
//! layer is scaled, masked (rounded corners or feathered edges), run through
//! its adjustment chain and blended onto the accumulated backdrop. The same
//! path renders both the interactive preview (with selection and crop
//! chrome) and chrome-free exports.

pub mod blend;
pub mod filter;
pub mod mask;

pub use blend::{BlendMode, blend_pixel};

use egui::{Pos2, Rect, pos2};
use image::{Rgba, RgbaImage, imageops};

use crate::document::{Document, Layer};
use crate::geometry::{handle_rects, layer_rect};

/// Selection border and corner handle color.
const HANDLE_COLOR: Rgba<u8> = Rgba([0, 150, 255, 204]);
/// Translucent fill for the pending crop box.
const CROP_FILL: Rgba<u8> = Rgba([0, 150, 255, 51]);
/// Dimming tint over a layer while a crop is being drawn on it.
const CROP_DIM: Rgba<u8> = Rgba([0, 0, 0, 102]);

/// Editing chrome drawn into the preview. Exports pass `None` to
/// [`render_composite`] and get clean pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EditorOverlay {
    /// Crop mode is armed: selection handles are hidden and the selected
    /// layer is dimmed outside the pending box.
    pub cropping: bool,
    /// The crop box being dragged out, in canvas coordinates.
    pub crop_rect: Option<Rect>,
}

/// Renders the document to an RGBA buffer at the base image's size.
/// Returns `None` while no base image is loaded.
pub fn render_composite(document: &Document, overlay: Option<&EditorOverlay>) -> Option<RgbaImage> {
    let base = document.base.as_ref()?;

    // The base fills the canvas at its natural size; its blur clips at the
    // canvas edge instead of bleeding past it.
    let mut composite = (*base.source.image()).clone();
    filter::apply_adjustments(&mut composite, &base.adjustments);

    let cropping = overlay.is_some_and(|o| o.cropping);
    let crop_rect = overlay.and_then(|o| o.crop_rect);
    let selected = document.selection.layer_id();

    for layer in document.layers.iter().rev() {
        draw_layer(&mut composite, layer, None);
        if cropping && selected == Some(layer.id) {
            // Dim the whole layer, then repaint just the part under the
            // pending box so the kept region previews at full brightness.
            fill_rect(&mut composite, layer_rect(layer), CROP_DIM);
            if let Some(rect) = crop_rect {
                draw_layer(&mut composite, layer, Some(rect));
            }
        }
    }

    if let Some(overlay) = overlay {
        if overlay.cropping {
            if let Some(rect) = overlay.crop_rect {
                fill_rect(&mut composite, rect, CROP_FILL);
                stroke_rect(&mut composite, rect, 2.0, HANDLE_COLOR);
            }
        } else if let Some(layer) = document.selected_layer() {
            draw_selection_chrome(&mut composite, layer);
        }
    }

    Some(composite)
}

/// Flattens one layer to its rendered size with masking and adjustments
/// applied, for per-layer export. Feather spill past the layer bounds is
/// clipped off.
pub fn flatten_layer(layer: &Layer) -> RgbaImage {
    let width = layer.width().round().max(1.0) as u32;
    let height = layer.height().round().max(1.0) as u32;
    let mut canvas = RgbaImage::new(width, height);
    let mut moved = layer.clone();
    moved.x = 0.0;
    moved.y = 0.0;
    draw_layer(&mut canvas, &moved, None);
    canvas
}

/// Flattens one layer with a feather-sized margin on every side so the soft
/// edge survives in full. This is the form sent out for remote edits.
pub fn flatten_layer_padded(layer: &Layer) -> RgbaImage {
    let margin = layer.feather.max(0.0);
    let width = (layer.width() + 2.0 * margin).round().max(1.0) as u32;
    let height = (layer.height() + 2.0 * margin).round().max(1.0) as u32;
    let mut canvas = RgbaImage::new(width, height);
    let mut moved = layer.clone();
    moved.x = margin;
    moved.y = margin;
    draw_layer(&mut canvas, &moved, None);
    canvas
}

/// Draws one layer onto the composite: scale, mask, adjust, blend.
///
/// With `clip` set, only pixels whose centers fall inside the rect are
/// touched.
fn draw_layer(composite: &mut RgbaImage, layer: &Layer, clip: Option<Rect>) {
    let width = layer.width().round().max(1.0) as u32;
    let height = layer.height().round().max(1.0) as u32;

    let source = layer.source.image();
    let scaled = if source.dimensions() == (width, height) {
        source.clone()
    } else {
        imageops::resize(source, width, height, imageops::FilterType::Triangle)
    };

    let (mut buffer, mut dest_x, mut dest_y);
    if layer.feather > 0.0 {
        let pad = layer.feather.ceil() as u32;
        let mut padded = RgbaImage::new(width + 2 * pad, height + 2 * pad);
        imageops::replace(&mut padded, &scaled, pad as i64, pad as i64);
        let coverage = mask::feathered_coverage(
            width,
            height,
            pad,
            layer.corner_radius,
            layer.feather,
            layer.feather_start,
        );
        mask::apply_coverage(&mut padded, &coverage);
        buffer = padded;
        dest_x = layer.x.round() as i64 - pad as i64;
        dest_y = layer.y.round() as i64 - pad as i64;
    } else {
        buffer = scaled;
        if layer.corner_radius > 0.0 {
            let coverage = mask::rounded_rect_coverage(width, height, layer.corner_radius);
            mask::apply_coverage(&mut buffer, &coverage);
        }
        dest_x = layer.x.round() as i64;
        dest_y = layer.y.round() as i64;
    }

    // Adjustments come after masking: the filter applies to the masked
    // buffer as it is composited, so layer blur also softens the mask edge.
    if !layer.adjustments.is_identity() {
        if layer.adjustments.blur > 0.0 {
            let spill = (3.0 * layer.adjustments.blur).ceil() as u32;
            buffer = pad_transparent(&buffer, spill);
            dest_x -= spill as i64;
            dest_y -= spill as i64;
        }
        filter::apply_adjustments(&mut buffer, &layer.adjustments);
    }

    blend_into(composite, &buffer, dest_x, dest_y, layer.blend_mode, clip);
}

fn pad_transparent(image: &RgbaImage, margin: u32) -> RgbaImage {
    let mut out = RgbaImage::new(image.width() + 2 * margin, image.height() + 2 * margin);
    imageops::replace(&mut out, image, margin as i64, margin as i64);
    out
}

fn blend_into(
    composite: &mut RgbaImage,
    source: &RgbaImage,
    dest_x: i64,
    dest_y: i64,
    mode: BlendMode,
    clip: Option<Rect>,
) {
    let (canvas_w, canvas_h) = composite.dimensions();
    for (sx, sy, &pixel) in source.enumerate_pixels() {
        let cx = dest_x + sx as i64;
        let cy = dest_y + sy as i64;
        if cx < 0 || cy < 0 || cx >= canvas_w as i64 || cy >= canvas_h as i64 {
            continue;
        }
        if let Some(clip) = clip {
            if !clip.contains(pixel_center(cx, cy)) {
                continue;
            }
        }
        let base = *composite.get_pixel(cx as u32, cy as u32);
        composite.put_pixel(cx as u32, cy as u32, blend_pixel(base, pixel, mode));
    }
}

fn pixel_center(x: i64, y: i64) -> Pos2 {
    pos2(x as f32 + 0.5, y as f32 + 0.5)
}

fn draw_selection_chrome(composite: &mut RgbaImage, layer: &Layer) {
    let rect = layer_rect(layer);
    stroke_rect(composite, rect, 2.0, HANDLE_COLOR);
    for (_, handle) in handle_rects(rect) {
        fill_rect(composite, handle, HANDLE_COLOR);
    }
}

/// Source-over fill of every pixel whose center lies inside `rect`.
fn fill_rect(canvas: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    let (canvas_w, canvas_h) = canvas.dimensions();
    let x0 = rect.min.x.floor().max(0.0) as u32;
    let y0 = rect.min.y.floor().max(0.0) as u32;
    let x1 = (rect.max.x.ceil().max(0.0) as u32).min(canvas_w);
    let y1 = (rect.max.y.ceil().max(0.0) as u32).min(canvas_h);
    for y in y0..y1 {
        for x in x0..x1 {
            if rect.contains(pixel_center(x as i64, y as i64)) {
                let base = *canvas.get_pixel(x, y);
                canvas.put_pixel(x, y, blend_pixel(base, color, BlendMode::Normal));
            }
        }
    }
}

/// Strokes `rect` with a line centered on its edge, canvas style.
fn stroke_rect(canvas: &mut RgbaImage, rect: Rect, line_width: f32, color: Rgba<u8>) {
    let outer = rect.expand(line_width / 2.0);
    let inner = rect.shrink(line_width / 2.0);
    let (canvas_w, canvas_h) = canvas.dimensions();
    let x0 = outer.min.x.floor().max(0.0) as u32;
    let y0 = outer.min.y.floor().max(0.0) as u32;
    let x1 = (outer.max.x.ceil().max(0.0) as u32).min(canvas_w);
    let y1 = (outer.max.y.ceil().max(0.0) as u32).min(canvas_h);
    for y in y0..y1 {
        for x in x0..x1 {
            let center = pixel_center(x as i64, y as i64);
            if outer.contains(center) && !inner.contains(center) {
                let base = *canvas.get_pixel(x, y);
                canvas.put_pixel(x, y, blend_pixel(base, color, BlendMode::Normal));
            }
        }
    }
}
