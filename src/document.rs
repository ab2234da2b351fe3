use crate::compositor::BlendMode;
use crate::source::PixelSource;
use egui::Rect;
use image::RgbaImage;
use std::fmt;
use uuid::Uuid;

/// Fit factor applied when a new layer is sized to the canvas.
const ADD_LAYER_FIT: f32 = 0.8;

/// Ratio between a layer's feather falloff and the inset where it begins.
pub const FEATHER_START_RATIO: f32 = 2.5;

/// Stable identity of a layer for its whole lifetime.
///
/// Random uuids rather than timestamps: rapid duplication must never be able
/// to mint two layers with the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(Uuid);

impl LayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer-{}", self.0)
    }
}

/// What the edit controls and the canvas gestures act on.
///
/// The base image is addressed by the `Base` sentinel, never by membership in
/// the layer list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Base,
    Layer(LayerId),
}

impl Selection {
    pub fn is_base(&self) -> bool {
        matches!(self, Selection::Base)
    }

    pub fn layer_id(&self) -> Option<LayerId> {
        match self {
            Selection::Layer(id) => Some(*id),
            Selection::Base => None,
        }
    }
}

/// The color/blur adjustment set shared by the base image and every layer.
///
/// 100 is identity for the percentage values, 0 for blur and hue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adjustments {
    /// Gaussian blur in pixels, >= 0.
    pub blur: f32,
    /// Brightness percentage, 0-200.
    pub brightness: f32,
    /// Contrast percentage, 0-200.
    pub contrast: f32,
    /// Saturation percentage, 0-200.
    pub saturation: f32,
    /// Hue rotation in degrees, -180-180.
    pub hue: f32,
}

impl Default for Adjustments {
    fn default() -> Self {
        Self {
            blur: 0.0,
            brightness: 100.0,
            contrast: 100.0,
            saturation: 100.0,
            hue: 0.0,
        }
    }
}

impl Adjustments {
    pub fn is_identity(&self) -> bool {
        self.blur <= 0.0
            && self.brightness == 100.0
            && self.contrast == 100.0
            && self.saturation == 100.0
            && self.hue == 0.0
    }
}

/// A single image layer of the composition.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Unique identifier for the layer
    pub id: LayerId,
    /// Display name of the layer
    pub name: String,
    /// Decoded pixels this layer draws
    pub source: PixelSource,
    /// Pre-crop / pre-AI-edit source, retained for forward compatibility.
    /// Nothing reads it back yet; crop, replace and AI edits refresh it.
    pub original: PixelSource,
    /// Top-left position in base-image pixel space
    pub x: f32,
    pub y: f32,
    /// Uniform scale; rendered width is natural width times this
    pub scale: f32,
    pub adjustments: Adjustments,
    /// Rounded-corner radius in pixels
    pub corner_radius: f32,
    /// Soft-edge falloff distance in pixels
    pub feather: f32,
    /// Inset from the layer bounds where the feather falloff begins
    pub feather_start: f32,
    pub blend_mode: BlendMode,
}

impl Layer {
    pub fn new(name: &str, source: PixelSource, x: f32, y: f32, scale: f32) -> Self {
        Self {
            id: LayerId::new(),
            name: name.to_owned(),
            original: source.clone(),
            source,
            x,
            y,
            scale,
            adjustments: Adjustments::default(),
            corner_radius: 0.0,
            feather: 0.0,
            feather_start: 0.0,
            blend_mode: BlendMode::Normal,
        }
    }

    /// Rendered width in base-image pixels.
    pub fn width(&self) -> f32 {
        self.source.width() as f32 * self.scale
    }

    /// Rendered height in base-image pixels.
    pub fn height(&self) -> f32 {
        self.source.height() as f32 * self.scale
    }

    pub fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

/// The backdrop of the composition. No geometry: it always fills the canvas
/// at its natural size.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseImage {
    pub source: PixelSource,
    pub name: String,
    pub adjustments: Adjustments,
}

/// The versioned document snapshot: everything undo/redo travels over.
///
/// `layers` is ordered front to back; index 0 renders on top, so the
/// compositor walks it in reverse. The selection rides along in the snapshot
/// so undoing an edit also restores what was selected when it was made.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub base: Option<BaseImage>,
    pub layers: Vec<Layer>,
    pub selection: Selection,
}

impl Document {
    /// Canvas pixel size, defined by the base image.
    pub fn canvas_size(&self) -> Option<(u32, u32)> {
        self.base
            .as_ref()
            .map(|base| (base.source.width(), base.source.height()))
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|layer| layer.id == id)
    }

    pub fn layer_index(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.id == id)
    }

    pub fn selected_layer(&self) -> Option<&Layer> {
        self.selection.layer_id().and_then(|id| self.layer(id))
    }

    pub fn selected_layer_mut(&mut self) -> Option<&mut Layer> {
        let id = self.selection.layer_id()?;
        self.layer_mut(id)
    }

    /// Populates (or replaces) the base image. Layers are cleared and the
    /// adjustments reset: this starts a fresh composition.
    pub fn set_base(&mut self, source: PixelSource, name: String) {
        self.base = Some(BaseImage {
            source,
            name,
            adjustments: Adjustments::default(),
        });
        self.layers.clear();
        self.selection = Selection::Base;
    }

    /// Inserts a decoded image as the new top layer, centered and scaled to
    /// fit within the canvas (never upscaled past 1:1), and selects it.
    ///
    /// Returns `None` when there is no base image yet to define a canvas.
    pub fn add_layer(&mut self, source: PixelSource, name: &str) -> Option<LayerId> {
        let (canvas_w, canvas_h) = self.canvas_size()?;
        let (img_w, img_h) = (source.width() as f32, source.height() as f32);
        let scale = (canvas_w as f32 / img_w)
            .min(canvas_h as f32 / img_h)
            .min(1.0)
            * ADD_LAYER_FIT;
        let x = (canvas_w as f32 - img_w * scale) / 2.0;
        let y = (canvas_h as f32 - img_h * scale) / 2.0;

        let layer = Layer::new(name, source, x, y, scale);
        let id = layer.id;
        self.layers.insert(0, layer);
        self.selection = Selection::Layer(id);
        Some(id)
    }

    /// Duplicates the given target and selects the copy.
    ///
    /// A regular layer is copied field for field (fresh id, name + " copy")
    /// and inserted at the original's index, so the copy sits immediately
    /// above it. Duplicating the base synthesizes a new top-most layer at
    /// (0,0) scale 1 that covers the base exactly.
    pub fn duplicate(&mut self, target: Selection) -> Option<LayerId> {
        match target {
            Selection::Base => {
                let base = self.base.as_ref()?;
                let layer = Layer::new(
                    &format!("{} copy", base.name),
                    base.source.clone(),
                    0.0,
                    0.0,
                    1.0,
                );
                let id = layer.id;
                self.layers.insert(0, layer);
                self.selection = Selection::Layer(id);
                Some(id)
            }
            Selection::Layer(target_id) => {
                let index = self.layer_index(target_id)?;
                let mut copy = self.layers[index].clone();
                copy.id = LayerId::new();
                copy.name = format!("{} copy", copy.name);
                let id = copy.id;
                self.layers.insert(index, copy);
                self.selection = Selection::Layer(id);
                Some(id)
            }
        }
    }

    /// Removes a layer by id. If it was selected, selection falls back to
    /// the base image.
    pub fn delete_layer(&mut self, id: LayerId) {
        self.layers.retain(|layer| layer.id != id);
        if self.selection == Selection::Layer(id) {
            self.selection = Selection::Base;
        }
    }

    /// Moves the dragged layer to sit immediately before the drop target in
    /// the list. Dropping a layer onto itself is a no-op.
    pub fn reorder_layer(&mut self, dragged: LayerId, target: LayerId) {
        if dragged == target {
            return;
        }
        let (Some(from), Some(_)) = (self.layer_index(dragged), self.layer_index(target)) else {
            return;
        };
        let layer = self.layers.remove(from);
        // Look the target up again: removing may have shifted it.
        if let Some(to) = self.layer_index(target) {
            self.layers.insert(to, layer);
        } else {
            self.layers.insert(from, layer);
        }
    }

    /// Swaps a layer's pixel source while preserving its rendered height:
    /// the new scale is old rendered height over the new natural height,
    /// falling back to 1 when the new source reports a degenerate size.
    pub fn replace_layer_image(&mut self, id: LayerId, source: PixelSource, name: &str) {
        let Some(layer) = self.layer_mut(id) else {
            return;
        };
        let old_height = layer.height();
        let new_scale = old_height / source.height() as f32;
        layer.scale = if new_scale.is_finite() && new_scale > 0.0 {
            new_scale
        } else {
            1.0
        };
        layer.name = name.to_owned();
        layer.original = source.clone();
        layer.source = source;
    }

    /// Swaps in a remotely edited rendering of a layer. The layer keeps its
    /// position and rendered height; the feather is re-derived from the new
    /// image so the soft edge matches what the edit was given.
    pub fn apply_remote_layer_edit(&mut self, id: LayerId, source: PixelSource, feather: f32) {
        let Some(layer) = self.layer_mut(id) else {
            return;
        };
        let old_height = layer.height();
        let new_scale = old_height / source.height() as f32;
        layer.scale = if new_scale.is_finite() && new_scale > 0.0 {
            new_scale
        } else {
            1.0
        };
        layer.feather = feather;
        layer.feather_start = feather * FEATHER_START_RATIO;
        layer.original = source.clone();
        layer.source = source;
    }

    /// Swaps the base image pixels for a remotely edited version. Layers,
    /// base adjustments and the base name all stay as they are.
    pub fn apply_remote_base_edit(&mut self, source: PixelSource) {
        if let Some(base) = self.base.as_mut() {
            base.source = source;
        }
    }

    /// Replaces a layer's pixels with the sub-region under `crop` (given in
    /// canvas space), moves the layer to the crop origin and resets its
    /// scale to 1. The extracted region becomes the layer's new `original`.
    pub fn crop_layer(&mut self, id: LayerId, crop: Rect) {
        let Some(layer) = self.layer(id) else {
            return;
        };
        let scale = layer.scale;
        let src_x = (crop.min.x - layer.x) / scale;
        let src_y = (crop.min.y - layer.y) / scale;
        let src_w = crop.width() / scale;
        let src_h = crop.height() / scale;
        if !(src_w >= 1.0 && src_h >= 1.0) {
            return;
        }

        let cropped = extract_region(layer.source.image(), src_x, src_y, src_w, src_h);
        let source = PixelSource::new(cropped);
        if let Some(layer) = self.layer_mut(id) {
            layer.original = source.clone();
            layer.source = source;
            layer.x = crop.min.x;
            layer.y = crop.min.y;
            layer.scale = 1.0;
        }
    }
}

/// Copies a region out of `image` into a fresh buffer of the region's size.
/// Pixels of the region that fall outside the image stay transparent.
fn extract_region(image: &RgbaImage, src_x: f32, src_y: f32, src_w: f32, src_h: f32) -> RgbaImage {
    let out_w = src_w.round().max(1.0) as u32;
    let out_h = src_h.round().max(1.0) as u32;
    let off_x = src_x.round() as i64;
    let off_y = src_y.round() as i64;

    let mut out = RgbaImage::new(out_w, out_h);
    for dy in 0..out_h {
        for dx in 0..out_w {
            let sx = off_x + dx as i64;
            let sy = off_y + dy as i64;
            if sx >= 0 && sy >= 0 && (sx as u32) < image.width() && (sy as u32) < image.height() {
                out.put_pixel(dx, dy, *image.get_pixel(sx as u32, sy as u32));
            }
        }
    }
    out
}
