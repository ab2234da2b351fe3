//! Pointer-space math for direct manipulation: screen/canvas mapping, layer
//! bounds, handle and body hit-testing, and the drag, scale and crop
//! arithmetic. Everything here is a pure function over document state.

use egui::{CursorIcon, Pos2, Rect, pos2, vec2};

use crate::document::{Document, Layer, Selection};

/// Side length of the square corner handles, in canvas pixels.
pub const HANDLE_SIZE: f32 = 12.0;
/// Minimum rendered width a scale gesture may produce.
pub const MIN_SCALE_WIDTH: f32 = 10.0;
/// Crop boxes at or under this size on either axis are discarded as
/// accidental drags.
pub const MIN_CROP_SIZE: f32 = 5.0;

/// One of the four scale handles on the selected layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub fn cursor_icon(self) -> CursorIcon {
        match self {
            Self::TopLeft | Self::BottomRight => CursorIcon::ResizeNwSe,
            Self::TopRight | Self::BottomLeft => CursorIcon::ResizeNeSw,
        }
    }

    fn is_left(self) -> bool {
        matches!(self, Self::TopLeft | Self::BottomLeft)
    }

    fn is_right(self) -> bool {
        matches!(self, Self::TopRight | Self::BottomRight)
    }

    fn is_top(self) -> bool {
        matches!(self, Self::TopLeft | Self::TopRight)
    }
}

/// The rect the canvas occupies inside the available panel space,
/// aspect-fit and centered.
pub fn fit_display_rect(canvas_size: (u32, u32), available: Rect) -> Rect {
    let (canvas_w, canvas_h) = (canvas_size.0 as f32, canvas_size.1 as f32);
    if canvas_w <= 0.0 || canvas_h <= 0.0 {
        return Rect::NOTHING;
    }
    let zoom = (available.width() / canvas_w).min(available.height() / canvas_h);
    let size = vec2(canvas_w * zoom, canvas_h * zoom);
    Rect::from_center_size(available.center(), size)
}

/// Maps a screen-space pointer position into canvas pixel coordinates,
/// undoing the display scaling per axis.
pub fn canvas_from_screen(screen: Pos2, display: Rect, canvas_size: (u32, u32)) -> Pos2 {
    pos2(
        (screen.x - display.min.x) * (canvas_size.0 as f32 / display.width()),
        (screen.y - display.min.y) * (canvas_size.1 as f32 / display.height()),
    )
}

/// A layer's axis-aligned bounds in canvas coordinates.
pub fn layer_rect(layer: &Layer) -> Rect {
    Rect::from_min_size(pos2(layer.x, layer.y), vec2(layer.width(), layer.height()))
}

/// The four handle squares centered on the corners of `rect`, in
/// hit-test priority order.
pub fn handle_rects(rect: Rect) -> [(Corner, Rect); 4] {
    let square = |center: Pos2| Rect::from_center_size(center, egui::Vec2::splat(HANDLE_SIZE));
    [
        (Corner::TopLeft, square(rect.left_top())),
        (Corner::TopRight, square(rect.right_top())),
        (Corner::BottomLeft, square(rect.left_bottom())),
        (Corner::BottomRight, square(rect.right_bottom())),
    ]
}

/// Hit-tests the scale handles of a layer. Handles win over the layer body,
/// so callers check this first.
pub fn hit_handle(layer: &Layer, pos: Pos2) -> Option<Corner> {
    handle_rects(layer_rect(layer))
        .into_iter()
        .find(|(_, rect)| rect.contains(pos))
        .map(|(corner, _)| corner)
}

/// Hit-tests layer bodies front to back. The topmost layer containing the
/// point wins; with no hit the selection falls back to the base image.
pub fn hit_layer_body(document: &Document, pos: Pos2) -> Selection {
    document
        .layers
        .iter()
        .find(|layer| layer_rect(layer).contains(pos))
        .map(|layer| Selection::Layer(layer.id))
        .unwrap_or(Selection::Base)
}

/// New top-left position for a body drag: the press-time origin shifted by
/// the pointer delta.
pub fn dragged_origin(start_origin: Pos2, press: Pos2, current: Pos2) -> Pos2 {
    start_origin + (current - press)
}

/// New position and scale for a corner-handle drag.
///
/// Width is driven by the horizontal pointer delta, floored before the
/// scale is derived so the layer can neither collapse nor invert. Left
/// handles shift `x` to anchor the right edge; top handles shift `y` to
/// anchor the bottom edge. Height follows from the aspect ratio.
pub fn scale_from_corner(corner: Corner, start: &Layer, press: Pos2, current: Pos2) -> (Pos2, f32) {
    let dx = current.x - press.x;
    let natural_w = start.source.width() as f32;
    let natural_h = start.source.height() as f32;
    let start_w = natural_w * start.scale;

    let mut new_w = start_w;
    let mut new_x = start.x;
    if corner.is_right() {
        new_w = start_w + dx;
    }
    if corner.is_left() {
        new_w = start_w - dx;
        new_x = start.x + dx;
    }
    if new_w < MIN_SCALE_WIDTH {
        new_w = MIN_SCALE_WIDTH;
    }
    let new_scale = new_w / natural_w;

    let mut new_y = start.y;
    if corner.is_top() {
        new_y = start.y - (natural_h * new_scale - natural_h * start.scale);
    }
    (pos2(new_x, new_y), new_scale)
}

/// Normalized crop box between the press point and the current pointer.
pub fn crop_rect_from_drag(press: Pos2, current: Pos2) -> Rect {
    Rect::from_two_pos(press, current)
}

/// Whether a pending crop box is big enough to apply.
pub fn crop_rect_is_valid(rect: Rect) -> bool {
    rect.width() > MIN_CROP_SIZE && rect.height() > MIN_CROP_SIZE
}
