//! Pointer-driven editing: the gesture state machine, the two-phase
//! gesture session, and crop mode.
//!
//! A gesture stages its intermediate document states through
//! [`History::overwrite`] so the canvas tracks the pointer live, and
//! resolves to a single labeled commit on release. Selection changes ride
//! the same staging path, so a plain click never creates a history entry
//! by itself.

use egui::{Pos2, Rect, Vec2};

use crate::document::{Document, Layer, Selection};
use crate::geometry::{self, Corner};
use crate::history::History;

/// A pointer gesture in flight. Gesture variants carry a clone of the layer
/// as it was at press time; all movement math runs against that snapshot,
/// never against the already-moved layer.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerState {
    Idle,
    Dragging {
        session: GestureSession,
        press: Pos2,
        start: Layer,
    },
    Scaling {
        session: GestureSession,
        press: Pos2,
        start: Layer,
        corner: Corner,
    },
    CroppingDrag {
        press: Pos2,
    },
}

impl Default for PointerState {
    fn default() -> Self {
        PointerState::Idle
    }
}

impl PointerState {
    /// Gestures only begin from `Idle` and only resolve back to it.
    pub fn can_transition_to(&self, next: &PointerState) -> bool {
        match (self, next) {
            (PointerState::Idle, _) => true,
            (_, PointerState::Idle) => true,
            _ => false,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, PointerState::Idle)
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, PointerState::Dragging { .. })
    }

    pub fn is_scaling(&self) -> bool {
        matches!(self, PointerState::Scaling { .. })
    }

    pub fn is_cropping_drag(&self) -> bool {
        matches!(self, PointerState::CroppingDrag { .. })
    }
}

/// Two-phase mutation protocol for one gesture.
///
/// `begin` records the document as the gesture found it (staged selection
/// included). Every pointer move stages a provisional snapshot, and
/// `finish` folds the whole gesture into one labeled commit. A gesture
/// that ends where it began commits nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureSession {
    label: &'static str,
    baseline: Document,
}

impl GestureSession {
    pub fn begin(label: &'static str, history: &History<Document>) -> Self {
        Self {
            label,
            baseline: history.current().clone(),
        }
    }

    pub fn stage(&self, history: &mut History<Document>, snapshot: Document) {
        history.overwrite(snapshot);
    }

    /// Finalizes the gesture. Returns the commit label if an entry was
    /// created.
    pub fn finish(self, history: &mut History<Document>) -> Option<&'static str> {
        let outcome = history.current().clone();
        if outcome == self.baseline {
            return None;
        }
        history.commit(outcome, self.label).then_some(self.label)
    }
}

/// What a crop-mode toggle did, for the caller to surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropToggle {
    /// The base image cannot be cropped; nothing changed.
    RefusedBaseLayer,
    /// Crop mode armed; waiting for a box to be dragged out.
    Armed,
    /// Crop mode left with a valid box: the crop was committed.
    Applied,
    /// Crop mode left with no usable box; nothing changed.
    Discarded,
}

/// Routes pointer events into document edits.
///
/// Owns the live gesture state and the crop-mode flag plus its pending
/// box; the document history stays with the caller and is borrowed per
/// event.
#[derive(Debug, Default)]
pub struct InteractionController {
    state: PointerState,
    crop_mode: bool,
    crop_rect: Option<Rect>,
}

impl InteractionController {
    pub fn state(&self) -> &PointerState {
        &self.state
    }

    pub fn crop_mode(&self) -> bool {
        self.crop_mode
    }

    /// The pending crop box, kept across pointer-up until crop mode is
    /// disarmed.
    pub fn crop_rect(&self) -> Option<Rect> {
        self.crop_rect
    }

    /// Pointer pressed at `pos` (canvas coordinates).
    ///
    /// Priority order: an armed crop mode captures the press; otherwise the
    /// selected layer's handles; otherwise the topmost layer body under the
    /// pointer, which is selected and dragged in the same gesture; an empty
    /// press selects the base image.
    pub fn pointer_down(&mut self, history: &mut History<Document>, pos: Pos2) {
        if !self.state.is_idle() {
            return;
        }

        if self.crop_mode && history.current().selection.layer_id().is_some() {
            self.crop_rect = Some(Rect::from_min_size(pos, Vec2::ZERO));
            self.set_state(PointerState::CroppingDrag { press: pos });
            return;
        }

        let handle_hit = history
            .current()
            .selected_layer()
            .and_then(|layer| geometry::hit_handle(layer, pos).map(|corner| (corner, layer.clone())));
        if let Some((corner, start)) = handle_hit {
            let session = GestureSession::begin("Scale Layer", history);
            self.set_state(PointerState::Scaling {
                session,
                press: pos,
                start,
                corner,
            });
            return;
        }

        match geometry::hit_layer_body(history.current(), pos) {
            Selection::Layer(id) => {
                self.stage_selection(history, Selection::Layer(id));
                let Some(start) = history.current().layer(id).cloned() else {
                    return;
                };
                let session = GestureSession::begin("Move Layer", history);
                self.set_state(PointerState::Dragging {
                    session,
                    press: pos,
                    start,
                });
            }
            Selection::Base => {
                self.stage_selection(history, Selection::Base);
            }
        }
    }

    /// Pointer moved to `pos` while held.
    pub fn pointer_move(&mut self, history: &mut History<Document>, pos: Pos2) {
        match self.state.clone() {
            PointerState::Idle => {}
            PointerState::Dragging {
                session,
                press,
                start,
            } => {
                let origin =
                    geometry::dragged_origin(egui::pos2(start.x, start.y), press, pos);
                let mut staged = history.current().clone();
                if let Some(layer) = staged.layer_mut(start.id) {
                    layer.x = origin.x;
                    layer.y = origin.y;
                    session.stage(history, staged);
                }
            }
            PointerState::Scaling {
                session,
                press,
                start,
                corner,
            } => {
                let (origin, scale) = geometry::scale_from_corner(corner, &start, press, pos);
                let mut staged = history.current().clone();
                if let Some(layer) = staged.layer_mut(start.id) {
                    layer.x = origin.x;
                    layer.y = origin.y;
                    layer.scale = scale;
                    session.stage(history, staged);
                }
            }
            PointerState::CroppingDrag { press } => {
                self.crop_rect = Some(geometry::crop_rect_from_drag(press, pos));
            }
        }
    }

    /// Pointer released. Drags and scales resolve to one labeled commit;
    /// a crop drag just parks its box until crop mode is disarmed.
    /// Returns the commit label if an entry was created.
    pub fn pointer_up(&mut self, history: &mut History<Document>) -> Option<&'static str> {
        match std::mem::replace(&mut self.state, PointerState::Idle) {
            PointerState::Idle => None,
            PointerState::Dragging { session, .. } | PointerState::Scaling { session, .. } => {
                session.finish(history)
            }
            PointerState::CroppingDrag { .. } => None,
        }
    }

    /// Arms or disarms crop mode. Disarming with a valid pending box
    /// applies the crop as one commit; anything smaller is discarded.
    pub fn toggle_crop_mode(&mut self, history: &mut History<Document>) -> CropToggle {
        let Some(selected) = history.current().selection.layer_id() else {
            return CropToggle::RefusedBaseLayer;
        };

        if self.crop_mode {
            let applied = match self.crop_rect {
                Some(rect) if geometry::crop_rect_is_valid(rect) => {
                    let mut doc = history.current().clone();
                    doc.crop_layer(selected, rect);
                    history.commit(doc, "Crop Layer")
                }
                _ => false,
            };
            self.crop_mode = false;
            self.crop_rect = None;
            if applied {
                log::info!("crop applied to layer {selected}");
                CropToggle::Applied
            } else {
                CropToggle::Discarded
            }
        } else {
            self.crop_mode = true;
            CropToggle::Armed
        }
    }

    fn stage_selection(&mut self, history: &mut History<Document>, selection: Selection) {
        if history.current().selection != selection {
            let mut staged = history.current().clone();
            staged.selection = selection;
            history.overwrite(staged);
        }
    }

    fn set_state(&mut self, next: PointerState) {
        debug_assert!(self.state.can_transition_to(&next));
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::PixelSource;
    use egui::pos2;
    use image::RgbaImage;

    fn source(width: u32, height: u32) -> PixelSource {
        PixelSource::new(RgbaImage::new(width, height))
    }

    /// 100x80 base with one 40x20 layer at (10, 10), layer selected.
    fn editing_setup() -> (History<Document>, InteractionController) {
        let mut doc = Document::default();
        doc.set_base(source(100, 80), "base.png".to_owned());
        let id = doc.add_layer(source(40, 20), "layer.png").unwrap();
        {
            let layer = doc.layer_mut(id).unwrap();
            layer.x = 10.0;
            layer.y = 10.0;
            layer.scale = 1.0;
        }
        (History::new(doc), InteractionController::default())
    }

    #[test]
    fn test_body_press_starts_drag_and_selects() {
        let (mut history, mut controller) = editing_setup();
        controller.pointer_down(&mut history, pos2(20.0, 15.0));
        assert!(controller.state().is_dragging());
        assert!(history.current().selection.layer_id().is_some());
    }

    #[test]
    fn test_drag_moves_layer_and_commits_once() {
        let (mut history, mut controller) = editing_setup();
        let before = history.len();
        controller.pointer_down(&mut history, pos2(20.0, 15.0));
        for step in 1..=5 {
            let offset = step as f32 * 10.0;
            controller.pointer_move(&mut history, pos2(20.0 + offset, 15.0 + offset / 2.0));
            assert_eq!(history.len(), before, "moves must not create entries");
        }
        let label = controller.pointer_up(&mut history);
        assert_eq!(label, Some("Move Layer"));
        assert_eq!(history.len(), before + 1);
        let layer = history.current().layers.first().unwrap();
        assert_eq!((layer.x, layer.y), (60.0, 35.0));
        assert!(controller.state().is_idle());
    }

    #[test]
    fn test_zero_movement_click_commits_nothing() {
        let (mut history, mut controller) = editing_setup();
        let before = history.len();
        controller.pointer_down(&mut history, pos2(20.0, 15.0));
        controller.pointer_move(&mut history, pos2(20.0, 15.0));
        assert_eq!(controller.pointer_up(&mut history), None);
        assert_eq!(history.len(), before);
    }

    #[test]
    fn test_empty_press_selects_base_without_entries() {
        let (mut history, mut controller) = editing_setup();
        let before = history.len();
        controller.pointer_down(&mut history, pos2(90.0, 70.0));
        assert!(controller.state().is_idle());
        assert_eq!(history.current().selection, Selection::Base);
        assert_eq!(history.len(), before);
    }

    #[test]
    fn test_handle_press_scales_from_snapshot() {
        let (mut history, mut controller) = editing_setup();
        // Bottom-right corner of the 40x20 layer at (10, 10) is (50, 30).
        controller.pointer_down(&mut history, pos2(50.0, 30.0));
        assert!(controller.state().is_scaling());
        controller.pointer_move(&mut history, pos2(90.0, 30.0));
        let staged = history.current().layers.first().unwrap();
        assert_eq!(staged.scale, 2.0);
        assert_eq!(controller.pointer_up(&mut history), Some("Scale Layer"));
        let layer = history.current().layers.first().unwrap();
        assert_eq!(layer.scale, 2.0);
        assert_eq!((layer.x, layer.y), (10.0, 10.0));
    }

    #[test]
    fn test_crop_refused_for_base_selection() {
        let (mut history, mut controller) = editing_setup();
        let mut doc = history.current().clone();
        doc.selection = Selection::Base;
        history.overwrite(doc);
        assert_eq!(
            controller.toggle_crop_mode(&mut history),
            CropToggle::RefusedBaseLayer
        );
        assert!(!controller.crop_mode());
    }

    #[test]
    fn test_crop_box_survives_pointer_up() {
        let (mut history, mut controller) = editing_setup();
        assert_eq!(controller.toggle_crop_mode(&mut history), CropToggle::Armed);
        controller.pointer_down(&mut history, pos2(40.0, 25.0));
        assert!(controller.state().is_cropping_drag());
        controller.pointer_move(&mut history, pos2(15.0, 12.0));
        assert_eq!(controller.pointer_up(&mut history), None);
        let rect = controller.crop_rect().unwrap();
        assert_eq!(rect.min, pos2(15.0, 12.0));
        assert_eq!(rect.max, pos2(40.0, 25.0));
    }

    #[test]
    fn test_disarm_with_valid_box_applies_crop() {
        let (mut history, mut controller) = editing_setup();
        let before = history.len();
        controller.toggle_crop_mode(&mut history);
        controller.pointer_down(&mut history, pos2(12.0, 12.0));
        controller.pointer_move(&mut history, pos2(30.0, 24.0));
        controller.pointer_up(&mut history);
        assert_eq!(
            controller.toggle_crop_mode(&mut history),
            CropToggle::Applied
        );
        assert_eq!(history.len(), before + 1);
        assert!(!controller.crop_mode());
        assert_eq!(controller.crop_rect(), None);
        let layer = history.current().layers.first().unwrap();
        assert_eq!(layer.source.image().dimensions(), (18, 12));
        assert_eq!(layer.scale, 1.0);
        assert_eq!((layer.x, layer.y), (12.0, 12.0));
    }

    #[test]
    fn test_disarm_with_tiny_box_discards() {
        let (mut history, mut controller) = editing_setup();
        let before = history.len();
        controller.toggle_crop_mode(&mut history);
        controller.pointer_down(&mut history, pos2(12.0, 12.0));
        controller.pointer_move(&mut history, pos2(15.0, 40.0));
        controller.pointer_up(&mut history);
        assert_eq!(
            controller.toggle_crop_mode(&mut history),
            CropToggle::Discarded
        );
        assert_eq!(history.len(), before);
        assert_eq!(controller.crop_rect(), None);
    }

    #[test]
    fn test_transitions_only_pivot_through_idle() {
        let dragging = PointerState::CroppingDrag { press: pos2(0.0, 0.0) };
        assert!(PointerState::Idle.can_transition_to(&dragging));
        assert!(dragging.can_transition_to(&PointerState::Idle));
        let other = PointerState::CroppingDrag { press: pos2(1.0, 1.0) };
        assert!(!dragging.can_transition_to(&other));
    }
}
