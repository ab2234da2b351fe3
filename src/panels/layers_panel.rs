//! The right-hand sidebar: the layer list with drag-reorder, plus the edit
//! controls for whatever is selected.
//!
//! Slider-style controls stage every intermediate value and commit once on
//! release, so an adjustment drag is a single undo step no matter how many
//! frames it ran for.

use egui::{Button, CollapsingHeader, ComboBox, Slider};

use crate::ComposeApp;
use crate::compositor::BlendMode;
use crate::document::{Adjustments, Document, LayerId, Selection, FEATHER_START_RATIO};
use crate::source::PixelSource;

/// Which adjustment slider the sidebar is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdjustmentKind {
    #[default]
    Brightness,
    Contrast,
    Saturation,
    Hue,
    Blur,
}

impl AdjustmentKind {
    pub fn all() -> &'static [AdjustmentKind] {
        &[
            Self::Brightness,
            Self::Contrast,
            Self::Saturation,
            Self::Hue,
            Self::Blur,
        ]
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Brightness => "Brightness",
            Self::Contrast => "Contrast",
            Self::Saturation => "Saturation",
            Self::Hue => "Hue",
            Self::Blur => "Blur",
        }
    }

    /// The undo label a finished slider drag commits under.
    pub fn commit_label(self) -> &'static str {
        match self {
            Self::Brightness => "Adjust brightness",
            Self::Contrast => "Adjust contrast",
            Self::Saturation => "Adjust saturation",
            Self::Hue => "Adjust hue",
            Self::Blur => "Adjust blur",
        }
    }

    pub fn range(self) -> std::ops::RangeInclusive<f32> {
        match self {
            Self::Brightness | Self::Contrast | Self::Saturation => 0.0..=200.0,
            Self::Hue => -180.0..=180.0,
            Self::Blur => 0.0..=50.0,
        }
    }

    pub fn get(self, adjustments: &Adjustments) -> f32 {
        match self {
            Self::Brightness => adjustments.brightness,
            Self::Contrast => adjustments.contrast,
            Self::Saturation => adjustments.saturation,
            Self::Hue => adjustments.hue,
            Self::Blur => adjustments.blur,
        }
    }

    pub fn set(self, adjustments: &mut Adjustments, value: f32) {
        match self {
            Self::Brightness => adjustments.brightness = value,
            Self::Contrast => adjustments.contrast = value,
            Self::Saturation => adjustments.saturation = value,
            Self::Hue => adjustments.hue = value,
            Self::Blur => adjustments.blur = value,
        }
    }
}

pub fn layers_panel(app: &mut ComposeApp, ctx: &egui::Context) {
    egui::SidePanel::right("layers_panel")
        .resizable(true)
        .default_width(260.0)
        .show(ctx, |ui| {
            ui.add_enabled_ui(!app.is_busy(), |ui| {
                ui.heading("Layers");
                ui.separator();

                if app.document().base.is_none() {
                    ui.label("Upload an image to get started.");
                    return;
                }

                egui::ScrollArea::vertical().show(ui, |ui| {
                    layer_list(app, ctx, ui);
                    ui.separator();
                    match app.document().selection {
                        Selection::Base => base_controls(app, ui),
                        Selection::Layer(id) => layer_controls(app, ctx, ui, id),
                    }
                });
            });
        });
}

/// One row per layer, top first, with the base image pinned at the bottom.
/// Rows are drag sources and drop targets for reordering.
fn layer_list(app: &mut ComposeApp, ctx: &egui::Context, ui: &mut egui::Ui) {
    let rows: Vec<(LayerId, String, PixelSource)> = app
        .document()
        .layers
        .iter()
        .map(|layer| (layer.id, layer.name.clone(), layer.source.clone()))
        .collect();
    let base = app
        .document()
        .base
        .as_ref()
        .map(|base| (base.name.clone(), base.source.clone()));

    let mut dropped: Option<(LayerId, LayerId)> = None;
    for (id, name, source) in rows {
        let selected = app.document().selection == Selection::Layer(id);
        let row_id = egui::Id::new("layer_row").with(id);
        let response = ui
            .dnd_drag_source(row_id, id, |ui| {
                ui.horizontal(|ui| {
                    if let Some((texture, size)) = app.layer_thumbnail(ctx, &source) {
                        ui.image((texture, size));
                    }
                    if ui.selectable_label(selected, &name).clicked() {
                        app.select(Selection::Layer(id));
                    }
                });
            })
            .response;
        if let Some(dragged) = response.dnd_release_payload::<LayerId>() {
            dropped = Some((*dragged, id));
        }
    }
    if let Some((dragged, target)) = dropped {
        app.reorder_layers(dragged, target);
    }

    if let Some((name, source)) = base {
        let selected = app.document().selection == Selection::Base;
        ui.horizontal(|ui| {
            if let Some((texture, size)) = app.layer_thumbnail(ctx, &source) {
                ui.image((texture, size));
            }
            if ui
                .selectable_label(selected, format!("{name} (base)"))
                .clicked()
            {
                app.select(Selection::Base);
            }
        });
    }
}

fn base_controls(app: &mut ComposeApp, ui: &mut egui::Ui) {
    ui.label("Base image");
    ui.horizontal_wrapped(|ui| {
        if ui.button("Duplicate").clicked() {
            app.duplicate(Selection::Base);
        }
        if ui.button("Download").clicked() {
            app.export_selected();
        }
        if ui.button("AI Edit").clicked() {
            app.request_ai_edit();
        }
    });
    adjustments_section(app, ui, Selection::Base);
}

fn layer_controls(app: &mut ComposeApp, ctx: &egui::Context, ui: &mut egui::Ui, id: LayerId) {
    let Some(layer) = app.document().layer(id) else {
        return;
    };
    let mut name = layer.name.clone();
    let blend_mode = layer.blend_mode;
    let corner_radius = layer.corner_radius;
    let feather = layer.feather;

    let response = ui.text_edit_singleline(&mut name);
    if response.changed() {
        app.stage_edit(|doc| {
            if let Some(layer) = doc.layer_mut(id) {
                layer.set_name(name.clone());
            }
        });
    }
    if response.lost_focus() {
        app.commit_current("Rename");
    }

    ui.horizontal_wrapped(|ui| {
        if ui.button("Duplicate").clicked() {
            app.duplicate(Selection::Layer(id));
        }
        if ui.button("Delete").clicked() {
            app.delete_layer(id);
        }
        let crop_label = if app.interaction().crop_mode() {
            "Apply Crop"
        } else {
            "Crop"
        };
        if ui.button(crop_label).clicked() {
            app.toggle_crop();
        }
        if ui.button("Replace").clicked() {
            app.pick_replacement_file(ctx, id);
        }
        if ui.button("Download").clicked() {
            app.export_selected();
        }
        if ui.button("AI Edit").clicked() {
            app.request_ai_edit();
        }
    });
    // The delete button above may have removed the layer this frame.
    if app.document().layer(id).is_none() {
        return;
    }

    let mut picked = blend_mode;
    ComboBox::from_label("Blend")
        .selected_text(blend_mode.display_name())
        .show_ui(ui, |ui| {
            for &mode in BlendMode::all() {
                ui.selectable_value(&mut picked, mode, mode.display_name());
            }
        });
    if picked != blend_mode {
        app.commit_edit("Change Blend Mode", |doc| {
            if let Some(layer) = doc.layer_mut(id) {
                layer.blend_mode = picked;
            }
        });
    }

    adjustments_section(app, ui, Selection::Layer(id));
    masking_section(app, ui, id, corner_radius, feather);
}

fn adjustments_section(app: &mut ComposeApp, ui: &mut egui::Ui, target: Selection) {
    let result = CollapsingHeader::new("Adjustments")
        .open(Some(app.adjustments_open()))
        .show(ui, |ui| {
            let kind = app.active_adjustment();
            ui.horizontal_wrapped(|ui| {
                for &candidate in AdjustmentKind::all() {
                    if ui
                        .selectable_label(candidate == kind, candidate.label())
                        .clicked()
                    {
                        app.set_active_adjustment(candidate);
                    }
                }
            });

            let kind = app.active_adjustment();
            let Some(adjustments) = target_adjustments(app.document(), target) else {
                return;
            };
            let mut value = kind.get(&adjustments);
            let response = ui.add(Slider::new(&mut value, kind.range()));
            if response.changed() {
                app.stage_edit(|doc| {
                    if let Some(adjustments) = target_adjustments_mut(doc, target) {
                        kind.set(adjustments, value);
                    }
                });
            }
            if response.drag_stopped() || response.lost_focus() {
                app.commit_current(kind.commit_label());
            }

            if ui.add(Button::new("Reset").small()).clicked() {
                app.commit_edit("Reset adjustments", |doc| {
                    if let Some(adjustments) = target_adjustments_mut(doc, target) {
                        *adjustments = Adjustments::default();
                    }
                });
            }
        });
    if result.header_response.clicked() {
        let open = app.adjustments_open();
        app.set_adjustments_open(!open);
    }
}

fn masking_section(
    app: &mut ComposeApp,
    ui: &mut egui::Ui,
    id: LayerId,
    corner_radius: f32,
    feather: f32,
) {
    let result = CollapsingHeader::new("Masking")
        .open(Some(app.masking_open()))
        .show(ui, |ui| {
            let mut radius = corner_radius;
            let response = ui.add(Slider::new(&mut radius, 0.0..=200.0).text("Corners"));
            if response.changed() {
                app.stage_edit(|doc| {
                    if let Some(layer) = doc.layer_mut(id) {
                        layer.corner_radius = radius;
                    }
                });
            }
            if response.drag_stopped() || response.lost_focus() {
                app.commit_current("Adjust Corners");
            }

            let mut feather = feather;
            let response = ui.add(Slider::new(&mut feather, 0.0..=100.0).text("Feather"));
            if response.changed() {
                // The falloff start tracks the feather at a fixed ratio.
                app.stage_edit(|doc| {
                    if let Some(layer) = doc.layer_mut(id) {
                        layer.feather = feather;
                        layer.feather_start = feather * FEATHER_START_RATIO;
                    }
                });
            }
            if response.drag_stopped() || response.lost_focus() {
                app.commit_current("Adjust Feather");
            }
        });
    if result.header_response.clicked() {
        let open = app.masking_open();
        app.set_masking_open(!open);
    }
}

fn target_adjustments(document: &Document, target: Selection) -> Option<Adjustments> {
    match target {
        Selection::Base => document.base.as_ref().map(|base| base.adjustments),
        Selection::Layer(id) => document.layer(id).map(|layer| layer.adjustments),
    }
}

fn target_adjustments_mut(document: &mut Document, target: Selection) -> Option<&mut Adjustments> {
    match target {
        Selection::Base => document.base.as_mut().map(|base| &mut base.adjustments),
        Selection::Layer(id) => document.layer_mut(id).map(|layer| &mut layer.adjustments),
    }
}
