//! Centered modal windows: image upload, the AI edit prompt, and settings.

use egui::{Align2, Button, Slider, TextEdit, Vec2, Window};

use crate::ComposeApp;
use crate::document::Selection;

pub fn upload_modal(app: &mut ComposeApp, ctx: &egui::Context) {
    let has_base = app.upload_modal_dismissable();
    let title = if has_base { "Add Layer" } else { "Upload Image" };
    Window::new(title)
        .collapsible(false)
        .resizable(false)
        .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
        .show(ctx, |ui| {
            ui.label(if has_base {
                "The image is added as a new layer on top of the composition."
            } else {
                "The first image becomes the base of the composition."
            });
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui.button("Choose File…").clicked() {
                    app.pick_upload_file(ctx);
                }
                ui.label("or drag & drop an image");
            });
            if has_base {
                ui.add_space(8.0);
                if ui.button("Cancel").clicked() || ui.input(|i| i.key_pressed(egui::Key::Escape))
                {
                    app.close_upload_modal();
                }
            }
        });
}

pub fn ai_prompt_modal(app: &mut ComposeApp, ctx: &egui::Context) {
    let target = match app.document().selection {
        Selection::Base => "the base image".to_owned(),
        Selection::Layer(id) => app
            .document()
            .layer(id)
            .map(|layer| format!("\"{}\"", layer.name))
            .unwrap_or_else(|| "the selection".to_owned()),
    };
    Window::new("AI Edit")
        .collapsible(false)
        .resizable(false)
        .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
        .show(ctx, |ui| {
            ui.label(format!("Describe how to change {target}:"));
            let response = ui.add(
                TextEdit::multiline(app.ai_prompt_mut())
                    .hint_text("e.g. remove the background")
                    .desired_rows(3),
            );
            if app.take_ai_prompt_focus() {
                response.request_focus();
            }
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                let can_apply = !app.ai_prompt().trim().is_empty();
                if ui.add_enabled(can_apply, Button::new("Apply")).clicked() {
                    app.begin_ai_edit();
                }
                if ui.button("Cancel").clicked() || ui.input(|i| i.key_pressed(egui::Key::Escape))
                {
                    app.close_ai_modal();
                }
            });
        });
}

pub fn settings_modal(app: &mut ComposeApp, ctx: &egui::Context) {
    Window::new("Settings")
        .collapsible(false)
        .resizable(false)
        .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
        .show(ctx, |ui| {
            {
                let draft = app.settings_draft_mut();
                ui.checkbox(
                    &mut draft.default_adjustments_open,
                    "Open Adjustments section by default",
                );
                ui.checkbox(
                    &mut draft.default_masking_open,
                    "Open Masking section by default",
                );
                ui.horizontal(|ui| {
                    ui.label("Gemini API Key");
                    ui.add(TextEdit::singleline(&mut draft.api_key).password(true));
                });
                ui.add(
                    Slider::new(&mut draft.ai_feather_percent, 0.0..=50.0)
                        .text("AI edit feather (tenths of % of width)"),
                );
            }
            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Save").clicked() {
                    app.save_settings();
                }
                if ui.button("Cancel").clicked() || ui.input(|i| i.key_pressed(egui::Key::Escape))
                {
                    app.close_settings();
                }
            });
        });
}
