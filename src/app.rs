use std::time::Duration;

use egui::Pos2;
use image::RgbaImage;

use crate::compositor::{flatten_layer, flatten_layer_padded, render_composite, EditorOverlay};
use crate::decode::{encode_png, DecodeEvent, DecodeTarget, ImageIntake};
use crate::document::{Document, LayerId, Selection};
use crate::history::History;
use crate::interaction::{CropToggle, InteractionController};
use crate::panels;
use crate::panels::layers_panel::AdjustmentKind;
use crate::remote::{EditRequest, GeminiImageEditor, PendingEdit, RemoteImageEditor};
use crate::settings::Preferences;
use crate::source::PixelSource;
use crate::texture_cache::{color_image_from_rgba, TextureCache};
use crate::util::time::current_time_secs;

/// How long a status notice stays on screen.
pub const NOTICE_SECONDS: f64 = 2.0;

/// Composite uploads kept around; staged gestures mint one per frame.
const COMPOSITE_TEXTURES: usize = 4;
/// Thumbnail uploads kept around, keyed by pixel-source id.
const THUMBNAIL_TEXTURES: usize = 64;
/// Longest edge of a sidebar thumbnail, in points.
const THUMBNAIL_EDGE: u32 = 40;

const PNG_MIME: &str = "image/png";

struct Notice {
    text: String,
    expires_at: f64,
}

pub struct ComposeApp {
    history: History<Document>,
    interaction: InteractionController,
    intake: ImageIntake,
    editor: GeminiImageEditor,
    pending_edit: Option<PendingEdit>,
    busy_message: Option<String>,
    preferences: Preferences,

    composite_cache: TextureCache,
    thumbnail_cache: TextureCache,
    // Monotonic id for the composite texture key; bumped whenever the
    // document or overlay differs from what was last rendered.
    revision: u64,
    rendered_document: Document,
    rendered_overlay: EditorOverlay,

    notice: Option<Notice>,
    upload_modal_open: bool,
    ai_modal_open: bool,
    ai_prompt: String,
    ai_prompt_wants_focus: bool,
    settings_modal_open: bool,
    settings_draft: Preferences,
    settings_saved: bool,
    active_adjustment: AdjustmentKind,
    adjustments_open: bool,
    masking_open: bool,
}

impl ComposeApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let preferences = Preferences::load(cc.storage);
        Self {
            history: History::new(Document::default()),
            interaction: InteractionController::default(),
            intake: ImageIntake::new(),
            editor: GeminiImageEditor::new(),
            pending_edit: None,
            busy_message: None,
            composite_cache: TextureCache::new(COMPOSITE_TEXTURES),
            thumbnail_cache: TextureCache::new(THUMBNAIL_TEXTURES),
            revision: 0,
            rendered_document: Document::default(),
            rendered_overlay: EditorOverlay::default(),
            notice: None,
            upload_modal_open: false,
            ai_modal_open: false,
            ai_prompt: String::new(),
            ai_prompt_wants_focus: false,
            settings_modal_open: false,
            settings_draft: preferences.clone(),
            settings_saved: false,
            active_adjustment: AdjustmentKind::default(),
            adjustments_open: preferences.default_adjustments_open,
            masking_open: preferences.default_masking_open,
            preferences,
        }
    }

    pub fn document(&self) -> &Document {
        self.history.current()
    }

    pub fn history(&self) -> &History<Document> {
        &self.history
    }

    pub fn interaction(&self) -> &InteractionController {
        &self.interaction
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn is_busy(&self) -> bool {
        self.busy_message.is_some()
    }

    pub fn notify(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice {
            text: text.into(),
            expires_at: current_time_secs() + NOTICE_SECONDS,
        });
    }

    // ---- document edits ----

    /// Applies `edit` to a copy of the current document and stages it
    /// without creating a history entry.
    pub fn stage_edit(&mut self, edit: impl FnOnce(&mut Document)) {
        let mut document = self.history.current().clone();
        edit(&mut document);
        self.history.overwrite(document);
    }

    /// Applies `edit` to a copy of the current document and commits the
    /// result under `label`. A no-op edit leaves the history untouched.
    pub fn commit_edit(&mut self, label: &str, edit: impl FnOnce(&mut Document)) {
        let mut document = self.history.current().clone();
        edit(&mut document);
        self.history.commit(document, label);
    }

    /// Commits whatever is currently staged under `label`. Used by sliders
    /// that stage a value per frame and label the gesture on release.
    pub fn commit_current(&mut self, label: &str) {
        let document = self.history.current().clone();
        self.history.commit(document, label);
    }

    /// Changes the selection without creating a history entry.
    pub fn select(&mut self, selection: Selection) {
        if self.history.current().selection != selection {
            self.stage_edit(|doc| doc.selection = selection);
        }
    }

    pub fn undo(&mut self) {
        if self.is_busy() {
            return;
        }
        match self.history.undo() {
            Some(label) => self.notify(format!("Undid {label}")),
            None => self.notify("Nothing to undo"),
        }
    }

    pub fn redo(&mut self) {
        if self.is_busy() {
            return;
        }
        match self.history.redo() {
            Some(label) => self.notify(format!("Redid {label}")),
            None => self.notify("Nothing to redo"),
        }
    }

    pub fn duplicate(&mut self, target: Selection) {
        self.commit_edit("Duplicate Layer", |doc| {
            doc.duplicate(target);
        });
    }

    pub fn delete_layer(&mut self, id: LayerId) {
        self.commit_edit("Delete Layer", |doc| doc.delete_layer(id));
    }

    /// Deletes the selected layer. The base image cannot be deleted.
    pub fn delete_selected(&mut self) {
        if let Selection::Layer(id) = self.history.current().selection {
            self.delete_layer(id);
        }
    }

    pub fn reorder_layers(&mut self, dragged: LayerId, target: LayerId) {
        self.commit_edit("Reorder Layers", |doc| doc.reorder_layer(dragged, target));
    }

    pub fn toggle_crop(&mut self) {
        match self.interaction.toggle_crop_mode(&mut self.history) {
            CropToggle::RefusedBaseLayer => {
                self.notify("Cannot crop the base layer. Please duplicate it first.");
            }
            CropToggle::Armed => self.notify("Drag on canvas to select area to crop"),
            CropToggle::Applied | CropToggle::Discarded => {}
        }
    }

    // ---- pointer routing ----

    pub fn pointer_pressed(&mut self, pos: Pos2) {
        self.interaction.pointer_down(&mut self.history, pos);
    }

    pub fn pointer_moved(&mut self, pos: Pos2) {
        self.interaction.pointer_move(&mut self.history, pos);
    }

    pub fn pointer_released(&mut self) {
        if let Some(label) = self.interaction.pointer_up(&mut self.history) {
            log::debug!("gesture committed: {label}");
        }
    }

    // ---- textures ----

    /// Uploads (or reuses) the composite preview texture for the current
    /// document plus editing chrome. `None` while no base image is loaded.
    pub fn composite_texture(&mut self, ctx: &egui::Context) -> Option<egui::TextureId> {
        self.history.current().canvas_size()?;

        let overlay = EditorOverlay {
            cropping: self.interaction.crop_mode(),
            crop_rect: self.interaction.crop_rect(),
        };
        if self.rendered_document != *self.history.current() || self.rendered_overlay != overlay {
            self.revision += 1;
            self.rendered_document = self.history.current().clone();
            self.rendered_overlay = overlay;
        }

        let document = &self.rendered_document;
        self.composite_cache
            .get_or_upload(
                self.revision,
                || render_composite(document, Some(&overlay)).map(|img| color_image_from_rgba(&img)),
                ctx,
            )
            .ok()
    }

    /// Small preview of a pixel source for the layer list. Sources are
    /// immutable, so the upload is reused for as long as it stays cached.
    pub fn layer_thumbnail(
        &mut self,
        ctx: &egui::Context,
        source: &PixelSource,
    ) -> Option<(egui::TextureId, egui::Vec2)> {
        let (w, h) = (source.width(), source.height());
        if w == 0 || h == 0 {
            return None;
        }
        let scale = (THUMBNAIL_EDGE as f32 / w.max(h) as f32).min(1.0);
        let size = egui::vec2((w as f32 * scale).max(1.0), (h as f32 * scale).max(1.0));

        let texture = self
            .thumbnail_cache
            .get_or_upload(
                source.id().index() as u64,
                || {
                    let thumb =
                        image::imageops::thumbnail(source.image(), size.x as u32, size.y as u32);
                    Some(color_image_from_rgba(&thumb))
                },
                ctx,
            )
            .ok()?;
        Some((texture, size))
    }

    // ---- image intake ----

    fn apply_decode_event(&mut self, ctx: &egui::Context, event: DecodeEvent) {
        match event {
            DecodeEvent::Loaded {
                target,
                name,
                image,
            } => {
                let source = PixelSource::new(image);
                match target {
                    DecodeTarget::Intake => {
                        if self.history.current().base.is_none() {
                            self.commit_edit("Set Base Image", |doc| doc.set_base(source, name));
                        } else {
                            self.commit_edit("Add Layer", |doc| {
                                doc.add_layer(source, &name);
                            });
                        }
                        self.upload_modal_open = false;
                    }
                    DecodeTarget::ReplaceLayer(id) => {
                        if self.history.current().layer(id).is_none() {
                            log::warn!("discarding decoded replacement for removed layer {id}");
                            return;
                        }
                        self.commit_edit("Replace Layer", |doc| {
                            doc.replace_layer_image(id, source, &name)
                        });
                    }
                }
                ctx.request_repaint();
            }
            DecodeEvent::Failed { name, error } => {
                log::error!("could not decode {name}: {error}");
                self.notify(format!("Error processing image: {error}"));
            }
        }
    }

    /// Opens a native picker and routes the chosen file into the decoder.
    pub fn pick_upload_file(&mut self, ctx: &egui::Context) {
        if let Some((name, bytes)) = self.pick_image_file() {
            self.intake
                .submit(ctx, DecodeTarget::Intake, name, String::new(), bytes);
        }
    }

    pub fn pick_replacement_file(&mut self, ctx: &egui::Context, id: LayerId) {
        if let Some((name, bytes)) = self.pick_image_file() {
            self.intake.submit(
                ctx,
                DecodeTarget::ReplaceLayer(id),
                name,
                String::new(),
                bytes,
            );
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn pick_image_file(&mut self) -> Option<(String, Vec<u8>)> {
        let path = rfd::FileDialog::new()
            .add_filter(
                "Images",
                &["png", "jpg", "jpeg", "gif", "webp", "bmp", "heic", "heif"],
            )
            .pick_file()?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_owned());
        match std::fs::read(&path) {
            Ok(bytes) => Some((name, bytes)),
            Err(err) => {
                log::error!("could not read {}: {err}", path.display());
                self.notify(format!("Error processing image: {err}"));
                None
            }
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn pick_image_file(&mut self) -> Option<(String, Vec<u8>)> {
        self.notify("Use drag & drop to add images in the web build");
        None
    }

    // ---- export ----

    pub fn export_composition(&mut self) {
        let Some(image) = render_composite(self.history.current(), None) else {
            return;
        };
        self.save_png_dialog("composition.png", image);
    }

    /// Exports the selected layer alone, or the undecorated base image.
    pub fn export_selected(&mut self) {
        let document = self.history.current();
        let (suggested, image) = match document.selection {
            Selection::Base => {
                let Some(base) = &document.base else { return };
                (export_file_name(&base.name), base.source.image().clone())
            }
            Selection::Layer(id) => {
                let Some(layer) = document.layer(id) else { return };
                (export_file_name(&layer.name), flatten_layer(layer))
            }
        };
        self.save_png_dialog(&suggested, image);
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn save_png_dialog(&mut self, suggested: &str, image: RgbaImage) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG image", &["png"])
            .set_file_name(suggested)
            .save_file()
        else {
            return;
        };
        match image.save_with_format(&path, image::ImageFormat::Png) {
            Ok(()) => {
                log::info!("exported {}", path.display());
                self.notify(format!("Saved {}", path.display()));
            }
            Err(err) => {
                log::error!("export failed: {err}");
                self.notify(format!("Could not save image: {err}"));
            }
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn save_png_dialog(&mut self, _suggested: &str, _image: RgbaImage) {
        self.notify("Saving files is not supported in the web build");
    }

    // ---- remote edits ----

    /// Entry point for the AI Edit button and its shortcut: opens the prompt
    /// modal, or the settings modal when no API key is configured yet.
    pub fn request_ai_edit(&mut self) {
        if self.is_busy() || self.history.current().base.is_none() {
            return;
        }
        if self.preferences.api_key.is_empty() {
            self.open_settings();
            self.notify("Please set your Gemini API Key in Settings.");
            return;
        }
        self.ai_prompt.clear();
        self.ai_modal_open = true;
        self.ai_prompt_wants_focus = true;
    }

    /// Flattens the selected target, ships it to the remote editor and
    /// records the in-flight job. The UI stays blocked until it resolves.
    pub fn begin_ai_edit(&mut self) {
        let prompt = self.ai_prompt.trim().to_owned();
        if prompt.is_empty() || self.pending_edit.is_some() {
            return;
        }
        let selection = self.history.current().selection;
        let payload = {
            let document = self.history.current();
            match selection {
                Selection::Base => document.base.as_ref().map(|b| encode_png(b.source.image())),
                Selection::Layer(id) => document
                    .layer(id)
                    .map(|layer| encode_png(&flatten_layer_padded(layer))),
            }
        };
        let Some(payload) = payload else { return };
        let image_bytes = match payload {
            Ok(bytes) => bytes,
            Err(err) => {
                log::error!("could not encode edit payload: {err}");
                self.notify(format!("Error processing image: {err}"));
                return;
            }
        };

        let request = EditRequest {
            prompt,
            mime_type: PNG_MIME.to_owned(),
            image_bytes,
        };
        let receiver = self.editor.begin_edit(&self.preferences.api_key, request);
        self.pending_edit = Some(PendingEdit::new(selection, receiver));
        self.busy_message = Some("Sending to AI...".to_owned());
        self.ai_modal_open = false;
    }

    fn poll_remote_edit(&mut self) {
        let Some(mut pending) = self.pending_edit.take() else {
            return;
        };
        let Some(outcome) = pending.poll() else {
            self.pending_edit = Some(pending);
            return;
        };
        self.busy_message = None;
        match outcome {
            Ok(image) => self.apply_remote_outcome(pending.target(), image),
            Err(err) => {
                log::error!("remote edit failed: {err}");
                self.notify(format!("AI Error: {err}"));
            }
        }
    }

    fn apply_remote_outcome(&mut self, target: Selection, image: RgbaImage) {
        let source = PixelSource::new(image);
        match target {
            Selection::Base => {
                self.commit_edit("AI Edit Base Image", |doc| {
                    doc.apply_remote_base_edit(source)
                });
                self.notify("AI edit successful! ✨");
            }
            Selection::Layer(id) => {
                if self.history.current().layer(id).is_none() {
                    log::warn!("discarding remote edit for removed layer {id}");
                    return;
                }
                let feather = self.preferences.ai_feather_for_width(source.width());
                self.commit_edit("AI Edit Layer", move |doc| {
                    doc.apply_remote_layer_edit(id, source, feather)
                });
                self.notify("AI edit successful! ✨");
            }
        }
    }

    // ---- modal state ----

    pub fn open_upload_modal(&mut self) {
        self.upload_modal_open = true;
    }

    pub fn close_upload_modal(&mut self) {
        self.upload_modal_open = false;
    }

    /// The upload modal is forced open while there is no base image, so it
    /// only offers a close button once one exists.
    pub fn upload_modal_dismissable(&self) -> bool {
        self.history.current().base.is_some()
    }

    pub fn open_settings(&mut self) {
        self.settings_draft = self.preferences.clone();
        self.settings_modal_open = true;
    }

    pub fn close_settings(&mut self) {
        self.settings_modal_open = false;
    }

    pub fn settings_draft_mut(&mut self) -> &mut Preferences {
        &mut self.settings_draft
    }

    pub fn save_settings(&mut self) {
        self.preferences = self.settings_draft.clone();
        self.adjustments_open = self.preferences.default_adjustments_open;
        self.masking_open = self.preferences.default_masking_open;
        self.settings_modal_open = false;
        self.settings_saved = true;
        self.notify("Settings saved!");
    }

    pub fn close_ai_modal(&mut self) {
        self.ai_modal_open = false;
    }

    pub fn ai_prompt(&self) -> &str {
        &self.ai_prompt
    }

    pub fn ai_prompt_mut(&mut self) -> &mut String {
        &mut self.ai_prompt
    }

    /// True once, on the frame the prompt modal opened.
    pub fn take_ai_prompt_focus(&mut self) -> bool {
        std::mem::take(&mut self.ai_prompt_wants_focus)
    }

    // ---- sidebar section state ----

    pub fn active_adjustment(&self) -> AdjustmentKind {
        self.active_adjustment
    }

    pub fn set_active_adjustment(&mut self, kind: AdjustmentKind) {
        self.active_adjustment = kind;
    }

    pub fn adjustments_open(&self) -> bool {
        self.adjustments_open
    }

    pub fn set_adjustments_open(&mut self, open: bool) {
        self.adjustments_open = open;
    }

    pub fn masking_open(&self) -> bool {
        self.masking_open
    }

    pub fn set_masking_open(&mut self, open: bool) {
        self.masking_open = open;
    }

    // ---- per-frame plumbing ----

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if self.is_busy() || ctx.wants_keyboard_input() {
            return;
        }

        let (modifiers, z, d, e, delete, space_down, space_up) = ctx.input(|i| {
            (
                i.modifiers,
                i.key_pressed(egui::Key::Z),
                i.key_pressed(egui::Key::D),
                i.key_pressed(egui::Key::E),
                i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace),
                i.key_pressed(egui::Key::Space),
                i.key_released(egui::Key::Space),
            )
        });

        if modifiers.command && z {
            if modifiers.shift {
                self.redo();
            } else {
                self.undo();
            }
        }
        if modifiers.command && d {
            self.duplicate(self.history.current().selection);
        }
        if modifiers.command && e {
            self.request_ai_edit();
        }
        if delete && !modifiers.command {
            self.delete_selected();
        }
        // Hold Space to crop: arm on press, apply (or discard) on release.
        if space_down && !self.interaction.crop_mode() {
            self.toggle_crop();
        }
        if space_up && self.interaction.crop_mode() {
            self.toggle_crop();
        }
    }

    fn show_notice(&mut self, ctx: &egui::Context) {
        let Some(notice) = &self.notice else { return };
        let remaining = notice.expires_at - current_time_secs();
        if remaining <= 0.0 {
            self.notice = None;
            return;
        }
        egui::Area::new(egui::Id::new("notice_toast"))
            .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-16.0, -16.0))
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.label(&notice.text);
                });
            });
        ctx.request_repaint_after(Duration::from_secs_f64(remaining.max(0.05)));
    }

    fn show_busy_overlay(&self, ctx: &egui::Context) {
        let Some(message) = &self.busy_message else { return };
        let screen = ctx.screen_rect();
        egui::Area::new(egui::Id::new("busy_overlay"))
            .order(egui::Order::Foreground)
            .fixed_pos(screen.min)
            .show(ctx, |ui| {
                // Swallow pointer input while the edit is in flight.
                let response = ui.allocate_response(screen.size(), egui::Sense::click_and_drag());
                ui.painter()
                    .rect_filled(response.rect, 0.0, egui::Color32::from_black_alpha(160));
            });
        egui::Area::new(egui::Id::new("busy_spinner"))
            .order(egui::Order::Foreground)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add(egui::Spinner::new().size(40.0));
                    ui.colored_label(egui::Color32::WHITE, message);
                });
            });
    }
}

impl eframe::App for ComposeApp {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        self.preferences.store(storage);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        self.composite_cache.begin_frame();
        self.thumbnail_cache.begin_frame();

        for event in self.intake.poll() {
            self.apply_decode_event(ctx, event);
        }
        self.poll_remote_edit();
        if self.pending_edit.is_some() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        self.intake.absorb_dropped_files(ctx);
        self.intake.preview_files_being_dropped(ctx);

        // The document is unusable without a base image, so the upload modal
        // stays open until one lands.
        if self.history.current().base.is_none() {
            self.upload_modal_open = true;
        }

        self.handle_shortcuts(ctx);

        panels::toolbar(self, ctx);
        panels::layers_panel(self, ctx);
        panels::central_panel(self, ctx);

        if self.upload_modal_open {
            panels::upload_modal(self, ctx);
        }
        if self.ai_modal_open {
            panels::ai_prompt_modal(self, ctx);
        }
        if self.settings_modal_open {
            panels::settings_modal(self, ctx);
        }

        if self.settings_saved {
            if let Some(storage) = frame.storage_mut() {
                self.preferences.store(storage);
            }
            self.settings_saved = false;
        }

        self.show_busy_overlay(ctx);
        self.show_notice(ctx);
    }
}

/// `photo.jpg` exports as `photo.png`, matching the stem-plus-png naming of
/// the composite export.
fn export_file_name(name: &str) -> String {
    let stem = name
        .split('.')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("image");
    format!("{stem}.png")
}
