use crate::ComposeApp;

pub fn toolbar(app: &mut ComposeApp, ctx: &egui::Context) {
    egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
        ui.add_enabled_ui(!app.is_busy(), |ui| {
            ui.horizontal(|ui| {
                ui.heading("Canvas");
                ui.separator();

                let modifier = modifier_name(ctx);
                let can_undo = app.history().can_undo();
                let can_redo = app.history().can_redo();

                if ui
                    .add_enabled(can_undo, egui::Button::new("Undo"))
                    .on_hover_text(format!("Undo ({modifier} + Z)"))
                    .clicked()
                {
                    app.undo();
                }
                if ui
                    .add_enabled(can_redo, egui::Button::new("Redo"))
                    .on_hover_text(format!("Redo ({modifier} + Shift + Z)"))
                    .clicked()
                {
                    app.redo();
                }

                ui.separator();

                let has_base = app.document().base.is_some();
                if ui
                    .add_enabled(has_base, egui::Button::new("+ New Layer"))
                    .on_hover_text("Add an image as a new layer")
                    .clicked()
                {
                    app.open_upload_modal();
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Settings").clicked() {
                        app.open_settings();
                    }
                    if ui
                        .add_enabled(has_base, egui::Button::new("Download Image"))
                        .on_hover_text("Export the composition as PNG")
                        .clicked()
                    {
                        app.export_composition();
                    }
                });
            });
        });
    });
}

/// The platform's primary shortcut modifier, for tooltips.
fn modifier_name(ctx: &egui::Context) -> &'static str {
    match ctx.os() {
        egui::os::OperatingSystem::Mac | egui::os::OperatingSystem::IOS => "⌘",
        _ => "Ctrl",
    }
}
