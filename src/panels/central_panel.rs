use crate::ComposeApp;
use crate::document::Selection;
use crate::geometry;

/// The canvas: draws the composite preview aspect-fit in the remaining
/// space and routes pointer gestures into the interaction controller in
/// canvas coordinates.
pub fn central_panel(app: &mut ComposeApp, ctx: &egui::Context) {
    egui::CentralPanel::default().show(ctx, |ui| {
        let Some(canvas_size) = app.document().canvas_size() else {
            ui.centered_and_justified(|ui| {
                ui.label("Drop an image anywhere to start a composition");
            });
            return;
        };
        let Some(texture) = app.composite_texture(ctx) else {
            return;
        };

        let available = ui.available_rect_before_wrap();
        let display = geometry::fit_display_rect(canvas_size, available);
        // Drag-only sense: a press starts a gesture immediately, and a
        // zero-movement click resolves through the same path without
        // committing anything.
        let response = ui.allocate_rect(display, egui::Sense::drag());
        ui.painter().image(
            texture,
            display,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );

        if app.is_busy() {
            return;
        }

        if let Some(pos) = response.interact_pointer_pos() {
            let canvas_pos = geometry::canvas_from_screen(pos, display, canvas_size);
            if response.drag_started() {
                app.pointer_pressed(canvas_pos);
            } else if response.dragged() {
                app.pointer_moved(canvas_pos);
            }
        }
        if response.drag_stopped() {
            app.pointer_released();
        }

        if let Some(hover) = response.hover_pos() {
            ctx.set_cursor_icon(cursor_for(app, hover, display, canvas_size));
        }
    });
}

fn cursor_for(
    app: &ComposeApp,
    hover: egui::Pos2,
    display: egui::Rect,
    canvas_size: (u32, u32),
) -> egui::CursorIcon {
    let canvas_pos = geometry::canvas_from_screen(hover, display, canvas_size);
    if app.interaction().crop_mode() {
        return egui::CursorIcon::Crosshair;
    }
    if let Some(corner) = app
        .document()
        .selected_layer()
        .and_then(|layer| geometry::hit_handle(layer, canvas_pos))
    {
        return corner.cursor_icon();
    }
    match geometry::hit_layer_body(app.document(), canvas_pos) {
        Selection::Layer(_) => egui::CursorIcon::Move,
        Selection::Base => egui::CursorIcon::Default,
    }
}
