// src/ui.rs

use lumen2d::rendering_lib::renderer::{FrameStats, RenderMode};

pub struct UiState {
    pub mode: RenderMode,
    pub stats: FrameStats,
    pub visible_points: usize,
    pub lights: usize,
}

/// Returns the render mode picked in the panel.
pub fn build_ui(ctx: &egui::Context, state: &UiState) -> RenderMode {
    let mut mode = state.mode;
    egui::Window::new("Lighting")
        .anchor(egui::Align2::LEFT_TOP, egui::vec2(10.0, 10.0))
        .resizable(false)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut mode, RenderMode::Default, "Unlit");
                ui.selectable_value(&mut mode, RenderMode::Shadow, "Shadows");
            });
            ui.separator();

            let stats = &state.stats;
            ui.label(format!("Draw calls: {}", stats.draw_calls));
            ui.label(format!(
                "Vertices: {} geometry / {} texture / {} light",
                stats.geometry_vertices, stats.texture_vertices, stats.light_vertices
            ));
            ui.label(format!("Lights drawn: {} of {}", stats.lights_drawn, state.lights));
            ui.label(format!("Visibility points: {}", state.visible_points));
            ui.separator();

            ui.label("Mouse: move the viewer light");
            ui.label("W/A/S/D: pan, wheel: zoom");
            ui.label("Tab: toggle shadows");
        });
    mode
}
