use eframe::egui;
use crate::app::app_core::TestbedApp;

pub fn render_status_bar(app: &mut TestbedApp, ctx: &egui::Context) {
    egui::TopBottomPanel::bottom("status_bar")
        .min_height(25.0)
        .show(ctx, |ui| {
            ui.add_space(3.0);
            ui.horizontal(|ui| {
                ui.label(&app.state.backend_label);
                ui.separator();

                ui.label(format!("Readings: {}", app.state.result_count));
                ui.separator();

                // 最近一次错误，点击清除
                if let Some(error) = app.state.last_error.clone() {
                    ui.colored_label(egui::Color32::from_rgb(200, 0, 0), &error);
                    if ui.small_button("✖").clicked() {
                        app.state.last_error = None;
                    }
                    ui.separator();
                }

                // 右侧：导出
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("📤 Export CSV").clicked() {
                        app.request_export();
                    }
                    if !app.state.export_status.is_empty() {
                        ui.colored_label(egui::Color32::from_rgb(0, 150, 100), &app.state.export_status);
                    }
                });
            });
            ui.add_space(3.0);
        });
}
