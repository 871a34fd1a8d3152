use eframe::egui;
use crate::app::app_core::TestbedApp;
use crate::utils::{format_force, format_timestamp};

// 表格只显示最近的行，完整数据走 CSV 导出
pub const TABLE_ROWS: usize = 200;

pub fn render_data_panel(app: &mut TestbedApp, ctx: &egui::Context) {
    egui::CentralPanel::default().show(ctx, |ui| {
        let force = app.state.live.force;
        ui.horizontal(|ui| {
            ui.heading("Live Force");
            ui.separator();
            for (label, value) in [("Fx", force.fx), ("Fy", force.fy), ("Fz", force.fz)] {
                ui.label(egui::RichText::new(format!("{}: {}", label, format_force(value))).size(18.0));
                ui.add_space(10.0);
            }
        });
        ui.add_space(5.0);

        app.state.live.fz_plot.ui(ui);
        ui.label(format!("{} points", app.state.live.fz_plot.len()));

        ui.separator();
        ui.heading("Results");
        render_results_table(app, ui);
    });
}

fn render_results_table(app: &TestbedApp, ui: &mut egui::Ui) {
    let results = &app.state.live.results;
    if results.is_empty() {
        ui.colored_label(egui::Color32::GRAY, "No results stored yet");
        return;
    }

    egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
        egui::Grid::new("results_table")
            .num_columns(5)
            .striped(true)
            .spacing([16.0, 4.0])
            .show(ui, |ui| {
                for header in ["ID", "Fx", "Fy", "Fz", "Timestamp"] {
                    ui.strong(header);
                }
                ui.end_row();

                // 最新的在最上面
                for reading in results.iter().rev() {
                    ui.label(reading.id.to_string());
                    ui.label(format!("{:.3}", reading.fx));
                    ui.label(format!("{:.3}", reading.fy));
                    ui.label(format!("{:.3}", reading.fz));
                    ui.label(format_timestamp(&reading.timestamp));
                    ui.end_row();
                }
            });
    });
}
