use eframe::egui;
use crate::app::app_core::TestbedApp;
use crate::types::Axis;
use crate::utils::format_force;

pub fn render_control_panel(app: &mut TestbedApp, ctx: &egui::Context) {
    egui::SidePanel::left("control_panel")
        .resizable(false)
        .default_width(320.0)
        .show(ctx, |ui| {
            ui.heading("Force Tests");
            ui.add_space(5.0);
            render_force_tests(app, ui);

            ui.separator();
            ui.heading("Automation");
            ui.add_space(5.0);
            render_automation(app, ui);

            ui.separator();
            ui.heading("Axis Control");
            ui.add_space(5.0);
            render_axis_control(app, ui);
        });
}

fn render_force_tests(app: &mut TestbedApp, ui: &mut egui::Ui) {
    egui::Grid::new("force_tests").num_columns(3).spacing([8.0, 6.0]).show(ui, |ui| {
        ui.label("Push force:");
        ui.add(egui::DragValue::new(&mut app.state.force_test.push_force).speed(0.5).suffix(" N"));
        if ui.button("Apply Push").clicked() {
            app.request_push();
        }
        ui.end_row();

        ui.label("Push result:");
        ui.label(result_text(app.state.force_test.push_result));
        ui.end_row();

        ui.label("Pull force:");
        ui.add(egui::DragValue::new(&mut app.state.force_test.pull_force).speed(0.5).suffix(" N"));
        if ui.button("Apply Pull").clicked() {
            app.request_pull();
        }
        ui.end_row();

        ui.label("Pull result:");
        ui.label(result_text(app.state.force_test.pull_result));
        ui.end_row();
    });
}

fn render_automation(app: &mut TestbedApp, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        ui.label("Steps:");
        ui.add(egui::DragValue::new(&mut app.state.automation.steps).range(0..=1000));
        let running = app.state.automation.running;
        if ui.add_enabled(!running, egui::Button::new("Run Automation")).clicked() {
            app.request_automation();
        }
    });

    let automation = &app.state.automation;
    ui.add(
        egui::ProgressBar::new(automation.progress())
            .desired_width(250.0)
            .text(format!("{} / {}", automation.done, automation.total)),
    );

    if let Some(last) = automation.results.last() {
        ui.label(format!(
            "Last step: push {}, pull {}",
            format_force(last.push_result),
            format_force(last.pull_result)
        ));
    }
}

fn render_axis_control(app: &mut TestbedApp, ui: &mut egui::Ui) {
    let busy = app.state.motion.busy;
    let mut requested = None;

    egui::Grid::new("axis_control").num_columns(3).spacing([8.0, 6.0]).show(ui, |ui| {
        for axis in Axis::ALL {
            let travel = app.state.motion.travel[axis.index()].travel_mm;
            ui.label(format!("{} (0-{} mm):", axis, travel));
            ui.add(
                egui::DragValue::new(&mut app.state.motion.targets[axis.index()])
                    .speed(0.1)
                    .suffix(" mm"),
            );
            if ui.add_enabled(!busy, egui::Button::new(format!("Move {}", axis))).clicked() {
                requested = Some(axis);
            }
            ui.end_row();
        }
    });

    if let Some(axis) = requested {
        app.request_move(axis);
    }

    ui.add_space(5.0);
    if ui.add_enabled(!busy, egui::Button::new("Reset Alignment")).clicked() {
        app.request_reset_alignment();
    }

    if !app.state.motion.status.is_empty() {
        ui.colored_label(egui::Color32::from_rgb(0, 100, 200), &app.state.motion.status);
    }
}

fn result_text(result: Option<f64>) -> String {
    result.map(format_force).unwrap_or_else(|| "-".to_string())
}
