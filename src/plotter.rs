use egui::Color32;
use egui_plot::{Line, Plot, PlotPoints};
use std::collections::VecDeque;

/// 格式化数字为固定宽度的 y 轴标签
fn format_fixed_width_y_label(value: f64) -> String {
    let abs_value = value.abs();
    if abs_value >= 1000.0 {
        format!("{:-6.1e}", value)
    } else if abs_value >= 100.0 {
        format!("{:-6.0}", value)
    } else if abs_value >= 10.0 {
        format!("{:-6.1}", value)
    } else {
        format!("{:-6.2}", value)
    }
}

/// Fz 历史曲线，保留最近 `max_samples` 个刷新点
#[derive(Debug)]
pub struct ForcePlot {
    buffer_fz: VecDeque<f64>,
    max_samples: usize,
    refresh_seconds: f64,
}

impl ForcePlot {
    pub fn new(max_samples: usize, refresh_seconds: f64) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            buffer_fz: VecDeque::with_capacity(max_samples),
            max_samples,
            refresh_seconds,
        }
    }

    pub fn push(&mut self, fz: f64) {
        self.buffer_fz.push_back(fz);
        // 超过容量时丢弃最旧的点
        while self.buffer_fz.len() > self.max_samples {
            self.buffer_fz.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.buffer_fz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer_fz.is_empty()
    }

    fn y_bounds(&self) -> (f64, f64) {
        let (y_min, y_max) = self.buffer_fz.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(min, max), &val| (min.min(val), max.max(val)),
        );
        let range = (y_max - y_min).max(0.1);
        (y_min - range * 0.05, y_max + range * 0.05)
    }

    pub fn ui(&self, ui: &mut egui::Ui) {
        ui.heading("Fz History");
        if self.is_empty() {
            ui.colored_label(Color32::GRAY, "Waiting for data...");
            return;
        }

        let (y_min, y_max) = self.y_bounds();
        let window = self.max_samples as f64 * self.refresh_seconds;

        Plot::new("fz_history")
            .height(180.0)
            .x_axis_formatter(|v, _| format!("{:.0}s", v.value))
            .y_axis_formatter(|v, _| format_fixed_width_y_label(v.value))
            .allow_drag(false)
            .allow_zoom(false)
            .show(ui, |plot_ui| {
                // 最旧的点在左侧
                let points: Vec<[f64; 2]> = self
                    .buffer_fz
                    .iter()
                    .enumerate()
                    .map(|(i, &fz)| [i as f64 * self.refresh_seconds, fz])
                    .collect();

                plot_ui.set_plot_bounds(egui_plot::PlotBounds::from_min_max(
                    [0.0, y_min],
                    [window, y_max],
                ));

                plot_ui.line(
                    Line::new("Fz", PlotPoints::from(points))
                        .color(Color32::from_rgb(0, 120, 215))
                        .width(1.5),
                );
            });
    }
}
