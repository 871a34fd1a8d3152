use std::time::Duration;
use eframe::{egui, Frame};
use log::info;

use crate::config::AppConfig;
use super::handlers::ControlHandle;
use super::state::AppState;

pub struct TestbedApp {
    // 统一的状态管理
    pub state: AppState,

    // 控制线程句柄
    pub control: ControlHandle,
}

impl TestbedApp {
    pub fn new(control: ControlHandle, config: &AppConfig) -> Self {
        info!("Control panel started ({})", config.window.title);
        Self {
            state: AppState::new(config),
            control,
        }
    }
}

impl eframe::App for TestbedApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        // 设置明亮模式主题
        ctx.set_visuals(egui::Visuals::light());

        // 处理控制线程的回报
        self.handle_control_events();

        // 定时刷新实时数据
        self.schedule_refresh();

        // 渲染UI组件
        crate::app::ui::render_status_bar(self, ctx);
        crate::app::ui::render_control_panel(self, ctx);
        crate::app::ui::render_data_panel(self, ctx);

        ctx.request_repaint_after(Duration::from_millis(150));
    }
}
