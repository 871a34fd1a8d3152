use std::time::{Duration, Instant};

use crate::config::{AppConfig, AxisConfig};
use crate::plotter::ForcePlot;
use crate::types::{AutomationStep, Axis, ForceSample, Reading};

/// 应用状态管理模块
/// 面板只保存显示用的数据，所有硬件操作都交给控制线程

/// 推拉测试
#[derive(Debug, Clone)]
pub struct ForceTestState {
    pub push_force: f64,
    pub pull_force: f64,
    pub push_result: Option<f64>,
    pub pull_result: Option<f64>,
}

impl Default for ForceTestState {
    fn default() -> Self {
        Self {
            push_force: 10.0,
            pull_force: 50.0,
            push_result: None,
            pull_result: None,
        }
    }
}

/// 自动化流程
#[derive(Debug, Clone, Default)]
pub struct AutomationState {
    pub steps: usize,
    pub running: bool,
    pub done: usize,
    pub total: usize,
    pub results: Vec<AutomationStep>,
}

impl AutomationState {
    pub fn progress(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.done as f32 / self.total as f32
        }
    }
}

/// 轴位置输入
#[derive(Debug, Clone)]
pub struct MotionState {
    pub targets: [f64; 3],
    pub travel: [AxisConfig; 3],
    pub busy: bool,
    pub status: String,
}

/// 实时数据
#[derive(Debug)]
pub struct LiveState {
    pub force: ForceSample,
    pub results: Vec<Reading>,
    pub fz_plot: ForcePlot,
    pub last_refresh: Option<Instant>,
    pub refresh_pending: bool,
}

/// 统一的应用状态管理
#[derive(Debug)]
pub struct AppState {
    pub force_test: ForceTestState,
    pub automation: AutomationState,
    pub motion: MotionState,
    pub live: LiveState,
    pub backend_label: String,
    pub result_count: usize,
    pub last_error: Option<String>,
    pub export_status: String,
    pub export_dir: String,
    pub refresh_interval: Duration,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        let refresh_interval = Duration::from_millis(config.window.refresh_interval_ms.max(100));
        let backend_label = format!(
            "Sensor: {:?} | GPIO: {:?}",
            config.serial.backend, config.motion.backend
        );

        Self {
            force_test: ForceTestState::default(),
            automation: AutomationState::default(),
            motion: MotionState {
                targets: [0.0; 3],
                travel: Axis::ALL.map(|axis| *config.motion.axes.get(axis)),
                busy: false,
                status: String::new(),
            },
            live: LiveState {
                force: ForceSample::zero(),
                results: Vec::new(),
                fz_plot: ForcePlot::new(config.window.plot_history, refresh_interval.as_secs_f64()),
                last_refresh: None,
                refresh_pending: false,
            },
            backend_label,
            result_count: 0,
            last_error: None,
            export_status: String::new(),
            export_dir: config.database.export_dir.clone(),
            refresh_interval,
        }
    }

    /// 距离上次刷新超过刷新周期且没有未完成的刷新时返回 true
    pub fn refresh_due(&self, now: Instant) -> bool {
        !self.live.refresh_pending
            && self
                .live
                .last_refresh
                .map_or(true, |last| now.duration_since(last) >= self.refresh_interval)
    }

    pub fn apply_snapshot(&mut self, force: ForceSample, results: Vec<Reading>) {
        self.live.force = force;
        self.live.results = results;
        self.live.fz_plot.push(force.fz);
        self.live.refresh_pending = false;
    }

    pub fn record_error(&mut self, message: String) {
        self.last_error = Some(message);
    }
}

/// 目标位置是否在轴行程内
pub fn check_travel(axis: Axis, travel: &AxisConfig, position_mm: f64) -> Result<f64, String> {
    if position_mm.is_finite() && (0.0..=travel.travel_mm).contains(&position_mm) {
        Ok(position_mm)
    } else {
        Err(format!(
            "{} position must be between 0 and {} mm",
            axis, travel.travel_mm
        ))
    }
}
