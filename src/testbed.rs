use std::sync::Arc;

use log::info;

use crate::database::ResultStore;
use crate::error::MotionError;
use crate::motion::AxisDriver;
use crate::sensor::SensorHandle;
use crate::types::{AutomationStep, ForceSample, MoveOutcome, Reading};

/// 试验台对外操作的统一入口，HTTP 与桌面面板共用
///
/// 持有传感器、运动驱动和结果存储的句柄，本身无状态，可在线程间共享。
#[derive(Clone)]
pub struct Testbed {
    sensor: SensorHandle,
    motion: Arc<AxisDriver>,
    store: ResultStore,
}

impl Testbed {
    pub fn new(sensor: SensorHandle, motion: Arc<AxisDriver>, store: ResultStore) -> Self {
        Self { sensor, motion, store }
    }

    pub fn status(&self) -> &'static str {
        "API running"
    }

    pub fn current_force(&self) -> ForceSample {
        self.sensor.read()
    }

    /// 推力测试：结果为当前 Fz。目标力只记录，不参与控制
    pub fn apply_push(&self, force: f64) -> f64 {
        info!("Push requested with force {} (not used for control)", force);
        self.current_force().fz
    }

    /// 拉力测试：结果为当前 Fz 取反
    pub fn apply_pull(&self, force: f64) -> f64 {
        info!("Pull requested with force {} (not used for control)", force);
        -self.current_force().fz
    }

    /// 每一步重新采样一次，推、拉结果取自同一次采样；不下发运动
    pub fn run_automation(&self, steps: usize, push_force: f64, pull_force: f64) -> Vec<AutomationStep> {
        info!(
            "Running automation: {} steps (push {}, pull {})",
            steps, push_force, pull_force
        );
        (0..steps).map(|_| self.automation_step()).collect()
    }

    /// 自动化流程的单步，桌面面板逐步调用以显示进度
    pub fn automation_step(&self) -> AutomationStep {
        AutomationStep::from_fz(self.current_force().fz)
    }

    pub fn move_axis(&self, axis: &str, position_mm: f64) -> Result<MoveOutcome, MotionError> {
        self.motion.move_mm(axis, position_mm)
    }

    pub fn list_results(&self) -> Vec<Reading> {
        self.store.list_all()
    }

    pub fn recent_results(&self, limit: usize) -> Vec<Reading> {
        self.store.list_recent(limit)
    }

    pub fn result_count(&self) -> usize {
        self.store.count()
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }
}
