use std::path::PathBuf;
use std::time::Instant;

use log::{info, warn};

use super::app_core::TestbedApp;
use super::handlers::{ControlEvent, ControlTask};
use super::state::check_travel;
use super::ui::data_panel::TABLE_ROWS;
use crate::types::Axis;

impl TestbedApp {
    pub fn handle_control_events(&mut self) {
        while let Some(event) = self.control.try_recv() {
            match event {
                ControlEvent::PushResult(result) => self.state.force_test.push_result = Some(result),
                ControlEvent::PullResult(result) => self.state.force_test.pull_result = Some(result),
                ControlEvent::AutomationProgress { done, total, step } => {
                    let automation = &mut self.state.automation;
                    automation.done = done;
                    automation.total = total;
                    automation.results.push(step);
                }
                ControlEvent::AutomationFinished { total } => {
                    self.state.automation.running = false;
                    info!("Automation finished: {} steps", total);
                }
                ControlEvent::Moved(outcome) => {
                    self.state.motion.busy = false;
                    self.state.motion.status = format!(
                        "Moved {} by {} mm ({} steps)",
                        outcome.axis, outcome.position_mm, outcome.steps
                    );
                }
                ControlEvent::AlignmentReset => {
                    self.state.motion.busy = false;
                    self.state.motion.targets = [0.0; 3];
                    self.state.motion.status = "Alignment reset".to_string();
                }
                ControlEvent::CommandFailed(message) => {
                    warn!("Panel command failed: {}", message);
                    self.state.motion.busy = false;
                    self.state.automation.running = false;
                    self.state.record_error(message);
                }
                ControlEvent::Snapshot { force, results, count } => {
                    self.state.result_count = count;
                    self.state.apply_snapshot(force, results);
                }
                ControlEvent::Exported(result) => {
                    info!("CSV export finished: {} rows", result.rows);
                    self.state.export_status = result.message;
                }
            }
        }
    }

    pub fn schedule_refresh(&mut self) {
        let now = Instant::now();
        if !self.state.refresh_due(now) {
            return;
        }
        self.state.live.last_refresh = Some(now);
        // 队列忙时跳过本轮，下个周期再试
        if self.control.submit(ControlTask::Refresh { limit: TABLE_ROWS }).is_ok() {
            self.state.live.refresh_pending = true;
        }
    }

    fn submit(&mut self, task: ControlTask) -> bool {
        match self.control.submit(task) {
            Ok(()) => true,
            Err(message) => {
                self.state.record_error(message);
                false
            }
        }
    }

    pub fn request_push(&mut self) {
        let force = self.state.force_test.push_force;
        self.submit(ControlTask::Push { force });
    }

    pub fn request_pull(&mut self) {
        let force = self.state.force_test.pull_force;
        self.submit(ControlTask::Pull { force });
    }

    pub fn request_automation(&mut self) {
        let automation = &self.state.automation;
        if automation.running {
            return;
        }
        let task = ControlTask::Automate {
            steps: automation.steps,
            push_force: self.state.force_test.push_force,
            pull_force: self.state.force_test.pull_force,
        };
        let steps = automation.steps;
        if self.submit(task) {
            let automation = &mut self.state.automation;
            automation.running = steps > 0;
            automation.done = 0;
            automation.total = steps;
            automation.results.clear();
        }
    }

    pub fn request_move(&mut self, axis: Axis) {
        let motion = &self.state.motion;
        let position = motion.targets[axis.index()];
        match check_travel(axis, &motion.travel[axis.index()], position) {
            Ok(position_mm) => {
                if self.submit(ControlTask::Move { axis, position_mm }) {
                    self.state.motion.busy = true;
                    self.state.motion.status = format!("Moving {}...", axis);
                }
            }
            Err(message) => self.state.record_error(message),
        }
    }

    pub fn request_reset_alignment(&mut self) {
        if self.submit(ControlTask::ResetAlignment) {
            self.state.motion.busy = true;
            self.state.motion.status = "Resetting alignment...".to_string();
        }
    }

    pub fn request_export(&mut self) {
        let file_name = crate::utils::export_file_name(&chrono::Local::now());
        let path = PathBuf::from(&self.state.export_dir).join(file_name);
        if self.submit(ControlTask::ExportCsv { path }) {
            self.state.export_status = "Exporting...".to_string();
        }
    }
}
