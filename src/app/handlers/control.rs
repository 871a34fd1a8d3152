use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{info, warn};

use crate::testbed::Testbed;
use crate::types::{AutomationStep, Axis, ExportResult, ForceSample, MoveOutcome, Reading};

/// 面板下发给控制线程的命令
#[derive(Debug, Clone)]
pub enum ControlTask {
    Push { force: f64 },
    Pull { force: f64 },
    Automate { steps: usize, push_force: f64, pull_force: f64 },
    Move { axis: Axis, position_mm: f64 },
    ResetAlignment,
    Refresh { limit: usize },
    ExportCsv { path: PathBuf },
}

/// 控制线程回报给面板的结果
#[derive(Debug, Clone)]
pub enum ControlEvent {
    PushResult(f64),
    PullResult(f64),
    AutomationProgress { done: usize, total: usize, step: AutomationStep },
    AutomationFinished { total: usize },
    Moved(MoveOutcome),
    AlignmentReset,
    CommandFailed(String),
    Snapshot { force: ForceSample, results: Vec<Reading>, count: usize },
    Exported(ExportResult),
}

/// 面板持有的控制线程句柄
pub struct ControlHandle {
    task_sender: Sender<ControlTask>,
    event_receiver: Receiver<ControlEvent>,
}

impl ControlHandle {
    pub fn new(task_sender: Sender<ControlTask>, event_receiver: Receiver<ControlEvent>) -> Self {
        Self { task_sender, event_receiver }
    }

    /// 非阻塞提交；队列满时返回错误描述供状态栏显示
    pub fn submit(&self, task: ControlTask) -> Result<(), String> {
        match self.task_sender.try_send(task) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err("Control queue is busy, try again".to_string()),
            Err(TrySendError::Disconnected(_)) => Err("Control worker is not running".to_string()),
        }
    }

    pub fn try_recv(&self) -> Option<ControlEvent> {
        self.event_receiver.try_recv().ok()
    }
}

pub fn spawn_control_worker(
    testbed: Testbed,
    capacity: usize,
    shutdown_signal: Arc<AtomicBool>,
) -> std::io::Result<(ControlHandle, JoinHandle<()>)> {
    let (task_sender, task_receiver) = bounded(capacity);
    // 自动化进度可能连续产生很多事件，事件通道放宽一些
    let (event_sender, event_receiver) = bounded(capacity * 8);

    let handle = thread::Builder::new()
        .name("control-worker".into())
        .spawn(move || run_control_worker(testbed, task_receiver, event_sender, shutdown_signal))?;

    Ok((ControlHandle::new(task_sender, event_receiver), handle))
}

pub fn run_control_worker(
    testbed: Testbed,
    task_receiver: Receiver<ControlTask>,
    event_sender: Sender<ControlEvent>,
    shutdown_signal: Arc<AtomicBool>,
) {
    info!("Control worker thread started");

    while !shutdown_signal.load(Ordering::Relaxed) {
        match task_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(task) => execute(&testbed, task, &event_sender, &shutdown_signal),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                info!("Control worker: task channel disconnected, exiting");
                break;
            }
        }
    }

    info!("Control worker thread exiting gracefully");
}

fn execute(testbed: &Testbed, task: ControlTask, events: &Sender<ControlEvent>, shutdown_signal: &AtomicBool) {
    match task {
        ControlTask::Push { force } => emit(events, ControlEvent::PushResult(testbed.apply_push(force))),
        ControlTask::Pull { force } => emit(events, ControlEvent::PullResult(testbed.apply_pull(force))),
        ControlTask::Automate { steps, push_force, pull_force } => {
            info!(
                "Running automation from panel: {} steps (push {}, pull {})",
                steps, push_force, pull_force
            );
            for done in 1..=steps {
                if shutdown_signal.load(Ordering::Relaxed) {
                    return;
                }
                let step = testbed.automation_step();
                emit(events, ControlEvent::AutomationProgress { done, total: steps, step });
            }
            emit(events, ControlEvent::AutomationFinished { total: steps });
        }
        ControlTask::Move { axis, position_mm } => match testbed.move_axis(axis.name(), position_mm) {
            Ok(outcome) => emit(events, ControlEvent::Moved(outcome)),
            Err(e) => emit(events, ControlEvent::CommandFailed(e.to_string())),
        },
        ControlTask::ResetAlignment => {
            for axis in Axis::ALL {
                if let Err(e) = testbed.move_axis(axis.name(), 0.0) {
                    emit(events, ControlEvent::CommandFailed(e.to_string()));
                    return;
                }
            }
            emit(events, ControlEvent::AlignmentReset);
        }
        ControlTask::Refresh { limit } => {
            let force = testbed.current_force();
            let results = testbed.recent_results(limit);
            let count = testbed.result_count();
            emit(events, ControlEvent::Snapshot { force, results, count });
        }
        ControlTask::ExportCsv { path } => {
            emit(events, ControlEvent::Exported(testbed.store().export_csv(path)));
        }
    }
}

fn emit(events: &Sender<ControlEvent>, event: ControlEvent) {
    if let Err(e) = events.send_timeout(event, Duration::from_secs(1)) {
        warn!("Control worker: panel is not draining events: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use crate::testbed::tests::scripted_rig;

    fn wait_event(handle: &ControlHandle) -> ControlEvent {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Some(event) = handle.try_recv() {
                return event;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("no control event within 5s");
    }

    #[test]
    fn automation_reports_progress_per_step() {
        let rig = scripted_rig(&[49152, 32768]);
        let (handle, join) = spawn_control_worker(rig.testbed.clone(), 4, Arc::clone(&rig.shutdown)).unwrap();

        handle
            .submit(ControlTask::Automate { steps: 2, push_force: 10.0, pull_force: 50.0 })
            .unwrap();

        match wait_event(&handle) {
            ControlEvent::AutomationProgress { done: 1, total: 2, step } => {
                assert!((step.push_result - 20.0).abs() < 1e-9)
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(wait_event(&handle), ControlEvent::AutomationProgress { done: 2, .. }));
        assert!(matches!(wait_event(&handle), ControlEvent::AutomationFinished { total: 2 }));

        rig.stop();
        join.join().unwrap();
    }

    #[test]
    fn reset_alignment_emits_no_pulses() {
        let rig = scripted_rig(&[]);
        let (handle, join) = spawn_control_worker(rig.testbed.clone(), 4, Arc::clone(&rig.shutdown)).unwrap();

        handle.submit(ControlTask::ResetAlignment).unwrap();
        assert!(matches!(wait_event(&handle), ControlEvent::AlignmentReset));
        assert!(rig.probes.iter().all(|p| p.step.rising_edges() == 0));
        assert!(rig.probes.iter().all(|p| p.dir.is_high()));

        rig.stop();
        join.join().unwrap();
    }

    #[test]
    fn refresh_returns_force_and_results() {
        let rig = scripted_rig(&[16384]);
        for i in 0..3 {
            rig.testbed.store().append(i as f64, 2.0, 3.0);
        }
        let (handle, join) = spawn_control_worker(rig.testbed.clone(), 4, Arc::clone(&rig.shutdown)).unwrap();

        handle.submit(ControlTask::Refresh { limit: 2 }).unwrap();
        match wait_event(&handle) {
            ControlEvent::Snapshot { force, results, count } => {
                assert!((force.fz + 20.0).abs() < 1e-9);
                assert_eq!(results.len(), 2);
                assert_eq!(results[1].fx, 2.0);
                assert_eq!(count, 3);
            }
            other => panic!("unexpected event: {:?}", other),
        }

        rig.stop();
        join.join().unwrap();
    }
}
