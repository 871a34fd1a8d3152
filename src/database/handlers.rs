use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use crossbeam_channel::Receiver;
use log::{debug, error, info, warn};

use crate::types::{DatabaseTask, ExportResult};
use super::manager::DatabaseManager;

/// 数据库线程主循环：唯一持有连接，按 FIFO 顺序处理任务
pub fn run_database_handler(
    db_manager: DatabaseManager,
    task_receiver: Receiver<DatabaseTask>,
    shutdown_signal: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Database handler thread started");

    while !shutdown_signal.load(Ordering::Relaxed) {
        match task_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(task) => handle_task(&db_manager, task),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                // 超时，继续循环检查关闭信号
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                info!("Database handler: Task channel disconnected, exiting");
                break;
            }
        }
    }

    // 关闭前把已排队的写入落盘
    let mut drained = 0;
    while let Ok(task) = task_receiver.try_recv() {
        if matches!(task, DatabaseTask::Append { .. }) {
            drained += 1;
        }
        handle_task(&db_manager, task);
    }
    if drained > 0 {
        info!("Database handler: flushed {} queued readings before exit", drained);
    }

    info!("Database handler thread exiting gracefully");
    Ok(())
}

fn handle_task(db_manager: &DatabaseManager, task: DatabaseTask) {
    match task {
        DatabaseTask::Append { sample } => {
            // 写入失败只记录日志，不中断采集
            match db_manager.append(&sample, Utc::now()) {
                Ok(id) => debug!("Force data stored successfully (id {})", id),
                Err(e) => error!("Error storing result: {}", e),
            }
        }
        DatabaseTask::ListAll { response_sender } => {
            let readings = db_manager.list_all().unwrap_or_else(|e| {
                error!("Error fetching results: {}", e);
                Vec::new()
            });
            debug!("Retrieved {} results", readings.len());
            if let Err(e) = response_sender.try_send(readings) {
                warn!("Database handler: Failed to send results: {}", e);
            }
        }
        DatabaseTask::ListRecent { limit, response_sender } => {
            let readings = db_manager.list_recent(limit).unwrap_or_else(|e| {
                error!("Error fetching recent results: {}", e);
                Vec::new()
            });
            if let Err(e) = response_sender.try_send(readings) {
                warn!("Database handler: Failed to send recent results: {}", e);
            }
        }
        DatabaseTask::Count { response_sender } => {
            let count = db_manager.count().unwrap_or_else(|e| {
                error!("Error counting results: {}", e);
                0
            });
            if let Err(e) = response_sender.try_send(count) {
                warn!("Database handler: Failed to send count: {}", e);
            }
        }
        DatabaseTask::ExportCsv { path, response_sender } => {
            let result = match db_manager.export_csv(&path) {
                Ok(rows) => ExportResult::success(rows, &path.display().to_string()),
                Err(e) => {
                    error!("CSV export failed: {}", e);
                    ExportResult::error(format!("Export failed: {}", e))
                }
            };
            if let Err(e) = response_sender.try_send(result) {
                warn!("Database handler: Failed to send export result: {}", e);
            }
        }
    }
}
