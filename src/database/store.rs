use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Sender};
use log::{error, warn};

use crate::error::StorageError;
use crate::types::{DatabaseTask, ExportResult, ForceSample, Reading};
use super::handlers::run_database_handler;
use super::manager::DatabaseManager;

const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// 结果存储句柄：写入是即发即忘，查询经由数据库线程同步返回
#[derive(Clone)]
pub struct ResultStore {
    db_task_sender: Sender<DatabaseTask>,
}

impl ResultStore {
    pub fn new(db_task_sender: Sender<DatabaseTask>) -> Self {
        Self { db_task_sender }
    }

    /// 启动数据库线程
    pub fn spawn(
        db_manager: DatabaseManager,
        capacity: usize,
        shutdown_signal: Arc<AtomicBool>,
    ) -> std::io::Result<(Self, JoinHandle<()>)> {
        let (db_task_sender, db_task_receiver) = bounded(capacity);
        let handle = thread::Builder::new()
            .name("database".into())
            .spawn(move || {
                if let Err(e) = run_database_handler(db_manager, db_task_receiver, shutdown_signal) {
                    error!("Database handler thread failed: {}", e);
                }
            })?;
        Ok((Self::new(db_task_sender), handle))
    }

    /// 追加一条读数；失败只记录，不向调用方传播
    pub fn append(&self, fx: f64, fy: f64, fz: f64) {
        let task = DatabaseTask::Append { sample: ForceSample::new(fx, fy, fz) };
        if let Err(e) = self.db_task_sender.try_send(task) {
            warn!("Failed to queue reading for storage: {}", e);
        }
    }

    pub fn append_sample(&self, sample: ForceSample) {
        self.append(sample.fx, sample.fy, sample.fz);
    }

    /// 按 id 升序返回全部读数；出错时返回空序列
    pub fn list_all(&self) -> Vec<Reading> {
        let (response_sender, response_receiver) = bounded(1);
        self.request(DatabaseTask::ListAll { response_sender })
            .and_then(|()| response_receiver.recv_timeout(QUERY_TIMEOUT).map_err(|_| StorageError::HandlerUnavailable))
            .unwrap_or_else(|e| {
                warn!("Listing results failed: {}", e);
                Vec::new()
            })
    }

    /// 面板只需要最近的若干条，避免每次刷新都搬运全部历史
    pub fn list_recent(&self, limit: usize) -> Vec<Reading> {
        let (response_sender, response_receiver) = bounded(1);
        self.request(DatabaseTask::ListRecent { limit, response_sender })
            .and_then(|()| response_receiver.recv_timeout(QUERY_TIMEOUT).map_err(|_| StorageError::HandlerUnavailable))
            .unwrap_or_else(|e| {
                warn!("Listing recent results failed: {}", e);
                Vec::new()
            })
    }

    pub fn count(&self) -> usize {
        let (response_sender, response_receiver) = bounded(1);
        self.request(DatabaseTask::Count { response_sender })
            .and_then(|()| response_receiver.recv_timeout(QUERY_TIMEOUT).map_err(|_| StorageError::HandlerUnavailable))
            .unwrap_or(0)
    }

    pub fn export_csv(&self, path: PathBuf) -> ExportResult {
        let (response_sender, response_receiver) = bounded(1);
        self.request(DatabaseTask::ExportCsv { path, response_sender })
            .and_then(|()| response_receiver.recv_timeout(QUERY_TIMEOUT * 6).map_err(|_| StorageError::HandlerUnavailable))
            .unwrap_or_else(|e| ExportResult::error(format!("Export failed: {}", e)))
    }

    fn request(&self, task: DatabaseTask) -> Result<(), StorageError> {
        self.db_task_sender
            .send_timeout(task, QUERY_TIMEOUT)
            .map_err(|_| StorageError::HandlerUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    fn spawn_store() -> (ResultStore, Arc<AtomicBool>, JoinHandle<()>) {
        let shutdown = Arc::new(AtomicBool::new(false));
        let db = DatabaseManager::open_in_memory().unwrap();
        let (store, handle) = ResultStore::spawn(db, 100, Arc::clone(&shutdown)).unwrap();
        (store, shutdown, handle)
    }

    #[test]
    fn list_all_on_empty_store_is_empty() {
        let (store, shutdown, handle) = spawn_store();
        assert!(store.list_all().is_empty());
        assert_eq!(store.count(), 0);
        shutdown.store(true, Ordering::Relaxed);
        handle.join().unwrap();
    }

    #[test]
    fn append_then_list_returns_reading_last() {
        let (store, shutdown, handle) = spawn_store();
        store.append(1.0, 2.0, 3.0);
        store.append(4.0, 5.0, 6.0);

        let readings = store.list_all();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[1].sample(), ForceSample::new(4.0, 5.0, 6.0));
        assert!(readings[1].id > readings[0].id);

        shutdown.store(true, Ordering::Relaxed);
        handle.join().unwrap();
    }

    #[test]
    fn recent_is_capped_at_limit() {
        let (store, shutdown, handle) = spawn_store();
        for i in 0..5 {
            store.append(i as f64, 0.0, 0.0);
        }
        let recent = store.list_recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].fx, 4.0);
        assert_eq!(store.count(), 5);

        shutdown.store(true, Ordering::Relaxed);
        handle.join().unwrap();
    }

    #[test]
    fn stopped_handler_degrades_to_empty() {
        let (store, shutdown, handle) = spawn_store();
        shutdown.store(true, Ordering::Relaxed);
        handle.join().unwrap();

        store.append(1.0, 1.0, 1.0);
        assert!(store.list_all().is_empty());
        assert!(store.list_recent(10).is_empty());
        assert_eq!(store.count(), 0);
    }
}
