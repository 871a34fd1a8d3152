use std::time::Duration;

/// 传感器链路错误，只在传感器工作线程内部可见
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("Serial I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("No valid frame within {0:?}")]
    Timeout(Duration),
    #[error("Sensor read cancelled")]
    Cancelled,
    #[error("Sensor worker unavailable")]
    WorkerUnavailable,
}

/// 轴运动错误
#[derive(Debug, thiserror::Error)]
pub enum MotionError {
    #[error("Invalid axis: {0}")]
    InvalidAxis(String),
    #[error("Move on axis {axis} cancelled after {pulses} pulses")]
    Cancelled { axis: String, pulses: u64 },
    #[error("GPIO error: {0}")]
    Gpio(String),
}

/// 结果存储错误
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database handler unavailable")]
    HandlerUnavailable,
}
