use serde::{Deserialize, Serialize};

use super::Axis;

/// 自动化流程中的一步：推、拉共用同一次采样
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct AutomationStep {
    pub push_result: f64,
    pub pull_result: f64,
}

impl AutomationStep {
    pub fn from_fz(fz: f64) -> Self {
        Self {
            push_result: fz,
            pull_result: -fz,
        }
    }
}

/// 一次轴运动下发了什么（不代表平台实际到达的位置）
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct MoveOutcome {
    pub axis: Axis,
    pub position_mm: f64,
    pub steps: i64,
    pub pulses: u64,
}

/// Result of a CSV export
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub rows: usize,
    pub message: String,
}

impl ExportResult {
    pub fn success(rows: usize, path: &str) -> Self {
        Self {
            rows,
            message: format!("Exported {} readings to {}", rows, path),
        }
    }

    pub fn error(error: String) -> Self {
        Self {
            rows: 0,
            message: error,
        }
    }
}
