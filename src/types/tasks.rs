use std::path::PathBuf;

use super::{ExportResult, ForceSample, Reading};

/// Database task enumeration for the database handler thread
#[derive(Clone, Debug)]
pub enum DatabaseTask {
    Append {
        sample: ForceSample,
    },
    ListAll {
        response_sender: crossbeam_channel::Sender<Vec<Reading>>,
    },
    ListRecent {
        limit: usize,
        response_sender: crossbeam_channel::Sender<Vec<Reading>>,
    },
    Count {
        response_sender: crossbeam_channel::Sender<usize>,
    },
    ExportCsv {
        path: PathBuf,
        response_sender: crossbeam_channel::Sender<ExportResult>,
    },
}

/// 发给传感器工作线程的请求
#[derive(Clone, Debug)]
pub enum SensorRequest {
    Sample {
        response_sender: crossbeam_channel::Sender<ForceSample>,
    },
}
