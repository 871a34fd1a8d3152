pub mod axis;
pub mod reading;
pub mod results;
pub mod tasks;

pub use axis::Axis;
pub use reading::{ForceSample, Reading};
pub use results::{AutomationStep, ExportResult, MoveOutcome};
pub use tasks::{DatabaseTask, SensorRequest};
