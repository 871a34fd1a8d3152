pub mod link;
pub mod protocol;
pub mod simulated;
pub mod worker;

pub use link::{open_serial, LinkSettings, SensorLink};
pub use simulated::SimulatedSensor;
pub use worker::{spawn_sensor_worker, SensorHandle};
