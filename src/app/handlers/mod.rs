pub mod control;

pub use control::{spawn_control_worker, ControlEvent, ControlHandle, ControlTask};
