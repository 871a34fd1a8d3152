pub mod control_panel;
pub mod data_panel;
pub mod status_bar;

pub use control_panel::render_control_panel;
pub use data_panel::render_data_panel;
pub use status_bar::render_status_bar;
