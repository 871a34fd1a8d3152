pub mod driver;
pub mod pins;

pub use driver::AxisDriver;
