//! 数字输出引脚抽象
//!
//! 驱动只依赖 `OutputPin`；模拟后端记录电平和上升沿数量，
//! `rpi` 特性下使用 rppal 驱动真实 GPIO。

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use log::trace;

/// Digital output line
pub trait OutputPin: Send {
    fn set_high(&mut self);

    fn set_low(&mut self);

    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }
}

/// 模拟引脚的观测点，可在驱动持有引脚时从其他线程读取
#[derive(Debug, Default)]
pub struct PinProbe {
    level: AtomicBool,
    rising_edges: AtomicU64,
}

impl PinProbe {
    #[cfg(test)]
    pub fn is_high(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub fn rising_edges(&self) -> u64 {
        self.rising_edges.load(Ordering::SeqCst)
    }
}

pub struct SimulatedPin {
    pin: u8,
    probe: Arc<PinProbe>,
}

impl SimulatedPin {
    pub fn new(pin: u8) -> Self {
        Self {
            pin,
            probe: Arc::new(PinProbe::default()),
        }
    }

    #[cfg(test)]
    pub fn probe(&self) -> Arc<PinProbe> {
        Arc::clone(&self.probe)
    }
}

impl OutputPin for SimulatedPin {
    fn set_high(&mut self) {
        if !self.probe.level.swap(true, Ordering::SeqCst) {
            self.probe.rising_edges.fetch_add(1, Ordering::SeqCst);
        }
        trace!("GPIO{} -> HIGH", self.pin);
    }

    fn set_low(&mut self) {
        self.probe.level.store(false, Ordering::SeqCst);
        trace!("GPIO{} -> LOW", self.pin);
    }
}

#[cfg(feature = "rpi")]
pub use rpi::{open_rpi_pin, RpiPin};

#[cfg(feature = "rpi")]
mod rpi {
    use super::OutputPin;
    use crate::error::MotionError;

    /// rppal 输出引脚，drop 时恢复引脚原状态
    pub struct RpiPin(rppal::gpio::OutputPin);

    impl OutputPin for RpiPin {
        fn set_high(&mut self) {
            self.0.set_high();
        }

        fn set_low(&mut self) {
            self.0.set_low();
        }
    }

    pub fn open_rpi_pin(gpio: &rppal::gpio::Gpio, pin: u8) -> Result<RpiPin, MotionError> {
        let pin = gpio
            .get(pin)
            .map_err(|e| MotionError::Gpio(format!("GPIO{}: {}", pin, e)))?;
        Ok(RpiPin(pin.into_output_low()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_rising_edges_only() {
        let mut pin = SimulatedPin::new(16);
        let probe = pin.probe();
        pin.set_high();
        pin.set_high();
        pin.set_low();
        pin.set_state(true);
        assert!(probe.is_high());
        assert_eq!(probe.rising_edges(), 2);
    }
}
