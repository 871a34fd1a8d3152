use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::config::{AxisConfig, GpioBackend, MotionConfig};
use crate::error::MotionError;
use crate::types::{Axis, MoveOutcome};
use super::pins::{OutputPin, SimulatedPin};

/// 毫米换算为步数，向零截断
pub fn mm_to_steps(position_mm: f64, steps_per_mm: f64) -> i64 {
    (position_mm * steps_per_mm) as i64
}

/// 一个轴独占的两根输出线
pub struct AxisChannel {
    pub config: AxisConfig,
    pub step: Box<dyn OutputPin>,
    pub dir: Box<dyn OutputPin>,
}

/// 步进电机脉冲驱动
///
/// 只做相对运动，不跟踪位置、不做加减速和软限位。每个轴一把锁：
/// 不同轴可以在不同线程并发运动，同一轴的运动串行执行。
pub struct AxisDriver {
    channels: [Mutex<AxisChannel>; 3],
    step_delay: Duration,
    shutdown: Arc<AtomicBool>,
}

impl AxisDriver {
    /// 通道顺序为 X、Y、Z
    pub fn new(channels: [AxisChannel; 3], step_delay: Duration, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            channels: channels.map(Mutex::new),
            step_delay,
            shutdown,
        }
    }

    /// 按配置选择 GPIO 后端
    pub fn from_config(config: &MotionConfig, shutdown: Arc<AtomicBool>) -> Result<Self, MotionError> {
        let channels = match config.backend {
            GpioBackend::Simulated => {
                info!("Using simulated GPIO backend");
                Axis::ALL.map(|axis| {
                    let axis_config = *config.axes.get(axis);
                    AxisChannel {
                        config: axis_config,
                        step: Box::new(SimulatedPin::new(axis_config.step_pin)) as Box<dyn OutputPin>,
                        dir: Box::new(SimulatedPin::new(axis_config.dir_pin)) as Box<dyn OutputPin>,
                    }
                })
            }
            GpioBackend::Rpi => Self::rpi_channels(config)?,
        };
        Ok(Self::new(channels, config.step_delay(), shutdown))
    }

    #[cfg(feature = "rpi")]
    fn rpi_channels(config: &MotionConfig) -> Result<[AxisChannel; 3], MotionError> {
        use super::pins::open_rpi_pin;

        let gpio = rppal::gpio::Gpio::new().map_err(|e| MotionError::Gpio(e.to_string()))?;
        let open = |axis: Axis| -> Result<AxisChannel, MotionError> {
            let axis_config = *config.axes.get(axis);
            Ok(AxisChannel {
                config: axis_config,
                step: Box::new(open_rpi_pin(&gpio, axis_config.step_pin)?),
                dir: Box::new(open_rpi_pin(&gpio, axis_config.dir_pin)?),
            })
        };
        info!("Using Raspberry Pi GPIO backend");
        Ok([open(Axis::X)?, open(Axis::Y)?, open(Axis::Z)?])
    }

    #[cfg(not(feature = "rpi"))]
    fn rpi_channels(_config: &MotionConfig) -> Result<[AxisChannel; 3], MotionError> {
        Err(MotionError::Gpio("built without the `rpi` feature".to_string()))
    }

    fn channel(&self, axis: Axis) -> MutexGuard<'_, AxisChannel> {
        // 脉冲循环中途 panic 不会留下不一致状态，直接沿用
        self.channels[axis.index()]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn axis_config(&self, axis: Axis) -> AxisConfig {
        self.channel(axis).config
    }

    #[cfg(test)]
    /// 按轴名移动带符号步数，阻塞到脉冲串结束；返回发出的脉冲数
    pub fn move_steps(&self, axis_name: &str, signed_steps: i64) -> Result<u64, MotionError> {
        let axis: Axis = axis_name.parse()?;
        self.move_axis_steps(axis, signed_steps)
    }

    pub fn move_axis_steps(&self, axis: Axis, signed_steps: i64) -> Result<u64, MotionError> {
        let mut channel = self.channel(axis);
        let pulses = signed_steps.unsigned_abs();

        channel.dir.set_state(signed_steps >= 0);
        debug!("Axis {}: {} pulses, dir {}", axis, pulses, if signed_steps >= 0 { "HIGH" } else { "LOW" });

        for emitted in 0..pulses {
            if self.shutdown.load(Ordering::Relaxed) {
                warn!("Axis {} move cancelled after {} of {} pulses", axis, emitted, pulses);
                return Err(MotionError::Cancelled { axis: axis.to_string(), pulses: emitted });
            }
            channel.step.set_high();
            thread::sleep(self.step_delay);
            channel.step.set_low();
            thread::sleep(self.step_delay);
        }

        Ok(pulses)
    }

    /// 位置按相对位移处理：不记录累计位置
    pub fn move_mm(&self, axis_name: &str, position_mm: f64) -> Result<MoveOutcome, MotionError> {
        let axis: Axis = axis_name.parse()?;
        let steps = mm_to_steps(position_mm, self.axis_config(axis).steps_per_mm);
        let pulses = self.move_axis_steps(axis, steps)?;
        info!("Axis {} moved {} mm ({} steps)", axis, position_mm, steps);
        Ok(MoveOutcome {
            axis,
            position_mm,
            steps,
            pulses,
        })
    }
}
