use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::protocol::{RawFrame, CMD_ARM, CMD_IDENTIFY, CMD_START, RAW_ZERO};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandshakeState {
    Idle,
    Started,
    Identified,
    Streaming,
}

/// 无硬件时使用的模拟力传感器
///
/// 只有按顺序收到 start、identify、arm 后才开始回帧，之前的读取全部超时，
/// 和真实设备一样。Fz 叠加一个缓慢的正弦载荷，三轴都加随机噪声。
pub struct SimulatedSensor {
    state: HandshakeState,
    pending: VecDeque<u8>,
    rng: StdRng,
    noise: u16,
    frames_sent: u64,
}

impl SimulatedSensor {
    pub fn new(noise: u16) -> Self {
        Self::with_rng(noise, StdRng::from_os_rng())
    }

    #[cfg(test)]
    pub fn seeded(noise: u16, seed: u64) -> Self {
        Self::with_rng(noise, StdRng::seed_from_u64(seed))
    }

    fn with_rng(noise: u16, rng: StdRng) -> Self {
        Self {
            state: HandshakeState::Idle,
            pending: VecDeque::new(),
            rng,
            noise,
            frames_sent: 0,
        }
    }

    fn jitter(&mut self) -> i32 {
        if self.noise == 0 {
            return 0;
        }
        let n = i32::from(self.noise);
        self.rng.random_range(-n..=n)
    }

    fn code(&mut self, load: i32) -> u16 {
        let value = i32::from(RAW_ZERO) + load + self.jitter();
        value.clamp(0, i32::from(u16::MAX)) as u16
    }

    fn next_frame(&mut self) -> RawFrame {
        let phase = self.frames_sent as f64 / 200.0 * std::f64::consts::TAU;
        let fz_load = (phase.sin() * 800.0) as i32;
        self.frames_sent += 1;
        let fx = self.code(0);
        let fy = self.code(0);
        let fz = self.code(fz_load);
        RawFrame::from_codes(fx, fy, fz)
    }
}

impl Write for SimulatedSensor {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.state = match (self.state, buf) {
            (_, b) if b == CMD_START => {
                self.pending.clear();
                HandshakeState::Started
            }
            (HandshakeState::Started, b) if b == CMD_IDENTIFY => HandshakeState::Identified,
            (HandshakeState::Identified, b) if b == CMD_ARM => HandshakeState::Streaming,
            _ => HandshakeState::Idle,
        };
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for SimulatedSensor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.state != HandshakeState::Streaming {
            return Err(io::Error::new(ErrorKind::TimedOut, "sensor not armed"));
        }
        if self.pending.is_empty() {
            let frame = self.next_frame();
            self.pending.extend(frame.as_bytes().iter().copied());
        }
        let n = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::error::SensorError;
    use crate::sensor::link::tests::fast_settings;
    use crate::sensor::link::{read_up_to, SensorLink};
    use crate::sensor::protocol::FRAME_LEN;

    #[test]
    fn silent_until_armed() {
        let mut sensor = SimulatedSensor::seeded(0, 1);
        assert!(read_up_to(&mut sensor, FRAME_LEN).unwrap().is_empty());
        sensor.write_all(&CMD_START).unwrap();
        sensor.write_all(&CMD_ARM).unwrap();
        assert!(read_up_to(&mut sensor, FRAME_LEN).unwrap().is_empty());
    }

    #[test]
    fn streams_valid_frames_after_handshake() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut link = SensorLink::new(SimulatedSensor::seeded(0, 1), fast_settings(), shutdown);
        let first = link.sample().unwrap();
        // 第一帧载荷为零且无噪声
        assert_eq!(first.fz, 0.0);
        let frame = link.read_frame(Duration::from_millis(100)).unwrap();
        assert!(frame.fz_raw() > RAW_ZERO);
    }

    #[test]
    fn noise_stays_within_amplitude() {
        let mut sensor = SimulatedSensor::seeded(40, 7);
        for _ in 0..100 {
            let frame = sensor.next_frame();
            assert!((i32::from(frame.fx_raw()) - i32::from(RAW_ZERO)).abs() <= 40);
        }
    }

    #[test]
    fn unarmed_link_times_out() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut link = SensorLink::new(SimulatedSensor::seeded(0, 1), fast_settings(), shutdown);
        assert!(matches!(link.read_frame(Duration::from_millis(10)), Err(SensorError::Timeout(_))));
    }
}
