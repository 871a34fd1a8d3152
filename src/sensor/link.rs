use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, trace};

use crate::config::{AppConfig, CalibrationFactors};
use crate::error::SensorError;
use crate::types::ForceSample;
use super::protocol::{decode, RawFrame, CMD_ARM, CMD_IDENTIFY, CMD_START, FRAME_LEN};

/// 传感器字节流：真实串口、模拟设备或测试脚本
pub trait SensorPort: Read + Write + Send {}

impl<T: Read + Write + Send + ?Sized> SensorPort for T {}

/// 打开配置中的串口
pub fn open_serial(config: &AppConfig) -> Result<Box<dyn serialport::SerialPort>, SensorError> {
    let serial = &config.serial;
    let port = serialport::new(&serial.port, serial.baud_rate)
        .timeout(serial.timeout())
        .open()?;
    info!("Serial port {} opened at {} baud", serial.port, serial.baud_rate);
    Ok(port)
}

/// 读取最多 `len` 个字节，遇到端口超时即返回已收到的部分
pub fn read_up_to<R: Read + ?Sized>(port: &mut R, len: usize) -> Result<Vec<u8>, SensorError> {
    let mut buf = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        match port.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    buf.truncate(filled);
    Ok(buf)
}

/// 协议时序与换算参数
#[derive(Debug, Clone)]
pub struct LinkSettings {
    pub settle: Duration,
    pub backoff: Duration,
    pub read_deadline: Duration,
    /// 单次阻塞读的上限，read_frame 最多越过截止时间这么久
    pub port_timeout: Duration,
    pub calibration: CalibrationFactors,
    pub full_scale: f64,
}

impl LinkSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            settle: config.serial.settle(),
            backoff: config.serial.backoff(),
            read_deadline: config.serial.read_deadline(),
            port_timeout: config.serial.timeout(),
            calibration: config.sensor.calibration,
            full_scale: config.sensor.full_scale,
        }
    }

    /// 一次完整采样（握手 + 读帧）的最长耗时
    pub fn worst_case_exchange(&self) -> Duration {
        self.settle * 2 + self.read_deadline + self.backoff + self.port_timeout
    }
}

/// 独占串口的协议端点，只应由传感器工作线程持有
pub struct SensorLink<P: SensorPort> {
    port: P,
    settings: LinkSettings,
    shutdown: Arc<AtomicBool>,
}

impl<P: SensorPort> SensorLink<P> {
    pub fn new(port: P, settings: LinkSettings, shutdown: Arc<AtomicBool>) -> Self {
        Self { port, settings, shutdown }
    }

    pub fn settings(&self) -> &LinkSettings {
        &self.settings
    }

    /// start → identify → arm，使设备进入推流模式
    pub fn send_handshake(&mut self) -> Result<(), SensorError> {
        self.write_command(&CMD_START)?;
        thread::sleep(self.settings.settle);
        self.write_command(&CMD_IDENTIFY)?;
        thread::sleep(self.settings.settle);
        self.write_command(&CMD_ARM)?;
        trace!("Sensor handshake sent");
        Ok(())
    }

    fn write_command(&mut self, bytes: &[u8]) -> Result<(), SensorError> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    /// 反复读取直到得到合法帧；超过截止时间返回 Timeout，收到关闭信号返回 Cancelled
    pub fn read_frame(&mut self, deadline: Duration) -> Result<RawFrame, SensorError> {
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                return Err(SensorError::Cancelled);
            }

            let chunk = read_up_to(&mut self.port, FRAME_LEN)?;
            attempts += 1;
            if let Some(frame) = RawFrame::parse(&chunk) {
                if attempts > 1 {
                    debug!("Valid frame after {} attempts", attempts);
                }
                return Ok(frame);
            }
            trace!("Discarding malformed frame ({} bytes)", chunk.len());

            if started.elapsed() >= deadline {
                return Err(SensorError::Timeout(deadline));
            }
            thread::sleep(self.settings.backoff);
        }
    }

    /// 握手、读帧、解码
    pub fn sample(&mut self) -> Result<ForceSample, SensorError> {
        self.send_handshake()?;
        let frame = self.read_frame(self.settings.read_deadline)?;
        Ok(decode(&frame, &self.settings.calibration, self.settings.full_scale))
    }

    #[cfg(test)]
    pub fn into_port(self) -> P {
        self.port
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    use crate::sensor::protocol::RawFrame;

    /// 按脚本返回数据的假串口；`None` 表示一次端口超时
    #[derive(Default)]
    pub struct ScriptedPort {
        pub reads: VecDeque<Option<Vec<u8>>>,
        pub written: Vec<Vec<u8>>,
        pub fail_writes: bool,
    }

    impl ScriptedPort {
        pub fn with_reads(reads: Vec<Option<Vec<u8>>>) -> Self {
            Self { reads: reads.into(), ..Default::default() }
        }
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                Some(Some(mut chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.reads.push_front(Some(chunk.split_off(n)));
                    }
                    Ok(n)
                }
                Some(None) | None => Err(io::Error::new(ErrorKind::TimedOut, "timed out")),
            }
        }
    }

    impl Write for ScriptedPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_writes {
                return Err(io::Error::new(ErrorKind::BrokenPipe, "device unplugged"));
            }
            self.written.push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    pub fn fast_settings() -> LinkSettings {
        LinkSettings {
            settle: Duration::ZERO,
            backoff: Duration::from_millis(1),
            read_deadline: Duration::from_millis(50),
            port_timeout: Duration::ZERO,
            calibration: CalibrationFactors { fx: 20.0, fy: 20.0, fz: 20.0 },
            full_scale: 2.0,
        }
    }

    fn link(port: ScriptedPort) -> SensorLink<ScriptedPort> {
        SensorLink::new(port, fast_settings(), Arc::new(AtomicBool::new(false)))
    }

    fn frame(fx: u16, fy: u16, fz: u16) -> Option<Vec<u8>> {
        Some(RawFrame::from_codes(fx, fy, fz).as_bytes().to_vec())
    }

    #[test]
    fn handshake_writes_commands_in_order() {
        let mut link = link(ScriptedPort::default());
        link.send_handshake().unwrap();
        let port = link.into_port();
        assert_eq!(
            port.written,
            vec![vec![0x23], vec![0x26, 0x01, 0x62, 0x65, 0x72, 0x6C, 0x69, 0x6E], vec![0x24]]
        );
    }

    #[test]
    fn skips_bad_sentinel_then_returns_good_frame() {
        let mut bad = RawFrame::from_codes(1, 2, 3).as_bytes().to_vec();
        bad[0] = 0x00;
        let mut link = link(ScriptedPort::with_reads(vec![Some(bad), frame(4, 5, 6)]));
        let got = link.read_frame(Duration::from_secs(1)).unwrap();
        assert_eq!((got.fx_raw(), got.fy_raw(), got.fz_raw()), (4, 5, 6));
    }

    #[test]
    fn short_read_is_retried() {
        let short = Some(vec![0xA5, 0x80, 0x00]);
        let mut link = link(ScriptedPort::with_reads(vec![short, None, frame(7, 8, 9)]));
        let got = link.read_frame(Duration::from_secs(1)).unwrap();
        assert_eq!(got.fz_raw(), 9);
    }

    #[test]
    fn silent_port_times_out() {
        let mut link = link(ScriptedPort::default());
        let started = Instant::now();
        match link.read_frame(Duration::from_millis(20)) {
            Err(SensorError::Timeout(d)) => assert_eq!(d, Duration::from_millis(20)),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn shutdown_cancels_read() {
        let shutdown = Arc::new(AtomicBool::new(true));
        let mut link = SensorLink::new(ScriptedPort::default(), fast_settings(), shutdown);
        assert!(matches!(link.read_frame(Duration::from_secs(5)), Err(SensorError::Cancelled)));
    }

    #[test]
    fn sample_decodes_calibrated_force() {
        let mut link = link(ScriptedPort::with_reads(vec![frame(32768, 32768, 49152)]));
        let sample = link.sample().unwrap();
        assert_eq!(sample.fx, 0.0);
        assert_eq!(sample.fy, 0.0);
        assert!((sample.fz - 20.0).abs() < 1e-9);
    }

    #[test]
    fn write_failure_is_reported() {
        let port = ScriptedPort { fail_writes: true, ..Default::default() };
        assert!(matches!(link(port).sample(), Err(SensorError::Io(_))));
    }

    #[test]
    fn worst_case_includes_blocking_port_read() {
        let mut config = AppConfig::default();
        config.serial.timeout_ms = 1500;
        let settings = LinkSettings::from_config(&config);
        // settle 100 x2 + deadline 2000 + backoff 50 + 一次阻塞读 1500
        assert_eq!(settings.worst_case_exchange(), Duration::from_millis(3750));
    }
}
