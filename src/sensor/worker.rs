use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{error, info, warn};

use crate::error::SensorError;
use crate::types::{ForceSample, SensorRequest};
use super::link::{SensorLink, SensorPort};

/// 传感器请求句柄，可被采集循环和 HTTP/UI 请求共享
///
/// 所有协议交互都排队交给唯一持有串口的工作线程，同一时刻最多一次交互。
#[derive(Clone)]
pub struct SensorHandle {
    request_sender: Sender<SensorRequest>,
    response_timeout: Duration,
}

impl SensorHandle {
    pub fn new(request_sender: Sender<SensorRequest>, response_timeout: Duration) -> Self {
        Self { request_sender, response_timeout }
    }

    /// 每次调用都重新采样，不做缓存；失败时返回零读数
    pub fn read(&self) -> ForceSample {
        match self.try_read() {
            Ok(sample) => sample,
            Err(e) => {
                warn!("Sensor request failed, returning zero reading: {}", e);
                ForceSample::zero()
            }
        }
    }

    fn try_read(&self) -> Result<ForceSample, SensorError> {
        let (response_sender, response_receiver) = bounded(1);
        self.request_sender
            .send_timeout(SensorRequest::Sample { response_sender }, self.response_timeout)
            .map_err(|_| SensorError::WorkerUnavailable)?;
        response_receiver
            .recv_timeout(self.response_timeout)
            .map_err(|_| SensorError::WorkerUnavailable)
    }
}

/// 启动传感器工作线程，返回请求句柄
pub fn spawn_sensor_worker<P: SensorPort + 'static>(
    link: SensorLink<P>,
    capacity: usize,
    shutdown_signal: Arc<AtomicBool>,
) -> std::io::Result<(SensorHandle, JoinHandle<()>)> {
    let (request_sender, request_receiver) = bounded(capacity);
    // 排在前面的请求最多各占用一次完整交互
    let response_timeout = link.settings().worst_case_exchange() * 2 + Duration::from_secs(1);

    let handle = thread::Builder::new()
        .name("sensor-worker".into())
        .spawn(move || run_sensor_worker(link, request_receiver, shutdown_signal))?;

    Ok((SensorHandle::new(request_sender, response_timeout), handle))
}

pub fn run_sensor_worker<P: SensorPort>(
    mut link: SensorLink<P>,
    request_receiver: Receiver<SensorRequest>,
    shutdown_signal: Arc<AtomicBool>,
) {
    info!("Sensor worker thread started");
    let mut consecutive_failures: u32 = 0;

    while !shutdown_signal.load(Ordering::Relaxed) {
        match request_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(SensorRequest::Sample { response_sender }) => {
                let sample = match link.sample() {
                    Ok(sample) => {
                        if consecutive_failures > 0 {
                            info!("Sensor link recovered after {} failed reads", consecutive_failures);
                        }
                        consecutive_failures = 0;
                        sample
                    }
                    Err(SensorError::Cancelled) => ForceSample::zero(),
                    Err(e) => {
                        consecutive_failures += 1;
                        // 只在首次失败和之后每 100 次时报错，避免刷屏
                        if consecutive_failures == 1 || consecutive_failures % 100 == 0 {
                            error!("Error reading sensor ({} consecutive): {}", consecutive_failures, e);
                        }
                        ForceSample::zero()
                    }
                };
                if let Err(e) = response_sender.try_send(sample) {
                    warn!("Sensor worker: requester went away: {}", e);
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                info!("Sensor worker: request channel disconnected, exiting");
                break;
            }
        }
    }

    info!("Sensor worker thread exiting gracefully");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::link::tests::{fast_settings, ScriptedPort};
    use crate::sensor::link::LinkSettings;
    use crate::sensor::protocol::RawFrame;
    use crate::sensor::SimulatedSensor;

    fn start<P: SensorPort + 'static>(port: P) -> (SensorHandle, Arc<AtomicBool>, JoinHandle<()>) {
        let shutdown = Arc::new(AtomicBool::new(false));
        let link = SensorLink::new(port, fast_settings(), Arc::clone(&shutdown));
        let (handle, join) = spawn_sensor_worker(link, 8, Arc::clone(&shutdown)).unwrap();
        (handle, shutdown, join)
    }

    #[test]
    fn serves_samples_from_link() {
        let frame = RawFrame::from_codes(49152, 32768, 16384).as_bytes().to_vec();
        let (handle, shutdown, join) = start(ScriptedPort::with_reads(vec![Some(frame)]));

        let sample = handle.read();
        assert!((sample.fx - 20.0).abs() < 1e-9);
        assert_eq!(sample.fy, 0.0);
        assert!((sample.fz + 20.0).abs() < 1e-9);

        shutdown.store(true, Ordering::Relaxed);
        join.join().unwrap();
    }

    #[test]
    fn link_failure_degrades_to_zero_reading() {
        let port = ScriptedPort { fail_writes: true, ..Default::default() };
        let (handle, shutdown, join) = start(port);
        assert_eq!(handle.read(), ForceSample::zero());
        shutdown.store(true, Ordering::Relaxed);
        join.join().unwrap();
    }

    #[test]
    fn silent_sensor_degrades_to_zero_reading() {
        let (handle, shutdown, join) = start(ScriptedPort::default());
        assert!(handle.read().is_zero());
        shutdown.store(true, Ordering::Relaxed);
        join.join().unwrap();
    }

    #[test]
    fn concurrent_requests_are_serialized() {
        let (handle, shutdown, join) = start(SimulatedSensor::seeded(0, 3));
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let handle = handle.clone();
                thread::spawn(move || (0..5).map(|_| handle.read()).collect::<Vec<_>>())
            })
            .collect();
        let samples: Vec<ForceSample> = workers
            .into_iter()
            .flat_map(|worker| worker.join().unwrap())
            .collect();
        assert_eq!(samples.len(), 20);
        // 交错写入会打乱握手，读帧超时后得到零读数；只有第一帧的 Fz 载荷为零
        let live = samples.iter().filter(|s| s.fz != 0.0).count();
        assert!(live >= 19, "only {} live samples", live);
        shutdown.store(true, Ordering::Relaxed);
        join.join().unwrap();
    }

    /// 每次读都阻塞一段时间后才返回一帧的串口
    struct SlowPort {
        delay: Duration,
        frame: Vec<u8>,
    }

    impl std::io::Read for SlowPort {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            thread::sleep(self.delay);
            let n = self.frame.len().min(buf.len());
            buf[..n].copy_from_slice(&self.frame[..n]);
            Ok(n)
        }
    }

    impl std::io::Write for SlowPort {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn slow_port_read_still_reaches_requester() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let delay = Duration::from_millis(1500);
        let port = SlowPort {
            delay,
            frame: RawFrame::from_codes(32768, 32768, 49152).as_bytes().to_vec(),
        };
        // 单次读超过读帧截止时间，应答等待必须把它算进去
        let settings = LinkSettings { port_timeout: delay, ..fast_settings() };
        let link = SensorLink::new(port, settings, Arc::clone(&shutdown));
        let (handle, join) = spawn_sensor_worker(link, 8, Arc::clone(&shutdown)).unwrap();

        let sample = handle.read();
        assert!((sample.fz - 20.0).abs() < 1e-9);

        shutdown.store(true, Ordering::Relaxed);
        join.join().unwrap();
    }

    #[test]
    fn stopped_worker_returns_zero() {
        let (handle, shutdown, join) = start(ScriptedPort::default());
        shutdown.store(true, Ordering::Relaxed);
        join.join().unwrap();
        assert!(handle.read().is_zero());
    }
}
