use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::info;

use crate::database::ResultStore;
use crate::sensor::SensorHandle;

/// 后台采集循环：采样 -> 入库 -> 休眠，直到收到关闭信号
pub fn run_acquisition_loop(
    sensor: SensorHandle,
    store: ResultStore,
    interval: Duration,
    shutdown_signal: Arc<AtomicBool>,
) {
    info!("Acquisition loop started ({} ms interval)", interval.as_millis());
    let mut iterations: u64 = 0;

    while !shutdown_signal.load(Ordering::Relaxed) {
        let sample = sensor.read();
        // 零读数同样入库，与现场记录保持一致
        store.append_sample(sample);
        iterations += 1;
        sleep_unless_shutdown(interval, &shutdown_signal);
    }

    info!("Acquisition loop exiting after {} samples", iterations);
}

pub fn spawn_acquisition(
    sensor: SensorHandle,
    store: ResultStore,
    interval: Duration,
    shutdown_signal: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("acquisition".into())
        .spawn(move || run_acquisition_loop(sensor, store, interval, shutdown_signal))
}

// 分段休眠，长采样间隔下也能及时响应关闭
fn sleep_unless_shutdown(interval: Duration, shutdown_signal: &AtomicBool) {
    let slice = Duration::from_millis(50);
    let mut remaining = interval;
    while !remaining.is_zero() && !shutdown_signal.load(Ordering::Relaxed) {
        let step = remaining.min(slice);
        thread::sleep(step);
        remaining -= step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseManager;
    use crate::sensor::link::tests::fast_settings;
    use crate::sensor::{spawn_sensor_worker, SensorLink, SimulatedSensor};

    #[test]
    fn loop_persists_samples_until_shutdown() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let link = SensorLink::new(SimulatedSensor::seeded(5, 11), fast_settings(), Arc::clone(&shutdown));
        let (sensor, sensor_join) = spawn_sensor_worker(link, 8, Arc::clone(&shutdown)).unwrap();
        let db = DatabaseManager::open_in_memory().unwrap();
        let (store, db_join) = ResultStore::spawn(db, 100, Arc::clone(&shutdown)).unwrap();

        let acq_join = spawn_acquisition(
            sensor,
            store.clone(),
            Duration::from_millis(5),
            Arc::clone(&shutdown),
        )
        .unwrap();

        let mut stored = 0;
        for _ in 0..100 {
            stored = store.count();
            if stored >= 3 {
                break;
            }
            thread::sleep(Duration::from_millis(20));
        }
        assert!(stored >= 3, "only {} readings stored", stored);

        let readings = store.list_all();
        assert!(readings.windows(2).all(|w| w[0].id < w[1].id));

        shutdown.store(true, Ordering::Relaxed);
        acq_join.join().unwrap();
        sensor_join.join().unwrap();
        db_join.join().unwrap();
    }

    #[test]
    fn sleep_returns_early_on_shutdown() {
        let shutdown = AtomicBool::new(true);
        let started = std::time::Instant::now();
        sleep_unless_shutdown(Duration::from_secs(10), &shutdown);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
