mod acquisition;
mod api;
mod app;
mod config;
mod database;
mod error;
mod logger;
mod motion;
mod plotter;
mod sensor;
mod testbed;
mod types;
mod utils;

use dotenv::dotenv;
use eframe::egui;
use log::{error, info, warn};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use config::{AppConfig, ConfigManager, SensorBackend};
use database::{DatabaseManager, ResultStore};
use motion::AxisDriver;
use sensor::{open_serial, spawn_sensor_worker, LinkSettings, SensorHandle, SensorLink, SimulatedSensor};
use testbed::Testbed;

type StartupResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
    dotenv().ok(); // 加载 .env 文件
    logger::init_logger();
    info!("Gecko testbed starting");

    let config_path = env::var("GECKO_CONFIG").unwrap_or_else(|_| "gecko_testbed.toml".into());
    let config = match ConfigManager::load_or_default(&config_path) {
        Ok(manager) => {
            match manager.config_path() {
                Some(path) if path.exists() => info!("Configuration loaded from {}", path.display()),
                _ => info!("No config file at {}, using defaults", config_path),
            }
            manager.get_config().clone()
        }
        Err(e) => {
            error!("Failed to load config {}: {}", config_path, e);
            std::process::exit(1);
        }
    };

    let shutdown_signal = Arc::new(AtomicBool::new(false));
    let mut workers: Vec<(&'static str, JoinHandle<()>)> = Vec::new();

    let testbed = match start_services(&config, &shutdown_signal, &mut workers) {
        Ok(testbed) => testbed,
        Err(e) => {
            error!("Startup failed: {}", e);
            shutdown_signal.store(true, Ordering::Relaxed);
            join_workers(workers);
            std::process::exit(1);
        }
    };

    let headless = env::var("GECKO_HEADLESS").map(|v| v == "1").unwrap_or(false);
    if headless {
        wait_for_ctrl_c();
    } else {
        run_control_panel(&config, testbed, &shutdown_signal, &mut workers);
    }

    // 面板关闭或收到 Ctrl-C 后，通知所有线程退出
    info!("Shutting down, signaling worker threads");
    shutdown_signal.store(true, Ordering::Relaxed);
    join_workers(workers);
    info!("Gecko testbed stopped");
}

fn start_services(
    config: &AppConfig,
    shutdown_signal: &Arc<AtomicBool>,
    workers: &mut Vec<(&'static str, JoinHandle<()>)>,
) -> StartupResult<Testbed> {
    let (sensor, sensor_join) = start_sensor(config, shutdown_signal)?;
    workers.push(("sensor worker", sensor_join));

    let motion = Arc::new(AxisDriver::from_config(&config.motion, Arc::clone(shutdown_signal))?);

    let db_manager = DatabaseManager::new(&config.database)?;
    let (store, db_join) = ResultStore::spawn(
        db_manager,
        config.channels.db_task_channel_capacity,
        Arc::clone(shutdown_signal),
    )?;
    workers.push(("database", db_join));

    if config.acquisition.enabled {
        let acquisition_join = acquisition::spawn_acquisition(
            sensor.clone(),
            store.clone(),
            config.acquisition.interval(),
            Arc::clone(shutdown_signal),
        )?;
        workers.push(("acquisition", acquisition_join));
    } else {
        warn!("Background acquisition disabled by config");
    }

    let testbed = Testbed::new(sensor, motion, store);

    if config.api.enabled {
        let api_join = api::spawn_api_server(config.api.clone(), testbed.clone(), Arc::clone(shutdown_signal))?;
        workers.push(("api", api_join));
    }

    Ok(testbed)
}

fn start_sensor(
    config: &AppConfig,
    shutdown_signal: &Arc<AtomicBool>,
) -> StartupResult<(SensorHandle, JoinHandle<()>)> {
    let settings = LinkSettings::from_config(config);
    let capacity = config.channels.sensor_request_capacity;
    let worker = match config.serial.backend {
        SensorBackend::Serial => {
            let port = open_serial(config)?;
            let link = SensorLink::new(port, settings, Arc::clone(shutdown_signal));
            spawn_sensor_worker(link, capacity, Arc::clone(shutdown_signal))?
        }
        SensorBackend::Simulated => {
            info!("Using simulated force sensor");
            let link = SensorLink::new(
                SimulatedSensor::new(config.sensor.simulated_noise),
                settings,
                Arc::clone(shutdown_signal),
            );
            spawn_sensor_worker(link, capacity, Arc::clone(shutdown_signal))?
        }
    };
    Ok(worker)
}

fn run_control_panel(
    config: &AppConfig,
    testbed: Testbed,
    shutdown_signal: &Arc<AtomicBool>,
    workers: &mut Vec<(&'static str, JoinHandle<()>)>,
) {
    let control = match app::spawn_control_worker(
        testbed,
        config.channels.control_channel_capacity,
        Arc::clone(shutdown_signal),
    ) {
        Ok((control, control_join)) => {
            workers.push(("control worker", control_join));
            control
        }
        Err(e) => {
            error!("Failed to start control worker: {}", e);
            return;
        }
    };

    let window = &config.window;
    let options = eframe::NativeOptions {
        vsync: window.vsync,
        hardware_acceleration: if window.hardware_acceleration {
            eframe::HardwareAcceleration::Preferred // 硬件加速优先模式
        } else {
            eframe::HardwareAcceleration::Off
        },
        renderer: eframe::Renderer::Glow,
        viewport: egui::ViewportBuilder::default()
            .with_title(&window.title)
            .with_inner_size([window.width, window.height])
            .with_resizable(window.resizable),
        ..Default::default()
    };

    let app_config = config.clone();
    if let Err(e) = eframe::run_native(
        &window.title,
        options,
        Box::new(move |_cc| Ok(Box::new(app::TestbedApp::new(control, &app_config)))),
    ) {
        error!("GUI failed: {}", e);
        shutdown_signal.store(true, Ordering::Relaxed);
        join_workers(std::mem::take(workers));
        std::process::exit(1);
    }
}

fn wait_for_ctrl_c() {
    info!("Running headless, press Ctrl-C to stop");
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create signal runtime: {}", e);
            return;
        }
    };
    if let Err(e) = runtime.block_on(tokio::signal::ctrl_c()) {
        error!("Failed to listen for Ctrl-C: {}", e);
    }
}

fn join_workers(workers: Vec<(&'static str, JoinHandle<()>)>) {
    for (name, handle) in workers {
        match handle.join() {
            Ok(()) => info!("{} thread shut down gracefully", name),
            Err(e) => error!("{} thread panicked: {:?}", name, e),
        }
    }
}
