use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::types::{Axis, ForceSample};

/// 应用配置管理模块
/// 集中管理所有配置项，提供默认值和配置验证
/// 硬件引脚、标定系数在启动时加载一次，之后只读

/// 主配置结构
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub serial: SerialConfig,
    pub sensor: SensorConfig,
    pub motion: MotionConfig,
    pub acquisition: AcquisitionConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub channels: ChannelConfig,
}

/// 窗口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: f32,
    pub height: f32,
    pub title: String,
    pub resizable: bool,
    pub vsync: bool,
    pub hardware_acceleration: bool,
    pub refresh_interval_ms: u64,
    pub plot_history: usize,
}

/// 传感器后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorBackend {
    Serial,
    Simulated,
}

/// 串口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub backend: SensorBackend,
    pub port: String,
    pub baud_rate: u32,
    pub timeout_ms: u64,
    pub settle_ms: u64,
    pub backoff_ms: u64,
    pub read_deadline_ms: u64,
}

/// 标定系数，对每个解码后的采样统一生效
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationFactors {
    pub fx: f64,
    pub fy: f64,
    pub fz: f64,
}

/// 传感器换算配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub full_scale: f64,
    pub calibration: CalibrationFactors,
    /// 模拟传感器的噪声幅度（原始码）
    pub simulated_noise: u16,
}

/// GPIO 后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpioBackend {
    Simulated,
    Rpi,
}

/// 单轴配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    pub step_pin: u8,
    pub dir_pin: u8,
    pub steps_per_mm: f64,
    /// 面板允许输入的最大位置，驱动本身不做限位
    pub travel_mm: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxesConfig {
    pub x: AxisConfig,
    pub y: AxisConfig,
    pub z: AxisConfig,
}

/// 运动配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub backend: GpioBackend,
    pub step_delay_us: u64,
    pub axes: AxesConfig,
}

/// 采集循环配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub enabled: bool,
    pub interval_ms: u64,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub auto_create_dir: bool,
    pub export_dir: String,
}

/// HTTP 接口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    pub bind_addr: String,
}

/// 通道配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub sensor_request_capacity: usize,
    pub db_task_channel_capacity: usize,
    pub control_channel_capacity: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 600.0,
            title: "Gecko Testbed Control".to_string(),
            resizable: true,
            vsync: true,
            hardware_acceleration: true,
            refresh_interval_ms: 1000,
            plot_history: 500,
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            backend: SensorBackend::Serial,
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115200,
            timeout_ms: 1000,
            settle_ms: 100,
            backoff_ms: 50,
            read_deadline_ms: 2000,
        }
    }
}

impl Default for CalibrationFactors {
    fn default() -> Self {
        Self {
            fx: 20.0,
            fy: 20.0,
            fz: 20.0,
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            full_scale: 2.0,
            calibration: CalibrationFactors::default(),
            simulated_noise: 40,
        }
    }
}

impl Default for AxesConfig {
    fn default() -> Self {
        // BCM 编号：(step, dir)
        Self {
            x: AxisConfig { step_pin: 16, dir_pin: 26, steps_per_mm: 200.0, travel_mm: 100.0 },
            y: AxisConfig { step_pin: 24, dir_pin: 25, steps_per_mm: 200.0, travel_mm: 50.0 },
            z: AxisConfig { step_pin: 27, dir_pin: 17, steps_per_mm: 200.0, travel_mm: 30.0 },
        }
    }
}

impl AxesConfig {
    pub fn get(&self, axis: Axis) -> &AxisConfig {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            backend: GpioBackend::Simulated,
            step_delay_us: 1000,
            axes: AxesConfig::default(),
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 50,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/gecko_testbed.db".to_string(),
            auto_create_dir: true,
            export_dir: "data_export".to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_addr: "0.0.0.0:5000".to_string(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            sensor_request_capacity: 64,
            db_task_channel_capacity: 1000,
            control_channel_capacity: 32,
        }
    }
}

impl CalibrationFactors {
    pub fn apply(&self, sample: ForceSample) -> ForceSample {
        ForceSample::new(sample.fx * self.fx, sample.fy * self.fy, sample.fz * self.fz)
    }
}

impl SerialConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn read_deadline(&self) -> Duration {
        Duration::from_millis(self.read_deadline_ms)
    }
}

impl MotionConfig {
    pub fn step_delay(&self) -> Duration {
        Duration::from_micros(self.step_delay_us)
    }
}

impl AcquisitionConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl AppConfig {
    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(ConfigError::IoError)?;

        let config: AppConfig = toml::from_str(&content)
            .map_err(ConfigError::ParseError)?;

        config.validate()?;
        Ok(config)
    }

    #[cfg(test)]
    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(ConfigError::SerializeError)?;

        std::fs::write(path, content)
            .map_err(ConfigError::IoError)?;

        Ok(())
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width <= 0.0 || self.window.height <= 0.0 {
            return Err(ConfigError::ValidationError("Window dimensions must be positive".to_string()));
        }

        if self.serial.backend == SensorBackend::Serial && self.serial.port.trim().is_empty() {
            return Err(ConfigError::ValidationError("Serial port path must not be empty".to_string()));
        }

        if self.serial.baud_rate == 0 {
            return Err(ConfigError::ValidationError("Baud rate must be positive".to_string()));
        }

        if self.serial.read_deadline_ms == 0 {
            return Err(ConfigError::ValidationError("Frame read deadline must be positive".to_string()));
        }

        if !(self.sensor.full_scale.is_finite() && self.sensor.full_scale > 0.0) {
            return Err(ConfigError::ValidationError("Sensor full scale must be positive".to_string()));
        }

        let cal = &self.sensor.calibration;
        if !(cal.fx.is_finite() && cal.fy.is_finite() && cal.fz.is_finite()) {
            return Err(ConfigError::ValidationError("Calibration factors must be finite".to_string()));
        }

        for axis in Axis::ALL {
            let axis_config = self.motion.axes.get(axis);
            if !(axis_config.steps_per_mm.is_finite() && axis_config.steps_per_mm > 0.0) {
                return Err(ConfigError::ValidationError(format!("Axis {} steps_per_mm must be positive", axis)));
            }
            if !(axis_config.travel_mm.is_finite() && axis_config.travel_mm >= 0.0) {
                return Err(ConfigError::ValidationError(format!("Axis {} travel must be non-negative", axis)));
            }
            if axis_config.step_pin == axis_config.dir_pin {
                return Err(ConfigError::ValidationError(format!("Axis {} step and dir pins must differ", axis)));
            }
        }

        let channels = &self.channels;
        if channels.sensor_request_capacity == 0
            || channels.db_task_channel_capacity == 0
            || channels.control_channel_capacity == 0
        {
            return Err(ConfigError::ValidationError("Channel capacities must be positive".to_string()));
        }

        Ok(())
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(toml::de::Error),
    #[cfg(test)]
    #[error("Serialize error: {0}")]
    SerializeError(toml::ser::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// 配置管理器
pub struct ConfigManager {
    config: AppConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let config = AppConfig::load_from_file(&path)?;
        Ok(Self {
            config,
            config_path: Some(path.as_ref().to_path_buf()),
        })
    }

    /// 文件不存在时使用默认配置
    pub fn load_or_default<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self {
                config: AppConfig::default(),
                config_path: Some(path.as_ref().to_path_buf()),
            })
        }
    }

    /// 获取当前配置
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&std::path::Path> {
        self.config_path.as_deref()
    }
}
