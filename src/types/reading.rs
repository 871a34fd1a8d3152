use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 一次解码后的力传感器采样（尚未入库，没有 id）
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct ForceSample {
    #[serde(rename = "Fx")]
    pub fx: f64,
    #[serde(rename = "Fy")]
    pub fy: f64,
    #[serde(rename = "Fz")]
    pub fz: f64,
}

impl ForceSample {
    pub fn new(fx: f64, fy: f64, fz: f64) -> Self {
        Self { fx, fy, fz }
    }

    /// 链路故障时返回的零读数
    pub fn zero() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn is_zero(&self) -> bool {
        self.fx == 0.0 && self.fy == 0.0 && self.fz == 0.0
    }
}

/// 已持久化的读数，入库后不可变
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Reading {
    pub id: i64,
    pub fx: f64,
    pub fy: f64,
    pub fz: f64,
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    pub fn new(id: i64, fx: f64, fy: f64, fz: f64, timestamp: DateTime<Utc>) -> Self {
        Self { id, fx, fy, fz, timestamp }
    }

    #[cfg(test)]
    pub fn sample(&self) -> ForceSample {
        ForceSample::new(self.fx, self.fy, self.fz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_sample_serializes_with_capitalized_keys() {
        let json = serde_json::to_value(ForceSample::new(1.0, -2.0, 3.5)).unwrap();
        assert_eq!(json["Fx"], 1.0);
        assert_eq!(json["Fy"], -2.0);
        assert_eq!(json["Fz"], 3.5);
    }

    #[test]
    fn reading_serializes_with_lowercase_keys() {
        let reading = Reading::new(7, 0.5, 0.0, -1.0, Utc::now());
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["fz"], -1.0);
        assert!(json["timestamp"].is_string());
    }
}
