//! 力传感器二进制协议
//!
//! 命令：start `0x23`，identify `& 0x01 berlin`，arm `0x24`。
//! 响应帧固定 11 字节：`0xA5` 起始字节，偏移 1/3/5 处为 Fx/Fy/Fz 的
//! 无符号大端 16 位原始码，7..11 字节忽略。

use crate::config::CalibrationFactors;
use crate::types::ForceSample;

pub const FRAME_LEN: usize = 11;
pub const FRAME_SENTINEL: u8 = 0xA5;

pub const CMD_START: [u8; 1] = [0x23];
pub const CMD_IDENTIFY: [u8; 8] = [0x26, 0x01, b'b', b'e', b'r', b'l', b'i', b'n'];
pub const CMD_ARM: [u8; 1] = [0x24];

/// 零点对应的原始码
pub const RAW_ZERO: u16 = 32768;

/// 结构合法的响应帧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame([u8; FRAME_LEN]);

impl RawFrame {
    /// 长度必须为 11 且首字节为 0xA5，否则丢弃
    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() != FRAME_LEN || buf[0] != FRAME_SENTINEL {
            return None;
        }
        let mut bytes = [0u8; FRAME_LEN];
        bytes.copy_from_slice(buf);
        Some(Self(bytes))
    }

    /// 由三个原始码构造一帧（模拟设备和测试使用）
    pub fn from_codes(fx: u16, fy: u16, fz: u16) -> Self {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = FRAME_SENTINEL;
        bytes[1..3].copy_from_slice(&fx.to_be_bytes());
        bytes[3..5].copy_from_slice(&fy.to_be_bytes());
        bytes[5..7].copy_from_slice(&fz.to_be_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    fn code_at(&self, offset: usize) -> u16 {
        u16::from_be_bytes([self.0[offset], self.0[offset + 1]])
    }

    pub fn fx_raw(&self) -> u16 {
        self.code_at(1)
    }

    pub fn fy_raw(&self) -> u16 {
        self.code_at(3)
    }

    pub fn fz_raw(&self) -> u16 {
        self.code_at(5)
    }
}

/// 原始码换算为 mV/V
pub fn raw_to_mv_v(raw: u16, full_scale: f64) -> f64 {
    (f64::from(raw) - f64::from(RAW_ZERO)) / f64::from(RAW_ZERO) * full_scale
}

/// 解码一帧并乘以各轴标定系数
pub fn decode(frame: &RawFrame, calibration: &CalibrationFactors, full_scale: f64) -> ForceSample {
    let mv_v = ForceSample::new(
        raw_to_mv_v(frame.fx_raw(), full_scale),
        raw_to_mv_v(frame.fy_raw(), full_scale),
        raw_to_mv_v(frame.fz_raw(), full_scale),
    );
    calibration.apply(mv_v)
}
