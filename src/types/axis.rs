use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MotionError;

/// 三个线性轴
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Axis {
    type Err = MotionError;

    /// 轴名不区分大小写，路由参数会先被转成大写
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "X" => Ok(Axis::X),
            "Y" => Ok(Axis::Y),
            "Z" => Ok(Axis::Z),
            _ => Err(MotionError::InvalidAxis(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_axes_case_insensitively() {
        assert_eq!("X".parse::<Axis>().unwrap(), Axis::X);
        assert_eq!("y".parse::<Axis>().unwrap(), Axis::Y);
        assert_eq!(" z ".parse::<Axis>().unwrap(), Axis::Z);
    }

    #[test]
    fn rejects_unknown_axis() {
        match "W".parse::<Axis>() {
            Err(MotionError::InvalidAxis(name)) => assert_eq!(name, "W"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
