use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a tool that can be mounted on the robot flange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    /// Offset from the flange to the tool center point, in flange coordinates (mm).
    pub tcp_position: DVec3,
    /// Orientation of the tool center point relative to the flange.
    pub tcp_orientation: DQuat,
    /// Tool mass in kg.
    pub weight: f64,
    /// Center of gravity relative to the flange (mm).
    pub center_of_gravity: DVec3,
}

impl Tool {
    pub fn new(
        name: impl Into<String>,
        tcp_position: DVec3,
        tcp_orientation: DQuat,
        weight: f64,
        center_of_gravity: DVec3,
    ) -> Self {
        Self {
            name: name.into(),
            tcp_position,
            tcp_orientation: tcp_orientation.normalize(),
            weight,
            center_of_gravity,
        }
    }
}

/// How the robot interpolates between targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionType {
    #[default]
    Linear,
    Joint,
}

impl fmt::Display for MotionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionType::Linear => write!(f, "linear"),
            MotionType::Joint => write!(f, "joint"),
        }
    }
}

/// Frame in which relative motion deltas are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceCS {
    #[default]
    World,
    Local,
}

impl fmt::Display for ReferenceCS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceCS::World => write!(f, "world"),
            ReferenceCS::Local => write!(f, "local"),
        }
    }
}

/// Heated parts of an additive-manufacturing device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RobotPart {
    Extruder,
    Bed,
    Chamber,
}

impl fmt::Display for RobotPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RobotPart::Extruder => write!(f, "extruder"),
            RobotPart::Bed => write!(f, "bed"),
            RobotPart::Chamber => write!(f, "chamber"),
        }
    }
}

/// Which external-axes set an ExternalAxis action writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalAxesTarget {
    /// Axes travelling with cartesian (position/rotation) targets.
    Cartesian,
    /// Axes travelling with joint targets.
    Joint,
    #[default]
    All,
}

impl fmt::Display for ExternalAxesTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalAxesTarget::Cartesian => write!(f, "cartesian"),
            ExternalAxesTarget::Joint => write!(f, "joint"),
            ExternalAxesTarget::All => write!(f, "all"),
        }
    }
}
