use crate::buffers::Settings;
use crate::geometry::{ExternalAxes, Joints};
use crate::types::{RobotPart, Tool};
use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Geometric, IO, tool and thermal state derived by replaying actions.
///
/// Position/rotation and axes are never both authoritative: motion actions
/// clear whichever representation they do not set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CursorState {
    pub position: Option<DVec3>,
    pub rotation: Option<DQuat>,
    pub axes: Option<Joints>,
    /// External axes travelling with cartesian targets.
    pub external_axes_cartesian: Option<ExternalAxes>,
    /// External axes travelling with joint targets.
    pub external_axes_joints: Option<ExternalAxes>,
    pub settings: Settings,
    pub tool: Option<Tool>,
    /// Tools available for attachment, by name.
    pub tools: HashMap<String, Tool>,
    pub digital_outputs: BTreeMap<String, bool>,
    pub analog_outputs: BTreeMap<String, f64>,
    /// Target temperatures in °C.
    pub temperatures: BTreeMap<RobotPart, f64>,
    pub is_extruding: bool,
    /// Cumulative extruded length.
    pub extruded_length: f64,
    /// Whether the device was brought up by an Initialization action.
    pub device_initialized: bool,

    pub prev_position: Option<DVec3>,
    pub prev_rotation: Option<DQuat>,
    pub prev_axes: Option<Joints>,
    pub prev_extruded_length: f64,
}

/// Starting pose handed to [`crate::RobotCursor::initialize`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialPose {
    pub position: Option<DVec3>,
    pub rotation: Option<DQuat>,
    pub axes: Option<Joints>,
    pub external_axes: Option<ExternalAxes>,
}

impl CursorState {
    /// Extruded length added by the last applied action.
    pub fn extruded_delta(&self) -> f64 {
        self.extruded_length - self.prev_extruded_length
    }
}
