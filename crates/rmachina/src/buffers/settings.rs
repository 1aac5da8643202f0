use crate::types::{MotionType, ReferenceCS};
use serde::{Deserialize, Serialize};

/// Mutable motion settings bundled for push/pop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// TCP speed in mm/s.
    pub speed: f64,
    /// TCP acceleration in mm/s². Zero means controller default.
    pub acceleration: f64,
    /// Blend radius in mm.
    pub precision: f64,
    pub motion_type: MotionType,
    pub reference_cs: ReferenceCS,
    /// Extruded material per travelled mm.
    pub extrusion_rate: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            speed: 20.0,
            acceleration: 0.0,
            precision: 5.0,
            motion_type: MotionType::Linear,
            reference_cs: ReferenceCS::World,
            extrusion_rate: 0.0,
        }
    }
}

/// A single field that differs between two settings snapshots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingChange {
    Speed(f64),
    Acceleration(f64),
    Precision(f64),
    MotionType(MotionType),
    ReferenceCS(ReferenceCS),
    ExtrusionRate(f64),
}

impl Settings {
    /// Fields of `self` that differ from `before`, in a fixed order.
    pub fn changes_since(&self, before: &Settings) -> Vec<SettingChange> {
        let mut changes = Vec::new();
        if self.speed != before.speed {
            changes.push(SettingChange::Speed(self.speed));
        }
        if self.acceleration != before.acceleration {
            changes.push(SettingChange::Acceleration(self.acceleration));
        }
        if self.precision != before.precision {
            changes.push(SettingChange::Precision(self.precision));
        }
        if self.motion_type != before.motion_type {
            changes.push(SettingChange::MotionType(self.motion_type));
        }
        if self.reference_cs != before.reference_cs {
            changes.push(SettingChange::ReferenceCS(self.reference_cs));
        }
        if self.extrusion_rate != before.extrusion_rate {
            changes.push(SettingChange::ExtrusionRate(self.extrusion_rate));
        }
        changes
    }
}

/// Stack of settings snapshots.
#[derive(Debug, Clone, Default)]
pub struct SettingsBuffer {
    stack: Vec<Settings>,
    before_pop: Option<Settings>,
}

impl SettingsBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, snapshot: Settings) {
        self.stack.push(snapshot);
    }

    /// Pop the most recent snapshot. `current` is remembered as the value
    /// bound before this pop. Returns `None` and changes nothing when empty.
    pub fn pop(&mut self, current: &Settings) -> Option<Settings> {
        let restored = self.stack.pop()?;
        self.before_pop = Some(current.clone());
        Some(restored)
    }

    /// Settings that were active right before the last successful pop.
    pub fn settings_before_pop(&self) -> Option<&Settings> {
        self.before_pop.as_ref()
    }

    /// Number of stored snapshots.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}
