mod describe;
mod ids;

pub use ids::{ActionId, ActionIdGenerator};

use crate::geometry::Joints;
use crate::types::{ExternalAxesTarget, MotionType, ReferenceCS, RobotPart, Tool};
use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Payload of an action. The set of variants is closed: every cursor
/// transition and every backend matches on it exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ActionKind {
    /// TCP speed in mm/s.
    Speed { value: f64, relative: bool },
    /// TCP acceleration in mm/s².
    Acceleration { value: f64, relative: bool },
    /// Blend radius in mm.
    Precision { value: f64, relative: bool },
    MotionMode(MotionType),
    ReferenceFrame(ReferenceCS),
    PushSettings,
    PopSettings,
    Translation {
        delta: DVec3,
        relative: bool,
    },
    Rotation {
        rotation: DQuat,
        relative: bool,
    },
    Transformation {
        translation: DVec3,
        rotation: DQuat,
        relative: bool,
        /// Relative form only: apply the translation before the rotation.
        translation_first: bool,
    },
    Axes {
        joints: Joints,
        relative: bool,
    },
    ExternalAxis {
        /// One-based axis index.
        index: usize,
        value: f64,
        target: ExternalAxesTarget,
        relative: bool,
    },
    DefineTool(Tool),
    AttachTool { name: String },
    DetachTool,
    WriteDigitalIO { pin: String, on: bool, tool_pin: bool },
    WriteAnalogIO { pin: String, value: f64, tool_pin: bool },
    Wait { millis: u64 },
    Message(String),
    Comment(String),
    Temperature {
        part: RobotPart,
        value: f64,
        wait: bool,
        relative: bool,
    },
    Extrusion(bool),
    /// Extruded material per travelled mm.
    ExtrusionRate { value: f64, relative: bool },
    Initialization(bool),
    CustomCode { code: String, is_declaration: bool },
}

/// An immutable, id-stamped robot instruction.
///
/// Equality, ordering and hashing consider the id only.
#[derive(Debug, Clone, Serialize)]
pub struct Action {
    id: ActionId,
    kind: ActionKind,
}

impl Action {
    /// Create an action, stamping it with the generator's next id.
    pub fn new(ids: &ActionIdGenerator, kind: ActionKind) -> Self {
        Self {
            id: ids.next_id(),
            kind,
        }
    }

    pub fn id(&self) -> ActionId {
        self.id
    }

    pub fn kind(&self) -> &ActionKind {
        &self.kind
    }

    /// Whether applying this action produces a new motion target.
    pub fn is_motion(&self) -> bool {
        matches!(
            self.kind,
            ActionKind::Translation { .. }
                | ActionKind::Rotation { .. }
                | ActionKind::Transformation { .. }
                | ActionKind::Axes { .. }
        )
    }

    /// Short variant name, used in diagnostics.
    pub fn variant_name(&self) -> &'static str {
        match self.kind {
            ActionKind::Speed { .. } => "Speed",
            ActionKind::Acceleration { .. } => "Acceleration",
            ActionKind::Precision { .. } => "Precision",
            ActionKind::MotionMode(_) => "MotionMode",
            ActionKind::ReferenceFrame(_) => "ReferenceFrame",
            ActionKind::PushSettings => "PushSettings",
            ActionKind::PopSettings => "PopSettings",
            ActionKind::Translation { .. } => "Translation",
            ActionKind::Rotation { .. } => "Rotation",
            ActionKind::Transformation { .. } => "Transformation",
            ActionKind::Axes { .. } => "Axes",
            ActionKind::ExternalAxis { .. } => "ExternalAxis",
            ActionKind::DefineTool(_) => "DefineTool",
            ActionKind::AttachTool { .. } => "AttachTool",
            ActionKind::DetachTool => "DetachTool",
            ActionKind::WriteDigitalIO { .. } => "WriteDigitalIO",
            ActionKind::WriteAnalogIO { .. } => "WriteAnalogIO",
            ActionKind::Wait { .. } => "Wait",
            ActionKind::Message(_) => "Message",
            ActionKind::Comment(_) => "Comment",
            ActionKind::Temperature { .. } => "Temperature",
            ActionKind::Extrusion(_) => "Extrusion",
            ActionKind::ExtrusionRate { .. } => "ExtrusionRate",
            ActionKind::Initialization(_) => "Initialization",
            ActionKind::CustomCode { .. } => "CustomCode",
        }
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Action {}

impl PartialOrd for Action {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Action {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Hash for Action {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_ids_follow_creation_order() {
        let ids = ActionIdGenerator::new();
        let a = Action::new(&ids, ActionKind::Comment("first".into()));
        let b = Action::new(&ids, ActionKind::Comment("first".into()));
        assert!(a < b);
        assert_ne!(a, b, "same payload, different ids");
        assert_eq!(a.id().raw(), 1);
        assert_eq!(b.id().raw(), 2);
    }

    #[test]
    fn test_equality_is_by_id_only() {
        let ids = ActionIdGenerator::new();
        let a = Action::new(&ids, ActionKind::Wait { millis: 10 });
        let copy = a.clone();
        assert_eq!(a, copy);
    }

    #[test]
    fn test_is_motion() {
        let ids = ActionIdGenerator::new();
        let motion = Action::new(
            &ids,
            ActionKind::Translation {
                delta: DVec3::X,
                relative: true,
            },
        );
        let wait = Action::new(&ids, ActionKind::Wait { millis: 10 });
        assert!(motion.is_motion());
        assert!(!wait.is_motion());
        assert_eq!(wait.variant_name(), "Wait");
    }

    #[test]
    fn test_action_kind_serialization() {
        let kind = ActionKind::Speed {
            value: 50.0,
            relative: false,
        };
        let json = serde_json::to_string(&kind).expect("serialize");
        assert!(json.contains("\"type\":\"speed\""));
        let back: ActionKind = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, kind);
    }
}
